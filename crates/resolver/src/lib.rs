//! Code-sign group resolution.
//!
//! A pure, synchronous pipeline over immutable snapshots: candidate
//! construction, entitlement filtering, distribution-type filtering, then
//! deterministic selection. The pipeline performs no I/O — inventories
//! are taken as parameters, never queried here — so identical inputs give
//! identical output on any machine.

pub mod construct;
pub mod filter;
pub mod select;

#[cfg(test)]
pub(crate) mod testutil;

use serde::{Deserialize, Serialize};
use tracing::debug;
use xcexport_common::{ExportMethod, Result};
use xcexport_signing_schema::{
    BundleRequirement, CertificateInfo, DistributionType, ProvisioningProfileInfo,
    ResolvedMacSigningGroup, SelectableSigningGroup,
};

/// Why resolution was skipped and the export proceeds without re-signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Export method `none` never requests a signing group.
    ExportMethodNone,
    /// The archive's primary bundle carries no embedded provisioning
    /// profile and the method is not Developer ID: copy-through policy.
    NoEmbeddedProfile,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ExportMethodNone => write!(f, "export method is none"),
            SkipReason::NoEmbeddedProfile => {
                write!(f, "archive has no embedded provisioning profile")
            }
        }
    }
}

/// The selected signing group, with the installer certificate attached for
/// App Store exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvedSigningGroup {
    Standard(SelectableSigningGroup),
    AppStore(ResolvedMacSigningGroup),
}

impl ResolvedSigningGroup {
    pub fn signing_group(&self) -> &SelectableSigningGroup {
        match self {
            ResolvedSigningGroup::Standard(group) => group,
            ResolvedSigningGroup::AppStore(resolved) => &resolved.group,
        }
    }

    pub fn installer_certificate(&self) -> Option<&CertificateInfo> {
        match self {
            ResolvedSigningGroup::Standard(_) => None,
            ResolvedSigningGroup::AppStore(resolved) => Some(&resolved.installer_certificate),
        }
    }
}

/// Outcome of one resolution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    Skipped {
        reason: SkipReason,
    },
    Resolved {
        group: ResolvedSigningGroup,
        /// Non-fatal conditions (ambiguous candidates) surfaced to the user.
        warnings: Vec<String>,
    },
}

/// Resolve one signing group for the archive's bundle requirements.
///
/// Inventories must already be validity-filtered. Failure modes:
/// `NoSigningGroupFound` when no candidate survives both filters, and
/// `NoInstallerCertificateFound` for App Store exports without a matching
/// installer certificate.
pub fn resolve(
    requirements: &[BundleRequirement],
    certificates: &[CertificateInfo],
    installer_certificates: &[CertificateInfo],
    profiles: &[ProvisioningProfileInfo],
    method: ExportMethod,
    primary_has_embedded_profile: bool,
) -> Result<Resolution> {
    let distribution = match DistributionType::for_method(method) {
        Some(distribution) => distribution,
        None => {
            return Ok(Resolution::Skipped {
                reason: SkipReason::ExportMethodNone,
            })
        }
    };

    if !primary_has_embedded_profile && method != ExportMethod::DeveloperId {
        return Ok(Resolution::Skipped {
            reason: SkipReason::NoEmbeddedProfile,
        });
    }

    let groups = construct::selectable_groups(certificates, profiles, requirements);
    debug!("{} candidate signing groups constructed", groups.len());

    let groups = filter::filter_by_entitlements(groups, requirements);
    let groups = filter::filter_by_distribution_type(groups, distribution);
    debug!("{} candidate signing groups after filtering", groups.len());

    let (group, mut warnings) = select::select_group(groups, requirements, method)?;

    if method.is_app_store() {
        let (installer_certificate, more) =
            select::select_installer_certificate(installer_certificates, &group.certificate.team_id)?;
        warnings.extend(more);
        Ok(Resolution::Resolved {
            group: ResolvedSigningGroup::AppStore(ResolvedMacSigningGroup {
                group,
                installer_certificate,
            }),
            warnings,
        })
    } else {
        Ok(Resolution::Resolved {
            group: ResolvedSigningGroup::Standard(group),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{certificate, installer_certificate, profile, requirement};
    use pretty_assertions::assert_eq;
    use xcexport_common::Error;

    /// The worked scenario: one bundle requiring "push", one distribution
    /// certificate, one wildcard App Store profile granting push and
    /// keychain, one same-team installer certificate.
    fn scenario() -> (
        Vec<BundleRequirement>,
        Vec<CertificateInfo>,
        Vec<CertificateInfo>,
        Vec<ProvisioningProfileInfo>,
    ) {
        let c1 = certificate("Apple Distribution: Acme (TEAM1)", "TEAM1", "fp-c1");
        let mut p1 = profile("Acme Store", "com.acme.*", "TEAM1", &["fp-c1"]);
        p1.entitlements = ["push", "keychain"].iter().map(|s| s.to_string()).collect();
        let ic1 = installer_certificate("3rd Party Mac Developer Installer: Acme (TEAM1)", "TEAM1");
        (
            vec![requirement("com.acme.app", &["push"], None)],
            vec![c1],
            vec![ic1],
            vec![p1],
        )
    }

    #[test]
    fn test_app_store_scenario_resolves_group_and_installer() {
        let (reqs, certs, installers, profiles) = scenario();
        let resolution = resolve(
            &reqs,
            &certs,
            &installers,
            &profiles,
            ExportMethod::AppStore,
            true,
        )
        .unwrap();

        match resolution {
            Resolution::Resolved { group, warnings } => {
                assert_eq!(
                    group.signing_group().certificate.common_name,
                    "Apple Distribution: Acme (TEAM1)"
                );
                assert_eq!(
                    group.signing_group().bundle_id_profile_map["com.acme.app"].name,
                    "Acme Store"
                );
                assert_eq!(
                    group.installer_certificate().unwrap().common_name,
                    "3rd Party Mac Developer Installer: Acme (TEAM1)"
                );
                assert!(warnings.is_empty());
            }
            other => panic!("expected resolved group, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_entitlement_fails_resolution() {
        let (reqs, certs, installers, mut profiles) = scenario();
        // Drop "push" from the profile grant; the requirement no longer holds.
        profiles[0].entitlements =
            ["keychain"].iter().map(|s| s.to_string()).collect();

        let err = resolve(
            &reqs,
            &certs,
            &installers,
            &profiles,
            ExportMethod::AppStore,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoSigningGroupFound { .. }));
    }

    #[test]
    fn test_method_none_always_skips() {
        // Inventories are irrelevant, even when empty.
        let resolution = resolve(&[], &[], &[], &[], ExportMethod::None, false).unwrap();
        assert_eq!(
            resolution,
            Resolution::Skipped {
                reason: SkipReason::ExportMethodNone
            }
        );

        let (reqs, certs, installers, profiles) = scenario();
        let resolution = resolve(
            &reqs,
            &certs,
            &installers,
            &profiles,
            ExportMethod::None,
            true,
        )
        .unwrap();
        assert!(matches!(
            resolution,
            Resolution::Skipped {
                reason: SkipReason::ExportMethodNone
            }
        ));
    }

    #[test]
    fn test_no_embedded_profile_skips_unless_developer_id() {
        let (reqs, certs, installers, profiles) = scenario();
        let resolution = resolve(
            &reqs,
            &certs,
            &installers,
            &profiles,
            ExportMethod::Development,
            false,
        )
        .unwrap();
        assert_eq!(
            resolution,
            Resolution::Skipped {
                reason: SkipReason::NoEmbeddedProfile
            }
        );

        // Developer ID always requires a profile, so resolution proceeds
        // (and fails here: the profile is App Store type).
        let err = resolve(
            &reqs,
            &certs,
            &installers,
            &profiles,
            ExportMethod::DeveloperId,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoSigningGroupFound { .. }));
    }

    #[test]
    fn test_distribution_type_must_match_method() {
        let (reqs, certs, installers, profiles) = scenario();
        // The App Store profile cannot serve a development export.
        let err = resolve(
            &reqs,
            &certs,
            &installers,
            &profiles,
            ExportMethod::Development,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoSigningGroupFound { .. }));
    }

    #[test]
    fn test_app_store_without_installer_certificate_fails() {
        let (reqs, certs, _, profiles) = scenario();
        let err = resolve(&reqs, &certs, &[], &profiles, ExportMethod::AppStore, true)
            .unwrap_err();
        match err {
            Error::NoInstallerCertificateFound { team_id } => assert_eq!(team_id, "TEAM1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unmatched_bundle_fails_rather_than_partial_mapping() {
        let (mut reqs, certs, installers, profiles) = scenario();
        reqs.push(requirement("com.other.daemon", &[], None));

        let err = resolve(
            &reqs,
            &certs,
            &installers,
            &profiles,
            ExportMethod::AppStore,
            true,
        )
        .unwrap_err();
        match err {
            Error::NoSigningGroupFound { bundle_ids, .. } => {
                assert!(bundle_ids.contains("com.acme.app"));
                assert!(bundle_ids.contains("com.other.daemon"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        use xcexport_signing_schema::DistributionType;

        let c_z = certificate("Z Distribution: Acme (TEAM1)", "TEAM1", "fp-z");
        let c_a = certificate("A Distribution: Acme (TEAM1)", "TEAM1", "fp-a");
        let mut p = profile("Shared", "com.acme.*", "TEAM1", &["fp-a", "fp-z"]);
        p.distribution_type = DistributionType::Development;
        let reqs = vec![requirement("com.acme.app", &[], None)];

        let selected = |resolution: Resolution| match resolution {
            Resolution::Resolved { group, warnings } => (
                group.signing_group().certificate.common_name.clone(),
                warnings.len(),
            ),
            other => panic!("expected resolved group, got {other:?}"),
        };

        let forward = selected(
            resolve(
                &reqs,
                &[c_z.clone(), c_a.clone()],
                &[],
                &[p.clone()],
                ExportMethod::Development,
                true,
            )
            .unwrap(),
        );
        let reversed = selected(
            resolve(
                &reqs,
                &[c_a, c_z],
                &[],
                &[p],
                ExportMethod::Development,
                true,
            )
            .unwrap(),
        );

        // Same selected certificate regardless of inventory enumeration
        // order, and the ambiguity is reported both times.
        assert_eq!(forward, ("A Distribution: Acme (TEAM1)".to_string(), 1));
        assert_eq!(forward, reversed);
    }
}
