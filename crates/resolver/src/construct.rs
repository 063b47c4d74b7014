//! Candidate signing group construction.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;
use xcexport_signing_schema::{
    BundleRequirement, CertificateInfo, ProvisioningProfileInfo, SelectableSigningGroup,
};

/// Build every candidate signing group: one per certificate that can cover
/// all bundle requirements with its usable profiles.
///
/// An empty result is not an error; it is reported upstream as "no
/// candidate signing groups".
pub fn selectable_groups(
    certificates: &[CertificateInfo],
    profiles: &[ProvisioningProfileInfo],
    requirements: &[BundleRequirement],
) -> Vec<SelectableSigningGroup> {
    let mut groups = Vec::new();

    for certificate in certificates {
        let usable: Vec<&ProvisioningProfileInfo> = profiles
            .iter()
            .filter(|p| p.usable_with(certificate))
            .collect();
        if usable.is_empty() {
            debug!("no usable profiles for certificate: {}", certificate);
            continue;
        }

        let mut map = BTreeMap::new();
        for requirement in requirements {
            match best_profile(requirement, &usable) {
                Some(profile) => {
                    map.insert(requirement.bundle_id.clone(), profile.clone());
                }
                None => {
                    debug!(
                        "certificate {} has no profile matching bundle id {}",
                        certificate.common_name, requirement.bundle_id
                    );
                    map.clear();
                    break;
                }
            }
        }

        if !requirements.is_empty() && map.len() == requirements.len() {
            groups.push(SelectableSigningGroup {
                certificate: certificate.clone(),
                bundle_id_profile_map: map,
            });
        }
    }

    groups
}

/// The preferred profile for one bundle requirement, or `None` when no
/// usable profile matches its bundle id.
fn best_profile<'a>(
    requirement: &BundleRequirement,
    usable: &[&'a ProvisioningProfileInfo],
) -> Option<&'a ProvisioningProfileInfo> {
    let mut candidates: Vec<&ProvisioningProfileInfo> = usable
        .iter()
        .copied()
        .filter(|p| p.matches_bundle_id(&requirement.bundle_id))
        .collect();
    candidates.sort_by(|a, b| profile_preference(requirement, a, b));
    candidates.first().copied()
}

/// Deterministic profile preference: an already-embedded profile first,
/// then exact bundle-id match over wildcard, then the most specific
/// (longest) wildcard, then the most recently issued profile, with lexical
/// profile name as the final tie-break.
fn profile_preference(
    requirement: &BundleRequirement,
    a: &ProvisioningProfileInfo,
    b: &ProvisioningProfileInfo,
) -> Ordering {
    let embedded = |p: &ProvisioningProfileInfo| requirement.embedded_profile_id == Some(p.uuid);
    embedded(b)
        .cmp(&embedded(a))
        .then_with(|| b.pattern_specificity().cmp(&a.pattern_specificity()))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{certificate, profile, requirement};
    use uuid::Uuid;

    #[test]
    fn test_certificate_without_profiles_yields_no_group() {
        let cert = certificate("Apple Distribution: Acme (TEAM1)", "TEAM1", "fp-1");
        let groups = selectable_groups(
            &[cert],
            &[],
            &[requirement("com.acme.app", &[], None)],
        );
        assert!(groups.is_empty());
    }

    #[test]
    fn test_every_requirement_must_be_covered() {
        let cert = certificate("Apple Distribution: Acme (TEAM1)", "TEAM1", "fp-1");
        let p = profile("App", "com.acme.app", "TEAM1", &["fp-1"]);
        let reqs = vec![
            requirement("com.acme.app", &[], None),
            requirement("com.acme.app.widget", &[], None),
        ];
        // The single profile covers only one of the two bundles.
        assert!(selectable_groups(&[cert.clone()], &[p.clone()], &reqs).is_empty());

        let wildcard = profile("Wildcard", "com.acme.*", "TEAM1", &["fp-1"]);
        let groups = selectable_groups(&[cert], &[p, wildcard], &reqs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].bundle_id_profile_map.len(), 2);
    }

    #[test]
    fn test_exact_match_beats_wildcard() {
        let cert = certificate("Apple Distribution: Acme (TEAM1)", "TEAM1", "fp-1");
        let wildcard = profile("Wildcard", "com.acme.*", "TEAM1", &["fp-1"]);
        let exact = profile("Exact", "com.acme.app", "TEAM1", &["fp-1"]);
        let groups = selectable_groups(
            &[cert],
            &[wildcard, exact],
            &[requirement("com.acme.app", &[], None)],
        );
        assert_eq!(
            groups[0].bundle_id_profile_map["com.acme.app"].name,
            "Exact"
        );
    }

    #[test]
    fn test_more_specific_wildcard_wins() {
        let cert = certificate("Apple Distribution: Acme (TEAM1)", "TEAM1", "fp-1");
        let wide = profile("Wide", "com.acme.*", "TEAM1", &["fp-1"]);
        let narrow = profile("Narrow", "com.acme.app.*", "TEAM1", &["fp-1"]);
        let groups = selectable_groups(
            &[cert],
            &[wide, narrow],
            &[requirement("com.acme.app.ext", &[], None)],
        );
        assert_eq!(
            groups[0].bundle_id_profile_map["com.acme.app.ext"].name,
            "Narrow"
        );
    }

    #[test]
    fn test_newer_profile_preferred_on_equal_specificity() {
        let cert = certificate("Apple Distribution: Acme (TEAM1)", "TEAM1", "fp-1");
        let mut old = profile("Old", "com.acme.app", "TEAM1", &["fp-1"]);
        old.created_at = old.created_at - chrono::Duration::days(30);
        let new = profile("New", "com.acme.app", "TEAM1", &["fp-1"]);
        let groups = selectable_groups(
            &[cert],
            &[old, new],
            &[requirement("com.acme.app", &[], None)],
        );
        assert_eq!(groups[0].bundle_id_profile_map["com.acme.app"].name, "New");
    }

    #[test]
    fn test_embedded_profile_identity_preferred() {
        let cert = certificate("Apple Distribution: Acme (TEAM1)", "TEAM1", "fp-1");
        let embedded_id = Uuid::from_u128(7);
        let mut embedded = profile("Embedded", "com.acme.*", "TEAM1", &["fp-1"]);
        embedded.uuid = embedded_id;
        // More specific and newer, but not the embedded identity.
        let exact = profile("Exact", "com.acme.app", "TEAM1", &["fp-1"]);
        let groups = selectable_groups(
            &[cert],
            &[embedded, exact],
            &[requirement("com.acme.app", &[], Some(embedded_id))],
        );
        assert_eq!(
            groups[0].bundle_id_profile_map["com.acme.app"].name,
            "Embedded"
        );
    }

    #[test]
    fn test_team_mismatch_is_not_usable() {
        let cert = certificate("Apple Distribution: Acme (TEAM1)", "TEAM1", "fp-1");
        let other_team = profile("Other", "com.acme.app", "TEAM2", &["fp-1"]);
        let groups = selectable_groups(
            &[cert],
            &[other_team],
            &[requirement("com.acme.app", &[], None)],
        );
        assert!(groups.is_empty());
    }
}
