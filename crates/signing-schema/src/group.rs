//! Candidate and resolved signing groups.

use crate::records::{CertificateInfo, ProvisioningProfileInfo};
use crate::requirement::BundleRequirement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One candidate resolution: a certificate plus one profile per bundle id.
///
/// Every profile in the map is usable with `certificate` and its pattern
/// matches the corresponding bundle id; construction in the resolver
/// guarantees both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectableSigningGroup {
    pub certificate: CertificateInfo,
    pub bundle_id_profile_map: BTreeMap<String, ProvisioningProfileInfo>,
}

impl SelectableSigningGroup {
    /// Whether the group assigns a profile to every requirement.
    pub fn covers(&self, requirements: &[BundleRequirement]) -> bool {
        requirements
            .iter()
            .all(|r| self.bundle_id_profile_map.contains_key(&r.bundle_id))
    }

    /// The bundle-id → profile-name mapping consumed by the export-options
    /// writer. Must contain an entry for every bundle in the archive.
    pub fn profile_name_mapping(&self) -> BTreeMap<String, String> {
        self.bundle_id_profile_map
            .iter()
            .map(|(bundle_id, profile)| (bundle_id.clone(), profile.name.clone()))
            .collect()
    }
}

/// An App Store resolution: the signing group plus the installer
/// certificate used to sign the product package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMacSigningGroup {
    pub group: SelectableSigningGroup,
    pub installer_certificate: CertificateInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CertificateKind, DistributionType};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;
    use uuid::Uuid;
    use xcexport_common::ValidityWindow;

    fn cert() -> CertificateInfo {
        CertificateInfo {
            common_name: "Apple Distribution: Acme (TEAM1)".to_string(),
            team_id: "TEAM1".to_string(),
            serial_number: "01".to_string(),
            validity: ValidityWindow::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            ),
            fingerprint: "aa".to_string(),
            kind: CertificateKind::Distribution,
        }
    }

    fn profile(name: &str, pattern: &str) -> ProvisioningProfileInfo {
        ProvisioningProfileInfo {
            name: name.to_string(),
            uuid: Uuid::nil(),
            team_id: "TEAM1".to_string(),
            bundle_id_pattern: pattern.to_string(),
            distribution_type: DistributionType::AppStore,
            entitlements: BTreeSet::new(),
            certificate_fingerprints: BTreeSet::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_covers_and_mapping() {
        let mut map = BTreeMap::new();
        map.insert(
            "com.acme.app".to_string(),
            profile("Acme App Store", "com.acme.*"),
        );
        let group = SelectableSigningGroup {
            certificate: cert(),
            bundle_id_profile_map: map,
        };

        let reqs = vec![BundleRequirement::new("com.acme.app")];
        assert!(group.covers(&reqs));

        let more = vec![
            BundleRequirement::new("com.acme.app"),
            BundleRequirement::new("com.acme.app.widget"),
        ];
        assert!(!group.covers(&more));

        let mapping = group.profile_name_mapping();
        assert_eq!(mapping.get("com.acme.app").unwrap(), "Acme App Store");
    }
}
