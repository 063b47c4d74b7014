//! Shared builders for resolver tests.

use chrono::{TimeZone, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;
use xcexport_common::ValidityWindow;
use xcexport_signing_schema::{
    BundleRequirement, CertificateInfo, CertificateKind, DistributionType,
    ProvisioningProfileInfo,
};

pub fn certificate(common_name: &str, team_id: &str, fingerprint: &str) -> CertificateInfo {
    CertificateInfo {
        common_name: common_name.to_string(),
        team_id: team_id.to_string(),
        serial_number: "01".to_string(),
        validity: ValidityWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        ),
        fingerprint: fingerprint.to_string(),
        kind: CertificateKind::Distribution,
    }
}

pub fn installer_certificate(common_name: &str, team_id: &str) -> CertificateInfo {
    CertificateInfo {
        kind: CertificateKind::Installer,
        ..certificate(common_name, team_id, "fp-installer")
    }
}

/// An App Store profile; tests mutate fields for other shapes.
pub fn profile(
    name: &str,
    pattern: &str,
    team_id: &str,
    fingerprints: &[&str],
) -> ProvisioningProfileInfo {
    ProvisioningProfileInfo {
        name: name.to_string(),
        uuid: Uuid::new_v4(),
        team_id: team_id.to_string(),
        bundle_id_pattern: pattern.to_string(),
        distribution_type: DistributionType::AppStore,
        entitlements: BTreeSet::new(),
        certificate_fingerprints: fingerprints.iter().map(|s| s.to_string()).collect(),
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        expires_at: Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap(),
    }
}

pub fn requirement(
    bundle_id: &str,
    entitlements: &[&str],
    embedded_profile_id: Option<Uuid>,
) -> BundleRequirement {
    BundleRequirement {
        bundle_id: bundle_id.to_string(),
        entitlements: entitlements.iter().map(|s| s.to_string()).collect(),
        embedded_profile_id,
    }
}
