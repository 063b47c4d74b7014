//! Normalized inventory records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use xcexport_common::{ExportMethod, ValidityWindow};

/// What a signing identity is allowed to sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateKind {
    Development,
    Distribution,
    Installer,
}

/// A locally installed signing identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub common_name: String,
    pub team_id: String,
    pub serial_number: String,
    pub validity: ValidityWindow,
    /// Lowercase hex SHA-256 of the certificate DER.
    pub fingerprint: String,
    pub kind: CertificateKind,
}

impl CertificateInfo {
    /// Only certificates whose validity window covers `at` are eligible
    /// for matching.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.validity.covers(at)
    }
}

impl std::fmt::Display for CertificateInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (team: {}, serial: {}, valid: {})",
            self.common_name, self.team_id, self.serial_number, self.validity
        )
    }
}

/// The distribution channel a provisioning profile is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionType {
    Development,
    AdHoc,
    AppStore,
    Enterprise,
    DeveloperId,
}

impl DistributionType {
    /// The single distribution type an export method accepts, or `None`
    /// when the method requests no signing group at all.
    ///
    /// Mixing types across the bundles of one group is never allowed.
    pub fn for_method(method: ExportMethod) -> Option<DistributionType> {
        match method {
            ExportMethod::None => None,
            ExportMethod::AppStore => Some(DistributionType::AppStore),
            ExportMethod::Development => Some(DistributionType::Development),
            ExportMethod::DeveloperId => Some(DistributionType::DeveloperId),
        }
    }
}

impl std::fmt::Display for DistributionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionType::Development => write!(f, "development"),
            DistributionType::AdHoc => write!(f, "ad-hoc"),
            DistributionType::AppStore => write!(f, "app-store"),
            DistributionType::Enterprise => write!(f, "enterprise"),
            DistributionType::DeveloperId => write!(f, "developer-id"),
        }
    }
}

/// A locally installed provisioning profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningProfileInfo {
    pub name: String,
    pub uuid: Uuid,
    pub team_id: String,
    /// Exact bundle id, or a wildcard suffix pattern like `com.acme.*`.
    pub bundle_id_pattern: String,
    pub distribution_type: DistributionType,
    /// Capability identifiers the profile grants (entitlement keys).
    pub entitlements: BTreeSet<String>,
    /// Fingerprints of the certificates this profile can be used with.
    pub certificate_fingerprints: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ProvisioningProfileInfo {
    /// Wildcard-suffix matching: `com.acme.*` matches `com.acme.app` and
    /// `com.acme.app.widget`; exact patterns match only themselves.
    pub fn matches_bundle_id(&self, bundle_id: &str) -> bool {
        match self.bundle_id_pattern.strip_suffix('*') {
            Some(prefix) => bundle_id.starts_with(prefix),
            None => self.bundle_id_pattern == bundle_id,
        }
    }

    /// Specificity for candidate ordering: an exact pattern beats every
    /// wildcard, and longer wildcard prefixes beat shorter ones.
    pub fn pattern_specificity(&self) -> usize {
        match self.bundle_id_pattern.strip_suffix('*') {
            Some(prefix) => prefix.len(),
            None => usize::MAX,
        }
    }

    /// Whether this profile can sign with the given certificate.
    pub fn usable_with(&self, certificate: &CertificateInfo) -> bool {
        self.team_id == certificate.team_id
            && self.certificate_fingerprints.contains(&certificate.fingerprint)
    }

    /// Whether the profile grants every required capability.
    pub fn grants_entitlements(&self, required: &BTreeSet<String>) -> bool {
        self.entitlements.is_superset(required)
    }
}

impl std::fmt::Display for ProvisioningProfileInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, team: {}, pattern: {}, {})",
            self.name, self.uuid, self.team_id, self.bundle_id_pattern, self.distribution_type
        )
    }
}
