//! Per-bundle signing requirements discovered in an archive.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// One application or embedded extension that must be re-signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleRequirement {
    /// Unique within an archive, never empty.
    pub bundle_id: String,
    /// Capability identifiers the bundle requires (entitlement keys).
    pub entitlements: BTreeSet<String>,
    /// Identity of a profile already embedded in the archive, if any.
    pub embedded_profile_id: Option<Uuid>,
}

impl BundleRequirement {
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            entitlements: BTreeSet::new(),
            embedded_profile_id: None,
        }
    }
}

/// The bundle ids of a requirement set, in input order.
pub fn bundle_ids(requirements: &[BundleRequirement]) -> Vec<String> {
    requirements.iter().map(|r| r.bundle_id.clone()).collect()
}
