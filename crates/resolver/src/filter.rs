//! Candidate group filtering.
//!
//! Two independent predicates applied as a conjunction: entitlement
//! coverage and distribution-type compatibility.

use tracing::debug;
use xcexport_signing_schema::{BundleRequirement, DistributionType, SelectableSigningGroup};

/// Keep groups whose every assigned profile grants the corresponding
/// bundle's required entitlements.
pub fn filter_by_entitlements(
    groups: Vec<SelectableSigningGroup>,
    requirements: &[BundleRequirement],
) -> Vec<SelectableSigningGroup> {
    groups
        .into_iter()
        .filter(|group| {
            requirements.iter().all(|requirement| {
                match group.bundle_id_profile_map.get(&requirement.bundle_id) {
                    Some(profile) => {
                        let covered = profile.grants_entitlements(&requirement.entitlements);
                        if !covered {
                            debug!(
                                "dropping group with certificate {}: profile {} does not grant \
                                 the entitlements required by {}",
                                group.certificate.common_name,
                                profile.name,
                                requirement.bundle_id
                            );
                        }
                        covered
                    }
                    None => false,
                }
            })
        })
        .collect()
}

/// Keep groups whose every assigned profile has exactly the given
/// distribution type. Groups mixing types across bundles are rejected.
pub fn filter_by_distribution_type(
    groups: Vec<SelectableSigningGroup>,
    distribution: DistributionType,
) -> Vec<SelectableSigningGroup> {
    groups
        .into_iter()
        .filter(|group| {
            let uniform = group
                .bundle_id_profile_map
                .values()
                .all(|p| p.distribution_type == distribution);
            if !uniform {
                debug!(
                    "dropping group with certificate {}: profile distribution types do not all \
                     match {}",
                    group.certificate.common_name, distribution
                );
            }
            uniform
        })
        .collect()
}
