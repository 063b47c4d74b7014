//! Typed records for code-sign group resolution.
//!
//! Everything here is an immutable snapshot built once per export run:
//! the bundle requirements discovered in an archive, the normalized
//! certificate/profile inventory, candidate signing groups, and the
//! export-options contract handed to `xcodebuild -exportArchive`.

pub mod export_options;
pub mod group;
pub mod profile;
pub mod records;
pub mod requirement;

pub use export_options::ExportOptions;
pub use group::{ResolvedMacSigningGroup, SelectableSigningGroup};
pub use profile::parse_provisioning_profile;
pub use records::{CertificateInfo, CertificateKind, DistributionType, ProvisioningProfileInfo};
pub use requirement::BundleRequirement;
