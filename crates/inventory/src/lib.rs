//! Certificate and provisioning-profile inventory.
//!
//! Normalizes the system signing store into comparable records, taken as
//! one immutable snapshot per export run. The resolver never queries the
//! store itself; it receives these collections as parameters.

pub mod executor;
pub mod keychain;
pub mod profiles;

pub use executor::{Executor, LocalExecutor};

use chrono::Utc;
use std::path::Path;
use tracing::debug;
use xcexport_common::{ExportMethod, Result};
use xcexport_signing_schema::{CertificateInfo, ProvisioningProfileInfo};

/// One snapshot of the signing store.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub certificates: Vec<CertificateInfo>,
    pub installer_certificates: Vec<CertificateInfo>,
    pub profiles: Vec<ProvisioningProfileInfo>,
}

/// Collect the validity-filtered inventory an export needs.
///
/// Installer certificates are queried only for App Store exports.
pub async fn collect_inventory(
    executor: &dyn Executor,
    method: ExportMethod,
    profiles_dir: &Path,
) -> Result<Inventory> {
    let now = Utc::now();

    let certificates = keychain::filter_valid_certificates(
        keychain::installed_codesigning_certificates(executor).await?,
        now,
    );
    for certificate in &certificates {
        debug!("installed certificate: {certificate}");
    }

    let installer_certificates = if method.is_app_store() {
        let installers = keychain::filter_valid_certificates(
            keychain::installed_installer_certificates(executor).await?,
            now,
        );
        for certificate in &installers {
            debug!("installed installer certificate: {certificate}");
        }
        installers
    } else {
        Vec::new()
    };

    let profiles = profiles::installed_provisioning_profiles(profiles_dir)?;

    Ok(Inventory {
        certificates,
        installer_certificates,
        profiles,
    })
}
