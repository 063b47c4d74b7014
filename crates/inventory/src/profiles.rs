//! Provisioning profile inventory.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xcexport_common::{Error, Result};
use xcexport_signing_schema::{parse_provisioning_profile, ProvisioningProfileInfo};

const PROFILE_EXTENSIONS: [&str; 2] = ["provisionprofile", "mobileprovision"];

/// Where the user's installed profiles live.
pub fn default_profiles_directory() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join("Library")
            .join("MobileDevice")
            .join("Provisioning Profiles")
    })
}

/// Read every installed profile under `dir`.
///
/// A missing directory is an empty inventory (normal on a fresh machine);
/// an unreadable one is `InventoryUnavailable`. Individual profiles that
/// fail to parse are skipped with a warning.
pub fn installed_provisioning_profiles(dir: &Path) -> Result<Vec<ProvisioningProfileInfo>> {
    if !dir.exists() {
        warn!("profile directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::InventoryUnavailable(format!(
            "cannot read profile directory {}: {e}",
            dir.display()
        ))
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| PROFILE_EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut profiles = Vec::new();
    for path in paths {
        match std::fs::read(&path)
            .map_err(Error::from)
            .and_then(|data| parse_provisioning_profile(&data))
        {
            Ok(profile) => {
                debug!("installed profile: {profile}");
                profiles.push(profile);
            }
            Err(e) => warn!("skipping unreadable profile {}: {e}", path.display()),
        }
    }

    Ok(profiles)
}
