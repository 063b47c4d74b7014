//! Entitlements files inside archived bundles.

use plist::Value;
use std::collections::BTreeSet;
use std::path::Path;
use xcexport_common::{Error, Result};

/// Read the capability identifiers (entitlement keys) from an
/// entitlements plist. Handles both XML and binary plists.
pub fn read_entitlement_keys(path: &Path) -> Result<BTreeSet<String>> {
    let value = Value::from_file(path)?;
    let dict = value.as_dictionary().ok_or_else(|| {
        Error::MalformedArchive(format!(
            "entitlements file is not a dictionary: {}",
            path.display()
        ))
    })?;
    Ok(dict.keys().cloned().collect())
}
