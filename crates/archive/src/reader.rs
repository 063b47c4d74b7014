//! The `.xcarchive` reader.

use crate::entitlements;
use plist::{Dictionary, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xcexport_common::{Error, Result};
use xcexport_signing_schema::{parse_provisioning_profile, BundleRequirement, ProvisioningProfileInfo};

const ENTITLEMENTS_FILE: &str = "archived-expanded-entitlements.xcent";
const EMBEDDED_PROFILE_FILE: &str = "embedded.provisionprofile";

/// A parsed macOS build archive.
#[derive(Debug, Clone)]
pub struct MacosArchive {
    pub path: PathBuf,
    /// The application bundle under `Products/`.
    pub application_path: PathBuf,
    pub bundle_id: String,
    pub signing_identity: Option<String>,
    /// One requirement per signable bundle: the application first, then
    /// its app extensions.
    pub requirements: Vec<BundleRequirement>,
    /// The primary bundle's embedded profile, when present.
    pub embedded_profile: Option<ProvisioningProfileInfo>,
}

impl MacosArchive {
    /// Parse the archive manifest and extract every bundle requirement.
    pub fn load(path: &Path) -> Result<Self> {
        let info_path = path.join("Info.plist");
        let info = Value::from_file(&info_path).map_err(|e| {
            Error::MalformedArchive(format!("cannot read {}: {e}", info_path.display()))
        })?;
        let properties = info
            .as_dictionary()
            .and_then(|dict| dict.get("ApplicationProperties"))
            .and_then(Value::as_dictionary)
            .ok_or_else(|| {
                Error::MalformedArchive(format!(
                    "missing ApplicationProperties in {}",
                    info_path.display()
                ))
            })?;

        let application_rel = dict_string(properties, "ApplicationPath").ok_or_else(|| {
            Error::MalformedArchive("missing ApplicationPath in archive manifest".to_string())
        })?;
        let bundle_id = dict_string(properties, "CFBundleIdentifier").ok_or_else(|| {
            Error::MalformedArchive("missing CFBundleIdentifier in archive manifest".to_string())
        })?;
        let signing_identity = dict_string(properties, "SigningIdentity");

        let application_path = path.join("Products").join(&application_rel);
        let (primary, embedded_profile) = read_bundle(&application_path, true)?;
        if primary.bundle_id != bundle_id {
            warn!(
                "archive manifest bundle id {} differs from application bundle id {}",
                bundle_id, primary.bundle_id
            );
        }

        let mut requirements = vec![primary];
        let mut seen: BTreeSet<String> =
            requirements.iter().map(|r| r.bundle_id.clone()).collect();

        for extension_path in app_extensions(&application_path)? {
            match read_bundle(&extension_path, false) {
                Ok((requirement, _)) => {
                    if seen.insert(requirement.bundle_id.clone()) {
                        requirements.push(requirement);
                    } else {
                        warn!(
                            "duplicate bundle id {} in {}, keeping first",
                            requirement.bundle_id,
                            extension_path.display()
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        "skipping unreadable app extension {}: {e}",
                        extension_path.display()
                    );
                }
            }
        }

        debug!(
            "archive {} contains {} signable bundles",
            path.display(),
            requirements.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            application_path,
            bundle_id,
            signing_identity,
            requirements,
            embedded_profile,
        })
    }

    /// Whether the primary bundle carries an embedded provisioning
    /// profile. Drives the copy-through policy for non-Developer-ID
    /// exports.
    pub fn has_embedded_profile(&self) -> bool {
        self.embedded_profile.is_some()
    }

    pub fn bundle_ids(&self) -> Vec<String> {
        xcexport_signing_schema::requirement::bundle_ids(&self.requirements)
    }

    /// The application dSYM and any framework dSYMs under `dSYMs/`.
    pub fn find_dsyms(&self) -> Result<(Option<PathBuf>, Vec<PathBuf>)> {
        let dsym_dir = self.path.join("dSYMs");
        if !dsym_dir.is_dir() {
            return Ok((None, Vec::new()));
        }

        let app_dsym_name = self
            .application_path
            .file_name()
            .map(|name| format!("{}.dSYM", name.to_string_lossy()));

        let mut app_dsym = None;
        let mut framework_dsyms = Vec::new();
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dsym_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().map(|ext| ext == "dSYM").unwrap_or(false))
            .collect();
        entries.sort();

        for entry in entries {
            let name = entry.file_name().map(|n| n.to_string_lossy().to_string());
            if name.as_deref() == app_dsym_name.as_deref() {
                app_dsym = Some(entry);
            } else {
                framework_dsyms.push(entry);
            }
        }

        Ok((app_dsym, framework_dsyms))
    }
}

fn dict_string(dict: &Dictionary, key: &str) -> Option<String> {
    dict.get(key).and_then(Value::as_string).map(str::to_string)
}

/// Read one bundle's requirement. For the primary application an
/// unparseable Info.plist, entitlements file or embedded profile is fatal;
/// extensions propagate the error to the caller, which skips them.
fn read_bundle(
    bundle_path: &Path,
    primary: bool,
) -> Result<(BundleRequirement, Option<ProvisioningProfileInfo>)> {
    let contents = bundle_path.join("Contents");

    let info_path = contents.join("Info.plist");
    let info = Value::from_file(&info_path).map_err(|e| {
        Error::MalformedArchive(format!("cannot read {}: {e}", info_path.display()))
    })?;
    let bundle_id = info
        .as_dictionary()
        .and_then(|dict| dict.get("CFBundleIdentifier"))
        .and_then(Value::as_string)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            Error::MalformedArchive(format!("missing CFBundleIdentifier in {}", info_path.display()))
        })?
        .to_string();

    let mut requirement = BundleRequirement::new(bundle_id);
    requirement.entitlements = read_entitlements(bundle_path, &contents, primary)?;

    let profile_path = contents.join(EMBEDDED_PROFILE_FILE);
    let embedded_profile = if profile_path.is_file() {
        match std::fs::read(&profile_path)
            .map_err(Error::from)
            .and_then(|data| parse_provisioning_profile(&data))
        {
            Ok(profile) => Some(profile),
            Err(e) if primary => return Err(e),
            Err(e) => {
                warn!("unreadable embedded profile {}: {e}", profile_path.display());
                None
            }
        }
    } else {
        None
    };
    requirement.embedded_profile_id = embedded_profile.as_ref().map(|p| p.uuid);

    Ok((requirement, embedded_profile))
}

fn read_entitlements(
    bundle_path: &Path,
    contents: &Path,
    primary: bool,
) -> Result<BTreeSet<String>> {
    // macOS bundles keep the archived entitlements under Resources; fall
    // back to the bundle root used by flat extension layouts.
    let candidates = [
        contents.join("Resources").join(ENTITLEMENTS_FILE),
        bundle_path.join(ENTITLEMENTS_FILE),
    ];

    for candidate in candidates {
        if !candidate.is_file() {
            continue;
        }
        return match entitlements::read_entitlement_keys(&candidate) {
            Ok(keys) => Ok(keys),
            Err(e) if primary => Err(Error::MalformedArchive(format!(
                "cannot read entitlements {}: {e}",
                candidate.display()
            ))),
            Err(e) => {
                warn!("unreadable entitlements {}: {e}", candidate.display());
                Ok(BTreeSet::new())
            }
        };
    }

    // No entitlements file means the bundle requires no capabilities.
    Ok(BTreeSet::new())
}

/// The `.appex` bundles under the application's `Contents/PlugIns`.
fn app_extensions(application_path: &Path) -> Result<Vec<PathBuf>> {
    let plugins = application_path.join("Contents").join("PlugIns");
    if !plugins.is_dir() {
        return Ok(Vec::new());
    }

    let mut extensions: Vec<PathBuf> = std::fs::read_dir(&plugins)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().map(|ext| ext == "appex").unwrap_or(false))
        .collect();
    extensions.sort();
    Ok(extensions)
}
