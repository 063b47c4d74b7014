//! Provisioning-profile payload parsing.
//!
//! Installed profiles (and the copies embedded in archives) are CMS
//! envelopes around an XML plist. The plist window is located by scanning
//! for the `<plist` / `</plist>` markers rather than verifying the CMS
//! signature; the payload is all the inventory needs.

use crate::records::{DistributionType, ProvisioningProfileInfo};
use chrono::{DateTime, Utc};
use plist::{Dictionary, Value};
use std::collections::BTreeSet;
use uuid::Uuid;
use xcexport_common::{fingerprint, Error, Result};

const APP_ID_KEYS: [&str; 2] = ["com.apple.application-identifier", "application-identifier"];
const TASK_ALLOW_KEYS: [&str; 2] = ["com.apple.security.get-task-allow", "get-task-allow"];
const TEAM_ID_ENTITLEMENT: &str = "com.apple.developer.team-identifier";

/// Parse a provisioning profile from its raw (CMS-wrapped) bytes.
pub fn parse_provisioning_profile(data: &[u8]) -> Result<ProvisioningProfileInfo> {
    let start = data
        .windows(6)
        .position(|w| w == b"<plist")
        .ok_or_else(|| Error::MalformedProfile("no plist payload found".to_string()))?;
    let end = data
        .windows(8)
        .rposition(|w| w == b"</plist>")
        .ok_or_else(|| Error::MalformedProfile("unterminated plist payload".to_string()))?
        + 8;

    let value = Value::from_reader_xml(&data[start..end])?;
    let dict = value
        .as_dictionary()
        .ok_or_else(|| Error::MalformedProfile("payload is not a dictionary".to_string()))?;

    let name = string_field(dict, "Name")?;
    let uuid = Uuid::parse_str(&string_field(dict, "UUID")?)
        .map_err(|e| Error::MalformedProfile(format!("invalid UUID: {e}")))?;

    let entitlements_dict = dict
        .get("Entitlements")
        .and_then(Value::as_dictionary)
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let team_id = team_identifier(dict, &entitlements_dict)
        .ok_or_else(|| Error::MalformedProfile("missing team identifier".to_string()))?;
    let bundle_id_pattern = bundle_id_pattern(&entitlements_dict, &team_id)
        .ok_or_else(|| Error::MalformedProfile("missing application identifier".to_string()))?;

    let certificate_fingerprints = dict
        .get("DeveloperCertificates")
        .and_then(Value::as_array)
        .map(|certs| {
            certs
                .iter()
                .filter_map(Value::as_data)
                .map(fingerprint::certificate_fingerprint)
                .collect()
        })
        .unwrap_or_default();

    Ok(ProvisioningProfileInfo {
        name,
        uuid,
        team_id,
        bundle_id_pattern,
        distribution_type: distribution_type(dict, &entitlements_dict),
        entitlements: entitlements_dict.keys().cloned().collect::<BTreeSet<_>>(),
        certificate_fingerprints,
        created_at: date_field(dict, "CreationDate")?,
        expires_at: date_field(dict, "ExpirationDate")?,
    })
}

fn string_field(dict: &Dictionary, key: &str) -> Result<String> {
    dict.get(key)
        .and_then(Value::as_string)
        .map(str::to_string)
        .ok_or_else(|| Error::MalformedProfile(format!("missing {key}")))
}

fn date_field(dict: &Dictionary, key: &str) -> Result<DateTime<Utc>> {
    let date = dict
        .get(key)
        .and_then(Value::as_date)
        .ok_or_else(|| Error::MalformedProfile(format!("missing {key}")))?;
    let system: std::time::SystemTime = date.into();
    Ok(system.into())
}

fn team_identifier(dict: &Dictionary, entitlements: &Dictionary) -> Option<String> {
    dict.get("TeamIdentifier")
        .and_then(Value::as_array)
        .and_then(|ids| ids.first())
        .and_then(Value::as_string)
        .or_else(|| {
            entitlements
                .get(TEAM_ID_ENTITLEMENT)
                .and_then(Value::as_string)
        })
        .map(str::to_string)
}

/// The application-identifier entitlement minus its `TEAMID.` prefix.
fn bundle_id_pattern(entitlements: &Dictionary, team_id: &str) -> Option<String> {
    let app_id = APP_ID_KEYS
        .iter()
        .find_map(|key| entitlements.get(key).and_then(Value::as_string))?;
    let prefix = format!("{team_id}.");
    Some(
        app_id
            .strip_prefix(&prefix)
            .unwrap_or(app_id)
            .to_string(),
    )
}

fn distribution_type(dict: &Dictionary, entitlements: &Dictionary) -> DistributionType {
    let provisions_all = dict
        .get("ProvisionsAllDevices")
        .and_then(Value::as_boolean)
        .unwrap_or(false);
    if provisions_all {
        return DistributionType::DeveloperId;
    }

    let has_devices = dict
        .get("ProvisionedDevices")
        .and_then(Value::as_array)
        .is_some();
    if has_devices {
        let task_allow = TASK_ALLOW_KEYS
            .iter()
            .any(|key| entitlements.get(key).and_then(Value::as_boolean) == Some(true));
        if task_allow {
            DistributionType::Development
        } else {
            DistributionType::AdHoc
        }
    } else {
        DistributionType::AppStore
    }
}
