//! The export-options plist consumed by `xcodebuild -exportArchive`.
//!
//! This is the one contract the resolver output must honor exactly: an
//! incomplete bundle-id → profile-name mapping makes the downstream
//! re-sign step fail. Constructors therefore take resolved groups, not
//! loose strings.

use crate::group::{ResolvedMacSigningGroup, SelectableSigningGroup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use xcexport_common::{ExportMethod, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub method: ExportMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer_signing_certificate: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub provisioning_profiles: BTreeMap<String, String>,
}

impl ExportOptions {
    /// Options for an export that re-signs nothing (copy-through).
    pub fn unsigned(method: ExportMethod) -> Self {
        Self {
            method,
            signing_certificate: None,
            installer_signing_certificate: None,
            provisioning_profiles: BTreeMap::new(),
        }
    }

    /// Options for a non-App-Store signed export.
    pub fn signed(method: ExportMethod, group: &SelectableSigningGroup) -> Self {
        Self {
            method,
            signing_certificate: Some(group.certificate.common_name.clone()),
            installer_signing_certificate: None,
            provisioning_profiles: group.profile_name_mapping(),
        }
    }

    /// Options for an App Store export, which additionally names the
    /// installer certificate for the product package.
    pub fn app_store(resolved: &ResolvedMacSigningGroup) -> Self {
        Self {
            method: ExportMethod::AppStore,
            signing_certificate: Some(resolved.group.certificate.common_name.clone()),
            installer_signing_certificate: Some(
                resolved.installer_certificate.common_name.clone(),
            ),
            provisioning_profiles: resolved.group.profile_name_mapping(),
        }
    }

    /// Serialize as an XML property list.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, self)?;
        String::from_utf8(buf)
            .map_err(|e| xcexport_common::Error::Other(format!("non-UTF8 plist output: {e}")))
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CertificateInfo, CertificateKind, DistributionType};
    use crate::ProvisioningProfileInfo;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use uuid::Uuid;
    use xcexport_common::ValidityWindow;

    fn cert(common_name: &str, kind: CertificateKind) -> CertificateInfo {
        CertificateInfo {
            common_name: common_name.to_string(),
            team_id: "TEAM1".to_string(),
            serial_number: "01".to_string(),
            validity: ValidityWindow::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            ),
            fingerprint: "aa".to_string(),
            kind,
        }
    }

    fn group() -> SelectableSigningGroup {
        let profile = ProvisioningProfileInfo {
            name: "Acme Mac App Store".to_string(),
            uuid: Uuid::nil(),
            team_id: "TEAM1".to_string(),
            bundle_id_pattern: "com.acme.*".to_string(),
            distribution_type: DistributionType::AppStore,
            entitlements: BTreeSet::new(),
            certificate_fingerprints: BTreeSet::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        };
        let mut map = BTreeMap::new();
        map.insert("com.acme.app".to_string(), profile);
        SelectableSigningGroup {
            certificate: cert(
                "3rd Party Mac Developer Application: Acme (TEAM1)",
                CertificateKind::Distribution,
            ),
            bundle_id_profile_map: map,
        }
    }

    #[test]
    fn test_app_store_options_round_trip() {
        let resolved = ResolvedMacSigningGroup {
            group: group(),
            installer_certificate: cert(
                "3rd Party Mac Developer Installer: Acme (TEAM1)",
                CertificateKind::Installer,
            ),
        };
        let options = ExportOptions::app_store(&resolved);
        let xml = options.to_xml_string().unwrap();

        assert!(xml.contains("app-store"));
        assert!(xml.contains("signingCertificate"));
        assert!(xml.contains("installerSigningCertificate"));
        assert!(xml.contains("provisioningProfiles"));
        assert!(xml.contains("com.acme.app"));
        assert!(xml.contains("Acme Mac App Store"));

        let parsed: ExportOptions = plist::from_bytes(xml.as_bytes()).unwrap();
        assert_eq!(parsed, options);
    }

    #[test]
    fn test_unsigned_options_omit_signing_keys() {
        let options = ExportOptions::unsigned(ExportMethod::Development);
        let xml = options.to_xml_string().unwrap();
        assert!(xml.contains("development"));
        assert!(!xml.contains("signingCertificate"));
        assert!(!xml.contains("provisioningProfiles"));
    }

    #[test]
    fn test_signed_options_map_every_bundle() {
        let options = ExportOptions::signed(ExportMethod::Development, &group());
        assert_eq!(
            options.provisioning_profiles.get("com.acme.app").unwrap(),
            "Acme Mac App Store"
        );
        assert!(options.installer_signing_certificate.is_none());
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export_options.plist");
        ExportOptions::unsigned(ExportMethod::DeveloperId)
            .write_to_file(&path)
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("developer-id"));
    }
}
