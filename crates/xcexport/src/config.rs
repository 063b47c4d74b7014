//! Step configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use xcexport_common::{Error, ExportMethod, Result};

/// Inputs of one archive-and-export run. Loadable from a YAML file, with
/// CLI flags overriding individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepConfig {
    /// Path to the `.xcodeproj` or `.xcworkspace`.
    pub project_path: PathBuf,
    pub scheme: String,
    pub configuration: Option<String>,
    pub export_method: ExportMethod,
    pub output_dir: PathBuf,
    /// Base name of produced artifacts; defaults to the scheme.
    pub artifact_name: String,
    pub clean_build: bool,
    pub disable_index_while_building: bool,
    pub force_team_id: Option<String>,
    pub force_code_sign_identity: Option<String>,
    pub force_provisioning_profile_specifier: Option<String>,
    pub force_provisioning_profile: Option<String>,
    /// Verbatim export-options plist content; bypasses resolution.
    pub custom_export_options_plist_content: Option<String>,
    pub export_archive_zip: bool,
    pub export_all_dsyms: bool,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            project_path: PathBuf::new(),
            scheme: String::new(),
            configuration: None,
            export_method: ExportMethod::Development,
            output_dir: PathBuf::from("deploy"),
            artifact_name: String::new(),
            clean_build: false,
            disable_index_while_building: false,
            force_team_id: None,
            force_code_sign_identity: None,
            force_provisioning_profile_specifier: None,
            force_provisioning_profile: None,
            custom_export_options_plist_content: None,
            export_archive_zip: false,
            export_all_dsyms: false,
        }
    }
}

impl StepConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Whether the project path names a workspace. Errors on any other
    /// extension.
    pub fn is_workspace(&self) -> Result<bool> {
        match self.project_path.extension().and_then(|ext| ext.to_str()) {
            Some("xcodeproj") => Ok(false),
            Some("xcworkspace") => Ok(true),
            _ => Err(Error::Config(format!(
                "project file extension should be .xcodeproj or .xcworkspace, but got: {}",
                self.project_path.display()
            ))),
        }
    }

    /// Validate and fill derived fields.
    pub fn normalized(mut self) -> Result<Self> {
        self.is_workspace()?;
        if self.scheme.is_empty() {
            return Err(Error::Config("scheme is required".to_string()));
        }
        if self.artifact_name.is_empty() {
            self.artifact_name = self.scheme.clone();
        }
        if self.force_provisioning_profile_specifier.is_some()
            && self.force_provisioning_profile.is_some()
        {
            warn!(
                "both force_provisioning_profile_specifier and force_provisioning_profile are \
                 set, using force_provisioning_profile_specifier"
            );
            self.force_provisioning_profile = None;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yaml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("step.yml");
        std::fs::write(
            &path,
            r#"
project_path: Acme.xcworkspace
scheme: Acme
export_method: app-store
output_dir: out
export_all_dsyms: true
"#,
        )
        .unwrap();

        let config = StepConfig::from_yaml_file(&path).unwrap();
        assert!(config.is_workspace().unwrap());
        assert_eq!(config.export_method, ExportMethod::AppStore);
        assert!(config.export_all_dsyms);
        assert!(!config.clean_build);
    }

    #[test]
    fn test_invalid_project_extension_rejected() {
        let config = StepConfig {
            project_path: PathBuf::from("Acme.txt"),
            scheme: "Acme".to_string(),
            ..StepConfig::default()
        };
        assert!(matches!(config.normalized(), Err(Error::Config(_))));
    }

    #[test]
    fn test_artifact_name_defaults_to_scheme() {
        let config = StepConfig {
            project_path: PathBuf::from("Acme.xcodeproj"),
            scheme: "Acme".to_string(),
            ..StepConfig::default()
        };
        let normalized = config.normalized().unwrap();
        assert_eq!(normalized.artifact_name, "Acme");
    }

    #[test]
    fn test_conflicting_force_profiles_prefers_specifier() {
        let config = StepConfig {
            project_path: PathBuf::from("Acme.xcodeproj"),
            scheme: "Acme".to_string(),
            force_provisioning_profile_specifier: Some("Acme Store".to_string()),
            force_provisioning_profile: Some("deadbeef".to_string()),
            ..StepConfig::default()
        };
        let normalized = config.normalized().unwrap();
        assert!(normalized.force_provisioning_profile.is_none());
        assert!(normalized.force_provisioning_profile_specifier.is_some());
    }
}
