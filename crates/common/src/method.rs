//! Export method definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The distribution channel an archive is exported for.
///
/// `None` exports a copy of the application without re-signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMethod {
    None,
    AppStore,
    Development,
    DeveloperId,
}

impl fmt::Display for ExportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportMethod::None => write!(f, "none"),
            ExportMethod::AppStore => write!(f, "app-store"),
            ExportMethod::Development => write!(f, "development"),
            ExportMethod::DeveloperId => write!(f, "developer-id"),
        }
    }
}

impl FromStr for ExportMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ExportMethod::None),
            "app-store" => Ok(ExportMethod::AppStore),
            "development" => Ok(ExportMethod::Development),
            "developer-id" => Ok(ExportMethod::DeveloperId),
            _ => Err(crate::Error::UnsupportedExportMethod(s.to_string())),
        }
    }
}

impl ExportMethod {
    /// Whether this method requests a signing group at all.
    pub fn requires_signing(&self) -> bool {
        !matches!(self, ExportMethod::None)
    }

    /// App Store exports additionally need an installer certificate.
    pub fn is_app_store(&self) -> bool {
        matches!(self, ExportMethod::AppStore)
    }

    /// The file extension of the exported artifact.
    pub fn artifact_extension(&self) -> &'static str {
        match self {
            ExportMethod::AppStore => "pkg",
            _ => "app",
        }
    }
}
