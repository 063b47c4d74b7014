//! Common error types for xcexport.

use thiserror::Error;

/// Common error type for xcexport operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),

    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    #[error("Malformed provisioning profile: {0}")]
    MalformedProfile(String),

    #[error("Signing inventory unavailable: {0}")]
    InventoryUnavailable(String),

    #[error("Command execution failed: {cmd} - {reason}")]
    CommandExecution { cmd: String, reason: String },

    #[error("No signing group found for bundle ids [{bundle_ids}] with export method {method}")]
    NoSigningGroupFound { bundle_ids: String, method: String },

    #[error("No installer certificate found for team {team_id}")]
    NoInstallerCertificateFound { team_id: String },

    #[error("Unsupported export method: {0}")]
    UnsupportedExportMethod(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}
