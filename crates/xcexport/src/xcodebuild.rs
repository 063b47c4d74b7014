//! xcodebuild command construction and execution.

use regex::Regex;
use std::path::PathBuf;
use tracing::debug;
use xcexport_common::{Error, Result};

const MACOS_DESTINATION: &str = "generic/platform=macOS";

/// Captured result of one xcodebuild invocation.
#[derive(Debug)]
pub struct XcodebuildOutput {
    pub exit_code: Option<i32>,
    /// stdout and stderr interleaved the way a log file expects them.
    pub combined: String,
}

impl XcodebuildOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// `xcodebuild archive` for a project or workspace.
#[derive(Debug, Clone, Default)]
pub struct ArchiveCommand {
    pub project_path: PathBuf,
    pub is_workspace: bool,
    pub scheme: String,
    pub configuration: Option<String>,
    pub archive_path: PathBuf,
    pub clean_build: bool,
    pub disable_index_while_building: bool,
    pub force_team_id: Option<String>,
    pub force_code_sign_identity: Option<String>,
    pub force_provisioning_profile_specifier: Option<String>,
    pub force_provisioning_profile: Option<String>,
}

impl ArchiveCommand {
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.clean_build {
            args.push("clean".to_string());
        }
        args.push("archive".to_string());

        if !self.project_path.as_os_str().is_empty() {
            args.push(if self.is_workspace { "-workspace" } else { "-project" }.to_string());
            args.push(self.project_path.to_string_lossy().to_string());
        }
        if !self.scheme.is_empty() {
            args.push("-scheme".to_string());
            args.push(self.scheme.clone());
        }
        if let Some(ref configuration) = self.configuration {
            args.push("-configuration".to_string());
            args.push(configuration.clone());
        }
        args.push("-destination".to_string());
        args.push(MACOS_DESTINATION.to_string());
        if !self.archive_path.as_os_str().is_empty() {
            args.push("-archivePath".to_string());
            args.push(self.archive_path.to_string_lossy().to_string());
        }

        if let Some(ref team) = self.force_team_id {
            args.push(format!("DEVELOPMENT_TEAM={team}"));
        }
        if let Some(ref identity) = self.force_code_sign_identity {
            args.push(format!("CODE_SIGN_IDENTITY={identity}"));
        }
        if let Some(ref specifier) = self.force_provisioning_profile_specifier {
            args.push(format!("PROVISIONING_PROFILE_SPECIFIER={specifier}"));
        }
        if let Some(ref profile) = self.force_provisioning_profile {
            args.push(format!("PROVISIONING_PROFILE={profile}"));
        }
        if self.disable_index_while_building {
            args.push("COMPILER_INDEX_STORE_ENABLE=NO".to_string());
        }

        args
    }

    pub fn printable(&self) -> String {
        printable_command(&self.args())
    }

    pub async fn run(&self) -> Result<XcodebuildOutput> {
        run_xcodebuild(&self.args()).await
    }
}

/// `xcodebuild -exportArchive` driven by an export-options plist.
#[derive(Debug, Clone)]
pub struct ExportCommand {
    pub archive_path: PathBuf,
    pub export_dir: PathBuf,
    pub options_plist: PathBuf,
}

impl ExportCommand {
    pub fn args(&self) -> Vec<String> {
        vec![
            "-exportArchive".to_string(),
            "-archivePath".to_string(),
            self.archive_path.to_string_lossy().to_string(),
            "-exportPath".to_string(),
            self.export_dir.to_string_lossy().to_string(),
            "-exportOptionsPlist".to_string(),
            self.options_plist.to_string_lossy().to_string(),
        ]
    }

    pub fn printable(&self) -> String {
        printable_command(&self.args())
    }

    pub async fn run(&self) -> Result<XcodebuildOutput> {
        run_xcodebuild(&self.args()).await
    }
}

fn printable_command(args: &[String]) -> String {
    let quoted: Vec<String> = args.iter().map(|a| format!("\"{a}\"")).collect();
    format!("xcodebuild {}", quoted.join(" "))
}

async fn run_xcodebuild(args: &[String]) -> Result<XcodebuildOutput> {
    debug!("running: {}", printable_command(args));

    let output = tokio::process::Command::new("xcodebuild")
        .args(args)
        .output()
        .await
        .map_err(|e| Error::CommandExecution {
            cmd: "xcodebuild".to_string(),
            reason: e.to_string(),
        })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(XcodebuildOutput {
        exit_code: output.status.code(),
        combined,
    })
}

/// Locate the IDE distribution logs bundle a failed export mentions in its
/// raw output.
pub fn ide_distribution_logs_path(output: &str) -> Option<PathBuf> {
    let pattern = Regex::new(
        r"IDEDistribution: -\[IDEDistributionLogging _createLoggingBundleAtPath:\]: Created bundle at path '(?P<log_path>[^']+)'",
    )
    .ok()?;
    output.lines().find_map(|line| {
        pattern
            .captures(line)
            .and_then(|captures| captures.name("log_path"))
            .map(|m| PathBuf::from(m.as_str()))
    })
}

/// The last `n` lines of a build log, for failure summaries.
pub fn last_lines(output: &str, n: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
