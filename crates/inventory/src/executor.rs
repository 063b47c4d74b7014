//! Command execution seam for system store queries.

use async_trait::async_trait;
use std::process::Command;
use tracing::debug;
use xcexport_common::{Error, Result};

/// Trait for running system commands; the seam tests inject through.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a program and return (exit_code, stdout, stderr).
    async fn execute(&self, program: &str, args: &[String]) -> Result<(Option<i32>, String, String)>;
}

/// Executor running commands on the build host.
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(&self, program: &str, args: &[String]) -> Result<(Option<i32>, String, String)> {
        debug!("exec: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::CommandExecution {
                cmd: program.to_string(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Ok((output.status.code(), stdout, stderr))
    }
}
