//! Invocation of the external `postconf` tool.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::trace;

use crate::error::{ConfError, Result};

/// Seam between the config store and the external tool.
///
/// The store only ever talks to the tool through this trait, so tests can
/// substitute an in-memory fake that records calls.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the tool with the given arguments and return its standard output.
    async fn run(&self, args: &[String]) -> Result<String>;
}

/// Runs the real `postconf` binary with a bounded execution time.
pub struct PostconfRunner {
    program: PathBuf,
    timeout: Duration,
}

impl PostconfRunner {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        PostconfRunner {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ToolRunner for PostconfRunner {
    async fn run(&self, args: &[String]) -> Result<String> {
        trace!(program = %self.program.display(), ?args, "running postconf");

        // A hung tool must not hold the configuration lock forever.
        let output = timeout(self.timeout, Command::new(&self.program).args(args).output())
            .await
            .map_err(|_| {
                ConfError::ExternalTool(format!(
                    "{} timed out after {}s",
                    self.program.display(),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(ConfError::Io)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConfError::ExternalTool(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout).map_err(|_| {
            ConfError::ExternalTool("tool output is not valid UTF-8".to_string())
        })
    }
}
