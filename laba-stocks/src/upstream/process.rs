//! Extractor process runner.
//!
//! Launches `<runtime> <scripts_dir>/<script> [args...]`, buffers stdout until
//! the child exits, then parses it once. Any stderr output is treated as a
//! failure even when the exit status is zero; extractor scripts only write to
//! stderr when something went wrong.

use async_trait::async_trait;
use laba_common::config::UpstreamConfig;
use laba_common::util::{single_line, truncate_with_ellipsis};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use super::{ProcessCollaborator, UpstreamError};

/// Longest stderr/stdout excerpt carried in an error message.
const MAX_ERROR_EXCERPT: usize = 300;

/// Extractor process runner.
#[derive(Debug, Clone)]
pub struct ExtractorProcess {
    runtime: String,
    scripts_dir: PathBuf,
    timeout: Duration,
}

impl ExtractorProcess {
    pub fn new(runtime: impl Into<String>, scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
            scripts_dir: scripts_dir.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(config.runtime.clone(), config.scripts_dir.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    /// Set the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn excerpt(raw: &[u8]) -> String {
        truncate_with_ellipsis(&single_line(&String::from_utf8_lossy(raw)), MAX_ERROR_EXCERPT)
    }
}

#[async_trait]
impl ProcessCollaborator for ExtractorProcess {
    async fn run(&self, script: &str, args: &[String]) -> Result<Value, UpstreamError> {
        let script_path = self.scripts_dir.join(script);
        let start = Instant::now();

        let mut cmd = Command::new(&self.runtime);
        cmd.arg(&script_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(script = %script, ?args, "Spawning extractor");

        let child = cmd.spawn().map_err(|e| UpstreamError::Spawn {
            script: script.to_string(),
            reason: e.to_string(),
        })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(UpstreamError::Spawn {
                    script: script.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                tracing::warn!(
                    script = %script,
                    timeout_secs = self.timeout.as_secs(),
                    "Extractor timed out"
                );
                return Err(UpstreamError::Timeout(self.timeout.as_secs()));
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !output.stderr.iter().all(u8::is_ascii_whitespace) {
            let message = Self::excerpt(&output.stderr);
            tracing::warn!(
                script = %script,
                elapsed_ms,
                stderr = %message,
                "Extractor wrote to stderr"
            );
            return Err(UpstreamError::Stderr(message));
        }

        if !output.status.success() {
            tracing::warn!(
                script = %script,
                elapsed_ms,
                code = ?output.status.code(),
                "Extractor failed"
            );
            return Err(UpstreamError::Exit {
                code: output.status.code(),
            });
        }

        let value = serde_json::from_slice::<Value>(&output.stdout).map_err(|e| {
            UpstreamError::InvalidJson(format!("{e} (output: {})", Self::excerpt(&output.stdout)))
        })?;

        tracing::debug!(
            script = %script,
            elapsed_ms,
            bytes = output.stdout.len(),
            "Extractor finished"
        );
        Ok(value)
    }
}
