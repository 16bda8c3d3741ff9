use std::{process::Stdio, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tokio::process::Command,
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// Executes one `chat api` command and returns its standard output.
#[async_trait]
pub trait ApiRunner: Send + Sync {
    async fn run(&self, request: &str) -> Result<String>;
}

#[async_trait]
impl<T: ApiRunner + ?Sized> ApiRunner for Arc<T> {
    async fn run(&self, request: &str) -> Result<String> {
        (**self).run(request).await
    }
}

/// Runs `<binary> chat api -m <request>` as a child process.
///
/// A call that outlives `timeout` is killed and reported as
/// [`Error::Timeout`].
#[derive(Debug, Clone)]
pub struct CliRunner {
    binary: String,
    timeout: Duration,
}

impl CliRunner {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ApiRunner for CliRunner {
    async fn run(&self, request: &str) -> Result<String> {
        debug!(binary = %self.binary, request, "running keybase chat api");

        let child = Command::new(&self.binary)
            .args(["chat", "api", "-m", request])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        // Dropping the pending future drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|source| Error::Spawn {
                binary: self.binary.clone(),
                source,
            })?,
            Err(_) => {
                warn!(
                    binary = %self.binary,
                    timeout_secs = self.timeout.as_secs(),
                    "keybase call timed out"
                );
                return Err(Error::Timeout {
                    secs: self.timeout.as_secs(),
                });
            },
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            debug!(
                exit_code = ?output.status.code(),
                stderr = %stderr.trim(),
                "keybase command failed"
            );
            return Err(Error::Exit {
                code: output.status.code(),
                stdout,
                stderr,
            });
        }
        Ok(stdout)
    }
}
