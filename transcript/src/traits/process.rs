//! Process execution capability.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Error;

/// A single process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Upper bound on the whole spawn-and-wait; the child is killed when exceeded.
    pub timeout: Duration,
}

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

/// Runs external processes.
///
/// Returns `Ok` for any process that exited, whatever its status. Spawn failures map
/// to `StageErrorKind::Spawn`, an exceeded timeout to `StageErrorKind::Timeout` and
/// cancellation to `ErrorKind::Cancelled`; in the last two cases the child has been
/// killed and reaped before the call returns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        command: &ProcessCommand,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, Error>;
}
