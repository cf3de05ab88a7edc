// Function Runner Port
// Abstraction for executing one external process per invocation request

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{DomainError, FunctionRequest};

/// Outcome of a successful invocation: the process exited with status 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Wall-clock time between process start and reap.
    pub duration_ms: i64,
    /// Always 0 on success; kept explicit for reporting.
    pub exit_code: i32,
}

/// Invocation failure taxonomy.
///
/// Failures local to a drain task or the watchdog are absorbed (logged,
/// not raised) so the runner always reaches a well-ordered outcome; only
/// these variants surface to the caller.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The request is not runnable as written.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    /// Stdio handles could not be acquired. No trailer is written.
    #[error("Stdio setup failed: {0}")]
    Setup(String),

    /// The OS failed to create the process (bad path, permissions, ...).
    /// Reported once as a control log record; no trailer is written.
    #[error("Starting error: {0}")]
    Start(String),

    /// The process ran but exited non-zero or was killed. The trailer has
    /// already been written when this is returned.
    #[error("Process failed after {duration_ms}ms (exit code {exit_code:?}): {message}")]
    Wait {
        exit_code: Option<i32>,
        duration_ms: i64,
        message: String,
    },
}

/// Runs one process per invocation request.
#[async_trait]
pub trait FunctionRunner: Send + Sync {
    /// Execute the request to completion.
    ///
    /// Consumes the request: `input` is closed exactly once on every exit
    /// path, and the trailer is written to `output` on every path except
    /// setup and start failure. All captured output has been forwarded to
    /// the log sink by the time this returns.
    ///
    /// # Errors
    /// - [`RunnerError::InvalidRequest`] if the request fails validation
    /// - [`RunnerError::Setup`] if a stdio handle could not be acquired
    /// - [`RunnerError::Start`] if the OS could not create the process
    /// - [`RunnerError::Wait`] if the process exited non-zero or was killed
    async fn run(&self, request: FunctionRequest) -> Result<InvocationResult, RunnerError>;
}
