// Invocation Request - immutable description of one function execution

use tokio::io::{AsyncRead, AsyncWrite};

use crate::domain::DomainError;

/// Byte-stream source bound to the child's standard input.
pub type InputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Byte-stream sink the trailer is written into. The runner writes to it
/// but never shuts it down; the caller keeps the underlying resource.
pub type OutputStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Description of one function invocation.
///
/// Constructed once by the caller and consumed by a single
/// [`FunctionRunner::run`](crate::port::FunctionRunner::run) call: the
/// runner takes ownership, binds `input` to the child's stdin (closing it
/// exactly once regardless of outcome) and writes the trailer to `output`.
pub struct FunctionRequest {
    /// Path or name of the executable. Required, non-empty.
    pub process: String,
    /// Arguments passed to the process, in order.
    pub arguments: Vec<String>,
    /// `KEY=VALUE` entries replacing the child's environment wholesale.
    /// An empty vector means an empty environment, not inheritance.
    pub environment: Vec<String>,
    /// Optional standard-input source.
    pub input: Option<InputStream>,
    /// Sink for the `Trace-ID:` trailer.
    pub output: OutputStream,
    /// Declared size of `input`. Informational only, never enforced.
    pub content_length: Option<i64>,
    /// Opaque label correlating log records and the trailer with this
    /// invocation. Uniqueness is the caller's responsibility.
    pub trace_id: String,
}

impl FunctionRequest {
    /// Check the request is runnable at all.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.process.trim().is_empty() {
            return Err(DomainError::Validation(
                "process must be a non-empty executable path".to_string(),
            ));
        }
        Ok(())
    }
}

// Manual Debug: the stream fields are trait objects.
impl std::fmt::Debug for FunctionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRequest")
            .field("process", &self.process)
            .field("arguments", &self.arguments)
            .field("environment", &self.environment)
            .field("input", &self.input.is_some())
            .field("content_length", &self.content_length)
            .field("trace_id", &self.trace_id)
            .finish_non_exhaustive()
    }
}
