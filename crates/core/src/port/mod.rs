// Port Layer - Interfaces for external collaborators

pub mod function_runner;
pub mod log_sink;
pub mod time_provider;
pub mod trace_id;

// Re-exports
pub use function_runner::{FunctionRunner, InvocationResult, RunnerError};
pub use log_sink::LogSink;
pub use time_provider::TimeProvider;
pub use trace_id::TraceIdProvider;
