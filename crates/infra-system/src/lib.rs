// forkfn Infrastructure - Process Adapters
// Implements: FunctionRunner

pub mod fork_runner;
pub mod log_pipe;
pub mod watchdog;

pub use fork_runner::{ForkRunner, RunnerConfig};
pub use watchdog::Watchdog;
