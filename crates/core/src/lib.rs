// forkfn Core - Domain Model & Ports
// NO infrastructure dependencies: process handling lives in infra-system,
// the log collector client in infra-fluent.

pub mod domain;
pub mod port;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
