// forkfn Infrastructure - Fluent Log Sink Adapter
// Implements: LogSink

pub mod client;

pub use client::{FluentConfig, FluentLogSink};
