//! forkfn - run one function invocation from the command line
//!
//! Composition root: wires the shared fluent client and the fork runner,
//! builds a request from the arguments, executes it, and exits with the
//! child's status. The trailer goes to stdout; diagnostics go to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forkfn_core::domain::{FunctionRequest, InputStream};
use forkfn_core::port::trace_id::UuidTraceIdProvider;
use forkfn_core::port::time_provider::SystemTimeProvider;
use forkfn_core::port::{FunctionRunner, RunnerError, TraceIdProvider};
use forkfn_infra_fluent::{FluentConfig, FluentLogSink};
use forkfn_infra_system::{ForkRunner, RunnerConfig};

#[derive(Parser)]
#[command(name = "forkfn")]
#[command(about = "Fork a process once, streaming its output to a fluent collector", long_about = None)]
#[command(version)]
struct Cli {
    /// Wall-clock execution limit in milliseconds (0 = unbounded)
    #[arg(long, env = "FORKFN_EXEC_TIMEOUT_MS", default_value = "0")]
    timeout_ms: i64,

    /// Trace id correlating log records with this invocation (default: random)
    #[arg(long, env = "FORKFN_TRACE_ID")]
    trace_id: Option<String>,

    /// KEY=VALUE entry forming part of the child's entire environment
    /// (repeatable; the child inherits nothing else)
    #[arg(short = 'e', long = "env")]
    environment: Vec<String>,

    /// Forward this process's stdin to the child
    #[arg(long)]
    stdin: bool,

    /// Fluent collector host
    #[arg(long, env = "FORKFN_FLUENT_HOST", default_value = "localhost")]
    fluent_host: String,

    /// Fluent collector port
    #[arg(long, env = "FORKFN_FLUENT_PORT", default_value = "24224")]
    fluent_port: u16,

    /// Tag prefix for posted records
    #[arg(long, env = "FORKFN_TAG_PREFIX", default_value = "watchdog")]
    tag_prefix: String,

    /// Executable to run
    process: String,

    /// Arguments passed to the executable
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    arguments: Vec<String>,
}

fn init_tracing() {
    let log_format = std::env::var("FORKFN_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("forkfn=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let trace_id = cli
        .trace_id
        .clone()
        .unwrap_or_else(|| UuidTraceIdProvider.new_trace_id());

    // One long-lived collector client, shared with the runner and shut
    // down after the invocation reports.
    let log_sink = Arc::new(FluentLogSink::connect(FluentConfig {
        host: cli.fluent_host.clone(),
        port: cli.fluent_port,
        tag_prefix: cli.tag_prefix.clone(),
        ..FluentConfig::default()
    }));

    let runner = ForkRunner::new(
        RunnerConfig {
            exec_timeout_ms: cli.timeout_ms,
        },
        log_sink.clone(),
        Arc::new(SystemTimeProvider),
    );

    let request = FunctionRequest {
        process: cli.process.clone(),
        arguments: cli.arguments.clone(),
        environment: cli.environment.clone(),
        input: cli
            .stdin
            .then(|| Box::new(tokio::io::stdin()) as InputStream),
        output: Box::new(tokio::io::stdout()),
        content_length: None,
        trace_id: trace_id.clone(),
    };

    info!(process = %cli.process, %trace_id, "Dispatching invocation");

    let outcome = runner.run(request).await;

    log_sink.shutdown().await;

    match outcome {
        Ok(result) => {
            eprintln!(
                "{} {} ({} ms)",
                "✓".green().bold(),
                "invocation completed".green(),
                result.duration_ms
            );
            Ok(())
        }
        Err(RunnerError::Wait {
            exit_code,
            duration_ms,
            message,
        }) => {
            eprintln!(
                "{} {} ({} ms): {}",
                "✗".red().bold(),
                "process failed".red(),
                duration_ms,
                message
            );
            std::process::exit(exit_code.unwrap_or(1));
        }
        Err(e) => Err(e).context("invocation failed"),
    }
}
