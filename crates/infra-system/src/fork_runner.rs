// Fork runner - one forked process per invocation
// Sequencing: spawn -> drain both pipes -> capture-complete record -> reap
// -> disarm watchdog -> close input -> trailer.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use forkfn_core::domain::{FunctionRequest, LogRecord, StreamName};
use forkfn_core::port::{FunctionRunner, InvocationResult, LogSink, RunnerError, TimeProvider};

use crate::log_pipe::bind_log_pipe;
use crate::watchdog::Watchdog;

/// Runner configuration.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Wall-clock execution limit in milliseconds. A value <= 0 means
    /// unbounded execution: no watchdog is armed.
    pub exec_timeout_ms: i64,
}

impl RunnerConfig {
    fn exec_timeout(&self) -> Option<Duration> {
        if self.exec_timeout_ms > 0 {
            Some(Duration::from_millis(self.exec_timeout_ms as u64))
        } else {
            None
        }
    }
}

/// Forks one process per invocation request.
///
/// The log sink is the one long-lived collaborator, shared by every
/// invocation and injected here; the process, its pipes, and the watchdog
/// timer are owned exclusively by a single `run` call.
pub struct ForkRunner {
    config: RunnerConfig,
    log_sink: Arc<dyn LogSink>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ForkRunner {
    pub fn new(
        config: RunnerConfig,
        log_sink: Arc<dyn LogSink>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            config,
            log_sink,
            time_provider,
        }
    }

    fn post_control(&self, trace_id: &str, message: impl Into<String>) {
        self.log_sink.post(
            trace_id,
            LogRecord::new(StreamName::Control, message.into()).into_fields(),
        );
    }
}

#[async_trait]
impl FunctionRunner for ForkRunner {
    async fn run(&self, request: FunctionRequest) -> Result<InvocationResult, RunnerError> {
        request.validate()?;

        let FunctionRequest {
            process,
            arguments,
            environment,
            input,
            mut output,
            content_length,
            trace_id,
        } = request;

        info!(%process, %trace_id, "Running function");
        debug!(?content_length, "Declared input length");

        let mut cmd = Command::new(&process);
        cmd.args(&arguments)
            .env_clear()
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Full replacement: the child sees exactly these entries, nothing
        // inherited.
        for entry in &environment {
            match entry.split_once('=') {
                Some((key, value)) => {
                    cmd.env(key, value);
                }
                None => warn!(%entry, "Skipping malformed environment entry"),
            }
        }

        let start = self.time_provider.now_millis();

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                // Nothing meaningfully ran: report once to the sink and
                // bail. `input` drops here, closing it; no trailer.
                warn!(%process, error = %e, "Starting error");
                self.post_control(&trace_id, e.to_string());
                return Err(RunnerError::Start(e.to_string()));
            }
        };

        let stdin_pipe = child.stdin.take();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let (stdout_pipe, stderr_pipe) = match (stdout_pipe, stderr_pipe) {
            (Some(out), Some(err)) if !(input.is_some() && stdin_pipe.is_none()) => (out, err),
            _ => {
                // A requested pipe was not handed back; the child is
                // useless without its stdio.
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(RunnerError::Setup(
                    "child process stdio handles unavailable".to_string(),
                ));
            }
        };

        // Feed stdin from its own task so a slow consumer never blocks the
        // runner. Dropping the pair at the end closes the pipe (the child
        // sees EOF) and the input source, each exactly once.
        let stdin_task = input.zip(stdin_pipe).map(|(mut source, mut stdin)| {
            tokio::spawn(async move {
                if let Err(e) = tokio::io::copy(&mut source, &mut stdin).await {
                    debug!(error = %e, "Stdin feed ended early");
                }
            })
        });

        let watchdog = self
            .config
            .exec_timeout()
            .and_then(|timeout| child.id().map(|pid| Watchdog::arm(timeout, pid as i32)));

        // Exactly one drain task per stream; the pair of handles is the
        // join barrier of size 2, fixed before either task runs.
        let stdout_drain = bind_log_pipe(
            Arc::clone(&self.log_sink),
            StreamName::Stdout,
            trace_id.clone(),
            stdout_pipe,
        );
        let stderr_drain = bind_log_pipe(
            Arc::clone(&self.log_sink),
            StreamName::Stderr,
            trace_id.clone(),
            stderr_pipe,
        );

        // Both pipes must reach end-of-stream before the outcome is
        // decided; reaping first would discard whatever is still buffered.
        let (stdout_join, stderr_join) = tokio::join!(stdout_drain, stderr_drain);
        if let Err(e) = stdout_join {
            warn!(error = %e, "Stdout drain task aborted");
        }
        if let Err(e) = stderr_join {
            warn!(error = %e, "Stderr drain task aborted");
        }

        // Stdio capture is finished. Says nothing about the exit status,
        // which is not known yet.
        self.post_control(&trace_id, "Process completed successfully");

        let wait_result = child.wait().await;
        let duration_ms = self.time_provider.now_millis() - start;
        info!(%process, duration_ms, "Took {:.3} secs", duration_ms as f64 / 1000.0);

        if let Some(mut watchdog) = watchdog {
            watchdog.disarm();
            watchdog.join().await;
        }

        if let Some(task) = stdin_task {
            // The child is gone, so the copy has either finished or hit a
            // broken pipe; joining guarantees the input source is closed
            // before completion is reported.
            let _ = task.await;
        }

        let trailer = format!("Trace-ID: {trace_id}");
        if let Err(e) = output.write_all(trailer.as_bytes()).await {
            warn!(%trace_id, error = %e, "Failed to write trailer");
        } else if let Err(e) = output.flush().await {
            warn!(%trace_id, error = %e, "Failed to flush trailer");
        }

        match wait_result {
            Ok(status) if status.success() => Ok(InvocationResult {
                duration_ms,
                exit_code: 0,
            }),
            Ok(status) => Err(RunnerError::Wait {
                exit_code: status.code(),
                duration_ms,
                message: status.to_string(),
            }),
            Err(e) => Err(RunnerError::Wait {
                exit_code: None,
                duration_ms,
                message: e.to_string(),
            }),
        }
    }
}
