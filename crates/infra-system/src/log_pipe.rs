// Pipe capture - drains one child output stream into the log sink

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

use forkfn_core::domain::{LogRecord, StreamName};
use forkfn_core::port::LogSink;

/// Spawn the drain task for one output pipe.
///
/// Reads `pipe` line by line until end-of-stream, posting each line to the
/// sink under `trace_id`. A non-EOF read error is posted once as a control
/// record and ends the task; it never aborts the invocation. The returned
/// handle is the task's completion signal: the runner awaits both handles
/// before reaping the process, so every captured line has reached the sink
/// before the outcome is decided.
///
/// stdout and stderr each get their own task. They are independent OS
/// pipes filling at unrelated rates; a single multiplexed reader could
/// starve one of them until the child blocks on a full pipe buffer.
pub fn bind_log_pipe<R>(
    sink: Arc<dyn LogSink>,
    stream: StreamName,
    trace_id: String,
    pipe: R,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    debug!(%stream, %trace_id, "Started capturing pipe");

    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    sink.post(&trace_id, LogRecord::new(stream, line).into_fields());
                }
                Ok(None) => break,
                Err(e) => {
                    sink.post(
                        &trace_id,
                        LogRecord::new(StreamName::Control, e.to_string()).into_fields(),
                    );
                    debug!(%stream, error = %e, "Pipe read error");
                    break;
                }
            }
        }
    })
}
