// Fluent forward-protocol client
// One long-lived, concurrency-safe sink shared by every invocation.
// Records are handed to a background writer over a channel, so posting
// never blocks the caller.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use forkfn_core::port::LogSink;

/// Connection parameters for the fluent collector.
#[derive(Debug, Clone)]
pub struct FluentConfig {
    pub host: String,
    pub port: u16,
    /// Prepended to every tag as `<prefix>.<tag>`. Empty means no prefix.
    pub tag_prefix: String,
    /// Delivery attempts per record after the first failure; once
    /// exhausted the record is dropped with a warning.
    pub max_retry: u32,
    /// Cap for the reconnect backoff, in seconds.
    pub max_retry_wait_secs: u64,
}

impl Default for FluentConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 24224,
            tag_prefix: "watchdog".to_string(),
            max_retry: 0,
            max_retry_wait_secs: 4,
        }
    }
}

/// One event in the forward protocol's Message mode: `[tag, time, record]`.
#[derive(Debug, Serialize)]
struct Event(String, i64, HashMap<String, String>);

enum Frame {
    Event(Event),
    Shutdown(oneshot::Sender<()>),
}

/// Fire-and-forget fluent sink.
///
/// `post` stamps the event and enqueues it; a background task owns the
/// TCP connection, reconnecting with a capped backoff when the collector
/// drops it. Create the client once at process start, share it across all
/// invocations, and call [`shutdown`](FluentLogSink::shutdown) once at
/// process stop to flush whatever is still queued.
pub struct FluentLogSink {
    tx: mpsc::UnboundedSender<Frame>,
    tag_prefix: String,
}

impl FluentLogSink {
    /// Start the background writer. Does not connect eagerly: the first
    /// event triggers the first connection attempt, so a missing collector
    /// never delays startup.
    pub fn connect(config: FluentConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tag_prefix = config.tag_prefix.clone();
        tokio::spawn(write_loop(config, rx));
        Self { tx, tag_prefix }
    }

    /// Flush queued records and stop the writer. Records posted after this
    /// are silently dropped.
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Frame::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

impl LogSink for FluentLogSink {
    fn post(&self, tag: &str, fields: HashMap<String, String>) {
        let tag = if self.tag_prefix.is_empty() {
            tag.to_string()
        } else {
            format!("{}.{}", self.tag_prefix, tag)
        };
        let event = Event(tag, chrono::Utc::now().timestamp(), fields);
        if self.tx.send(Frame::Event(event)).is_err() {
            debug!("Fluent sink already shut down, record dropped");
        }
    }
}

async fn write_loop(config: FluentConfig, mut rx: mpsc::UnboundedReceiver<Frame>) {
    let mut conn: Option<TcpStream> = None;

    while let Some(frame) = rx.recv().await {
        let event = match frame {
            Frame::Event(event) => event,
            Frame::Shutdown(ack) => {
                let _ = ack.send(());
                break;
            }
        };

        let payload = match rmp_serde::to_vec(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode log event");
                continue;
            }
        };

        let mut attempt: u32 = 0;
        loop {
            if conn.is_none() {
                match TcpStream::connect((config.host.as_str(), config.port)).await {
                    Ok(stream) => conn = Some(stream),
                    Err(e) => {
                        if attempt >= config.max_retry {
                            warn!(error = %e, "Fluent collector unreachable, record dropped");
                            break;
                        }
                        attempt += 1;
                        let backoff = Duration::from_secs(
                            (1u64 << attempt.min(6)).min(config.max_retry_wait_secs.max(1)),
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                }
            }

            match conn.as_mut() {
                Some(stream) => match stream.write_all(&payload).await {
                    Ok(()) => break,
                    Err(e) => {
                        conn = None;
                        if attempt >= config.max_retry {
                            warn!(error = %e, "Fluent write failed, record dropped");
                            break;
                        }
                        attempt += 1;
                    }
                },
                None => break,
            }
        }
    }
}
