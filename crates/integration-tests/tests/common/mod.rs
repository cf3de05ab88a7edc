//! Shared helpers for the end-to-end runner tests.
#![allow(dead_code)]

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use forkfn_core::domain::FunctionRequest;

pub const TEST_PATH: &str = "PATH=/usr/bin:/bin";

/// Trailer sink whose contents stay observable after the runner consumed
/// the boxed writer.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl AsyncWrite for SharedBuf {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Input source that counts how many times it is dropped, making the
/// "closed exactly once" guarantee observable.
pub struct CountedInput {
    data: std::io::Cursor<Vec<u8>>,
    drops: Arc<AtomicUsize>,
}

impl CountedInput {
    pub fn new(data: &[u8]) -> (Self, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        (
            Self {
                data: std::io::Cursor::new(data.to_vec()),
                drops: drops.clone(),
            },
            drops,
        )
    }
}

impl AsyncRead for CountedInput {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

impl Drop for CountedInput {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Request running `process` with a minimal PATH-only environment and the
/// given trailer sink.
pub fn request(
    process: &str,
    arguments: &[&str],
    trace_id: &str,
    output: &SharedBuf,
) -> FunctionRequest {
    FunctionRequest {
        process: process.to_string(),
        arguments: arguments.iter().map(|s| s.to_string()).collect(),
        environment: vec![TEST_PATH.to_string()],
        input: None,
        output: Box::new(output.clone()),
        content_length: None,
        trace_id: trace_id.to_string(),
    }
}
