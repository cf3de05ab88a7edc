// Log Record - one tagged line forwarded to the log sink

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which stream a log record was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
    /// Lifecycle records emitted by the runner itself (start failure,
    /// capture complete), not by the child process.
    Control,
}

impl StreamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamName::Stdout => "stdout",
            StreamName::Stderr => "stderr",
            StreamName::Control => "control",
        }
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured line, produced during an invocation and forwarded to the
/// sink under the invocation's trace id. Produced, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub stream: StreamName,
    pub message: String,
}

impl LogRecord {
    pub fn new(stream: StreamName, message: impl Into<String>) -> Self {
        Self {
            stream,
            message: message.into(),
        }
    }

    /// Field map shape expected by
    /// [`LogSink::post`](crate::port::LogSink::post).
    pub fn into_fields(self) -> HashMap<String, String> {
        HashMap::from([
            ("stream".to_string(), self.stream.as_str().to_string()),
            ("message".to_string(), self.message),
        ])
    }
}
