// Log Sink Port - the external structured-log collection service

use std::collections::HashMap;

/// Asynchronous "post a tagged record" sink.
///
/// Fire-and-forget: implementations must not block the caller meaningfully
/// and must tolerate concurrent posts from arbitrarily many tasks. Errors
/// talking to the collector are the implementation's to absorb; the runner
/// never sees them.
pub trait LogSink: Send + Sync {
    fn post(&self, tag: &str, fields: HashMap<String, String>);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// In-memory sink capturing every posted record, in arrival order.
    #[derive(Default)]
    pub struct MemoryLogSink {
        records: Mutex<Vec<(String, HashMap<String, String>)>>,
    }

    impl MemoryLogSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// All `(tag, fields)` pairs posted so far.
        pub fn records(&self) -> Vec<(String, HashMap<String, String>)> {
            self.records.lock().unwrap().clone()
        }

        /// Messages posted for one stream name, in arrival order.
        pub fn messages_for(&self, stream: &str) -> Vec<String> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, fields)| fields.get("stream").map(String::as_str) == Some(stream))
                .filter_map(|(_, fields)| fields.get("message").cloned())
                .collect()
        }

        pub fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl LogSink for MemoryLogSink {
        fn post(&self, tag: &str, fields: HashMap<String, String>) {
            self.records.lock().unwrap().push((tag.to_string(), fields));
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn keeps_records_in_post_order() {
            let sink = MemoryLogSink::new();
            sink.post("t", HashMap::from([("message".to_string(), "a".to_string())]));
            sink.post("t", HashMap::from([("message".to_string(), "b".to_string())]));

            let records = sink.records();
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].1.get("message").map(String::as_str), Some("a"));
            assert_eq!(records[1].1.get("message").map(String::as_str), Some("b"));
        }

        #[test]
        fn filters_by_stream() {
            let sink = MemoryLogSink::new();
            sink.post(
                "t",
                HashMap::from([
                    ("stream".to_string(), "stdout".to_string()),
                    ("message".to_string(), "out".to_string()),
                ]),
            );
            sink.post(
                "t",
                HashMap::from([
                    ("stream".to_string(), "stderr".to_string()),
                    ("message".to_string(), "err".to_string()),
                ]),
            );

            assert_eq!(sink.messages_for("stdout"), vec!["out"]);
            assert_eq!(sink.messages_for("stderr"), vec!["err"]);
        }
    }
}
