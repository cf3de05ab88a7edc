// Trace Id Provider Port (for deterministic testing)

/// Trace identifier source.
pub trait TraceIdProvider: Send + Sync {
    /// Generate a fresh opaque trace identifier.
    fn new_trace_id(&self) -> String;
}

/// UUID v4 provider (production).
pub struct UuidTraceIdProvider;

impl TraceIdProvider for UuidTraceIdProvider {
    fn new_trace_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_distinct_ids() {
        let provider = UuidTraceIdProvider;
        assert_ne!(provider.new_trace_id(), provider.new_trace_id());
    }
}
