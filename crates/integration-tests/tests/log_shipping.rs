//! Full pipeline test: fork runner -> fluent client -> TCP collector.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use common::{request, SharedBuf};
use forkfn_core::port::time_provider::SystemTimeProvider;
use forkfn_core::port::FunctionRunner;
use forkfn_infra_fluent::{FluentConfig, FluentLogSink};
use forkfn_infra_system::{ForkRunner, RunnerConfig};

type Event = (String, i64, HashMap<String, String>);

#[tokio::test]
async fn captured_output_reaches_the_collector_with_prefixed_tag() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let sink = Arc::new(FluentLogSink::connect(FluentConfig {
        host: "127.0.0.1".to_string(),
        port,
        ..Default::default()
    }));

    let runner = ForkRunner::new(
        RunnerConfig::default(),
        sink.clone(),
        Arc::new(SystemTimeProvider),
    );
    let out = SharedBuf::default();

    runner
        .run(request("echo", &["hello"], "trace-1", &out))
        .await
        .expect("echo should succeed");

    let (mut conn, _) = listener.accept().await.unwrap();
    sink.shutdown().await;

    let mut buf = Vec::new();
    conn.read_to_end(&mut buf).await.unwrap();

    let mut slice: &[u8] = &buf;
    let mut events: Vec<Event> = Vec::new();
    while !slice.is_empty() {
        events.push(rmp_serde::decode::from_read(&mut slice).expect("decode event"));
    }

    // One stdout line plus the capture-complete control record.
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|(tag, _, _)| tag == "watchdog.trace-1"));
    assert_eq!(
        events[0].2.get("message").map(String::as_str),
        Some("hello")
    );
    assert_eq!(
        events[1].2.get("stream").map(String::as_str),
        Some("control")
    );
    assert_eq!(out.as_string(), "Trace-ID: trace-1");
}
