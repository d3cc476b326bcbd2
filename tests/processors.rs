//! Processor start/stop aggregation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use service_foundation::lifecycle::{start_all, stop_all, Processor, StopGroup};

mod common;
use common::{EventLog, RecordingProcessor};

fn as_processors(processors: &[Arc<RecordingProcessor>]) -> Vec<Arc<dyn Processor>> {
    processors
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Processor>)
        .collect()
}

#[tokio::test]
async fn start_all_succeeds_and_starts_each_processor_once() {
    let events = EventLog::default();
    let recorded = vec![
        RecordingProcessor::new("a", &events).shared(),
        RecordingProcessor::new("b", &events).shared(),
        RecordingProcessor::new("c", &events).shared(),
    ];

    let failures = start_all(&as_processors(&recorded)).await;

    assert!(failures.is_empty());
    for processor in &recorded {
        assert_eq!(processor.starts(), 1);
    }
    assert_eq!(events.events(), vec!["a:start", "b:start", "c:start"]);
}

#[tokio::test]
async fn start_all_does_not_short_circuit_and_attributes_failures() {
    let events = EventLog::default();
    let recorded = vec![
        RecordingProcessor::new("first", &events).failing_start().shared(),
        RecordingProcessor::new("second", &events).shared(),
        RecordingProcessor::new("third", &events).failing_start().shared(),
    ];

    let failures = start_all(&as_processors(&recorded)).await;

    for processor in &recorded {
        assert_eq!(processor.starts(), 1, "every processor gets a start call");
    }
    let reported = failures
        .iter()
        .map(|f| (f.index, f.processor.as_str(), f.source.to_string()))
        .collect::<Vec<_>>();
    assert_eq!(
        reported,
        vec![
            (0, "first", "first failed to start".to_string()),
            (2, "third", "third failed to start".to_string()),
        ]
    );
}

#[tokio::test]
async fn stop_all_waits_for_every_completion_signal() {
    let events = EventLog::default();
    let recorded = vec![
        RecordingProcessor::new("fast", &events).shared(),
        RecordingProcessor::new("slow", &events)
            .stop_delay(Duration::from_millis(200))
            .shared(),
    ];

    let failures = stop_all(&as_processors(&recorded), StopGroup::new()).await;

    assert!(failures.is_empty());
    for processor in &recorded {
        assert_eq!(processor.stops(), 1);
    }
    let log = events.events();
    assert!(log.contains(&"fast:stopped".to_string()));
    assert!(log.contains(&"slow:stopped".to_string()));
}

#[tokio::test]
async fn stop_all_collects_errors_and_still_waits() {
    let events = EventLog::default();
    let recorded = vec![
        RecordingProcessor::new("broken", &events)
            .failing_stop()
            .stop_delay(Duration::from_millis(100))
            .shared(),
        RecordingProcessor::new("healthy", &events).shared(),
    ];

    let failures = stop_all(&as_processors(&recorded), StopGroup::new()).await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].processor, "broken");
    assert_eq!(recorded[1].stops(), 1, "a failing stop must not skip the others");
    assert!(events.events().contains(&"broken:stopped".to_string()));
}

#[tokio::test]
async fn stop_all_runs_stops_concurrently() {
    let events = EventLog::default();
    let recorded = (0..4)
        .map(|i| {
            RecordingProcessor::new(&format!("p{}", i), &events)
                .stop_delay(Duration::from_millis(300))
                .shared()
        })
        .collect::<Vec<_>>();

    let started = Instant::now();
    let failures = stop_all(&as_processors(&recorded), StopGroup::new()).await;

    assert!(failures.is_empty());
    assert!(
        started.elapsed() < Duration::from_millis(900),
        "four 300ms stops should overlap, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn stop_all_with_no_processors_returns_immediately() {
    let failures = tokio::time::timeout(Duration::from_secs(1), stop_all(&[], StopGroup::new()))
        .await
        .expect("empty stop should not block");
    assert!(failures.is_empty());
}
