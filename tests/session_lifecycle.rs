mod common;

use audiodriver_lib::recorder::{
    RecordingError, SessionEvent, SessionState, StartOutcome, StopOutcome, TerminationReason,
};
use common::{scripted, BrokenStorage, HarnessBuilder, Script};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn reasons(summary: &audiodriver_lib::recorder::SessionSummary) -> Vec<TerminationReason> {
    summary.segments.iter().map(|s| s.reason).collect()
}

#[tokio::test]
async fn test_unauthorized_start_leaves_no_trace() {
    let harness = HarnessBuilder::new().authorized(false).build();
    let mut events = harness.controller.subscribe();

    let result = harness.controller.start();
    assert!(matches!(result, Err(RecordingError::Authorization(_))));
    assert_eq!(harness.controller.state(), SessionState::Idle);
    assert_eq!(harness.calls.created(), 0);
    assert!(harness.files().is_empty());

    match events.try_recv().unwrap() {
        SessionEvent::Failed { session_id, error } => {
            assert!(session_id.is_none());
            assert_eq!(error.code(), "AUTHORIZATION_ERROR");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_storage_failure_rejects_start() {
    let harness = HarnessBuilder::new()
        .storage(Arc::new(BrokenStorage))
        .build();

    let result = harness.controller.start();
    assert!(matches!(result, Err(RecordingError::Storage(_))));
    assert!(!harness.controller.is_active());
    assert_eq!(harness.calls.created(), 0);
    assert!(harness.controller.wait_until_idle().await.is_none());
}

#[tokio::test]
async fn test_stop_while_idle_is_noop() {
    let harness = HarnessBuilder::new().build();
    assert_eq!(harness.controller.stop(), StopOutcome::NotRunning);
    assert_eq!(harness.controller.state(), SessionState::Idle);
    assert_eq!(harness.calls.created(), 0);
}

#[tokio::test]
async fn test_start_twice_runs_one_session() {
    let harness = HarnessBuilder::new()
        .segment(Duration::from_secs(600))
        .poll(Duration::from_millis(10))
        .build();

    let first = harness.controller.start().unwrap();
    assert!(matches!(first, StartOutcome::Started { .. }));
    assert_eq!(harness.controller.start(), Ok(StartOutcome::AlreadyActive));
    assert_eq!(harness.controller.state(), SessionState::Running);

    assert_eq!(harness.controller.stop(), StopOutcome::Stopping);
    let summary = harness.controller.wait_until_idle().await.unwrap();

    assert_eq!(summary.segments.len(), 1);
    assert_eq!(harness.calls.created(), 1);
    assert_eq!(harness.files().len(), 1);
}

#[tokio::test]
async fn test_start_then_immediate_stop_yields_one_short_segment() {
    let harness = HarnessBuilder::new()
        .segment(Duration::from_secs(600))
        .poll(Duration::from_millis(10))
        .build();

    harness.controller.start().unwrap();
    harness.controller.stop();
    let summary = harness.controller.wait_until_idle().await.unwrap();

    assert!(summary.error.is_none());
    assert_eq!(reasons(&summary), vec![TerminationReason::UserStop]);
    assert_eq!(harness.files().len(), 1);
    assert_eq!(harness.calls.created(), harness.calls.released());
    assert_eq!(harness.controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_rotation_count_is_ceiling_of_elapsed_over_duration() {
    // D = 10s throughout
    for (stop_at, expected) in [(25, 3), (30, 3), (35, 4), (5, 1)] {
        let (harness, clock) = scripted(Duration::from_secs(stop_at), Script::default());

        harness.controller.start().unwrap();
        let summary = harness.controller.wait_until_idle().await.unwrap();

        assert_eq!(
            summary.segments.len(),
            expected,
            "stop at {}s should give {} segments",
            stop_at,
            expected
        );
        assert_eq!(clock.elapsed(), Duration::from_secs(stop_at));
        assert_eq!(harness.calls.created(), expected);
        assert_eq!(harness.calls.released(), expected);
    }
}

#[tokio::test]
async fn test_three_natural_segments_then_stop() {
    let (harness, _clock) = scripted(Duration::from_secs(35), Script::default());

    harness.controller.start().unwrap();
    let summary = harness.controller.wait_until_idle().await.unwrap();

    assert_eq!(
        reasons(&summary),
        vec![
            TerminationReason::NaturalTimeout,
            TerminationReason::NaturalTimeout,
            TerminationReason::NaturalTimeout,
            TerminationReason::UserStop,
        ]
    );
    for segment in &summary.segments[..3] {
        assert_eq!(segment.elapsed, Duration::from_secs(10));
    }
    assert_eq!(summary.segments[3].elapsed, Duration::from_secs(5));

    let files = harness.files();
    assert_eq!(files.len(), 4);
    let names: HashSet<_> = files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(names.len(), 4);
    assert!(files.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    assert_eq!(harness.controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_start_failure_on_second_segment_ends_session() {
    let script = Script {
        fail_start_on: Some(1),
        ..Script::default()
    };
    let (harness, _clock) = scripted(Duration::from_secs(1_000), script);
    let mut events = harness.controller.subscribe();

    harness.controller.start().unwrap();
    let summary = harness.controller.wait_until_idle().await.unwrap();

    assert!(matches!(
        summary.error,
        Some(RecordingError::ResourceAcquisition(_))
    ));
    assert_eq!(
        reasons(&summary),
        vec![TerminationReason::NaturalTimeout, TerminationReason::Error]
    );
    assert_eq!(summary.completed_segments().count(), 1);
    assert_eq!(harness.calls.created(), 2);
    assert_eq!(harness.calls.released(), 2);
    // The failed resource was never started, so only the first was stopped
    assert_eq!(harness.calls.stopped(), 1);
    assert_eq!(harness.files().len(), 1);
    assert_eq!(harness.controller.state(), SessionState::Idle);

    let mut failed = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Failed { session_id, .. } = event {
            assert_eq!(session_id, Some(summary.session_id));
            failed = true;
        }
    }
    assert!(failed);
}

#[tokio::test]
async fn test_mid_segment_storage_error_keeps_earlier_segments() {
    let script = Script {
        fail_poll_on: Some((2, 3)),
        ..Script::default()
    };
    let (harness, _clock) = scripted(Duration::from_secs(1_000), script);

    harness.controller.start().unwrap();
    let summary = harness.controller.wait_until_idle().await.unwrap();

    assert!(matches!(summary.error, Some(RecordingError::Storage(_))));
    assert_eq!(summary.segments.len(), 3);
    assert_eq!(summary.completed_segments().count(), 2);
    assert_eq!(harness.calls.created(), harness.calls.released());

    for segment in summary.completed_segments() {
        assert!(segment.path.exists(), "{:?} should be kept", segment.path);
    }
    assert_eq!(harness.controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_finalization_error_still_returns_to_idle() {
    let script = Script {
        fail_stop_on: Some(0),
        ..Script::default()
    };
    let (harness, _clock) = scripted(Duration::from_secs(1_000), script);

    harness.controller.start().unwrap();
    let summary = harness.controller.wait_until_idle().await.unwrap();

    assert!(matches!(summary.error, Some(RecordingError::Finalization(_))));
    assert_eq!(summary.segments.len(), 1);
    assert_eq!(harness.calls.released(), 1);
    assert_eq!(harness.controller.state(), SessionState::Idle);
    assert!(matches!(
        harness.controller.start(),
        Ok(StartOutcome::Started { .. })
    ));
    harness.controller.shutdown().await;
}

#[tokio::test]
async fn test_stop_latency_is_bounded_by_poll_interval() {
    let poll = Duration::from_millis(20);
    let harness = HarnessBuilder::new()
        .segment(Duration::from_secs(600))
        .poll(poll)
        .build();

    harness.controller.start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let requested = Instant::now();
    assert_eq!(harness.controller.stop(), StopOutcome::Stopping);
    let summary = harness.controller.wait_until_idle().await.unwrap();
    let latency = requested.elapsed();

    assert!(latency < Duration::from_secs(1), "stop took {:?}", latency);
    assert_eq!(reasons(&summary), vec![TerminationReason::UserStop]);
    assert!(!harness.controller.is_active());
}

#[tokio::test]
async fn test_events_follow_session_lifecycle() {
    let (harness, _clock) = scripted(Duration::from_secs(25), Script::default());
    let mut events = harness.controller.subscribe();

    let session_id = match harness.controller.start().unwrap() {
        StartOutcome::Started { session_id } => session_id,
        other => panic!("unexpected outcome {:?}", other),
    };
    harness.controller.wait_until_idle().await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert_eq!(received.len(), 5);
    assert!(matches!(received[0], SessionEvent::Started { session_id: id } if id == session_id));
    for (i, event) in received[1..4].iter().enumerate() {
        match event {
            SessionEvent::SegmentCompleted { record, .. } => assert_eq!(record.index, i),
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(matches!(
        received[4],
        SessionEvent::Stopped { segment_count: 3, .. }
    ));
}

#[tokio::test]
async fn test_shutdown_finalizes_active_session() {
    let harness = HarnessBuilder::new()
        .segment(Duration::from_secs(600))
        .poll(Duration::from_millis(10))
        .build();

    harness.controller.start().unwrap();
    let summary = harness.controller.shutdown().await.unwrap();

    assert_eq!(summary.segments.len(), 1);
    assert_eq!(harness.calls.stopped(), 1);
    assert_eq!(harness.calls.released(), 1);
    assert_eq!(harness.controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_state_readable_while_start_checks_authorization() {
    let authorizer = Arc::new(common::GatedAuthorizer::new());
    let harness = HarnessBuilder::new()
        .authorizer(authorizer.clone())
        .segment(Duration::from_secs(600))
        .poll(Duration::from_millis(10))
        .build();

    let controller = Arc::clone(&harness.controller);
    let observer = std::thread::spawn(move || {
        authorizer.gate.wait();
        let seen = (controller.state(), controller.is_active());
        authorizer.gate.wait();
        seen
    });

    let outcome = harness.controller.start().unwrap();
    assert!(matches!(outcome, StartOutcome::Started { .. }));
    assert_eq!(observer.join().unwrap(), (SessionState::Idle, false));

    harness.controller.stop();
    harness.controller.wait_until_idle().await.unwrap();
}
