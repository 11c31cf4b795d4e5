use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use simlab_core::{
    FollowupPolicy, LogCategory, LogEvent, SchedulerPhase, Session, SessionError, SessionSettings,
};
use simlab_oracle::{OracleClient, OracleOperation, ScriptedBackend};
use tokio::time::Instant;

fn backend() -> Arc<ScriptedBackend> {
    Arc::new(
        ScriptedBackend::new()
            .with_default(
                OracleOperation::GenerateCommand,
                json!({
                    "name": "STEP",
                    "description": "scripted step",
                    "payload": "D0098103012100",
                    "impact": "none",
                })
                .to_string(),
            )
            .with_default(OracleOperation::SimulateExfiltration, "lab data"),
    )
}

fn session(backend: &Arc<ScriptedBackend>, policy: FollowupPolicy, steps: &[&str]) -> Session {
    Session::new(
        OracleClient::new(backend.clone()),
        SessionSettings {
            followup_policy: policy,
            sequence: steps.iter().map(|s| s.to_string()).collect(),
            ..SessionSettings::default()
        },
    )
}

fn count(session: &Session, needle: &str) -> usize {
    session
        .log()
        .entries()
        .iter()
        .filter(|e| e.text.contains(needle))
        .count()
}

#[tokio::test(start_paused = true)]
async fn first_step_is_immediate_and_steps_are_spaced_by_the_interval() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &["A", "B", "C"]);
    let started = Instant::now();
    session.start_simulation().expect("idle");
    assert!(session.is_running());
    assert!(session.state().scripted_run_active);

    tokio::time::sleep(Duration::from_secs(30)).await;

    let steps = backend.calls_for(OracleOperation::GenerateCommand);
    let subjects: Vec<_> = steps.iter().map(|c| c.subject.as_str()).collect();
    assert_eq!(subjects, vec!["A", "B", "C"]);
    assert_eq!(steps[0].at, started);
    for pair in steps.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(8000));
    }
    assert_eq!(steps[2].at - started, Duration::from_millis(16_000));

    assert_eq!(session.scheduler_phase(), SchedulerPhase::Idle);
    assert!(!session.state().scripted_run_active);
    assert_eq!(count(&session, "Scripted run complete"), 1);
    assert_eq!(count(&session, "Scripted run halted"), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_steps_do_not_stop_the_run() {
    let backend = Arc::new(ScriptedBackend::new().with_failure(
        OracleOperation::GenerateCommand,
        simlab_oracle::OracleError::Transport("connection refused".into()),
    ));
    let session = session(&backend, FollowupPolicy::Detached, &["A", "B"]);
    session.start_simulation().expect("idle");
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(backend.calls_for(OracleOperation::GenerateCommand).len(), 2);
    assert_eq!(count(&session, "Payload generation failed"), 2);
    assert!(session.state().command.is_none());
    assert!(!session.in_flight());
    assert_eq!(count(&session, "Scripted run complete"), 1);
    assert!(backend.calls_for(OracleOperation::SimulateExfiltration).is_empty());
}

#[tokio::test(start_paused = true)]
async fn scripted_steps_schedule_follow_ups_and_skip_the_transport_echo() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &["A", "B"]);
    let started = Instant::now();
    session.start_simulation().expect("idle");
    tokio::time::sleep(Duration::from_secs(20)).await;

    let followups = backend.calls_for(OracleOperation::SimulateExfiltration);
    let offsets: Vec<_> = followups.iter().map(|c| c.at - started).collect();
    assert_eq!(
        offsets,
        vec![Duration::from_millis(2500), Duration::from_millis(10_500)]
    );
    let entries = session.log().entries();
    assert!(entries.iter().all(|e| e.category != LogCategory::ShellEcho));
    assert_eq!(
        entries
            .iter()
            .filter(|e| e.category == LogCategory::ReceivedData)
            .count(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn start_is_refused_unless_idle() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &["A", "B"]);
    session.start_simulation().expect("idle");
    assert_eq!(
        session.start_simulation(),
        Err(SessionError::SchedulerNotIdle)
    );
    assert_eq!(count(&session, "Scripted run started"), 1);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.calls_for(OracleOperation::GenerateCommand).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &["A", "B", "C"]);
    session.stop_simulation();
    assert!(!session.is_running());
    assert!(session.log().is_empty(), "no halt notice when nothing ran");

    session.start_simulation().expect("idle");
    session.stop_simulation();
    session.stop_simulation();
    assert!(!session.is_running());
    assert!(!session.state().scripted_run_active);
    assert_eq!(count(&session, "Scripted run halted"), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(
        backend.calls_for(OracleOperation::GenerateCommand).len() <= 1,
        "no steps after stop"
    );
}

#[tokio::test(start_paused = true)]
async fn toggle_alternates_and_allows_a_fresh_run() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &["A", "B"]);
    assert_eq!(session.toggle_simulation(), Ok(true));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.toggle_simulation(), Ok(false));
    assert_eq!(session.toggle_simulation(), Ok(true));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let subjects: Vec<_> = backend
        .calls_for(OracleOperation::GenerateCommand)
        .into_iter()
        .map(|c| c.subject)
        .collect();
    assert_eq!(subjects, vec!["A", "A"], "a new run restarts at step 0");
}

#[tokio::test(start_paused = true)]
async fn stopping_the_run_leaves_follow_ups_alone() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Session, &["A", "B"]);
    session.start_simulation().expect("idle");
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.stop_simulation();
    assert_eq!(session.pending_followups(), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.calls_for(OracleOperation::SimulateExfiltration).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_stops_the_run_and_clears_everything_at_once() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &["A", "B", "C"]);
    session.set_pdu_input("0011");
    session.set_topic_input("OTA");
    session.start_simulation().expect("idle");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(session.state().command.is_some());

    session.reset();
    let snapshot = session.snapshot();
    assert!(snapshot.log.is_empty());
    assert!(!snapshot.state.has_results());
    assert!(snapshot.state.pdu_input.is_empty());
    assert!(snapshot.state.topic_input.is_empty());
    assert!(!snapshot.state.scripted_run_active);
    assert_eq!(session.scheduler_phase(), SchedulerPhase::Idle);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.calls_for(OracleOperation::GenerateCommand).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_during_a_run_emits_only_the_clear() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &["A", "B", "C"]);
    session.start_simulation().expect("idle");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rx = session.subscribe();
    session.reset();
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events, vec![LogEvent::Cleared]);
    assert_eq!(session.scheduler_phase(), SchedulerPhase::Idle);
    assert!(!session.state().scripted_run_active);
    assert_eq!(count(&session, "Scripted run halted"), 0);

    session.start_simulation().expect("reset leaves the scheduler idle");
    session.stop_simulation();
}

#[tokio::test(start_paused = true)]
async fn detached_follow_ups_survive_reset() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &["A"]);
    session
        .execute_command("A", simlab_core::CommandMode::Interactive, None)
        .await
        .expect("accepted");
    session.reset();
    assert!(session.log().is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.calls_for(OracleOperation::SimulateExfiltration).len(), 1);
    let categories: Vec<_> = session.log().entries().iter().map(|e| e.category).collect();
    assert_eq!(
        categories,
        vec![LogCategory::ReceivedData, LogCategory::Success]
    );
}

#[tokio::test(start_paused = true)]
async fn session_bound_follow_ups_are_cancelled_by_reset() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Session, &["A"]);
    session
        .execute_command("A", simlab_core::CommandMode::Interactive, None)
        .await
        .expect("accepted");
    assert_eq!(session.pending_followups(), 1);
    session.reset();
    assert_eq!(session.pending_followups(), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(backend.calls_for(OracleOperation::SimulateExfiltration).is_empty());
    assert!(session.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_the_timer_and_bound_follow_ups() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Session, &["A", "B", "C"]);
    session.start_simulation().expect("idle");
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.shutdown();
    assert!(!session.is_running());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.calls_for(OracleOperation::GenerateCommand).len(), 1);
    assert!(backend.calls_for(OracleOperation::SimulateExfiltration).is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_session_stops_the_timer() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &["A", "B", "C"]);
    session.start_simulation().expect("idle");
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(session);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.calls_for(OracleOperation::GenerateCommand).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_sequence_completes_immediately() {
    let backend = backend();
    let session = session(&backend, FollowupPolicy::Detached, &[]);
    session.start_simulation().expect("idle");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!session.is_running());
    assert_eq!(count(&session, "Scripted run complete"), 1);
    assert_eq!(backend.call_count(), 0);
}
