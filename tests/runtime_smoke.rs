use std::time::Duration;

use polotrack::{
    core::session::{EngineError, Selected, Triggered},
    record::RosterEntry,
    runtime::{
        events::TrackerEvent,
        handle::{RuntimeConfig, RuntimeError, TrackerHandle, TrackerState, spawn_tracker},
    },
    types::{EventType, PlayerId, ROSTER_SLOTS, SubAction, Team},
};

fn cfg() -> RuntimeConfig {
    RuntimeConfig {
        require_full_roster: false,
        tick_interval: Duration::from_millis(20),
        ..RuntimeConfig::default()
    }
}

fn full_roster() -> Vec<RosterEntry> {
    let mut entries = Vec::new();
    for team in [Team::Home, Team::Away] {
        for slot in 1..=ROSTER_SLOTS {
            entries.push(RosterEntry {
                player: PlayerId { team, slot },
                number: u32::from(slot),
                name: format!("{team} {slot}"),
            });
        }
    }
    entries
}

async fn next_matching(
    sub: &mut tokio::sync::broadcast::Receiver<TrackerEvent>,
    mut pred: impl FnMut(&TrackerEvent) -> bool,
) -> TrackerEvent {
    for _ in 0..64 {
        let evt = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("event timeout")
            .expect("recv");
        if pred(&evt) {
            return evt;
        }
    }
    panic!("expected event not seen");
}

#[tokio::test]
async fn commands_before_a_match_are_rejected() {
    let handle = spawn_tracker(TrackerState::new(), None, cfg());

    let err = handle.start_clock().await.expect_err("no match yet");
    assert!(matches!(
        err,
        RuntimeError::Engine(EngineError::NoActiveMatch)
    ));

    let err = handle
        .trigger_event(EventType::Goal)
        .await
        .expect_err("no match yet");
    assert!(matches!(
        err,
        RuntimeError::Engine(EngineError::NoActiveMatch)
    ));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn roster_gate_blocks_new_match_until_names_are_complete() {
    let handle = spawn_tracker(TrackerState::new(), None, RuntimeConfig::default());

    let err = handle.new_match("Sharks", "Orcas").await.expect_err("gated");
    assert!(matches!(
        err,
        RuntimeError::Engine(EngineError::RosterIncomplete { missing: 28 })
    ));

    let complete = handle.save_roster(full_roster()).await.expect("save");
    assert!(complete);

    let meta = handle.new_match("Sharks", "Orcas").await.expect("new match");
    assert_eq!(meta.match_id, 1);
    assert_eq!(meta.match_code.len(), 15, "YYYYMMDD_HHMMSS");

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn event_flow_reaches_the_display_stream() {
    let handle = spawn_tracker(TrackerState::new(), None, cfg());
    let mut sub = handle.subscribe();

    handle.new_match("Sharks", "Orcas").await.expect("new match");
    handle.arm_sub(SubAction::In).await.expect("arm");
    let selected = handle.select_player(Team::Home, 1).await.expect("sub in");
    assert!(matches!(selected, Selected::SubApplied { .. }));

    let selected = handle.select_player(Team::Home, 1).await.expect("holder");
    assert!(matches!(selected, Selected::BallHolder(_)));

    let triggered = handle.trigger_event(EventType::Goal).await.expect("goal");
    assert!(matches!(
        triggered,
        Triggered::Recorded { event_type: EventType::Goal, .. }
    ));
    assert_eq!(handle.score().await.expect("score"), (1, 0));

    next_matching(&mut sub, |e| {
        matches!(e, TrackerEvent::SubstitutionApplied { action: SubAction::In, .. })
    })
    .await;
    next_matching(&mut sub, |e| {
        matches!(e, TrackerEvent::EventRecorded { event_type: EventType::Goal, .. })
    })
    .await;
    next_matching(&mut sub, |e| {
        matches!(e, TrackerEvent::ScoreChanged { home: 1, away: 0 })
    })
    .await;

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn defensive_two_step_over_the_command_surface() {
    let handle = spawn_tracker(TrackerState::new(), None, cfg());

    handle.new_match("Sharks", "Orcas").await.expect("new match");
    let triggered = handle.trigger_event(EventType::Block).await.expect("arm");
    assert!(matches!(
        triggered,
        Triggered::AwaitingDefender(EventType::Block)
    ));

    let selected = handle.select_player(Team::Away, 4).await.expect("defender");
    assert!(matches!(
        selected,
        Selected::DefensiveRecorded { event_type: EventType::Block, .. }
    ));

    let stats = handle.live_stats().await.expect("stats");
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].counts, vec![(EventType::Block, 1)]);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn ticking_accumulates_pool_time_while_running() {
    let handle = spawn_tracker(TrackerState::new(), None, cfg());

    handle.new_match("Sharks", "Orcas").await.expect("new match");
    handle.arm_sub(SubAction::In).await.expect("arm");
    handle.select_player(Team::Home, 1).await.expect("sub in");
    handle.start_clock().await.expect("start");

    let mut sub = handle.subscribe();
    // Two ticks are enough to observe movement without timing precision.
    for _ in 0..2 {
        next_matching(&mut sub, |e| matches!(e, TrackerEvent::ClockChanged { running: true, .. }))
            .await;
    }
    handle.pause_clock().await.expect("pause");

    let clock = handle.clock().await.expect("clock");
    assert!(clock.time_remaining < 480.0);
    assert!(!clock.running);

    let rows = handle.pool_leaderboard().await.expect("leaderboard");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].pool_seconds > 0.0);
    assert_eq!(rows[0].substitutions, 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn match_log_file_receives_header_and_event_lines() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let mut config = cfg();
    config.log_dir = Some(tmp.path().to_path_buf());
    let handle = spawn_tracker(TrackerState::new(), None, config);

    let meta = handle.new_match("Sharks", "Orcas").await.expect("new match");
    handle.arm_sub(SubAction::In).await.expect("arm");
    handle.select_player(Team::Home, 1).await.expect("sub in");
    handle.select_player(Team::Home, 1).await.expect("holder");
    handle.trigger_event(EventType::Shot).await.expect("shot");
    handle.shutdown().await.expect("shutdown");

    let path = tmp.path().join(format!("match_{}.log", meta.match_code));
    let text = std::fs::read_to_string(path).expect("log file");
    assert!(text.starts_with("Match: Sharks vs Orcas"));
    assert!(text.contains("8:00\tQ1\tHome\t\tHome #1\t\tShot\n"));
}

#[tokio::test]
async fn handles_are_cloneable() {
    let handle = spawn_tracker(TrackerState::new(), None, cfg());
    let clone: TrackerHandle = handle.clone();

    handle.new_match("Sharks", "Orcas").await.expect("new match");
    let clock = clone.clock().await.expect("clock via clone");
    assert_eq!(clock.quarter, 1);

    clone.shutdown().await.expect("shutdown");
}
