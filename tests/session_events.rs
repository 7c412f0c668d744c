use polotrack::{
    core::{
        roster::Roster,
        session::{EngineError, MatchSession, Selected, Selection, SessionConfig, Triggered},
    },
    logbook::LogEntry,
    op::WriteOp,
    types::{EventType, PlayerId, SubAction, Subject, Team},
};

fn session() -> MatchSession {
    MatchSession::open(1, 1, "Sharks", "Orcas", Roster::new(), SessionConfig::default())
}

fn sub_in(session: &mut MatchSession, team: Team, slot: u8) -> PlayerId {
    session.arm_sub(SubAction::In);
    session.select_player(team, slot).expect("sub in");
    PlayerId { team, slot }
}

#[test]
fn goal_scores_clears_holder_and_auto_pauses() {
    let mut s = session();
    let h1 = sub_in(&mut s, Team::Home, 1);
    s.select_player(Team::Home, 1).expect("holder");
    s.start_clock().expect("start");

    let triggered = s.trigger_event(EventType::Goal).expect("goal");
    assert_eq!(
        triggered,
        Triggered::Recorded {
            subject: Subject::Player(h1),
            event_type: EventType::Goal,
        }
    );

    assert_eq!(s.score(), (1, 0));
    assert_eq!(s.ball_holder(), None);
    assert!(!s.clock().is_running());
    assert!(s.clock().auto_paused());

    let critical = s.critical_log();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].quarter, 1);
    assert_eq!(critical[0].event_type, EventType::Goal);

    let appended = s.drain_writes().into_iter().any(|op| {
        matches!(
            op,
            WriteOp::AppendEvent { ref rec }
                if rec.event_type == EventType::Goal && rec.subject == Subject::Player(h1)
        )
    });
    assert!(appended, "expected a durable Goal event");
}

#[test]
fn offense_event_without_holder_is_rejected() {
    let mut s = session();
    assert_eq!(
        s.trigger_event(EventType::Shot),
        Err(EngineError::MissingBallHolder)
    );
    assert!(s.drain_writes().is_empty());
}

#[test]
fn defensive_event_resolves_against_next_selected_player() {
    let mut s = session();
    sub_in(&mut s, Team::Home, 1);
    s.select_player(Team::Home, 1).expect("holder");

    assert_eq!(
        s.trigger_event(EventType::Block).expect("arm"),
        Triggered::AwaitingDefender(EventType::Block)
    );

    // The defender can come from either team and need not be in the pool.
    let selected = s.select_player(Team::Away, 3).expect("defender");
    let a3 = PlayerId { team: Team::Away, slot: 3 };
    assert_eq!(
        selected,
        Selected::DefensiveRecorded { player: a3, event_type: EventType::Block }
    );

    assert_eq!(s.stats().count(Subject::Player(a3), EventType::Block), 1);
    assert_eq!(s.ball_holder(), None, "holder cleared on resolution");
    assert_eq!(s.selection(), Selection::Idle);
    assert_eq!(s.possession_team(), Team::Home, "no possession side effects");
}

#[test]
fn game_level_events_use_the_sentinel_subject() {
    let mut s = session();
    sub_in(&mut s, Team::Home, 1);
    s.start_clock().expect("start");

    let triggered = s.trigger_event(EventType::Timeout).expect("timeout");
    assert_eq!(
        triggered,
        Triggered::Recorded { subject: Subject::Game, event_type: EventType::Timeout }
    );
    assert!(!s.clock().is_running(), "Timeout auto-pauses");
    assert!(s.clock().auto_paused());

    s.start_clock().expect("resume");
    s.trigger_event(EventType::Corner).expect("corner");
    assert!(s.clock().is_running(), "Corner does not auto-pause");

    let critical = s.critical_log();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].event_type, EventType::Timeout);
    assert_eq!(critical[0].subject, Subject::Game);
}

#[test]
fn armed_sub_mode_wins_over_defensive_arming() {
    let mut s = session();
    s.arm_sub(SubAction::In);
    assert_eq!(s.trigger_event(EventType::Block), Err(EngineError::SubModeArmed));

    // The armed substitution still consumes the next selection.
    assert_eq!(
        s.select_player(Team::Home, 2).expect("sub"),
        Selected::SubApplied {
            player: PlayerId { team: Team::Home, slot: 2 },
            action: SubAction::In,
        }
    );
}

#[test]
fn counters_are_never_reset_during_a_match() {
    let mut s = session();
    let h1 = sub_in(&mut s, Team::Home, 1);
    s.select_player(Team::Home, 1).expect("holder");

    s.trigger_event(EventType::Foul).expect("foul");
    assert_eq!(s.stats().count(Subject::Player(h1), EventType::Foul), 1);

    s.advance_quarter().expect("advance");
    s.trigger_event(EventType::Foul).expect("foul in Q2");
    assert_eq!(s.stats().count(Subject::Player(h1), EventType::Foul), 2);
}

#[test]
fn auto_pause_only_fires_while_running() {
    let mut s = session();
    sub_in(&mut s, Team::Home, 1);
    s.select_player(Team::Home, 1).expect("holder");

    s.trigger_event(EventType::Foul).expect("foul");
    assert!(!s.clock().is_running());
    assert!(!s.clock().auto_paused(), "paused clock stays manually paused");
}

#[test]
fn quarter_summary_is_appended_when_the_quarter_expires() {
    let mut s = session();
    sub_in(&mut s, Team::Home, 1);
    s.select_player(Team::Home, 1).expect("holder");
    s.start_clock().expect("start");
    s.trigger_event(EventType::Goal).expect("goal");

    s.adjust_time(-479.0).expect("adjust");
    s.start_clock().expect("resume");
    s.tick(2.0);

    let log = s.drain_log();
    let summary = log
        .iter()
        .find_map(|entry| match entry {
            LogEntry::Summary { quarter, total, home, away, top, .. } => {
                Some((*quarter, *total, *home, *away, top.clone()))
            }
            _ => None,
        })
        .expect("summary entry");
    assert_eq!(summary, (1, 1, 1, 0, vec![(EventType::Goal, 1)]));

    let rendered = log.iter().map(|e| e.render()).collect::<String>();
    assert!(rendered.contains("--- Q1 SUMMARY: 1 critical events (H:1 A:0) | Goal:1 ---"));
}

#[test]
fn event_log_lines_use_the_tab_separated_format() {
    let mut s = session();
    sub_in(&mut s, Team::Home, 1);
    s.select_player(Team::Home, 1).expect("holder");
    s.trigger_event(EventType::Shot).expect("shot");

    let rendered: Vec<String> = s.drain_log().iter().map(|e| e.render()).collect();
    assert!(
        rendered
            .iter()
            .any(|line| line == "8:00\tQ1\tHome\t\tHome #1\t\tShot\n"),
        "unexpected log lines: {rendered:?}"
    );
}
