use polotrack::{
    core::{
        roster::Roster,
        session::{EngineError, MatchSession, Selected, Selection, SessionConfig},
    },
    op::WriteOp,
    types::{PlayerId, SubAction, Team},
};

fn session() -> MatchSession {
    MatchSession::open(1, 1, "Sharks", "Orcas", Roster::new(), SessionConfig::default())
}

fn sub(session: &mut MatchSession, action: SubAction, team: Team, slot: u8) -> Result<Selected, EngineError> {
    session.arm_sub(action);
    session.select_player(team, slot)
}

#[test]
fn ten_uninterrupted_ticks_accumulate_exactly() {
    let mut s = session();
    sub(&mut s, SubAction::In, Team::Home, 1).expect("sub in");
    s.select_player(Team::Home, 1).expect("holder");
    s.start_clock().expect("start");

    for _ in 0..10 {
        s.tick(1.0);
    }

    let h1 = PlayerId { team: Team::Home, slot: 1 };
    assert_eq!(s.accumulator().pool_seconds(h1, 1), 10.0);
    assert_eq!(s.accumulator().possession_seconds(h1, 1), 10.0);
    assert_eq!(s.accumulator().substitutions(h1, 1), 1);
}

#[test]
fn sub_in_twice_is_rejected_and_mode_is_one_shot() {
    let mut s = session();
    sub(&mut s, SubAction::In, Team::Home, 1).expect("first sub in");

    assert_eq!(
        sub(&mut s, SubAction::In, Team::Home, 1),
        Err(EngineError::AlreadyInPool {
            player: PlayerId { team: Team::Home, slot: 1 }
        })
    );
    assert_eq!(s.selection(), Selection::Idle, "sub mode cleared on failure");

    // The next plain selection is a possession action again.
    assert_eq!(
        s.select_player(Team::Home, 1).expect("holder"),
        Selected::BallHolder(PlayerId { team: Team::Home, slot: 1 })
    );
}

#[test]
fn sub_out_of_absent_player_is_rejected() {
    let mut s = session();
    assert_eq!(
        sub(&mut s, SubAction::Out, Team::Away, 5),
        Err(EngineError::NotInPool {
            player: PlayerId { team: Team::Away, slot: 5 }
        })
    );
    assert!(s.drain_writes().iter().all(|op| !matches!(op, WriteOp::AppendSubstitution { .. })));
}

#[test]
fn holder_reassignment_stays_on_the_same_team() {
    let mut s = session();
    sub(&mut s, SubAction::In, Team::Home, 1).expect("h1 in");
    sub(&mut s, SubAction::In, Team::Home, 2).expect("h2 in");
    sub(&mut s, SubAction::In, Team::Away, 1).expect("a1 in");

    s.select_player(Team::Home, 1).expect("holder");
    sub(&mut s, SubAction::Out, Team::Home, 1).expect("h1 out");

    let new_holder = s.ball_holder().expect("reassigned");
    assert_eq!(new_holder.team, Team::Home, "never the opposing team");
    assert_eq!(new_holder, PlayerId { team: Team::Home, slot: 2 });

    sub(&mut s, SubAction::Out, Team::Home, 2).expect("h2 out");
    assert_eq!(s.ball_holder(), None, "possession lost with no teammates");
}

#[test]
fn substitutions_append_durable_records() {
    let mut s = session();
    sub(&mut s, SubAction::In, Team::Home, 3).expect("in");
    sub(&mut s, SubAction::Out, Team::Home, 3).expect("out");

    let h3 = PlayerId { team: Team::Home, slot: 3 };
    let actions: Vec<SubAction> = s
        .drain_writes()
        .into_iter()
        .filter_map(|op| match op {
            WriteOp::AppendSubstitution { rec } if rec.player == h3 => Some(rec.action),
            _ => None,
        })
        .collect();
    assert_eq!(actions, vec![SubAction::In, SubAction::Out]);
    assert_eq!(s.accumulator().substitutions(h3, 1), 2);
}

#[test]
fn selecting_a_benched_player_as_holder_is_rejected() {
    let mut s = session();
    assert_eq!(
        s.select_player(Team::Home, 7),
        Err(EngineError::NotInPool {
            player: PlayerId { team: Team::Home, slot: 7 }
        })
    );
    assert_eq!(s.ball_holder(), None);
}
