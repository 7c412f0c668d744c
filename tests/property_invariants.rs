use std::collections::HashMap;

use proptest::prelude::*;

use polotrack::{
    core::{
        roster::Roster,
        session::{MatchSession, Selection, SessionConfig},
    },
    types::{EventType, PlayerId, Quarter, ROSTER_SLOTS, SubAction, Team},
};

#[derive(Debug, Clone)]
enum Action {
    Start,
    Pause,
    Tick { dt_ms: u16 },
    ArmSub { sub_in: bool },
    Select { home: bool, slot: u8 },
    Trigger { idx: u8 },
    Adjust { tenths: i16 },
    Advance,
    Reset,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        2 => Just(Action::Start),
        1 => Just(Action::Pause),
        6 => (50u16..2000).prop_map(|dt_ms| Action::Tick { dt_ms }),
        3 => any::<bool>().prop_map(|sub_in| Action::ArmSub { sub_in }),
        6 => (any::<bool>(), 0u8..16).prop_map(|(home, slot)| Action::Select { home, slot }),
        4 => (0u8..32).prop_map(|idx| Action::Trigger { idx }),
        1 => (-2000i16..2000).prop_map(|tenths| Action::Adjust { tenths }),
        1 => Just(Action::Advance),
        1 => Just(Action::Reset),
    ]
}

fn all_players() -> Vec<PlayerId> {
    let mut out = Vec::new();
    for team in [Team::Home, Team::Away] {
        for slot in 1..=ROSTER_SLOTS {
            out.push(PlayerId { team, slot });
        }
    }
    out
}

proptest! {
    #[test]
    fn random_command_sequences_preserve_engine_invariants(
        actions in prop::collection::vec(action_strategy(), 1..200)
    ) {
        let mut session = MatchSession::open(
            1, 1, "Sharks", "Orcas", Roster::new(), SessionConfig::default(),
        );
        let quarter_len = session.clock().quarter_len();
        // Running time consumed per quarter number, as the harness sees it.
        let mut elapsed: HashMap<Quarter, f64> = HashMap::new();
        let mut selected = false;

        for action in actions {
            selected = false;
            match action {
                Action::Start => {
                    let _ = session.start_clock();
                }
                Action::Pause => session.pause_clock(),
                Action::Tick { dt_ms } => {
                    if session.clock().is_running() {
                        let dt = f64::from(dt_ms) / 1000.0;
                        let quarter = session.clock().quarter();
                        session.tick(dt);
                        *elapsed.entry(quarter).or_insert(0.0) += dt;
                    }
                }
                Action::ArmSub { sub_in } => {
                    session.arm_sub(if sub_in { SubAction::In } else { SubAction::Out });
                }
                Action::Select { home, slot } => {
                    let team = if home { Team::Home } else { Team::Away };
                    let _ = session.select_player(team, slot);
                    selected = true;
                }
                Action::Trigger { idx } => {
                    let event_type = EventType::ALL[usize::from(idx) % EventType::ALL.len()];
                    let _ = session.trigger_event(event_type);
                }
                Action::Adjust { tenths } => {
                    let _ = session.adjust_time(f64::from(tenths) / 10.0);
                }
                Action::Advance => {
                    let _ = session.advance_quarter();
                }
                Action::Reset => {
                    let _ = session.reset_quarter();
                }
            }

            let clock = session.clock();
            prop_assert!(clock.time_remaining() >= 0.0);
            prop_assert!(clock.time_remaining() <= quarter_len + 1e-9);
            prop_assert!((1..=4).contains(&clock.quarter()));

            if selected {
                prop_assert_eq!(session.selection(), Selection::Idle);
            }

            if let Some(holder) = session.ball_holder() {
                prop_assert_eq!(holder.team, session.possession_team());
                prop_assert!(
                    session.in_pool(session.possession_team()).contains(&holder),
                    "holder {holder} not in pool"
                );
            }
        }

        // Accumulated time never exceeds the running time actually consumed.
        let players = all_players();
        for (quarter, spent) in &elapsed {
            let mut pool_total = 0.0;
            let mut possession_total = 0.0;
            for player in &players {
                let pool = session.accumulator().pool_seconds(*player, *quarter);
                prop_assert!(pool <= spent + 1e-6);
                pool_total += pool;
                possession_total += session.accumulator().possession_seconds(*player, *quarter);
            }
            prop_assert!(pool_total <= spent * players.len() as f64 + 1e-6);
            prop_assert!(possession_total <= spent + 1e-6);
        }
    }
}
