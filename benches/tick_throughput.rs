use criterion::{Criterion, criterion_group, criterion_main};

use polotrack::{
    core::{
        roster::Roster,
        session::{MatchSession, SessionConfig},
    },
    types::{EventType, ROSTER_SLOTS, SubAction, Team},
};

fn full_pool_session() -> MatchSession {
    let mut session = MatchSession::open(
        1,
        1,
        "Sharks",
        "Orcas",
        Roster::new(),
        SessionConfig::default(),
    );
    for team in [Team::Home, Team::Away] {
        for slot in 1..=ROSTER_SLOTS {
            session.arm_sub(SubAction::In);
            session.select_player(team, slot).expect("sub in");
        }
    }
    session.select_player(Team::Home, 1).expect("holder");
    session.start_clock().expect("start");
    session
}

fn bench_ticks(c: &mut Criterion) {
    c.bench_function("tick_full_pool_10k", |b| {
        b.iter(|| {
            let mut session = full_pool_session();
            for _ in 0..10_000 {
                session.tick(0.01);
            }
            session.drain_writes().len()
        });
    });
}

fn bench_events(c: &mut Criterion) {
    c.bench_function("record_events_10k", |b| {
        b.iter(|| {
            let mut session = full_pool_session();
            for _ in 0..10_000 {
                session.trigger_event(EventType::Shot).expect("shot");
            }
            session.drain_writes().len()
        });
    });
}

criterion_group!(benches, bench_ticks, bench_events);
criterion_main!(benches);
