//! Live water-polo match engine: an authoritative 1 Hz game clock with
//! concurrent possession/pool-time accumulation, substitution tracking, a
//! discrete event engine, and durable SQLite write-through.
//!
//! # Examples
//!
//! Driving a [`core::session::MatchSession`] directly (deterministic ticks):
//! ```
//! use polotrack::{
//!     core::{roster::Roster, session::{MatchSession, SessionConfig}},
//!     types::{SubAction, Team},
//! };
//!
//! let mut session = MatchSession::open(
//!     1, 1, "Sharks", "Orcas", Roster::new(), SessionConfig::default(),
//! );
//! session.arm_sub(SubAction::In);
//! session.select_player(Team::Home, 1).expect("sub in");
//! session.start_clock().expect("start");
//! for _ in 0..10 {
//!     session.tick(1.0);
//! }
//! let player = polotrack::types::PlayerId { team: Team::Home, slot: 1 };
//! assert_eq!(session.accumulator().pool_seconds(player, 1), 10.0);
//! ```
//!
//! Runtime usage with the SQLite sink:
//! ```no_run
//! use polotrack::{
//!     persist::sqlite::SqliteMatchSink,
//!     runtime::handle::{spawn_tracker, RuntimeConfig, TrackerState},
//!     types::{SubAction, Team},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = SqliteMatchSink::open("waterpolo.db").expect("open sqlite");
//! let state = TrackerState::load(&sink).expect("load state");
//! let cfg = RuntimeConfig { require_full_roster: false, ..RuntimeConfig::default() };
//! let handle = spawn_tracker(state, Some(Box::new(sink)), cfg);
//!
//! handle.new_match("Sharks", "Orcas").await.expect("new match");
//! handle.arm_sub(SubAction::In).await.expect("arm");
//! handle.select_player(Team::Home, 1).await.expect("sub in");
//! handle.start_clock().await.expect("start");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Authoritative in-memory match state: clock, roster, session.
pub mod core;
/// Possession/pool accumulation and live statistics.
pub mod engine;
/// Append-only per-match text log.
pub mod logbook;
/// Write-operation model applied to persistence.
pub mod op;
/// Persistence abstraction and SQLite implementation.
pub mod persist;
/// Durable match-domain records.
pub mod record;
/// Read-only report rows over stored data.
pub mod report;
/// Single-writer runtime handle and display events.
pub mod runtime;
/// Shared primitive types and enums.
pub mod types;
