pub mod sqlite;

use thiserror::Error;

use crate::op::WriteOp;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Durable sink for engine write operations.
///
/// All ops passed to one [`MatchSink::apply`] call must commit atomically;
/// the runtime relies on this to keep a tick's pool and possession deltas
/// together.
pub trait MatchSink: Send {
    fn apply(&mut self, ops: &[WriteOp]) -> PersistResult<()>;
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
}
