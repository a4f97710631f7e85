pub mod allocator;
pub mod capacity;
pub mod commit;
pub mod graph;
pub mod normalize;
pub mod search;
pub mod topology;

pub use commit::{commit_path, release_path, CommitMeta};
pub use search::{find_paths, PathCandidate};

use thiserror::Error;

/// Failures of the path engine. Everything here aborts the remainder of the
/// current operation and surfaces as a single message; only the safe-field
/// retry recovers locally before `StorageFieldRejected` escalates.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no available route between {start} and {end}")]
    NoPathFound { start: String, end: String },

    #[error("segment {from} -> {to} cannot supply {required} free cores")]
    InsufficientCapacity {
        from: String,
        to: String,
        required: usize,
    },

    #[error("a reserved record on segment {segment} no longer exists")]
    StaleReservation { segment: String },

    #[error("a reserved record on segment {segment} was claimed by another session")]
    AlreadyOccupied { segment: String },

    #[error("fiber {fiber} has no free core numbers left within its capacity")]
    CoreExhausted { fiber: String },

    #[error("storage rejected the update for record {id}: {reason}")]
    StorageFieldRejected { id: i64, reason: String },

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
