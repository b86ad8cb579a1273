use std::fmt;

use thiserror::Error;
use votesync_types::{Address, PollId};

/// The record kinds held by the mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Poll,
    Candidate,
    Vote,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Poll => "poll",
            RecordKind::Candidate => "candidate",
            RecordKind::Vote => "vote",
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {key} is not in the mirror")]
    NotFound { kind: RecordKind, key: String },

    /// Poll ids are unique across poll rows.
    #[error("poll id {poll_id} is already mirrored at {owner}")]
    Duplicate { poll_id: PollId, owner: Address },

    #[error("mirror backend failed: {0}")]
    Backend(String),

    #[error("failed to encode mirror record: {0}")]
    Serialization(String),

    #[error("mirror store is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    pub fn not_found(kind: RecordKind, key: impl fmt::Display) -> Self {
        StoreError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}
