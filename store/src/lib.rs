//! Abstract storage traits for the votesync mirror.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Operations that read a row and write it back (tally increment, linking,
//! poll-id correction) are single trait methods so a backend can run each one
//! inside one write transaction.

pub mod candidate;
pub mod error;
pub mod poll;
pub mod vote;

pub use candidate::{CandidateStore, TallyOutcome};
pub use error::{RecordKind, StoreError};
pub use poll::{EnsureOutcome, PollStore};
pub use vote::VoteStore;

use serde::{Deserialize, Serialize};

/// Whether an upsert created a new row or overwrote an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}
