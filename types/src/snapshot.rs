//! Typed values decoded from the ledger before they are reconciled.

use serde::{Deserialize, Serialize};

/// Decoded contents of a `PollAccount`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub poll_id: u64,
    pub name: String,
    pub description: String,
    /// Voting window start, unix seconds.
    pub voting_start: u64,
    /// Voting window end, unix seconds.
    pub voting_end: u64,
    pub option_index: u64,
}

/// Decoded contents of a `CandidateAccount`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    pub name: String,
    pub votes: u64,
}

/// A validated vote event extracted from a transaction's logs.
///
/// Fields are kept in the string form the validator checked them in; the
/// reconciler parses `poll_id` when it derives addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteEvent {
    pub poll_id: String,
    pub candidate: String,
    pub voter: String,
    pub slot: String,
}

impl VoteEvent {
    pub fn new(
        poll_id: impl Into<String>,
        candidate: impl Into<String>,
        voter: impl Into<String>,
        slot: impl Into<String>,
    ) -> Self {
        Self {
            poll_id: poll_id.into(),
            candidate: candidate.into(),
            voter: voter.into(),
            slot: slot.into(),
        }
    }
}

/// Slot and block time resolved for a transaction signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMeta {
    pub slot: u64,
    pub block_time: u64,
}

impl TxMeta {
    /// Neither lookup produced anything.
    pub const UNAVAILABLE: Self = Self {
        slot: 0,
        block_time: 0,
    };

    pub fn new(slot: u64, block_time: u64) -> Self {
        Self { slot, block_time }
    }

    pub fn is_unavailable(&self) -> bool {
        *self == Self::UNAVAILABLE
    }
}

