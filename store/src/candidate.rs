//! Candidate storage trait.

use crate::{StoreError, UpsertOutcome};
use votesync_types::{Address, CandidateRecord, CandidateSnapshot, PollId};

/// Result of applying one vote to a candidate row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TallyOutcome {
    /// The row existed; `votes` is the tally after the increment and
    /// `linked` is true if this call also linked it.
    Incremented { votes: u64, linked: bool },
    /// No row existed; a linked row with a tally of 1 was inserted.
    Created,
}

/// Candidates keyed by account address, indexed by the poll they link to.
pub trait CandidateStore {
    fn get_candidate(&self, address: &Address) -> Result<CandidateRecord, StoreError>;

    /// Overwrite name and tally of an existing row, or insert an unlinked one.
    /// The link state of an existing row is never touched.
    fn upsert_candidate(
        &self,
        address: &Address,
        snapshot: &CandidateSnapshot,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Add one vote to the candidate at `address`, linking it to the poll if
    /// it was unlinked, or insert it linked with a tally of 1.
    fn tally_vote(
        &self,
        address: &Address,
        name: &str,
        poll_address: &Address,
        poll_id: PollId,
    ) -> Result<TallyOutcome, StoreError>;

    /// Link an unlinked candidate. Returns `false` if it was already linked.
    fn link_candidate(
        &self,
        address: &Address,
        poll_address: &Address,
        poll_id: PollId,
    ) -> Result<bool, StoreError>;

    fn unlinked_candidates(&self) -> Result<Vec<CandidateRecord>, StoreError>;

    fn candidates_for_poll(&self, poll_address: &Address)
        -> Result<Vec<CandidateRecord>, StoreError>;

    fn candidate_count(&self) -> Result<u64, StoreError>;

    fn find_candidate(&self, address: &Address) -> Result<Option<CandidateRecord>, StoreError> {
        match self.get_candidate(address) {
            Ok(c) => Ok(Some(c)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
