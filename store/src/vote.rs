//! Vote storage trait.

use crate::StoreError;
use votesync_types::{NewVote, PollId, VoteRecord};

/// Append-only vote log.
///
/// Ids are assigned by the store in strictly increasing order.
pub trait VoteStore {
    fn append_vote(&self, vote: NewVote) -> Result<VoteRecord, StoreError>;

    fn get_vote(&self, id: u64) -> Result<VoteRecord, StoreError>;

    /// All votes of a poll, slot ascending, ties broken by id.
    fn votes_for_poll(&self, poll_id: PollId) -> Result<Vec<VoteRecord>, StoreError>;

    fn votes_by_voter(&self, poll_id: PollId, voter: &str) -> Result<Vec<VoteRecord>, StoreError> {
        Ok(self
            .votes_for_poll(poll_id)?
            .into_iter()
            .filter(|v| v.voter == voter)
            .collect())
    }

    fn vote_count(&self) -> Result<u64, StoreError>;
}
