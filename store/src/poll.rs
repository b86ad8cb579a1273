//! Poll storage trait.

use crate::{StoreError, UpsertOutcome};
use votesync_types::{Address, PollId, PollRecord, PollSnapshot};

/// What `ensure_poll` found at the derived poll address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A row existed with the expected poll id.
    Existing,
    /// A row existed with a different (or no) poll id and was corrected.
    Corrected,
    /// No row existed; a placeholder was inserted.
    Placeholder,
}

/// Polls keyed by account address, with a unique secondary index on poll id.
pub trait PollStore {
    fn get_poll(&self, address: &Address) -> Result<PollRecord, StoreError>;

    /// Overwrite every decoded field of an existing row, or insert a new one.
    ///
    /// Fails with `Duplicate` if the snapshot's poll id already belongs to a
    /// different address.
    fn upsert_poll(
        &self,
        address: &Address,
        snapshot: &PollSnapshot,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Make sure a row for `address` exists and carries `poll_id`.
    fn ensure_poll(&self, address: &Address, poll_id: PollId)
        -> Result<EnsureOutcome, StoreError>;

    fn poll_by_id(&self, poll_id: PollId) -> Result<Option<PollRecord>, StoreError>;

    fn iter_polls(&self) -> Result<Vec<PollRecord>, StoreError>;

    /// Delete a poll and every candidate linked to it. Returns the number of
    /// candidates removed.
    fn delete_poll(&self, address: &Address) -> Result<usize, StoreError>;

    fn poll_count(&self) -> Result<u64, StoreError>;

    fn find_poll(&self, address: &Address) -> Result<Option<PollRecord>, StoreError> {
        match self.get_poll(address) {
            Ok(poll) => Ok(Some(poll)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Polls whose numeric id is known, the search space for repair.
    fn known_polls(&self) -> Result<Vec<(PollId, Address)>, StoreError> {
        Ok(self
            .iter_polls()?
            .into_iter()
            .filter_map(|p| p.poll_id.map(|id| (id, p.address)))
            .collect())
    }
}
