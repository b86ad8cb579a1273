//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use votesync_store::{
    CandidateStore, EnsureOutcome, PollStore, RecordKind, StoreError, TallyOutcome, UpsertOutcome,
    VoteStore,
};
use votesync_types::{
    Address, CandidateLink, CandidateRecord, CandidateSnapshot, NewVote, PollId, PollRecord,
    PollSnapshot, VoteRecord,
};

#[derive(Default)]
struct Tables {
    polls: HashMap<Address, PollRecord>,
    poll_ids: HashMap<PollId, Address>,
    candidates: HashMap<Address, CandidateRecord>,
    votes: BTreeMap<u64, VoteRecord>,
}

impl Tables {
    fn claim_poll_id(&mut self, poll_id: PollId, address: &Address) -> Result<(), StoreError> {
        if let Some(owner) = self.poll_ids.get(&poll_id).filter(|o| *o != address) {
            return Err(StoreError::Duplicate {
                poll_id,
                owner: *owner,
            });
        }
        self.poll_ids.insert(poll_id, *address);
        Ok(())
    }
}

/// An in-memory poll + candidate + vote store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// All tables sit behind one lock, so every method is atomic.
#[derive(Default)]
pub struct NullStore {
    tables: Mutex<Tables>,
    failing: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every write fails with `StoreError::Backend`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store is failing".to_string()));
        }
        Ok(())
    }
}

impl PollStore for NullStore {
    fn get_poll(&self, address: &Address) -> Result<PollRecord, StoreError> {
        self.tables
            .lock()
            .unwrap()
            .polls
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::not_found(RecordKind::Poll, address))
    }

    fn upsert_poll(
        &self,
        address: &Address,
        snapshot: &PollSnapshot,
    ) -> Result<UpsertOutcome, StoreError> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        let poll_id = PollId::new(snapshot.poll_id);
        t.claim_poll_id(poll_id, address)?;
        match t.polls.get(address).cloned() {
            Some(mut record) => {
                if let Some(old) = record.poll_id.filter(|old| *old != poll_id) {
                    t.poll_ids.remove(&old);
                }
                record.apply(snapshot);
                t.polls.insert(*address, record);
                Ok(UpsertOutcome::Updated)
            }
            None => {
                t.polls
                    .insert(*address, PollRecord::from_snapshot(*address, snapshot));
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    fn ensure_poll(
        &self,
        address: &Address,
        poll_id: PollId,
    ) -> Result<EnsureOutcome, StoreError> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        match t.polls.get(address).cloned() {
            Some(record) if record.poll_id == Some(poll_id) => Ok(EnsureOutcome::Existing),
            Some(mut record) => {
                t.claim_poll_id(poll_id, address)?;
                if let Some(old) = record.poll_id {
                    t.poll_ids.remove(&old);
                }
                record.poll_id = Some(poll_id);
                t.polls.insert(*address, record);
                Ok(EnsureOutcome::Corrected)
            }
            None => {
                t.claim_poll_id(poll_id, address)?;
                t.polls
                    .insert(*address, PollRecord::placeholder(*address, poll_id));
                Ok(EnsureOutcome::Placeholder)
            }
        }
    }

    fn poll_by_id(&self, poll_id: PollId) -> Result<Option<PollRecord>, StoreError> {
        let t = self.tables.lock().unwrap();
        Ok(t.poll_ids
            .get(&poll_id)
            .and_then(|address| t.polls.get(address))
            .cloned())
    }

    fn iter_polls(&self) -> Result<Vec<PollRecord>, StoreError> {
        let mut polls: Vec<PollRecord> =
            self.tables.lock().unwrap().polls.values().cloned().collect();
        polls.sort_by_key(|p| p.address);
        Ok(polls)
    }

    fn delete_poll(&self, address: &Address) -> Result<usize, StoreError> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        let record = t
            .polls
            .remove(address)
            .ok_or_else(|| StoreError::not_found(RecordKind::Poll, address))?;
        if let Some(id) = record.poll_id {
            t.poll_ids.remove(&id);
        }
        let before = t.candidates.len();
        t.candidates
            .retain(|_, c| c.poll_address().as_ref() != Some(address));
        Ok(before - t.candidates.len())
    }

    fn poll_count(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().unwrap().polls.len() as u64)
    }
}

impl CandidateStore for NullStore {
    fn get_candidate(&self, address: &Address) -> Result<CandidateRecord, StoreError> {
        self.tables
            .lock()
            .unwrap()
            .candidates
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::not_found(RecordKind::Candidate, address))
    }

    fn upsert_candidate(
        &self,
        address: &Address,
        snapshot: &CandidateSnapshot,
    ) -> Result<UpsertOutcome, StoreError> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        match t.candidates.get_mut(address) {
            Some(record) => {
                record.name.clone_from(&snapshot.name);
                record.votes = snapshot.votes;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                t.candidates
                    .insert(*address, CandidateRecord::unlinked(*address, snapshot));
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    fn tally_vote(
        &self,
        address: &Address,
        name: &str,
        poll_address: &Address,
        poll_id: PollId,
    ) -> Result<TallyOutcome, StoreError> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        match t.candidates.get_mut(address) {
            Some(record) => {
                record.votes = record.votes.saturating_add(1);
                let linked = record.link(*poll_address, poll_id);
                Ok(TallyOutcome::Incremented {
                    votes: record.votes,
                    linked,
                })
            }
            None => {
                t.candidates.insert(
                    *address,
                    CandidateRecord {
                        address: *address,
                        name: name.to_string(),
                        votes: 1,
                        link: CandidateLink::Linked {
                            poll_address: *poll_address,
                            poll_id,
                        },
                    },
                );
                Ok(TallyOutcome::Created)
            }
        }
    }

    fn link_candidate(
        &self,
        address: &Address,
        poll_address: &Address,
        poll_id: PollId,
    ) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        let record = t
            .candidates
            .get_mut(address)
            .ok_or_else(|| StoreError::not_found(RecordKind::Candidate, address))?;
        Ok(record.link(*poll_address, poll_id))
    }

    fn unlinked_candidates(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        let mut out: Vec<CandidateRecord> = self
            .tables
            .lock()
            .unwrap()
            .candidates
            .values()
            .filter(|c| !c.is_linked())
            .cloned()
            .collect();
        out.sort_by_key(|c| c.address);
        Ok(out)
    }

    fn candidates_for_poll(
        &self,
        poll_address: &Address,
    ) -> Result<Vec<CandidateRecord>, StoreError> {
        let mut out: Vec<CandidateRecord> = self
            .tables
            .lock()
            .unwrap()
            .candidates
            .values()
            .filter(|c| c.poll_address().as_ref() == Some(poll_address))
            .cloned()
            .collect();
        out.sort_by_key(|c| c.address);
        Ok(out)
    }

    fn candidate_count(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().unwrap().candidates.len() as u64)
    }
}

impl VoteStore for NullStore {
    fn append_vote(&self, vote: NewVote) -> Result<VoteRecord, StoreError> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        let id = t.votes.keys().next_back().map_or(1, |last| last + 1);
        let record = VoteRecord::from_new(id, vote);
        t.votes.insert(id, record.clone());
        Ok(record)
    }

    fn get_vote(&self, id: u64) -> Result<VoteRecord, StoreError> {
        self.tables
            .lock()
            .unwrap()
            .votes
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(RecordKind::Vote, id))
    }

    fn votes_for_poll(&self, poll_id: PollId) -> Result<Vec<VoteRecord>, StoreError> {
        let mut out: Vec<VoteRecord> = self
            .tables
            .lock()
            .unwrap()
            .votes
            .values()
            .filter(|v| v.poll_id == poll_id)
            .cloned()
            .collect();
        out.sort_by_key(|v| (v.slot, v.id));
        Ok(out)
    }

    fn vote_count(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().unwrap().votes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 32])
    }

    #[test]
    fn tally_then_cascade_delete() {
        let store = NullStore::new();
        store
            .upsert_poll(
                &addr(1),
                &PollSnapshot {
                    poll_id: 7,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(
            store.tally_vote(&addr(2), "Alice", &addr(1), PollId::new(7)).unwrap(),
            TallyOutcome::Created
        );
        assert_eq!(store.candidates_for_poll(&addr(1)).unwrap().len(), 1);
        assert_eq!(store.delete_poll(&addr(1)).unwrap(), 1);
        assert_eq!(store.candidate_count().unwrap(), 0);
    }

    #[test]
    fn failing_store_rejects_writes_only() {
        let store = NullStore::new();
        store.set_failing(true);
        assert!(matches!(
            store.append_vote(NewVote {
                poll_id: PollId::new(1),
                candidate: addr(1),
                voter: "v".into(),
                signature: "s".into(),
                slot: 1,
                block_time: 0,
            }),
            Err(StoreError::Backend(_))
        ));
        assert_eq!(store.vote_count().unwrap(), 0);
    }
}
