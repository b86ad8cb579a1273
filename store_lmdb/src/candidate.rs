//! LMDB implementation of CandidateStore.
//!
//! `candidates_db` maps the candidate address to a bincode `CandidateRecord`.
//! `candidates_by_poll_db` holds one empty-valued key
//! `poll_address ++ candidate_address` per linked candidate.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};

use votesync_store::{CandidateStore, RecordKind, StoreError, TallyOutcome, UpsertOutcome};
use votesync_types::{Address, CandidateLink, CandidateRecord, CandidateSnapshot, PollId};

use crate::keys::{address_at, candidate_by_poll_key};
use crate::LmdbError;

pub struct LmdbCandidateStore {
    pub(crate) env: Arc<Env>,
    pub(crate) candidates_db: Database<Bytes, Bytes>,
    pub(crate) candidates_by_poll_db: Database<Bytes, Bytes>,
}

impl LmdbCandidateStore {
    fn read(&self, txn: &RoTxn, address: &Address) -> Result<Option<CandidateRecord>, LmdbError> {
        match self.candidates_db.get(txn, address.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Write the record and, if it is linked, its poll index entry.
    fn write(&self, wtxn: &mut RwTxn, record: &CandidateRecord) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(record)?;
        self.candidates_db.put(wtxn, record.address.as_bytes(), &bytes)?;
        if let Some(poll) = record.poll_address() {
            let key = candidate_by_poll_key(&poll, &record.address);
            self.candidates_by_poll_db.put(wtxn, &key, &[])?;
        }
        Ok(())
    }
}

impl CandidateStore for LmdbCandidateStore {
    fn get_candidate(&self, address: &Address) -> Result<CandidateRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let candidate = self
            .read(&rtxn, address)?
            .ok_or_else(|| LmdbError::NotFound(RecordKind::Candidate, address.to_string()))?;
        Ok(candidate)
    }

    fn upsert_candidate(
        &self,
        address: &Address,
        snapshot: &CandidateSnapshot,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let (record, outcome) = match self.read(&wtxn, address)? {
            Some(mut record) => {
                record.name.clone_from(&snapshot.name);
                record.votes = snapshot.votes;
                (record, UpsertOutcome::Updated)
            }
            None => (
                CandidateRecord::unlinked(*address, snapshot),
                UpsertOutcome::Inserted,
            ),
        };
        self.write(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(outcome)
    }

    fn tally_vote(
        &self,
        address: &Address,
        name: &str,
        poll_address: &Address,
        poll_id: PollId,
    ) -> Result<TallyOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let (record, outcome) = match self.read(&wtxn, address)? {
            Some(mut record) => {
                record.votes = record.votes.saturating_add(1);
                let linked = record.link(*poll_address, poll_id);
                let votes = record.votes;
                (record, TallyOutcome::Incremented { votes, linked })
            }
            None => (
                CandidateRecord {
                    address: *address,
                    name: name.to_string(),
                    votes: 1,
                    link: CandidateLink::Linked {
                        poll_address: *poll_address,
                        poll_id,
                    },
                },
                TallyOutcome::Created,
            ),
        };
        self.write(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(outcome)
    }

    fn link_candidate(
        &self,
        address: &Address,
        poll_address: &Address,
        poll_id: PollId,
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self
            .read(&wtxn, address)?
            .ok_or_else(|| LmdbError::NotFound(RecordKind::Candidate, address.to_string()))?;
        if !record.link(*poll_address, poll_id) {
            return Ok(false);
        }
        self.write(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn unlinked_candidates(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for result in self.candidates_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let record: CandidateRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            if !record.is_linked() {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn candidates_for_poll(
        &self,
        poll_address: &Address,
    ) -> Result<Vec<CandidateRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .candidates_by_poll_db
            .prefix_iter(&rtxn, poll_address.as_bytes())
            .map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            let candidate = address_at(key, Address::LEN)?;
            let record = self.read(&rtxn, &candidate)?.ok_or_else(|| {
                LmdbError::Corruption(format!("index points at missing candidate {candidate}"))
            })?;
            out.push(record);
        }
        Ok(out)
    }

    fn candidate_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.candidates_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
