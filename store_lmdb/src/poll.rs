//! LMDB implementation of PollStore.
//!
//! `polls_db` maps the 32-byte poll address to a bincode `PollRecord`;
//! `poll_ids_db` maps the big-endian poll id back to the address and enforces
//! uniqueness of non-null ids.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use votesync_store::{EnsureOutcome, PollStore, RecordKind, StoreError, UpsertOutcome};
use votesync_types::{Address, PollId, PollRecord, PollSnapshot};

use crate::keys::address_at;
use crate::LmdbError;

pub struct LmdbPollStore {
    pub(crate) env: Arc<Env>,
    pub(crate) polls_db: Database<Bytes, Bytes>,
    pub(crate) poll_ids_db: Database<Bytes, Bytes>,
    pub(crate) candidates_db: Database<Bytes, Bytes>,
    pub(crate) candidates_by_poll_db: Database<Bytes, Bytes>,
}

impl LmdbPollStore {
    fn read_poll(&self, txn: &heed::RoTxn, address: &Address) -> Result<Option<PollRecord>, LmdbError> {
        match self.polls_db.get(txn, address.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Point `poll_id` at `address`, failing if another address owns it.
    fn claim_poll_id(
        &self,
        wtxn: &mut RwTxn,
        poll_id: PollId,
        address: &Address,
    ) -> Result<(), StoreError> {
        let key = poll_id.to_be_bytes();
        if let Some(owner) = self.poll_ids_db.get(wtxn, &key).map_err(LmdbError::from)? {
            if owner != address.as_bytes() {
                return Err(StoreError::Duplicate {
                    poll_id,
                    owner: address_at(owner, 0)?,
                });
            }
        }
        self.poll_ids_db
            .put(wtxn, &key, address.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn release_poll_id(&self, wtxn: &mut RwTxn, poll_id: Option<PollId>) -> Result<(), LmdbError> {
        if let Some(id) = poll_id {
            self.poll_ids_db.delete(wtxn, &id.to_be_bytes())?;
        }
        Ok(())
    }

    fn write_poll(&self, wtxn: &mut RwTxn, record: &PollRecord) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(record)?;
        self.polls_db.put(wtxn, record.address.as_bytes(), &bytes)?;
        Ok(())
    }
}

impl PollStore for LmdbPollStore {
    fn get_poll(&self, address: &Address) -> Result<PollRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let poll = self
            .read_poll(&rtxn, address)?
            .ok_or_else(|| LmdbError::NotFound(RecordKind::Poll, address.to_string()))?;
        Ok(poll)
    }

    fn upsert_poll(
        &self,
        address: &Address,
        snapshot: &PollSnapshot,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existing = self.read_poll(&wtxn, address)?;
        let poll_id = PollId::new(snapshot.poll_id);
        self.claim_poll_id(&mut wtxn, poll_id, address)?;

        let (record, outcome) = match existing {
            Some(mut record) => {
                if record.poll_id != Some(poll_id) {
                    self.release_poll_id(&mut wtxn, record.poll_id)?;
                }
                record.apply(snapshot);
                (record, UpsertOutcome::Updated)
            }
            None => (
                PollRecord::from_snapshot(*address, snapshot),
                UpsertOutcome::Inserted,
            ),
        };
        self.write_poll(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(outcome)
    }

    fn ensure_poll(
        &self,
        address: &Address,
        poll_id: PollId,
    ) -> Result<EnsureOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let (record, outcome) = match self.read_poll(&wtxn, address)? {
            Some(record) if record.poll_id == Some(poll_id) => return Ok(EnsureOutcome::Existing),
            Some(mut record) => {
                self.claim_poll_id(&mut wtxn, poll_id, address)?;
                self.release_poll_id(&mut wtxn, record.poll_id)?;
                record.poll_id = Some(poll_id);
                (record, EnsureOutcome::Corrected)
            }
            None => {
                self.claim_poll_id(&mut wtxn, poll_id, address)?;
                (
                    PollRecord::placeholder(*address, poll_id),
                    EnsureOutcome::Placeholder,
                )
            }
        };
        self.write_poll(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(outcome)
    }

    fn poll_by_id(&self, poll_id: PollId) -> Result<Option<PollRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(owner) = self
            .poll_ids_db
            .get(&rtxn, &poll_id.to_be_bytes())
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let address = address_at(owner, 0)?;
        Ok(self.read_poll(&rtxn, &address)?)
    }

    fn iter_polls(&self) -> Result<Vec<PollRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut polls = Vec::new();
        for result in self.polls_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_key, val) = result.map_err(LmdbError::from)?;
            polls.push(bincode::deserialize(val).map_err(LmdbError::from)?);
        }
        Ok(polls)
    }

    fn delete_poll(&self, address: &Address) -> Result<usize, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let record = self
            .read_poll(&wtxn, address)?
            .ok_or_else(|| LmdbError::NotFound(RecordKind::Poll, address.to_string()))?;

        let index_keys: Vec<Vec<u8>> = {
            let mut keys = Vec::new();
            let iter = self
                .candidates_by_poll_db
                .prefix_iter(&wtxn, address.as_bytes())
                .map_err(LmdbError::from)?;
            for result in iter {
                let (key, _) = result.map_err(LmdbError::from)?;
                keys.push(key.to_vec());
            }
            keys
        };
        for key in &index_keys {
            let candidate = address_at(key, Address::LEN)?;
            self.candidates_db
                .delete(&mut wtxn, candidate.as_bytes())
                .map_err(LmdbError::from)?;
            self.candidates_by_poll_db
                .delete(&mut wtxn, key)
                .map_err(LmdbError::from)?;
        }

        self.release_poll_id(&mut wtxn, record.poll_id)?;
        self.polls_db
            .delete(&mut wtxn, address.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(index_keys.len())
    }

    fn poll_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.polls_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
