//! LMDB implementation of VoteStore.
//!
//! `votes_db` maps the big-endian vote id to a bincode `VoteRecord`. Ids are
//! one more than the last key in `votes_db`, starting at 1.
//! `votes_by_poll_db` holds `poll_id ++ slot ++ id` keys so a prefix scan
//! over one poll yields its votes slot ascending.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use votesync_store::{RecordKind, StoreError, VoteStore};
use votesync_types::{NewVote, PollId, VoteRecord};

use crate::keys::{be_u64, vote_by_poll_key};
use crate::LmdbError;

pub struct LmdbVoteStore {
    pub(crate) env: Arc<Env>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) votes_by_poll_db: Database<Bytes, Bytes>,
}

impl LmdbVoteStore {
    fn read(&self, txn: &RoTxn, id: u64) -> Result<Option<VoteRecord>, LmdbError> {
        match self.votes_db.get(txn, &id.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }
}

impl VoteStore for LmdbVoteStore {
    fn append_vote(&self, vote: NewVote) -> Result<VoteRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let next_id = match self.votes_db.last(&wtxn).map_err(LmdbError::from)? {
            Some((key, _)) => be_u64(key)? + 1,
            None => 1,
        };
        let record = VoteRecord::from_new(next_id, vote);
        let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.votes_db
            .put(&mut wtxn, &next_id.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        let index = vote_by_poll_key(record.poll_id, record.slot, record.id);
        self.votes_by_poll_db
            .put(&mut wtxn, &index, &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn get_vote(&self, id: u64) -> Result<VoteRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let vote = self
            .read(&rtxn, id)?
            .ok_or_else(|| LmdbError::NotFound(RecordKind::Vote, id.to_string()))?;
        Ok(vote)
    }

    fn votes_for_poll(&self, poll_id: PollId) -> Result<Vec<VoteRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = poll_id.to_be_bytes();
        let iter = self
            .votes_by_poll_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            let id = be_u64(key.get(16..).unwrap_or_default())?;
            let vote = self
                .read(&rtxn, id)?
                .ok_or_else(|| LmdbError::Corruption(format!("index points at missing vote {id}")))?;
            out.push(vote);
        }
        Ok(out)
    }

    fn vote_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.votes_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
