//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::info;

use crate::{LmdbCandidateStore, LmdbError, LmdbPollStore, LmdbVoteStore};

/// Number of named databases the mirror creates.
pub const DATABASE_COUNT: u32 = 6;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    polls_db: Database<Bytes, Bytes>,
    poll_ids_db: Database<Bytes, Bytes>,
    candidates_db: Database<Bytes, Bytes>,
    candidates_by_poll_db: Database<Bytes, Bytes>,
    votes_db: Database<Bytes, Bytes>,
    votes_by_poll_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process and the data
        // directory is not shared with other writers.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(DATABASE_COUNT))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let polls_db = env.create_database(&mut wtxn, Some("polls"))?;
        let poll_ids_db = env.create_database(&mut wtxn, Some("poll_ids"))?;
        let candidates_db = env.create_database(&mut wtxn, Some("candidates"))?;
        let candidates_by_poll_db = env.create_database(&mut wtxn, Some("candidates_by_poll"))?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let votes_by_poll_db = env.create_database(&mut wtxn, Some("votes_by_poll"))?;
        wtxn.commit()?;

        info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            polls_db,
            poll_ids_db,
            candidates_db,
            candidates_by_poll_db,
            votes_db,
            votes_by_poll_db,
        })
    }

    pub fn poll_store(&self) -> LmdbPollStore {
        LmdbPollStore {
            env: self.env.clone(),
            polls_db: self.polls_db,
            poll_ids_db: self.poll_ids_db,
            candidates_db: self.candidates_db,
            candidates_by_poll_db: self.candidates_by_poll_db,
        }
    }

    pub fn candidate_store(&self) -> LmdbCandidateStore {
        LmdbCandidateStore {
            env: self.env.clone(),
            candidates_db: self.candidates_db,
            candidates_by_poll_db: self.candidates_by_poll_db,
        }
    }

    pub fn vote_store(&self) -> LmdbVoteStore {
        LmdbVoteStore {
            env: self.env.clone(),
            votes_db: self.votes_db,
            votes_by_poll_db: self.votes_by_poll_db,
        }
    }

    /// Flush the memory map to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}
