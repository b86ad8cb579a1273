//! Reconciliation of decoded observations into the store.
//!
//! Poll and candidate observations are upserts keyed by account address.
//! A vote event increments (or creates) the candidate it names, appends one
//! vote row, and makes sure the poll row it belongs to exists.

use std::sync::Arc;

use tracing::{debug, info};
use votesync_codec::{decode_account, DecodedAccount};
use votesync_crypto::{AccountKind, AddressDeriver, DeriveError};
use votesync_ledger_client::KeyedAccount;
use votesync_store::{
    CandidateStore, EnsureOutcome, PollStore, TallyOutcome, UpsertOutcome, VoteStore,
};
use votesync_types::{
    Address, CandidateSnapshot, NewVote, PollId, PollSnapshot, TxMeta, VoteEvent, VoteRecord,
};

use crate::{SyncError, SyncMetrics};

/// Shared handles to the three stores.
#[derive(Clone)]
pub struct Stores {
    pub polls: Arc<dyn PollStore + Send + Sync>,
    pub candidates: Arc<dyn CandidateStore + Send + Sync>,
    pub votes: Arc<dyn VoteStore + Send + Sync>,
}

impl Stores {
    /// Use one backend for all three stores.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: PollStore + CandidateStore + VoteStore + Send + Sync + 'static,
    {
        Self {
            polls: store.clone(),
            candidates: store.clone(),
            votes: store,
        }
    }
}

/// What one vote event did to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteOutcome {
    pub candidate: Address,
    pub poll: Address,
    pub tally: TallyOutcome,
    pub vote: VoteRecord,
    pub poll_row: EnsureOutcome,
}

pub struct Reconciler {
    stores: Stores,
    deriver: AddressDeriver,
    metrics: Arc<SyncMetrics>,
}

impl Reconciler {
    pub fn new(stores: Stores, deriver: AddressDeriver, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            stores,
            deriver,
            metrics,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    /// Classify, decode and upsert one account. Returns `None` for accounts
    /// of a kind this mirror does not track.
    pub fn apply_account(&self, account: &KeyedAccount) -> Result<Option<AccountKind>, SyncError> {
        let Some(kind) = AccountKind::classify(&account.data) else {
            debug!(address = %account.address, "ignoring account of unknown kind");
            return Ok(None);
        };
        let decoded = decode_account(kind, &account.data).inspect_err(|_| {
            self.metrics.decode_failures.inc();
        })?;
        match decoded {
            DecodedAccount::Poll(snapshot) => {
                self.apply_poll(&account.address, &snapshot)?;
            }
            DecodedAccount::Candidate(snapshot) => {
                self.apply_candidate(&account.address, &snapshot)?;
            }
        }
        Ok(Some(kind))
    }

    pub fn apply_poll(
        &self,
        address: &Address,
        snapshot: &PollSnapshot,
    ) -> Result<UpsertOutcome, SyncError> {
        let outcome = self
            .stores
            .polls
            .upsert_poll(address, snapshot)
            .inspect_err(|_| self.metrics.store_failures.inc())?;
        self.metrics.accounts_applied.inc();
        debug!(address = %address, poll_id = snapshot.poll_id, ?outcome, "poll reconciled");
        Ok(outcome)
    }

    pub fn apply_candidate(
        &self,
        address: &Address,
        snapshot: &CandidateSnapshot,
    ) -> Result<UpsertOutcome, SyncError> {
        let outcome = self
            .stores
            .candidates
            .upsert_candidate(address, snapshot)
            .inspect_err(|_| self.metrics.store_failures.inc())?;
        self.metrics.accounts_applied.inc();
        debug!(address = %address, name = %snapshot.name, ?outcome, "candidate reconciled");
        Ok(outcome)
    }

    /// Apply one validated vote event observed in transaction `signature`.
    pub fn apply_vote(
        &self,
        event: &VoteEvent,
        meta: TxMeta,
        signature: &str,
    ) -> Result<VoteOutcome, SyncError> {
        let poll_id: PollId = event
            .poll_id
            .parse()
            .map_err(|_| DeriveError::InvalidSeed(event.poll_id.clone()))?;
        let candidate = self.deriver.candidate_address_for(poll_id, &event.candidate)?;
        let poll = self.deriver.poll_address_for(poll_id)?;

        let tally = self
            .stores
            .candidates
            .tally_vote(&candidate, &event.candidate, &poll, poll_id)
            .inspect_err(|_| self.metrics.store_failures.inc())?;
        if matches!(
            tally,
            TallyOutcome::Created | TallyOutcome::Incremented { linked: true, .. }
        ) {
            self.metrics.candidates_linked.inc();
        }

        // Fall back to the slot the program recorded when the ledger had no
        // metadata for the transaction.
        let slot = if meta.slot == 0 {
            event.slot.parse().unwrap_or(0)
        } else {
            meta.slot
        };
        let vote = self
            .stores
            .votes
            .append_vote(NewVote {
                poll_id,
                candidate,
                voter: event.voter.clone(),
                signature: signature.to_string(),
                slot,
                block_time: meta.block_time,
            })
            .inspect_err(|_| self.metrics.store_failures.inc())?;

        let poll_row = self
            .stores
            .polls
            .ensure_poll(&poll, poll_id)
            .inspect_err(|_| self.metrics.store_failures.inc())?;
        if poll_row == EnsureOutcome::Placeholder {
            info!(poll = %poll, poll_id = %poll_id, "inserted placeholder poll");
        }

        self.metrics.vote_events_applied.inc();
        Ok(VoteOutcome {
            candidate,
            poll,
            tally,
            vote,
            poll_row,
        })
    }
}
