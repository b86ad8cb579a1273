//! Reverse-link repair.
//!
//! A candidate account carries only its name and tally, so the poll it
//! belongs to is recovered by deriving `candidate_address(poll_id, name)` for
//! every known poll and comparing with the candidate's own address.

use std::sync::Arc;

use tracing::{debug, info, warn};
use votesync_crypto::{AddressDeriver, DeriveError};
use votesync_store::{CandidateStore, PollStore};
use votesync_types::{Address, CandidateRecord, PollId};

use crate::{Stores, SyncError, SyncMetrics};

/// Summary of one bulk repair pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub linked: u64,
    pub skipped_unnamed: u64,
    pub unresolved: u64,
}

enum Resolution {
    Linked,
    Unnamed,
    Unresolved,
}

pub struct ReverseLinker {
    polls: Arc<dyn PollStore + Send + Sync>,
    candidates: Arc<dyn CandidateStore + Send + Sync>,
    deriver: AddressDeriver,
    metrics: Arc<SyncMetrics>,
}

impl ReverseLinker {
    pub fn new(stores: &Stores, deriver: AddressDeriver, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            polls: stores.polls.clone(),
            candidates: stores.candidates.clone(),
            deriver,
            metrics,
        }
    }

    /// Try to link one candidate. Returns `true` if this call linked it.
    pub fn link_candidate(&self, address: &Address) -> Result<bool, SyncError> {
        let Some(candidate) = self.candidates.find_candidate(address)? else {
            return Ok(false);
        };
        if candidate.is_linked() {
            return Ok(false);
        }
        let known = self.polls.known_polls()?;
        Ok(matches!(self.resolve(&candidate, &known)?, Resolution::Linked))
    }

    /// Link the unlinked candidates that belong to one newly observed poll.
    /// Returns how many were linked.
    pub fn link_unlinked_for(
        &self,
        poll_id: PollId,
        poll_address: &Address,
    ) -> Result<u64, SyncError> {
        let known = [(poll_id, *poll_address)];
        let mut linked = 0;
        for candidate in self.candidates.unlinked_candidates()? {
            if candidate.name.is_empty() {
                continue;
            }
            if matches!(self.resolve(&candidate, &known)?, Resolution::Linked) {
                linked += 1;
            }
        }
        if linked > 0 {
            info!(poll_id = %poll_id, linked, "linked candidates to observed poll");
        }
        Ok(linked)
    }

    /// Try to link every unlinked candidate against every known poll.
    pub fn link_all(&self) -> Result<RepairReport, SyncError> {
        let known = self.polls.known_polls()?;
        let mut report = RepairReport::default();
        for candidate in self.candidates.unlinked_candidates()? {
            match self.resolve(&candidate, &known)? {
                Resolution::Linked => report.linked += 1,
                Resolution::Unnamed => report.skipped_unnamed += 1,
                Resolution::Unresolved => report.unresolved += 1,
            }
        }
        info!(
            linked = report.linked,
            skipped_unnamed = report.skipped_unnamed,
            unresolved = report.unresolved,
            "reverse-link repair finished"
        );
        Ok(report)
    }

    fn resolve(
        &self,
        candidate: &CandidateRecord,
        known: &[(PollId, Address)],
    ) -> Result<Resolution, SyncError> {
        if candidate.name.is_empty() {
            debug!(address = %candidate.address, "skipping unnamed candidate");
            return Ok(Resolution::Unnamed);
        }
        for (poll_id, poll_address) in known {
            let derived = match self.deriver.candidate_address_for(*poll_id, &candidate.name) {
                Ok(derived) => derived,
                // A name too long to be a seed cannot belong to any poll.
                Err(DeriveError::SeedTooLong { .. }) => return Ok(Resolution::Unresolved),
                Err(e) => {
                    warn!(address = %candidate.address, poll_id = %poll_id, error = %e, "derivation failed");
                    continue;
                }
            };
            if derived != candidate.address {
                continue;
            }
            if self
                .candidates
                .link_candidate(&candidate.address, poll_address, *poll_id)?
            {
                self.metrics.candidates_linked.inc();
                debug!(address = %candidate.address, poll_id = %poll_id, "candidate linked");
            }
            return Ok(Resolution::Linked);
        }
        Ok(Resolution::Unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use votesync_nullables::NullStore;
    use votesync_types::{CandidateSnapshot, PollSnapshot};

    const PROGRAM: &str = "4Dgb9aQU2aDmYz5FbR1ZxYqNZ1KqSKD9uF8P3oVfRpLs";

    fn setup() -> (Arc<NullStore>, AddressDeriver, ReverseLinker) {
        let store = Arc::new(NullStore::new());
        let deriver = AddressDeriver::new(PROGRAM.parse().unwrap());
        let linker = ReverseLinker::new(
            &Stores::shared(store.clone()),
            deriver,
            Arc::new(SyncMetrics::new()),
        );
        (store, deriver, linker)
    }

    fn add_poll(store: &NullStore, deriver: &AddressDeriver, poll_id: u64) -> Address {
        let address = deriver.poll_address_for(PollId::new(poll_id)).unwrap();
        store
            .upsert_poll(
                &address,
                &PollSnapshot {
                    poll_id,
                    name: format!("poll {poll_id}"),
                    ..Default::default()
                },
            )
            .unwrap();
        address
    }

    fn add_candidate(store: &NullStore, address: &Address, name: &str) {
        store
            .upsert_candidate(
                address,
                &CandidateSnapshot {
                    name: name.into(),
                    votes: 0,
                },
            )
            .unwrap();
    }

    #[test]
    fn links_candidate_to_matching_poll() {
        let (store, deriver, linker) = setup();
        add_poll(&store, &deriver, 1);
        let poll = add_poll(&store, &deriver, 7);
        let address = deriver.candidate_address_for(PollId::new(7), "Alice").unwrap();
        add_candidate(&store, &address, "Alice");

        assert!(linker.link_candidate(&address).unwrap());
        let record = store.get_candidate(&address).unwrap();
        assert_eq!(record.poll_id(), Some(PollId::new(7)));
        assert_eq!(record.poll_address(), Some(poll));

        assert!(!linker.link_candidate(&address).unwrap());
    }

    #[test]
    fn candidate_without_matching_poll_stays_unlinked() {
        let (store, deriver, linker) = setup();
        add_poll(&store, &deriver, 1);
        let address = deriver.candidate_address_for(PollId::new(9), "Bob").unwrap();
        add_candidate(&store, &address, "Bob");

        assert!(!linker.link_candidate(&address).unwrap());
        assert!(!store.get_candidate(&address).unwrap().is_linked());
    }

    #[test]
    fn bulk_pass_reports_each_outcome() {
        let (store, deriver, linker) = setup();
        add_poll(&store, &deriver, 7);
        let alice = deriver.candidate_address_for(PollId::new(7), "Alice").unwrap();
        add_candidate(&store, &alice, "Alice");
        add_candidate(&store, &Address::new([5; 32]), "");
        add_candidate(&store, &Address::new([6; 32]), "Stranger");
        add_candidate(&store, &Address::new([7; 32]), &"x".repeat(40));

        let report = linker.link_all().unwrap();
        assert_eq!(
            report,
            RepairReport {
                linked: 1,
                skipped_unnamed: 1,
                unresolved: 2,
            }
        );
        assert_eq!(store.unlinked_candidates().unwrap().len(), 3);
    }

    #[test]
    fn observed_poll_links_waiting_candidates() {
        let (store, deriver, linker) = setup();
        let bob = deriver.candidate_address_for(PollId::new(4), "Bob").unwrap();
        let other = deriver.candidate_address_for(PollId::new(5), "Bob").unwrap();
        add_candidate(&store, &bob, "Bob");
        add_candidate(&store, &other, "Bob");
        add_candidate(&store, &Address::new([5; 32]), "");

        let poll = add_poll(&store, &deriver, 4);
        assert_eq!(linker.link_unlinked_for(PollId::new(4), &poll).unwrap(), 1);
        assert_eq!(store.get_candidate(&bob).unwrap().poll_address(), Some(poll));
        assert!(!store.get_candidate(&other).unwrap().is_linked());
        assert_eq!(linker.link_unlinked_for(PollId::new(4), &poll).unwrap(), 0);
    }

    #[test]
    fn missing_candidate_is_not_an_error() {
        let (_, _, linker) = setup();
        assert!(!linker.link_candidate(&Address::new([1; 32])).unwrap());
    }
}
