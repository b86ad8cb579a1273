//! Startup backfill: snapshot every poll, then every candidate, then link
//! whatever candidates the snapshot left orphaned.

use std::time::Instant;

use tracing::{info, warn, Instrument};
use votesync_crypto::AccountKind;
use votesync_ledger_client::LedgerClient;
use votesync_types::Address;

use crate::tracing_spans::{account_span, backfill_span};
use crate::{Reconciler, ReverseLinker, SyncError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub polls: u64,
    pub candidates: u64,
    /// Accounts skipped after a decode or store error.
    pub failures: u64,
    /// Candidates linked by the repair pass.
    pub linked: u64,
}

/// Run the backfill. A failed listing call aborts it; a bad account is
/// logged and skipped.
pub async fn run_backfill<L: LedgerClient>(
    ledger: &L,
    program_id: &Address,
    reconciler: &Reconciler,
    linker: &ReverseLinker,
) -> Result<BackfillReport, SyncError> {
    async {
        let started = Instant::now();
        let mut report = BackfillReport::default();

        for kind in [AccountKind::Poll, AccountKind::Candidate] {
            let accounts = ledger
                .list_accounts_by_tag(program_id, &kind.discriminator())
                .await?;
            info!(kind = kind.type_name(), count = accounts.len(), "listed accounts");

            for account in &accounts {
                let _span = account_span(&account.address).entered();
                match reconciler.apply_account(account) {
                    Ok(Some(AccountKind::Poll)) => report.polls += 1,
                    Ok(Some(AccountKind::Candidate)) => report.candidates += 1,
                    Ok(None) => {}
                    Err(e) => {
                        warn!(address = %account.address, error = %e, "skipping account");
                        report.failures += 1;
                    }
                }
            }
        }

        report.linked = linker.link_all()?.linked;

        info!(
            polls = report.polls,
            candidates = report.candidates,
            failures = report.failures,
            linked = report.linked,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backfill complete"
        );
        Ok(report)
    }
    .instrument(backfill_span(program_id))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use votesync_crypto::AddressDeriver;
    use votesync_nullables::{NullLedger, NullStore};
    use votesync_store::{CandidateStore, PollStore};
    use votesync_types::PollId;

    use crate::{Stores, SyncMetrics};

    const PROGRAM: &str = "4Dgb9aQU2aDmYz5FbR1ZxYqNZ1KqSKD9uF8P3oVfRpLs";

    fn poll_data(poll_id: u64, name: &str) -> Vec<u8> {
        let mut data = AccountKind::Poll.discriminator().to_vec();
        data.extend_from_slice(&poll_id.to_le_bytes());
        for s in [name, ""] {
            data.extend_from_slice(&(s.len() as u32).to_le_bytes());
            data.extend_from_slice(s.as_bytes());
        }
        for v in [1000u64, 2000, 1] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data
    }

    fn candidate_data(name: &str, votes: u64) -> Vec<u8> {
        let mut data = AccountKind::Candidate.discriminator().to_vec();
        data.extend_from_slice(&(name.len() as u32).to_le_bytes());
        data.extend_from_slice(name.as_bytes());
        data.extend_from_slice(&votes.to_le_bytes());
        data
    }

    fn setup() -> (Arc<NullStore>, AddressDeriver, Reconciler, ReverseLinker) {
        let store = Arc::new(NullStore::new());
        let stores = Stores::shared(store.clone());
        let deriver = AddressDeriver::new(PROGRAM.parse().unwrap());
        let metrics = Arc::new(SyncMetrics::new());
        let linker = ReverseLinker::new(&stores, deriver, metrics.clone());
        let reconciler = Reconciler::new(stores, deriver, metrics);
        (store, deriver, reconciler, linker)
    }

    #[tokio::test]
    async fn backfill_applies_polls_then_candidates_then_links() {
        let (store, deriver, reconciler, linker) = setup();
        let ledger = NullLedger::new();
        let alice = deriver.candidate_address_for(PollId::new(7), "Alice").unwrap();
        let poll = deriver.poll_address_for(PollId::new(7)).unwrap();
        // Candidate registered first to show listing order does not matter.
        ledger.add_account(alice, candidate_data("Alice", 3));
        ledger.add_account(poll, poll_data(7, "Lunch"));
        ledger.add_account(Address::new([9; 32]), vec![0u8; 16]);

        let report = run_backfill(&ledger, deriver.program_id(), &reconciler, &linker)
            .await
            .unwrap();
        assert_eq!(
            report,
            BackfillReport {
                polls: 1,
                candidates: 1,
                failures: 0,
                linked: 1,
            }
        );
        assert_eq!(store.get_poll(&poll).unwrap().name, "Lunch");
        let candidate = store.get_candidate(&alice).unwrap();
        assert_eq!(candidate.votes, 3);
        assert_eq!(candidate.poll_id(), Some(PollId::new(7)));
        assert_eq!(
            ledger.calls(),
            vec!["getProgramAccounts", "getProgramAccounts"]
        );
    }

    #[tokio::test]
    async fn bad_accounts_are_counted_and_skipped() {
        let (store, deriver, reconciler, linker) = setup();
        let ledger = NullLedger::new();
        let mut truncated = AccountKind::Poll.discriminator().to_vec();
        truncated.push(1);
        ledger.add_account(Address::new([1; 32]), truncated);
        ledger.add_account(Address::new([2; 32]), poll_data(3, "Ok"));

        let report = run_backfill(&ledger, deriver.program_id(), &reconciler, &linker)
            .await
            .unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(report.polls, 1);
        assert_eq!(store.poll_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn listing_failure_is_fatal() {
        let (_, deriver, reconciler, linker) = setup();
        let ledger = NullLedger::new();
        ledger.fail("getProgramAccounts");
        let result = run_backfill(&ledger, deriver.program_id(), &reconciler, &linker).await;
        assert!(matches!(result, Err(SyncError::Ledger(_))));
    }
}
