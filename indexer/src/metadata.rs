//! Transaction metadata resolution.
//!
//! Slot and block time for a signature come from `getTransaction` when the
//! node still has the transaction, else from the signature status plus
//! `getBlockTime`. Lookup failures never propagate: a step that errors counts
//! as a step that found nothing.

use std::sync::Arc;

use tracing::debug;
use votesync_ledger_client::LedgerClient;
use votesync_types::TxMeta;

/// Ledger block times are signed; anything before the epoch reads as 0.
fn clamp_block_time(block_time: Option<i64>) -> u64 {
    block_time.and_then(|t| u64::try_from(t).ok()).unwrap_or(0)
}

pub struct MetadataResolver<L> {
    ledger: Arc<L>,
}

impl<L: LedgerClient> MetadataResolver<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    pub async fn resolve(&self, signature: &str) -> TxMeta {
        match self.ledger.get_transaction(signature).await {
            Ok(Some(tx)) => return TxMeta::new(tx.slot, clamp_block_time(tx.block_time)),
            Ok(None) => debug!(signature, "transaction not found, trying signature status"),
            Err(e) => debug!(signature, error = %e, "getTransaction failed, trying signature status"),
        }

        let slot = match self.ledger.get_signature_status(signature).await {
            Ok(Some(slot)) => slot,
            Ok(None) => {
                debug!(signature, "metadata unavailable");
                return TxMeta::UNAVAILABLE;
            }
            Err(e) => {
                debug!(signature, error = %e, "metadata unavailable");
                return TxMeta::UNAVAILABLE;
            }
        };

        let block_time = match self.ledger.get_block_time(slot).await {
            Ok(t) => clamp_block_time(t),
            Err(e) => {
                debug!(signature, slot, error = %e, "block time unavailable");
                0
            }
        };
        TxMeta::new(slot, block_time)
    }
}

impl<L> Clone for MetadataResolver<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use votesync_nullables::NullLedger;

    fn resolver(ledger: NullLedger) -> (Arc<NullLedger>, MetadataResolver<NullLedger>) {
        let ledger = Arc::new(ledger);
        (ledger.clone(), MetadataResolver::new(ledger))
    }

    #[tokio::test]
    async fn transaction_tier_wins() {
        let ledger = NullLedger::new();
        ledger.add_transaction("sig", 100, Some(1_700_000_000));
        ledger.add_signature_status("sig", 999);
        let (ledger, r) = resolver(ledger);
        assert_eq!(r.resolve("sig").await, TxMeta::new(100, 1_700_000_000));
        assert_eq!(ledger.calls(), vec!["getTransaction"]);
    }

    #[tokio::test]
    async fn transaction_without_block_time_reads_zero() {
        let ledger = NullLedger::new();
        ledger.add_transaction("sig", 100, None);
        let (_, r) = resolver(ledger);
        assert_eq!(r.resolve("sig").await, TxMeta::new(100, 0));
    }

    #[tokio::test]
    async fn falls_back_to_signature_status_and_block_time() {
        let ledger = NullLedger::new();
        ledger.add_signature_status("sig", 250);
        ledger.add_block_time(250, 1_700_000_250);
        let (ledger, r) = resolver(ledger);
        assert_eq!(r.resolve("sig").await, TxMeta::new(250, 1_700_000_250));
        assert_eq!(
            ledger.calls(),
            vec!["getTransaction", "getSignatureStatuses", "getBlockTime"]
        );
    }

    #[tokio::test]
    async fn rpc_errors_count_as_absent() {
        let ledger = NullLedger::new();
        ledger.add_transaction("sig", 100, Some(5));
        ledger.add_signature_status("sig", 250);
        ledger.fail("getTransaction");
        ledger.fail("getBlockTime");
        let (_, r) = resolver(ledger);
        assert_eq!(r.resolve("sig").await, TxMeta::new(250, 0));
    }

    #[tokio::test]
    async fn nothing_found_is_unavailable() {
        let (_, r) = resolver(NullLedger::new());
        let meta = r.resolve("unknown").await;
        assert!(meta.is_unavailable());
    }

    #[test]
    fn negative_block_time_clamps_to_zero() {
        assert_eq!(clamp_block_time(Some(-5)), 0);
        assert_eq!(clamp_block_time(Some(7)), 7);
        assert_eq!(clamp_block_time(None), 0);
    }
}
