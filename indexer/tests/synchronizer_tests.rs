use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use votesync_crypto::{event_discriminator, AccountKind, AddressDeriver};
use votesync_indexer::{Stores, SyncError, SyncMetrics, Synchronizer};
use votesync_nullables::{NullLedger, NullStore};
use votesync_store::{CandidateStore, PollStore, VoteStore};
use votesync_store_lmdb::LmdbEnvironment;
use votesync_types::{Address, PollId};

const PROGRAM: &str = "4Dgb9aQU2aDmYz5FbR1ZxYqNZ1KqSKD9uF8P3oVfRpLs";
const OTHER_PROGRAM: &str = "11111111111111111111111111111111";

fn program() -> Address {
    PROGRAM.parse().unwrap()
}

fn deriver() -> AddressDeriver {
    AddressDeriver::new(program())
}

fn poll_account(poll_id: u64, name: &str, start: u64, end: u64) -> Vec<u8> {
    let mut data = AccountKind::Poll.discriminator().to_vec();
    data.extend(
        borsh::to_vec(&(poll_id, name.to_string(), format!("{name} poll"), start, end, 2u64))
            .unwrap(),
    );
    // Accounts are allocated with headroom past the serialized fields.
    data.extend_from_slice(&[0u8; 24]);
    data
}

fn candidate_account(name: &str, votes: u64) -> Vec<u8> {
    let mut data = AccountKind::Candidate.discriminator().to_vec();
    data.extend(borsh::to_vec(&(name.to_string(), votes)).unwrap());
    data
}

fn vote_data_line(poll_id: u64, candidate: &str, voter: [u8; 32], slot: u64) -> String {
    let mut payload = event_discriminator("VoteEvent").to_vec();
    payload.extend(borsh::to_vec(&(poll_id, candidate.to_string(), voter, slot)).unwrap());
    format!("Program data: {}", STANDARD.encode(payload))
}

fn vote_logs(poll_id: u64, candidate: &str, slot: u64) -> Vec<String> {
    vec![
        format!("Program {PROGRAM} invoke [1]"),
        "Program log: Instruction: Vote".to_string(),
        vote_data_line(poll_id, candidate, [9; 32], slot),
        format!("Program {PROGRAM} consumed 5000 of 200000 compute units"),
        format!("Program {PROGRAM} success"),
    ]
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

struct Harness {
    ledger: Arc<NullLedger>,
    store: Arc<NullStore>,
    sync: Synchronizer<NullLedger>,
}

fn harness(ledger: NullLedger) -> Harness {
    let ledger = Arc::new(ledger);
    let store = Arc::new(NullStore::new());
    let sync = Synchronizer::new(
        ledger.clone(),
        Stores::shared(store.clone()),
        program(),
        16,
        Arc::new(SyncMetrics::new()),
    );
    Harness {
        ledger,
        store,
        sync,
    }
}

#[tokio::test]
async fn backfill_completes_before_subscriptions_attach() {
    let mut h = harness(NullLedger::new());
    h.sync.start().await.unwrap();
    assert_eq!(
        h.ledger.calls(),
        vec![
            "getProgramAccounts",
            "getProgramAccounts",
            "programSubscribe",
            "logsSubscribe"
        ]
    );
    h.sync.stop().await;
}

#[tokio::test]
async fn first_vote_creates_linked_candidate_with_metadata() {
    let ledger = NullLedger::new();
    ledger.add_transaction("sig-1", 100, Some(1_700_000_000));
    let mut h = harness(ledger);
    h.sync.start().await.unwrap();

    assert!(h.ledger.emit_logs("sig-1", vote_logs(7, "Alice", 90)).await);
    let store = h.store.clone();
    eventually(|| store.vote_count().unwrap() == 1).await;

    let d = deriver();
    let alice = d.candidate_address("7", "Alice").unwrap();
    let poll = d.poll_address("7").unwrap();
    let candidate = h.store.get_candidate(&alice).unwrap();
    assert_eq!(candidate.name, "Alice");
    assert_eq!(candidate.votes, 1);
    assert_eq!(candidate.poll_id(), Some(PollId::new(7)));
    assert_eq!(candidate.poll_address(), Some(poll));

    let votes = h.store.votes_for_poll(PollId::new(7)).unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].slot, 100);
    assert_eq!(votes[0].block_time, 1_700_000_000);
    assert_eq!(votes[0].candidate, alice);
    assert_eq!(votes[0].signature, "sig-1");
    assert_eq!(votes[0].voter, Address::new([9; 32]).to_string());

    // The poll only exists as a placeholder until its account is observed.
    let placeholder = h.store.get_poll(&poll).unwrap();
    assert!(placeholder.name.is_empty());
    h.sync.stop().await;
}

#[tokio::test]
async fn vote_increments_backfilled_tally() {
    let d = deriver();
    let alice = d.candidate_address("7", "Alice").unwrap();
    let ledger = NullLedger::new();
    ledger.add_account(d.poll_address("7").unwrap(), poll_account(7, "Lunch", 1000, 2000));
    ledger.add_account(alice, candidate_account("Alice", 3));
    ledger.add_signature_status("sig-2", 250);
    ledger.add_block_time(250, 1_700_000_250);
    let mut h = harness(ledger);

    let report = h.sync.start().await.unwrap();
    assert_eq!(report.linked, 1);

    h.ledger.emit_logs("sig-2", vote_logs(7, "Alice", 1)).await;
    let store = h.store.clone();
    eventually(|| store.get_candidate(&alice).unwrap().votes == 4).await;

    let votes = h.store.votes_for_poll(PollId::new(7)).unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].slot, 250);
    assert_eq!(votes[0].block_time, 1_700_000_250);
    assert_eq!(h.store.get_poll(&d.poll_address("7").unwrap()).unwrap().name, "Lunch");
    h.sync.stop().await;
}

#[tokio::test]
async fn live_candidate_is_linked_to_backfilled_poll() {
    let d = deriver();
    let ledger = NullLedger::new();
    ledger.add_account(d.poll_address("3").unwrap(), poll_account(3, "Colors", 0, 10));
    let mut h = harness(ledger);
    h.sync.start().await.unwrap();

    let red = d.candidate_address("3", "Red").unwrap();
    assert!(h.ledger.emit_account(red, candidate_account("Red", 0)).await);
    let store = h.store.clone();
    eventually(|| {
        store
            .find_candidate(&red)
            .unwrap()
            .is_some_and(|c| c.is_linked())
    })
    .await;
    assert_eq!(
        h.store.get_candidate(&red).unwrap().poll_id(),
        Some(PollId::new(3))
    );
    h.sync.stop().await;
}

#[tokio::test]
async fn backfilled_candidate_is_linked_when_its_poll_arrives_live() {
    let d = deriver();
    let bob = d.candidate_address("4", "Bob").unwrap();
    let ledger = NullLedger::new();
    ledger.add_account(bob, candidate_account("Bob", 2));
    let mut h = harness(ledger);
    let report = h.sync.start().await.unwrap();
    assert_eq!(report.linked, 0);
    assert!(!h.store.get_candidate(&bob).unwrap().is_linked());

    let poll = d.poll_address("4").unwrap();
    assert!(h.ledger.emit_account(poll, poll_account(4, "Desserts", 0, 10)).await);
    let store = h.store.clone();
    eventually(|| store.get_candidate(&bob).unwrap().is_linked()).await;

    let candidate = h.store.get_candidate(&bob).unwrap();
    assert_eq!(candidate.poll_id(), Some(PollId::new(4)));
    assert_eq!(candidate.poll_address(), Some(poll));
    assert_eq!(candidate.votes, 2);
    h.sync.stop().await;
}

#[tokio::test]
async fn repeated_account_observations_are_idempotent() {
    let d = deriver();
    let poll = d.poll_address("5").unwrap();
    let mut h = harness(NullLedger::new());
    h.sync.start().await.unwrap();
    for _ in 0..3 {
        h.ledger
            .emit_account(poll, poll_account(5, "Snacks", 100, 200))
            .await;
    }
    let marker = Address::new([4; 32]);
    h.ledger.emit_account(marker, candidate_account("Marker", 0)).await;
    let store = h.store.clone();
    eventually(|| store.find_candidate(&marker).unwrap().is_some()).await;

    assert_eq!(h.store.poll_count().unwrap(), 1);
    let record = h.store.get_poll(&poll).unwrap();
    assert_eq!(record.name, "Snacks");
    assert_eq!(record.voting_start, 100);
    assert_eq!(record.poll_id, Some(PollId::new(5)));
    h.sync.stop().await;
}

#[tokio::test]
async fn unnamed_candidate_stays_unlinked() {
    let d = deriver();
    let ledger = NullLedger::new();
    ledger.add_account(d.poll_address("1").unwrap(), poll_account(1, "One", 0, 10));
    ledger.add_account(Address::new([8; 32]), candidate_account("", 2));
    let mut h = harness(ledger);

    let report = h.sync.start().await.unwrap();
    assert_eq!(report.candidates, 1);
    assert_eq!(report.linked, 0);
    assert!(!h
        .store
        .get_candidate(&Address::new([8; 32]))
        .unwrap()
        .is_linked());
    h.sync.stop().await;
}

#[tokio::test]
async fn events_from_other_programs_and_failed_frames_are_ignored() {
    let mut h = harness(NullLedger::new());
    h.sync.start().await.unwrap();

    let spoofed = vec![
        format!("Program {PROGRAM} invoke [1]"),
        format!("Program {OTHER_PROGRAM} invoke [2]"),
        vote_data_line(7, "Mallory", [1; 32], 1),
        format!("Program {OTHER_PROGRAM} success"),
        format!("Program {PROGRAM} success"),
    ];
    h.ledger.emit_logs("sig-spoof", spoofed).await;
    let incomplete = vec![
        format!("Program {PROGRAM} invoke [1]"),
        vote_data_line(7, "", [1; 32], 1),
        format!("Program {PROGRAM} success"),
    ];
    h.ledger.emit_logs("sig-empty", incomplete).await;
    h.ledger.emit_logs("sig-ok", vote_logs(8, "Bob", 12)).await;

    let store = h.store.clone();
    eventually(|| store.vote_count().unwrap() == 1).await;
    let votes = h.store.votes_for_poll(PollId::new(8)).unwrap();
    assert_eq!(votes[0].signature, "sig-ok");
    assert!(h.store.votes_for_poll(PollId::new(7)).unwrap().is_empty());
    // Metadata is only looked up for batches that carry vote events.
    assert_eq!(
        h.ledger
            .calls()
            .iter()
            .filter(|m| **m == "getTransaction")
            .count(),
        1
    );
    h.sync.stop().await;
}

#[tokio::test]
async fn store_failure_does_not_end_the_stream() {
    let mut h = harness(NullLedger::new());
    h.sync.start().await.unwrap();

    h.store.set_failing(true);
    h.ledger.emit_logs("sig-a", vote_logs(2, "Ann", 5)).await;
    let metrics = h.sync.metrics().clone();
    eventually(|| metrics.store_failures.get() == 1).await;
    h.store.set_failing(false);
    h.ledger.emit_logs("sig-b", vote_logs(2, "Ann", 6)).await;

    let store = h.store.clone();
    eventually(|| store.vote_count().unwrap() == 1).await;
    assert_eq!(
        h.store.votes_for_poll(PollId::new(2)).unwrap()[0].signature,
        "sig-b"
    );
    h.sync.stop().await;
}

#[tokio::test]
async fn stop_unsubscribes_both_streams() {
    let mut h = harness(NullLedger::new());
    h.sync.start().await.unwrap();
    assert!(h.sync.is_running());
    h.sync.stop().await;
    assert!(!h.sync.is_running());
    assert_eq!(h.ledger.closed_subscriptions(), 2);
}

#[tokio::test]
async fn start_twice_is_rejected() {
    let mut h = harness(NullLedger::new());
    h.sync.start().await.unwrap();
    assert!(matches!(h.sync.start().await, Err(SyncError::AlreadyRunning)));
    h.sync.stop().await;
}

#[tokio::test]
async fn failed_listing_aborts_start_without_subscribing() {
    let ledger = NullLedger::new();
    ledger.fail("getProgramAccounts");
    let mut h = harness(ledger);
    assert!(matches!(h.sync.start().await, Err(SyncError::Ledger(_))));
    assert!(!h.sync.is_running());
    assert!(!h.ledger.calls().contains(&"programSubscribe"));
}

#[tokio::test]
async fn failed_subscription_aborts_start() {
    let ledger = NullLedger::new();
    ledger.fail("logsSubscribe");
    let mut h = harness(ledger);
    assert!(matches!(
        h.sync.start().await,
        Err(SyncError::Subscription(_))
    ));
    assert!(!h.sync.is_running());
    assert_eq!(h.ledger.closed_subscriptions(), 1);
}

#[tokio::test]
async fn lmdb_backed_synchronizer_persists_votes() {
    let dir = tempfile::tempdir().unwrap();
    let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
    let stores = Stores {
        polls: Arc::new(env.poll_store()),
        candidates: Arc::new(env.candidate_store()),
        votes: Arc::new(env.vote_store()),
    };
    let d = deriver();
    let ledger = NullLedger::new();
    ledger.add_account(d.poll_address("7").unwrap(), poll_account(7, "Lunch", 1000, 2000));
    ledger.add_transaction("sig-1", 100, Some(1_700_000_000));
    let ledger = Arc::new(ledger);
    let mut sync = Synchronizer::new(
        ledger.clone(),
        stores.clone(),
        program(),
        4,
        Arc::new(SyncMetrics::new()),
    );
    sync.start().await.unwrap();
    ledger.emit_logs("sig-1", vote_logs(7, "Alice", 90)).await;
    let votes = stores.votes.clone();
    eventually(|| votes.vote_count().unwrap() == 1).await;
    sync.stop().await;

    let alice = d.candidate_address("7", "Alice").unwrap();
    let candidate = stores.candidates.get_candidate(&alice).unwrap();
    assert_eq!(candidate.votes, 1);
    assert!(candidate.is_linked());
    assert_eq!(stores.votes.votes_for_poll(PollId::new(7)).unwrap()[0].slot, 100);
    assert_eq!(stores.polls.get_poll(&d.poll_address("7").unwrap()).unwrap().name, "Lunch");
}
