// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

mod node;

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use eth_wallet_sim::{
    BatchQueue, Clock, Enqueued, Error, ErrorKind, Ether, Simulator, Store,
    TxHash, BATCH_THRESHOLD,
};

use node::{MockNode, ETH};

/// Moves one minute forward every time it is read
struct SteppingClock(Mutex<DateTime<Utc>>);

impl SteppingClock {
    fn new() -> Self {
        Self(Mutex::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.0.lock().unwrap();
        let current = *now;
        *now = current + Duration::minutes(1);
        current
    }
}

fn no_status(_: &str) {}

async fn simulator(node: MockNode) -> Simulator<MockNode, SteppingClock> {
    let store = Store::open_in_memory().await.unwrap();
    let queue = BatchQueue::with_clock(SteppingClock::new());
    Simulator::with_queue(node, store, queue)
}

/// A simulator with a rich node account and the named accounts created
async fn with_accounts(names: &[&str]) -> Simulator<MockNode, SteppingClock> {
    let sim = simulator(MockNode::new(&[1_000])).await;
    for name in names {
        sim.create_account(name, no_status).await.unwrap();
    }
    sim
}

async fn balance(sim: &Simulator<MockNode, SteppingClock>, name: &str) -> f64 {
    sim.store()
        .account(name)
        .await
        .unwrap()
        .expect("account exists")
        .balance
        .as_f64()
}

fn tx_hash(outcome: &Enqueued) -> TxHash {
    match outcome {
        Enqueued::Queued { tx_hash, .. } => *tx_hash,
        Enqueued::Committed { tx_hash, .. } => *tx_hash,
    }
}

#[tokio::test]
async fn create_account_is_funded() {
    let sim = simulator(MockNode::new(&[1_000])).await;
    let funder = sim.chain().managed(0).await;

    let alice = sim.create_account("alice", no_status).await.unwrap();
    assert_eq!(alice.balance, 50.0);
    assert_eq!(balance(&sim, "alice").await, 50.0);
    assert_eq!(sim.chain().balance_of(&alice.address).await, 50 * ETH);
    assert!(sim.chain().balance_of(&funder).await < 950 * ETH);

    // the stored key controls the stored address
    let stored = sim.store().account("alice").await.unwrap().unwrap();
    assert_eq!(stored.key_pair().unwrap().address(), alice.address);
}

#[tokio::test]
async fn funder_needs_more_than_the_funding_amount() {
    // exactly 50 ETH is not enough, the second account is used instead
    let sim = simulator(MockNode::new(&[50, 200])).await;
    let poor = sim.chain().managed(0).await;
    let rich = sim.chain().managed(1).await;

    sim.create_account("alice", no_status).await.unwrap();
    assert_eq!(sim.chain().balance_of(&poor).await, 50 * ETH);
    assert!(sim.chain().balance_of(&rich).await < 150 * ETH);

    let sim = simulator(MockNode::new(&[50, 10])).await;
    let err = sim.create_account("alice", no_status).await.unwrap_err();
    assert!(matches!(err, Error::NoFunder));
    assert_eq!(sim.store().count_accounts().await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_account_is_rejected_early() {
    let sim = with_accounts(&["alice"]).await;
    let calls = sim.chain().calls();

    let err = sim.create_account("alice", no_status).await.unwrap_err();
    assert!(matches!(err, Error::AccountExists(ref name) if name == "alice"));
    assert_eq!(err.kind(), ErrorKind::Validation);

    // the address is a valid identifier too
    let address = sim.store().account("alice").await.unwrap().unwrap().address;
    let err = sim
        .create_account(&address.to_string(), no_status)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AccountExists(_)));

    assert_eq!(sim.chain().calls(), calls);
    assert_eq!(sim.store().count_accounts().await.unwrap(), 1);
}

#[tokio::test]
async fn hex_like_name_is_a_duplicate() {
    let name = format!("0x{}", "ab".repeat(20));
    let sim = with_accounts(&[name.as_str()]).await;
    let calls = sim.chain().calls();

    let err = sim.create_account(&name, no_status).await.unwrap_err();
    assert!(matches!(err, Error::AccountExists(ref n) if *n == name));

    // nothing was funded for the rejected account
    assert_eq!(sim.chain().calls(), calls);
    assert_eq!(sim.store().count_accounts().await.unwrap(), 1);
}

#[tokio::test]
async fn transfers_below_threshold_are_not_recorded() {
    let mut sim = with_accounts(&["a", "b"]).await;

    for i in 1..BATCH_THRESHOLD {
        let outcome = sim.send("a", "b", Ether::new(1.0)).await.unwrap();
        assert!(matches!(
            outcome,
            Enqueued::Queued { pending, .. } if pending == i
        ));
    }

    assert_eq!(sim.pending(), BATCH_THRESHOLD - 1);
    assert!(sim.transactions().await.unwrap().is_empty());
    assert_eq!(balance(&sim, "a").await, 50.0);
    assert_eq!(balance(&sim, "b").await, 50.0);
    assert_eq!(sim.chain().mines(), 0);
    // submitted right away, waiting in the node's pool
    assert_eq!(sim.chain().pool_size().await, BATCH_THRESHOLD - 1);
}

#[tokio::test]
async fn fifth_transfer_commits_the_batch() {
    let mut sim = with_accounts(&["A", "B", "C"]).await;

    let transfers = [
        ("A", "B", 1.0),
        ("B", "C", 2.0),
        ("C", "A", 0.5),
        ("A", "B", 1.0),
        ("B", "C", 0.5),
    ];
    let mut outcomes = vec![];
    for (from, to, amount) in transfers {
        outcomes.push(sim.send(from, to, Ether::new(amount)).await.unwrap());
    }

    assert!(matches!(
        outcomes[4],
        Enqueued::Committed { count: 5, .. }
    ));
    assert_eq!(sim.chain().mines(), 1);
    assert_eq!(sim.pending(), 0);

    assert_eq!(balance(&sim, "A").await, 48.5);
    assert_eq!(balance(&sim, "B").await, 49.5);
    assert_eq!(balance(&sim, "C").await, 52.0);

    let records = sim.transactions().await.unwrap();
    assert_eq!(records.len(), 5);

    let head = sim.blocks().await.unwrap().len() as u64 - 1;
    assert!(records.iter().all(|r| r.block_number == head));
    assert!(records.iter().all(|r| r.gas_used == 21_000));
    assert!(records.iter().all(|r| r.sender_known && r.receiver_known));

    // same timestamp, so the most recently inserted comes first
    let hashes: Vec<String> =
        records.iter().map(|r| r.tx_hash.clone()).collect();
    let expected: Vec<String> =
        outcomes.iter().rev().map(|o| tx_hash(o).to_string()).collect();
    assert_eq!(hashes, expected);
    assert_eq!(records[0].sender, "B");
    assert_eq!(records[0].receiver, "C");
    assert_eq!(records[0].value, 0.5);
}

#[tokio::test]
async fn search_returns_newest_first() {
    let mut sim = with_accounts(&["alice", "bob", "carol"]).await;

    // two batches, stamped one minute apart
    for _ in 0..BATCH_THRESHOLD {
        sim.send("alice", "bob", Ether::new(1.0)).await.unwrap();
    }
    for _ in 0..BATCH_THRESHOLD - 1 {
        sim.send("bob", "carol", Ether::new(1.0)).await.unwrap();
    }
    let last = sim.send("carol", "alice", Ether::new(3.0)).await.unwrap();

    let found = sim.search("alice").await.unwrap();
    assert_eq!(found.len(), BATCH_THRESHOLD + 1);
    assert_eq!(found[0].tx_hash, tx_hash(&last).to_string());
    assert!(found
        .windows(2)
        .all(|pair| pair[0].timestamp >= pair[1].timestamp));
    assert!(found
        .iter()
        .all(|t| t.sender == "alice" || t.receiver == "alice"));

    assert!(sim.search("dave").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_parties_are_rejected() {
    let mut sim = with_accounts(&["alice"]).await;
    let calls = sim.chain().calls();

    let err = sim.send("alice", "bob", Ether::new(1.0)).await.unwrap_err();
    assert!(matches!(err, Error::SenderOrReceiverNotFound));
    let err = sim.send("bob", "alice", Ether::new(1.0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = sim.send("alice", "alice", Ether::new(-2.0)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidAmount(_)));

    assert_eq!(sim.chain().calls(), calls);
    assert_eq!(sim.pending(), 0);
}

#[tokio::test]
async fn failed_commit_keeps_the_batch() {
    let mut sim = with_accounts(&["a", "b"]).await;

    sim.chain().fail_mining(true).await;
    for _ in 0..BATCH_THRESHOLD - 1 {
        sim.send("a", "b", Ether::new(1.0)).await.unwrap();
    }
    let err = sim.send("a", "b", Ether::new(1.0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::External);
    assert_eq!(sim.pending(), BATCH_THRESHOLD);
    assert!(sim.transactions().await.unwrap().is_empty());

    // the next transfer retries with everything still pending
    sim.chain().fail_mining(false).await;
    let outcome = sim.send("b", "a", Ether::new(2.0)).await.unwrap();
    assert!(matches!(
        outcome,
        Enqueued::Committed { count, .. } if count == BATCH_THRESHOLD + 1
    ));
    assert_eq!(sim.transactions().await.unwrap().len(), BATCH_THRESHOLD + 1);
    assert_eq!(balance(&sim, "a").await, 50.0 - 5.0 + 2.0);
    assert_eq!(balance(&sim, "b").await, 50.0 + 5.0 - 2.0);
}

#[tokio::test]
async fn deleting_accounts() {
    let mut sim = with_accounts(&["alice", "bob"]).await;

    let err = sim.delete_account("carol").await.unwrap_err();
    assert!(matches!(err, Error::AccountNotFound(_)));
    assert_eq!(sim.store().count_accounts().await.unwrap(), 2);

    for _ in 0..BATCH_THRESHOLD {
        sim.send("alice", "bob", Ether::new(1.0)).await.unwrap();
    }
    sim.delete_account("bob").await.unwrap();
    assert_eq!(sim.store().count_accounts().await.unwrap(), 1);

    // history survives, the deleted party is no longer known
    let records = sim.transactions().await.unwrap();
    assert_eq!(records.len(), BATCH_THRESHOLD);
    assert!(records
        .iter()
        .all(|r| r.receiver == "bob" && !r.receiver_known && r.sender_known));
}

#[tokio::test]
async fn blocks_from_genesis_to_head() {
    let sim = with_accounts(&["alice", "bob"]).await;

    let blocks = sim.blocks().await.unwrap();
    // genesis plus one block per funding transaction
    assert_eq!(blocks.len(), 3);
    for (i, block) in blocks.iter().enumerate() {
        assert_eq!(block.number, i as u64);
    }
    assert_eq!(blocks[0].transaction_count, 0);
    assert_eq!(blocks[1].transaction_count, 1);
    assert_eq!(blocks[2].parent_hash, blocks[1].hash);
}
