//! # Faucet Flow Integration Tests
//!
//! Drive the eligibility engine and the dispatcher through the public API
//! with mock node and wallet adapters.
//!
//! Properties covered:
//!
//! 1. A peer that already claimed is rejected, echoing the recorded address
//! 2. Invalid addresses never reach the node or the store
//! 3. A peer 2000 blocks behind is rejected with the lag in the message
//! 4. An underfunded faucet neither bonds nor records
//! 5. Concurrent requests for one peer dispense at most once
//! 6. A fresh, synced peer gets a transaction hash and a claim record

use std::sync::Arc;
use std::time::Duration;

use faucet_bot::application::{BotContext, Dispatcher, Inbound, Tone};
use faucet_bot::{
    Amount, ClaimLedger, EligibilityConfig, EligibilityEngine, FaucetApi, FaucetError,
    InMemoryStatusStore, MockFaucetWallet, MockNode, MockNodeConnector, PeerInfo, Requester,
    StatusStore,
};

const VALIDATOR: &str = "tpc1pxl333elgnrdtk0kjpjdvky44yu62x0cwupnpjl";
const SECOND_VALIDATOR: &str = "tpc1p424242424242424242424242424242423jr0tr";
const PEER_IDENTITY: &str = "QmNLfbof5rLekrACjeuLk9JmGZD2HDBHCU4z16iYKmx5SE";
const PAYOUT: u64 = 100_000_000_000;

fn peer(height: u32) -> PeerInfo {
    let mut peer_id = vec![0x12, 0x20];
    peer_id.extend(0u8..32);
    PeerInfo {
        peer_id,
        sync_height: height,
        consensus_addresses: vec![VALIDATOR.to_string(), SECOND_VALIDATOR.to_string()],
        consensus_keys: vec!["public1first".to_string(), "public1second".to_string()],
        moniker: "node-under-test".to_string(),
        agent: "pactus".to_string(),
    }
}

struct Harness {
    engine: Arc<EligibilityEngine>,
    connector: MockNodeConnector,
    wallet: MockFaucetWallet,
    store: Arc<InMemoryStatusStore>,
}

impl Harness {
    fn new(node: MockNode, wallet: MockFaucetWallet) -> Self {
        let connector = MockNodeConnector::new(node);
        let store = Arc::new(InMemoryStatusStore::new());
        let engine = Arc::new(EligibilityEngine::new(
            EligibilityConfig {
                faucet_amount: Amount::from_nanopac(PAYOUT),
                hrp: "tpc".to_string(),
                request_timeout: Duration::from_secs(1),
            },
            Arc::new(connector.clone()),
            Arc::new(wallet.clone()),
            ClaimLedger::new(store.clone()),
        ));
        Self {
            engine,
            connector,
            wallet,
            store,
        }
    }

    fn synced() -> Self {
        Self::new(
            MockNode::with_peers(10_000, vec![peer(9_999)]),
            MockFaucetWallet::default(),
        )
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(BotContext {
            connector: Arc::new(self.connector.clone()),
            faucet: self.engine.clone(),
            bot_user_id: "faucet-bot".to_string(),
            hrp: "tpc".to_string(),
            request_timeout: Duration::from_secs(1),
        })
    }
}

#[tokio::test]
async fn test_successful_claim_is_recorded() {
    let h = Harness::synced();

    let receipt = h
        .engine
        .request_faucet(VALIDATOR, &Requester::new("alice", "1001"))
        .await
        .unwrap();

    assert_eq!(receipt.tx_hash.as_str(), h.wallet.tx_hash);
    assert_eq!(receipt.peer_identity, PEER_IDENTITY);
    assert!(receipt.recorded);

    let record = h.store.get_data(PEER_IDENTITY).unwrap().unwrap();
    assert_eq!(record.validator_address, VALIDATOR);
    assert_eq!(record.requester_username, "alice");
    assert_eq!(record.amount, Amount::from_nanopac(PAYOUT));

    let bonds = h.wallet.bonds();
    assert_eq!(bonds.len(), 1);
    assert_eq!(bonds[0].public_key, "public1first");
}

#[tokio::test]
async fn test_repeat_claim_rejected_with_first_address() {
    let h = Harness::synced();
    h.engine
        .request_faucet(VALIDATOR, &Requester::new("alice", "1001"))
        .await
        .unwrap();

    // Different user, different validator address, same node
    let err = h
        .engine
        .request_faucet(SECOND_VALIDATOR, &Requester::new("bob", "2002"))
        .await
        .unwrap_err();

    assert_eq!(
        err.user_message(),
        format!("Sorry. You already received faucet using this address: {}", VALIDATOR)
    );
    assert_eq!(h.wallet.bonds().len(), 1);
}

#[tokio::test]
async fn test_invalid_address_has_no_side_effects() {
    let h = Harness::synced();

    for input in ["", "hello world", "tpc1invalid", "TPC1pxl333elgnrdtk0kjpjdvky44yu62x0cwupnpjl"] {
        let err = h
            .engine
            .request_faucet(input, &Requester::new("eve", "666"))
            .await
            .unwrap_err();
        assert_eq!(err, FaucetError::InvalidAddress, "input {:?}", input);
    }

    assert_eq!(h.connector.connect_count(), 0);
    assert_eq!(h.connector.query_count(), 0);
    assert_eq!(h.wallet.balance_queries(), 0);
    assert!(h.store.is_empty().unwrap());
}

#[tokio::test]
async fn test_lagging_peer_reports_lag() {
    let h = Harness::new(
        MockNode::with_peers(10_000, vec![peer(8_000)]),
        MockFaucetWallet::default(),
    );

    let err = h
        .engine
        .request_faucet(VALIDATOR, &Requester::new("alice", "1001"))
        .await
        .unwrap_err();

    assert_eq!(err, FaucetError::NotSynced { lag: 2000 });
    assert!(err.user_message().contains("2000"));
    assert!(h.store.is_empty().unwrap());
}

#[tokio::test]
async fn test_underfunded_faucet_neither_bonds_nor_records() {
    let h = Harness::new(
        MockNode::with_peers(10_000, vec![peer(10_000)]),
        MockFaucetWallet::with_balance(Amount::from_nanopac(PAYOUT - 1)),
    );

    let err = h
        .engine
        .request_faucet(VALIDATOR, &Requester::new("alice", "1001"))
        .await
        .unwrap_err();

    assert_eq!(err, FaucetError::InsufficientFaucetBalance);
    assert!(h.wallet.bonds().is_empty());
    assert!(h.store.is_empty().unwrap());
}

#[tokio::test]
async fn test_concurrent_claims_for_one_peer() {
    let mut wallet = MockFaucetWallet::default();
    wallet.delay = Some(Duration::from_millis(100));
    let h = Harness::new(MockNode::with_peers(10_000, vec![peer(10_000)]), wallet);

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let engine = h.engine.clone();
            let address = if i % 2 == 0 { VALIDATOR } else { SECOND_VALIDATOR };
            tokio::spawn(async move {
                engine
                    .request_faucet(address, &Requester::new(format!("user{}", i), i.to_string()))
                    .await
            })
        })
        .collect();

    let mut authorized = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            authorized += 1;
        }
    }

    assert_eq!(authorized, 1);
    assert_eq!(h.wallet.bonds().len(), 1);
    assert_eq!(h.store.len().unwrap(), 1);
}

#[tokio::test]
async fn test_dispatcher_end_to_end() {
    let h = Harness::synced();
    let dispatcher = h.dispatcher();

    let message = |content: &str| Inbound::Message {
        author_id: "1001".to_string(),
        author_name: "alice".to_string(),
        author_is_bot: false,
        content: content.to_string(),
    };

    let reply = dispatcher.handle(message(VALIDATOR)).await.unwrap();
    assert_eq!(reply.tone, Tone::Success);
    assert!(reply.body.contains("100.000000 PAC"));

    let reply = dispatcher.handle(message(VALIDATOR)).await.unwrap();
    assert_eq!(reply.tone, Tone::Failure);
    assert!(reply.body.contains(VALIDATOR));

    let reply = dispatcher.handle(message("balance")).await.unwrap();
    assert_eq!(reply.tone, Tone::Info);
}

#[test]
fn test_blocking_request_from_sync_context() {
    let h = Harness::synced();
    let result = tokio_test::block_on(
        h.engine
            .request_faucet("not-an-address", &Requester::new("alice", "1001")),
    );
    assert_eq!(result.unwrap_err(), FaucetError::InvalidAddress);
}

#[cfg(feature = "rocksdb")]
mod durable {
    use super::*;
    use faucet_bot::adapters::store::RocksDbStoreConfig;
    use faucet_bot::RocksDbStatusStore;
    use tempfile::TempDir;

    fn engine_over(store: Arc<dyn StatusStore>) -> EligibilityEngine {
        EligibilityEngine::new(
            EligibilityConfig {
                faucet_amount: Amount::from_nanopac(PAYOUT),
                hrp: "tpc".to_string(),
                request_timeout: Duration::from_secs(1),
            },
            Arc::new(MockNodeConnector::new(MockNode::with_peers(
                10_000,
                vec![peer(10_000)],
            ))),
            Arc::new(MockFaucetWallet::default()),
            ClaimLedger::new(store),
        )
    }

    #[tokio::test]
    async fn test_claims_survive_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("claims").to_string_lossy().to_string();

        {
            let store = RocksDbStatusStore::open(RocksDbStoreConfig::for_testing(path.clone())).unwrap();
            let engine = engine_over(Arc::new(store));
            engine
                .request_faucet(VALIDATOR, &Requester::new("alice", "1001"))
                .await
                .unwrap();
        }

        let store = RocksDbStatusStore::open(RocksDbStoreConfig::for_testing(path)).unwrap();
        let engine = engine_over(Arc::new(store));
        let err = engine
            .request_faucet(SECOND_VALIDATOR, &Requester::new("bob", "2002"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FaucetError::AlreadyClaimed {
                validator_address: VALIDATOR.to_string()
            }
        );
    }
}
