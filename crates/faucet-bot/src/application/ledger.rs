//! # Claim Ledger
//!
//! Wraps the status store with in-flight reservations. A peer identity is
//! either recorded in the store, reserved by a request that is still being
//! processed, or free. Only a free identity can be reserved.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::{ClaimRecord, FaucetError, StoreError};
use crate::ports::outbound::StatusStore;

type Pending = Arc<Mutex<HashMap<String, String>>>;

/// Duplicate-claim gate in front of a `StatusStore`.
#[derive(Clone)]
pub struct ClaimLedger {
    store: Arc<dyn StatusStore>,
    pending: Pending,
}

impl ClaimLedger {
    /// Create a ledger over `store`.
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Reserve `peer_identity` for a claim to `validator_address`.
    ///
    /// Fails with `AlreadyClaimed` if the peer has a record or another
    /// request currently holds a reservation for it. The error carries the
    /// address of the earlier claim.
    pub fn reserve(
        &self,
        peer_identity: &str,
        validator_address: &str,
    ) -> Result<ClaimReservation, FaucetError> {
        // The store read stays under the lock. Read before it, a claim committed
        // and released in between would go unseen. This blocks the calling
        // worker for one point lookup.
        let mut pending = self.pending.lock();

        if let Some(in_flight) = pending.get(peer_identity) {
            debug!("[ledger] peer {} already has a claim in flight", peer_identity);
            return Err(FaucetError::AlreadyClaimed {
                validator_address: in_flight.clone(),
            });
        }

        match self.store.get_data(peer_identity) {
            Ok(Some(record)) => {
                return Err(FaucetError::AlreadyClaimed {
                    validator_address: record.validator_address,
                })
            }
            Ok(None) => {}
            Err(e) => {
                error!("[ledger] claim lookup for peer {} failed: {}", peer_identity, e);
                return Err(FaucetError::StoreUnavailable);
            }
        }

        pending.insert(peer_identity.to_string(), validator_address.to_string());
        Ok(ClaimReservation {
            peer_identity: peer_identity.to_string(),
            pending: Arc::clone(&self.pending),
        })
    }

    /// Persist the claim and release the reservation.
    ///
    /// The reservation is released whether or not the write succeeds.
    pub fn commit(&self, reservation: ClaimReservation, record: ClaimRecord) -> Result<(), StoreError> {
        debug_assert_eq!(reservation.peer_identity, record.peer_identity);
        self.store.set_data(record)
    }

    /// Number of reservations currently held.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Exclusive right to claim for one peer identity. Released on drop.
#[derive(Debug)]
pub struct ClaimReservation {
    peer_identity: String,
    pending: Pending,
}

impl Drop for ClaimReservation {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.peer_identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStatusStore;
    use crate::domain::Amount;
    use chrono::Utc;

    fn ledger() -> ClaimLedger {
        ClaimLedger::new(Arc::new(InMemoryStatusStore::new()))
    }

    fn record(peer: &str, address: &str) -> ClaimRecord {
        ClaimRecord {
            peer_identity: peer.to_string(),
            validator_address: address.to_string(),
            requester_username: "carol".to_string(),
            requester_user_id: "3003".to_string(),
            amount: Amount::from_nanopac(1),
            timestamp: Utc::now(),
        }
    }

    struct BrokenStore;

    impl StatusStore for BrokenStore {
        fn set_data(&self, _record: ClaimRecord) -> Result<(), StoreError> {
            Err(StoreError::Io("disk full".to_string()))
        }

        fn get_data(&self, _peer_identity: &str) -> Result<Option<ClaimRecord>, StoreError> {
            Err(StoreError::Io("disk gone".to_string()))
        }

        fn len(&self) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    #[test]
    fn test_second_reservation_rejected_while_in_flight() {
        let ledger = ledger();
        let _first = ledger.reserve("QmPeer", "tpc1a").unwrap();

        let err = ledger.reserve("QmPeer", "tpc1b").unwrap_err();
        assert_eq!(
            err,
            FaucetError::AlreadyClaimed {
                validator_address: "tpc1a".to_string()
            }
        );
        assert_eq!(ledger.in_flight(), 1);
    }

    #[test]
    fn test_drop_releases_reservation() {
        let ledger = ledger();
        {
            let _reservation = ledger.reserve("QmPeer", "tpc1a").unwrap();
        }
        assert_eq!(ledger.in_flight(), 0);
        assert!(ledger.reserve("QmPeer", "tpc1b").is_ok());
    }

    #[test]
    fn test_commit_blocks_future_claims() {
        let ledger = ledger();
        let reservation = ledger.reserve("QmPeer", "tpc1a").unwrap();
        ledger.commit(reservation, record("QmPeer", "tpc1a")).unwrap();

        assert_eq!(ledger.in_flight(), 0);
        assert_eq!(
            ledger.reserve("QmPeer", "tpc1z").unwrap_err(),
            FaucetError::AlreadyClaimed {
                validator_address: "tpc1a".to_string()
            }
        );
    }

    #[test]
    fn test_distinct_peers_are_independent() {
        let ledger = ledger();
        let _a = ledger.reserve("QmA", "tpc1a").unwrap();
        let _b = ledger.reserve("QmB", "tpc1a").unwrap();
        assert_eq!(ledger.in_flight(), 2);
    }

    #[test]
    fn test_unreadable_store_blocks_reservation() {
        let ledger = ClaimLedger::new(Arc::new(BrokenStore));
        assert_eq!(
            ledger.reserve("QmPeer", "tpc1a").unwrap_err(),
            FaucetError::StoreUnavailable
        );
        assert_eq!(ledger.in_flight(), 0);
    }

    /// Store with a slow lookup, widening the reserve/commit window.
    struct SlowStore(InMemoryStatusStore);

    impl StatusStore for SlowStore {
        fn set_data(&self, record: ClaimRecord) -> Result<(), StoreError> {
            self.0.set_data(record)
        }

        fn get_data(&self, peer_identity: &str) -> Result<Option<ClaimRecord>, StoreError> {
            std::thread::sleep(std::time::Duration::from_millis(20));
            self.0.get_data(peer_identity)
        }

        fn len(&self) -> Result<usize, StoreError> {
            self.0.len()
        }
    }

    #[test]
    fn test_racing_claims_grant_one_reservation() {
        let ledger = ClaimLedger::new(Arc::new(SlowStore(InMemoryStatusStore::new())));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    let address = format!("tpc1{}", i);
                    match ledger.reserve("QmPeer", &address) {
                        Ok(reservation) => {
                            ledger.commit(reservation, record("QmPeer", &address)).unwrap();
                            true
                        }
                        Err(_) => false,
                    }
                })
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|granted| *granted)
            .count();
        assert_eq!(granted, 1);
        assert_eq!(ledger.in_flight(), 0);
    }

    #[test]
    fn test_failed_commit_still_releases() {
        let ledger = ClaimLedger::new(Arc::new(BrokenStore));
        let reservation = ClaimReservation {
            peer_identity: "QmPeer".to_string(),
            pending: Arc::clone(&ledger.pending),
        };
        ledger.pending.lock().insert("QmPeer".to_string(), "tpc1a".to_string());

        assert!(ledger.commit(reservation, record("QmPeer", "tpc1a")).is_err());
        assert_eq!(ledger.in_flight(), 0);
    }
}
