//! In-memory status store.

use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::domain::{ClaimRecord, StoreError};
use crate::ports::outbound::StatusStore;

/// `StatusStore` held in a `HashMap`. Lost on restart.
#[derive(Default)]
pub struct InMemoryStatusStore {
    records: Mutex<HashMap<String, ClaimRecord>>,
}

impl InMemoryStatusStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, ordered by timestamp.
    pub fn claims(&self) -> Vec<ClaimRecord> {
        let mut claims: Vec<ClaimRecord> = self.records.lock().values().cloned().collect();
        claims.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        claims
    }
}

impl StatusStore for InMemoryStatusStore {
    fn set_data(&self, record: ClaimRecord) -> Result<(), StoreError> {
        match self.records.lock().entry(record.peer_identity.clone()) {
            Entry::Occupied(entry) => Err(StoreError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(())
            }
        }
    }

    fn get_data(&self, peer_identity: &str) -> Result<Option<ClaimRecord>, StoreError> {
        Ok(self.records.lock().get(peer_identity).cloned())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Amount;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn record(peer: &str, address: &str, second: u32) -> ClaimRecord {
        ClaimRecord {
            peer_identity: peer.to_string(),
            validator_address: address.to_string(),
            requester_username: "alice".to_string(),
            requester_user_id: "1001".to_string(),
            amount: Amount::from_nanopac(100),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap(),
        }
    }

    #[test]
    fn test_set_then_get() {
        let store = InMemoryStatusStore::new();
        assert!(store.is_empty().unwrap());
        store.set_data(record("QmPeer", "tpc1a", 0)).unwrap();

        let found = store.get_data("QmPeer").unwrap().unwrap();
        assert_eq!(found.validator_address, "tpc1a");
        assert!(store.get_data("QmOther").unwrap().is_none());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_second_insert_rejected() {
        let store = InMemoryStatusStore::new();
        store.set_data(record("QmPeer", "tpc1a", 0)).unwrap();

        let err = store.set_data(record("QmPeer", "tpc1b", 1)).unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists("QmPeer".to_string()));
        // First record is untouched
        assert_eq!(store.get_data("QmPeer").unwrap().unwrap().validator_address, "tpc1a");
    }

    #[test]
    fn test_concurrent_inserts_one_winner() {
        let store = Arc::new(InMemoryStatusStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.set_data(record("QmPeer", &format!("tpc1{}", i), 0)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_claims_sorted_by_time() {
        let store = InMemoryStatusStore::new();
        store.set_data(record("QmB", "tpc1b", 5)).unwrap();
        store.set_data(record("QmA", "tpc1a", 1)).unwrap();
        let peers: Vec<_> = store.claims().into_iter().map(|c| c.peer_identity).collect();
        assert_eq!(peers, vec!["QmA", "QmB"]);
    }
}
