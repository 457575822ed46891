//! # Domain Invariants
//!
//! Business rules that must always hold true.

use super::errors::FaucetError;

/// Maximum blocks a peer may trail the chain tip and still receive the faucet.
pub const MAX_SYNC_LAG: u32 = 1080;

/// Blocks between the chain tip and a peer's height.
///
/// A peer ahead of our node (possible while our node catches up) has lag 0.
pub fn sync_lag(current_height: u32, peer_height: u32) -> u32 {
    current_height.saturating_sub(peer_height)
}

/// Invariant: the requesting peer must be within `MAX_SYNC_LAG` of the tip.
pub fn invariant_synced(current_height: u32, peer_height: u32) -> Result<(), FaucetError> {
    let lag = sync_lag(current_height, peer_height);
    if lag > MAX_SYNC_LAG {
        return Err(FaucetError::NotSynced { lag });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag_at_threshold_is_accepted() {
        assert!(invariant_synced(2080, 1000).is_ok());
    }

    #[test]
    fn test_lag_over_threshold_is_rejected() {
        assert_eq!(
            invariant_synced(3000, 1000),
            Err(FaucetError::NotSynced { lag: 2000 })
        );
        assert_eq!(
            invariant_synced(2081, 1000),
            Err(FaucetError::NotSynced { lag: 1081 })
        );
    }

    #[test]
    fn test_peer_ahead_has_no_lag() {
        assert_eq!(sync_lag(100, 150), 0);
        assert!(invariant_synced(100, 150).is_ok());
    }
}
