//! # Eligibility Engine
//!
//! Decides whether a faucet request may be paid out and, if so, dispenses
//! and records it.
//!
//! ## Gates
//!
//! Evaluated in order; the first failure ends the request.
//!
//! 1. Address syntax (no node or store access before this passes)
//! 2. Node connectivity
//! 3. Peer resolution by consensus address, with a public key
//! 4. Peer identity derivation
//! 5. Duplicate claim (store record or in-flight reservation)
//! 6. Sync lag against the current chain height
//! 7. Faucet balance
//! 8. Bonded transfer (an unconfirmed broadcast still records the claim)
//! 9. Claim record (a failed write is logged; the payout stands)

use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::ledger::{ClaimLedger, ClaimReservation};
use crate::domain::{
    invariant_synced, sync_lag, Address, Amount, Balance, ClaimRecord, FaucetError, FaucetReceipt,
    NodeError, PeerIdentity, Requester,
};
use crate::ports::inbound::FaucetApi;
use crate::ports::outbound::{FaucetWallet, NodeConnector};

/// Engine settings.
#[derive(Clone, Debug)]
pub struct EligibilityConfig {
    /// Amount bonded per claim.
    pub faucet_amount: Amount,
    /// Expected address prefix.
    pub hrp: String,
    /// Bound on each node round trip and the faucet balance query.
    pub request_timeout: Duration,
}

/// A request that passed gates 1-6.
///
/// Holds the peer's claim reservation; dropping it frees the peer again.
#[derive(Debug)]
pub struct Authorization {
    /// Identity the claim will be recorded under.
    pub peer_identity: String,
    /// Public key of the validator to bond to.
    pub public_key: String,
    /// Normalized validator address.
    pub validator_address: String,
    reservation: ClaimReservation,
}

/// Eligibility Engine.
pub struct EligibilityEngine {
    config: EligibilityConfig,
    connector: Arc<dyn NodeConnector>,
    wallet: Arc<dyn FaucetWallet>,
    ledger: ClaimLedger,
}

impl EligibilityEngine {
    /// Create an engine.
    pub fn new(
        config: EligibilityConfig,
        connector: Arc<dyn NodeConnector>,
        wallet: Arc<dyn FaucetWallet>,
        ledger: ClaimLedger,
    ) -> Self {
        Self {
            config,
            connector,
            wallet,
            ledger,
        }
    }

    /// Engine settings.
    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    /// Claim ledger.
    pub fn ledger(&self) -> &ClaimLedger {
        &self.ledger
    }

    /// Run gates 1-6 for `raw_address`.
    pub async fn evaluate(&self, raw_address: &str) -> Result<Authorization, FaucetError> {
        let address = Address::parse(raw_address.trim(), &self.config.hrp).map_err(|e| {
            debug!("[faucet] rejected address '{}': {}", raw_address, e);
            FaucetError::InvalidAddress
        })?;
        let address = address.as_str();

        let node = self
            .bounded(self.connector.connect())
            .await
            .map_err(|e| {
                warn!("[faucet] cannot connect to node: {}", e);
                FaucetError::NodeUnreachable
            })?;

        let peer = self
            .bounded(node.get_peer_info(address))
            .await
            .map_err(|e| match e {
                NodeError::Connection(reason) => {
                    warn!("[faucet] peer lookup for {} failed: {}", address, reason);
                    FaucetError::NodeUnreachable
                }
                other => {
                    debug!("[faucet] no peer info for {}: {}", address, other);
                    FaucetError::PeerInfoUnavailable
                }
            })?;

        let public_key = peer
            .public_key_for(address)
            .ok_or_else(|| {
                debug!("[faucet] peer advertising {} reports no public key", address);
                FaucetError::PeerInfoUnavailable
            })?
            .to_string();

        let peer_identity = PeerIdentity::from_bytes(&peer.peer_id)
            .map_err(|e| {
                warn!("[faucet] unusable peer id for {}: {}", address, e);
                FaucetError::PeerInfoUnavailable
            })?
            .into_string();

        let reservation = self.ledger.reserve(&peer_identity, address)?;

        let height = self
            .bounded(node.get_blockchain_height())
            .await
            .map_err(|e| {
                warn!("[faucet] cannot read chain height: {}", e);
                FaucetError::NodeUnreachable
            })?;

        if let Err(e) = invariant_synced(height, peer.sync_height) {
            info!(
                peer_id = %peer_identity,
                address = %address,
                lag = sync_lag(height, peer.sync_height),
                "[faucet] peer is not synced"
            );
            return Err(e);
        }

        Ok(Authorization {
            peer_identity,
            public_key,
            validator_address: address.to_string(),
            reservation,
        })
    }

    /// Gates 7-9: check the balance, bond, and record the claim.
    pub async fn dispense(
        &self,
        authorization: Authorization,
        requester: &Requester,
    ) -> Result<FaucetReceipt, FaucetError> {
        let amount = self.config.faucet_amount;

        let balance = self.wallet_balance().await?;
        if balance.available < amount {
            warn!(
                "[faucet] balance {} below payout {}",
                balance.available, amount
            );
            return Err(FaucetError::InsufficientFaucetBalance);
        }

        // No outer timeout: the wallet bounds each of its own round trips.
        let bonded = self
            .wallet
            .bond_transaction(
                &authorization.public_key,
                &authorization.validator_address,
                amount,
            )
            .await;

        let Authorization {
            peer_identity,
            validator_address,
            reservation,
            ..
        } = authorization;

        let record = ClaimRecord {
            peer_identity: peer_identity.clone(),
            validator_address: validator_address.clone(),
            requester_username: requester.username.clone(),
            requester_user_id: requester.user_id.clone(),
            amount,
            timestamp: Utc::now(),
        };

        let tx_hash = match bonded {
            Ok(tx_hash) => tx_hash,
            Err(e) if e.outcome_unknown() => {
                // Funds may have left; record the claim so the peer is not paid twice.
                error!(
                    peer_id = %peer_identity,
                    address = %validator_address,
                    "[faucet] bond outcome unknown, recording claim: {}", e
                );
                if let Err(store_err) = self.ledger.commit(reservation, record) {
                    faucet_telemetry::STORE_WRITE_FAILURES.inc();
                    error!(
                        peer_id = %peer_identity,
                        "[faucet] {}", FaucetError::StoreWriteFailed(store_err.to_string())
                    );
                }
                return Err(FaucetError::TransferFailed);
            }
            Err(e) => {
                error!(address = %validator_address, "[faucet] bond failed: {}", e);
                return Err(FaucetError::TransferFailed);
            }
        };

        faucet_telemetry::record_dispense(amount.as_nanopac());

        let recorded = match self.ledger.commit(reservation, record) {
            Ok(()) => true,
            Err(e) => {
                faucet_telemetry::STORE_WRITE_FAILURES.inc();
                error!(
                    peer_id = %peer_identity,
                    address = %validator_address,
                    tx_hash = %tx_hash,
                    "[faucet] {}", FaucetError::StoreWriteFailed(e.to_string())
                );
                false
            }
        };

        info!(
            peer_id = %peer_identity,
            address = %validator_address,
            user = %requester.username,
            tx_hash = %tx_hash,
            "[faucet] bonded {}", amount
        );

        Ok(FaucetReceipt {
            peer_identity,
            validator_address,
            amount,
            tx_hash,
            recorded,
        })
    }

    async fn wallet_balance(&self) -> Result<Balance, FaucetError> {
        self.bounded(self.wallet.get_balance()).await.map_err(|e| {
            warn!("[faucet] cannot read faucet balance: {}", e);
            FaucetError::NodeUnreachable
        })
    }

    /// Run `fut` under the request timeout. Expiry is reported as a
    /// connection error of the call's own error type.
    async fn bounded<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<TimedOut>,
    {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(E::from(TimedOut(self.config.request_timeout))),
        }
    }
}

/// A round trip exceeded the request timeout.
#[derive(Debug, Clone, Copy)]
pub struct TimedOut(pub Duration);

impl From<TimedOut> for NodeError {
    fn from(t: TimedOut) -> Self {
        NodeError::Connection(format!("timed out after {:?}", t.0))
    }
}

impl From<TimedOut> for crate::domain::WalletError {
    fn from(t: TimedOut) -> Self {
        crate::domain::WalletError::Rpc(format!("timed out after {:?}", t.0))
    }
}

#[async_trait]
impl FaucetApi for EligibilityEngine {
    async fn request_faucet(
        &self,
        address: &str,
        requester: &Requester,
    ) -> Result<FaucetReceipt, FaucetError> {
        let result = match self.evaluate(address).await {
            Ok(authorization) => self.dispense(authorization, requester).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => faucet_telemetry::record_request("dispensed"),
            Err(e) => {
                info!(
                    user = %requester.username,
                    outcome = e.outcome_label(),
                    "[faucet] request for '{}' rejected", address.trim()
                );
                faucet_telemetry::record_request(e.outcome_label());
            }
        }
        result
    }

    async fn faucet_balance(&self) -> Result<Balance, FaucetError> {
        self.wallet_balance().await
    }

    fn faucet_address(&self) -> &str {
        self.wallet.address()
    }
}
