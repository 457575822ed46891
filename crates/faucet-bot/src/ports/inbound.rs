//! # Inbound Ports
//!
//! API trait defining what the faucet can do for the dispatch layer.

use async_trait::async_trait;

use crate::domain::{Balance, FaucetError, FaucetReceipt, Requester};

/// Faucet API - inbound port.
#[async_trait]
pub trait FaucetApi: Send + Sync {
    /// Run the full eligibility check and, if authorized, dispense and record.
    async fn request_faucet(
        &self,
        address: &str,
        requester: &Requester,
    ) -> Result<FaucetReceipt, FaucetError>;

    /// Spendable balance of the faucet wallet.
    async fn faucet_balance(&self) -> Result<Balance, FaucetError>;

    /// Address the faucet pays from.
    fn faucet_address(&self) -> &str;
}
