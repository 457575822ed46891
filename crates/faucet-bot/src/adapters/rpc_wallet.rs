//! Faucet Wallet Facade backed by the node's wallet service.
//!
//! A bond is built by the node, signed by the node-side wallet and then
//! broadcast. Keys never leave the wallet service.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::rpc::{lenient_i64, JsonRpcClient, RpcError};
use crate::domain::{Amount, Balance, TxHash, WalletError};
use crate::ports::outbound::FaucetWallet;

const GET_ACCOUNT: &str = "pactus.blockchain.get_account";
const GET_RAW_BOND_TRANSACTION: &str = "pactus.transaction.get_raw_bond_transaction";
const SIGN_RAW_TRANSACTION: &str = "pactus.wallet.sign_raw_transaction";
const BROADCAST_TRANSACTION: &str = "pactus.transaction.broadcast_transaction";

const BOND_MEMO: &str = "faucet";

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: AccountData,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    #[serde(default, deserialize_with = "lenient_i64")]
    balance: i64,
}

#[derive(Debug, Deserialize)]
struct RawTransactionResponse {
    raw_transaction: String,
}

#[derive(Debug, Deserialize)]
struct SignedTransactionResponse {
    signed_raw_transaction: String,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    #[serde(default)]
    id: String,
}

/// Wallet settings needed to sign bonds.
#[derive(Clone, Debug)]
pub struct WalletSettings {
    /// Address the faucet pays from.
    pub faucet_address: String,
    /// Wallet name on the node.
    pub wallet_name: String,
    /// Wallet password; empty for an unencrypted wallet.
    pub password: String,
    /// Fee attached to each bond.
    pub fee: Amount,
}

/// `FaucetWallet` over JSON-RPC.
pub struct RpcFaucetWallet {
    rpc: JsonRpcClient,
    settings: WalletSettings,
}

impl RpcFaucetWallet {
    /// Create a wallet facade talking to `rpc`.
    pub fn new(rpc: JsonRpcClient, settings: WalletSettings) -> Self {
        info!(
            "[wallet] using wallet '{}' at {} for faucet address {}",
            settings.wallet_name,
            rpc.endpoint(),
            settings.faucet_address
        );
        Self { rpc, settings }
    }

    async fn build_bond(
        &self,
        public_key: &str,
        address: &str,
        amount: Amount,
    ) -> Result<String, WalletError> {
        let params = json!({
            "lock_time": 0,
            "sender": self.settings.faucet_address,
            "receiver": address,
            "stake": amount.as_nanopac(),
            "public_key": public_key,
            "fee": self.settings.fee.as_nanopac(),
            "memo": BOND_MEMO,
        });
        let response: RawTransactionResponse = self.rpc.call(GET_RAW_BOND_TRANSACTION, params).await?;
        Ok(response.raw_transaction)
    }

    async fn sign(&self, raw_transaction: String) -> Result<String, WalletError> {
        let params = json!({
            "wallet_name": self.settings.wallet_name,
            "raw_transaction": raw_transaction,
            "password": self.settings.password,
        });
        let response: SignedTransactionResponse = self.rpc.call(SIGN_RAW_TRANSACTION, params).await?;
        Ok(response.signed_raw_transaction)
    }

    /// An error object from the node is a rejection. Any other failure leaves
    /// the transaction possibly submitted.
    async fn broadcast(&self, signed_raw_transaction: String) -> Result<String, WalletError> {
        let params = json!({ "signed_raw_transaction": signed_raw_transaction });
        let response: BroadcastResponse = self
            .rpc
            .call(BROADCAST_TRANSACTION, params)
            .await
            .map_err(|e| match e {
                RpcError::Rpc { .. } => WalletError::from(e),
                other => WalletError::Unconfirmed(other.to_string()),
            })?;
        Ok(response.id)
    }
}

#[async_trait]
impl FaucetWallet for RpcFaucetWallet {
    async fn get_balance(&self) -> Result<Balance, WalletError> {
        let response: AccountResponse = self
            .rpc
            .call(GET_ACCOUNT, json!({ "address": self.settings.faucet_address }))
            .await?;
        let available = Amount::from_signed_nanopac(response.account.balance);
        debug!("[wallet] faucet balance {}", available);
        Ok(Balance { available })
    }

    async fn bond_transaction(
        &self,
        public_key: &str,
        address: &str,
        amount: Amount,
    ) -> Result<TxHash, WalletError> {
        let raw = self.build_bond(public_key, address, amount).await?;
        let signed = self.sign(raw).await?;
        let id = self.broadcast(signed).await?;

        match TxHash::new(id) {
            Some(hash) => {
                info!("[wallet] bonded {} to {} (tx {})", amount, address, hash);
                Ok(hash)
            }
            None => {
                warn!("[wallet] broadcast to {} returned no transaction id", address);
                Err(WalletError::EmptyTransactionHash)
            }
        }
    }

    fn address(&self) -> &str {
        &self.settings.faucet_address
    }
}
