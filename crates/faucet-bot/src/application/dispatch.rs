//! # Dispatch Layer
//!
//! Maps inbound chat traffic to faucet and node operations and renders every
//! outcome into a single `Reply`.
//!
//! Plain messages: `help`, `network`, `address` and `balance` are keywords
//! (exact match after trimming); any other non-empty text is treated as a
//! faucet request for that address. `/balance` with an `address` option
//! reports that account instead of the faucet.

use chrono::DateTime;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{
    Address, Amount, Balance, BlockchainInfo, FaucetError, FaucetReceipt, NetworkInfo, NodeError, NodeInfo,
    Requester, ValidatorInfo,
};
use crate::ports::inbound::FaucetApi;
use crate::ports::outbound::NodeConnector;

const EXAMPLE_ADDRESS: &str = "tpc1pxl333elgnrdtk0kjpjdvky44yu62x0cwupnpjl";
const NETWORK_INTRO: &str = "Pactus is truly decentralised proof of stake blockchain.";

/// Inbound chat event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A plain channel message.
    Message {
        /// Author's user id.
        author_id: String,
        /// Author's display name.
        author_name: String,
        /// Whether the transport flagged the author as a bot.
        author_is_bot: bool,
        /// Message text.
        content: String,
    },
    /// A slash command invocation.
    SlashCommand {
        /// Invoking user id.
        user_id: String,
        /// Invoking user's display name.
        username: String,
        /// Command name without the slash.
        name: String,
        /// Named options, e.g. `address`.
        options: Vec<(String, String)>,
    },
}

/// Visual tone of a reply; the transport maps it to an embed colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    /// Operation succeeded.
    Success,
    /// Request rejected or failed.
    Failure,
    /// Informational.
    Info,
}

impl Tone {
    /// Embed colour as `0xRRGGBB`.
    pub fn color(&self) -> u32 {
        match self {
            Tone::Success => 0x2ECC71,
            Tone::Failure => 0xE74C3C,
            Tone::Info => 0x3498DB,
        }
    }
}

/// One reply per handled inbound event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// Embed title.
    pub title: String,
    /// Embed body.
    pub body: String,
    /// Success or failure distinction.
    pub tone: Tone,
}

impl Reply {
    fn new(title: &str, body: impl Into<String>, tone: Tone) -> Self {
        Self {
            title: title.to_string(),
            body: body.into(),
            tone,
        }
    }
}

/// Network statistics; sections are `None` when the node did not answer.
#[derive(Clone, Debug, Default)]
pub struct NetworkReport {
    /// Node identification.
    pub node: Option<NodeInfo>,
    /// Network counters and peers.
    pub network: Option<NetworkInfo>,
    /// Chain summary.
    pub blockchain: Option<BlockchainInfo>,
}

/// Everything a handler can produce.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Usage text.
    Help,
    /// Network statistics.
    Network(NetworkReport),
    /// Faucet wallet address.
    FaucetAddress(String),
    /// Faucet wallet balance.
    Balance(Result<Balance, FaucetError>),
    /// Balance of an arbitrary account.
    AccountBalance {
        /// Queried address.
        address: String,
        /// Balance in NanoPAC.
        amount: Amount,
    },
    /// Account lookup failed.
    AccountUnavailable(String),
    /// Faucet paid out.
    Dispensed(FaucetReceipt),
    /// Validator record.
    Validator(ValidatorInfo),
    /// Validator lookup failed.
    ValidatorUnavailable(String),
    /// Faucet request rejected.
    Rejected(FaucetError),
    /// Slash command the bot does not know.
    UnknownCommand(String),
}

/// Shared dependencies for every handler.
#[derive(Clone)]
pub struct BotContext {
    /// Opens node connections for read-only queries.
    pub connector: Arc<dyn NodeConnector>,
    /// Faucet operations.
    pub faucet: Arc<dyn FaucetApi>,
    /// The bot's own user id.
    pub bot_user_id: String,
    /// Expected address prefix.
    pub hrp: String,
    /// Bound on every node round trip.
    pub request_timeout: Duration,
}

/// Routes inbound events to handlers.
#[derive(Clone)]
pub struct Dispatcher {
    ctx: BotContext,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    /// Handle one event. `None` means no reply is sent.
    pub async fn handle(&self, inbound: Inbound) -> Option<Reply> {
        let outcome = match inbound {
            Inbound::Message {
                author_id,
                author_name,
                author_is_bot,
                content,
            } => {
                if author_is_bot || author_id == self.ctx.bot_user_id {
                    return None;
                }
                let text = content.trim();
                if text.is_empty() {
                    return None;
                }
                debug!("[dispatch] message from {}: {}", author_name, text);
                let requester = Requester::new(author_name, author_id);
                match text {
                    "help" => Outcome::Help,
                    "network" => self.network().await,
                    "address" => self.faucet_address(),
                    "balance" => self.balance().await,
                    address => self.faucet(address, &requester).await,
                }
            }
            Inbound::SlashCommand {
                user_id,
                username,
                name,
                options,
            } => {
                debug!("[dispatch] /{} from {}", name, username);
                let requester = Requester::new(username, user_id);
                let address = options
                    .iter()
                    .find(|(key, _)| key == "address")
                    .map(|(_, value)| value.as_str())
                    .unwrap_or("");
                match name.as_str() {
                    "help" => Outcome::Help,
                    "network" => self.network().await,
                    "address" => self.faucet_address(),
                    "balance" if !address.is_empty() => self.account_balance(address).await,
                    "balance" => self.balance().await,
                    "faucet" => self.faucet(address, &requester).await,
                    "validator" => self.validator(address).await,
                    other => Outcome::UnknownCommand(other.to_string()),
                }
            }
        };
        Some(render(outcome))
    }

    fn faucet_address(&self) -> Outcome {
        Outcome::FaucetAddress(self.ctx.faucet.faucet_address().to_string())
    }

    async fn balance(&self) -> Outcome {
        Outcome::Balance(self.ctx.faucet.faucet_balance().await)
    }

    async fn account_balance(&self, raw_address: &str) -> Outcome {
        let address = match Address::parse(raw_address.trim(), &self.ctx.hrp) {
            Ok(address) => address,
            Err(_) => return Outcome::Rejected(FaucetError::InvalidAddress),
        };

        let node = match self.bounded(self.ctx.connector.connect()).await {
            Ok(node) => node,
            Err(_) => return Outcome::Rejected(FaucetError::NodeUnreachable),
        };
        match self.bounded(node.get_account_balance(address.as_str())).await {
            Ok(amount) => Outcome::AccountBalance {
                address: address.to_string(),
                amount,
            },
            Err(e) => {
                info!("[dispatch] balance of {} unavailable: {}", address, e);
                Outcome::AccountUnavailable(address.to_string())
            }
        }
    }

    async fn faucet(&self, address: &str, requester: &Requester) -> Outcome {
        match self.ctx.faucet.request_faucet(address, requester).await {
            Ok(receipt) => Outcome::Dispensed(receipt),
            Err(e) => Outcome::Rejected(e),
        }
    }

    async fn network(&self) -> Outcome {
        let mut report = NetworkReport::default();
        let node = match self.bounded(self.ctx.connector.connect()).await {
            Ok(node) => node,
            Err(e) => {
                warn!("[dispatch] network report without node: {}", e);
                return Outcome::Network(report);
            }
        };

        report.node = self.bounded(node.get_node_info()).await.ok();
        match self.bounded(node.get_network_info()).await {
            Ok(network) => report.network = Some(network),
            Err(e) => {
                warn!("[dispatch] network info unavailable: {}", e);
                return Outcome::Network(report);
            }
        }
        match self.bounded(node.get_blockchain_info()).await {
            Ok(info) => report.blockchain = Some(info),
            Err(e) => warn!("[dispatch] blockchain info unavailable: {}", e),
        }
        Outcome::Network(report)
    }

    async fn validator(&self, raw_address: &str) -> Outcome {
        let address = match Address::parse(raw_address.trim(), &self.ctx.hrp) {
            Ok(address) => address,
            Err(_) => return Outcome::Rejected(FaucetError::InvalidAddress),
        };

        let node = match self.bounded(self.ctx.connector.connect()).await {
            Ok(node) => node,
            Err(_) => return Outcome::Rejected(FaucetError::NodeUnreachable),
        };
        match self.bounded(node.get_validator(address.as_str())).await {
            Ok(validator) => Outcome::Validator(validator),
            Err(NodeError::Connection(_)) => Outcome::Rejected(FaucetError::NodeUnreachable),
            Err(e) => {
                info!("[dispatch] validator {} not found: {}", address, e);
                Outcome::ValidatorUnavailable(address.to_string())
            }
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, NodeError>
    where
        F: Future<Output = Result<T, NodeError>>,
    {
        tokio::time::timeout(self.ctx.request_timeout, fut)
            .await
            .unwrap_or_else(|_| Err(NodeError::Connection("request timed out".to_string())))
    }
}

/// Render any outcome into the reply sent back to the chat.
pub fn render(outcome: Outcome) -> Reply {
    match outcome {
        Outcome::Help => Reply::new(
            "Help",
            format!(
                "You can request the faucet by sending your wallet address, e.g {}",
                EXAMPLE_ADDRESS
            ),
            Tone::Info,
        ),
        Outcome::Network(report) => Reply::new("Network", network_body(&report), Tone::Info),
        Outcome::FaucetAddress(address) => {
            Reply::new("Faucet address", format!("Faucet address is: {}", address), Tone::Info)
        }
        Outcome::Balance(Ok(balance)) => Reply::new(
            "Faucet balance",
            format!("Available faucet balance is {}", balance.available),
            Tone::Info,
        ),
        Outcome::Balance(Err(e)) => Reply::new("Faucet balance", e.user_message(), Tone::Failure),
        Outcome::AccountBalance { address, amount } => Reply::new(
            "Account balance",
            format!("Balance of {} is {}", address, amount),
            Tone::Info,
        ),
        Outcome::AccountUnavailable(address) => Reply::new(
            "Account balance",
            format!("No account information found for {}", address),
            Tone::Failure,
        ),
        Outcome::Dispensed(receipt) => Reply::new(
            "Faucet sent",
            format!(
                "Faucet ({}) is staked on node successfully!\nTransaction: {}",
                receipt.amount, receipt.tx_hash
            ),
            Tone::Success,
        ),
        Outcome::Validator(v) => Reply::new(
            "Validator",
            format!(
                "Address: {}\nPublic key: {}\nNumber: {}\nStake: {}\nLast bonding height: {}\n\
                 Last sortition height: {}\nAvailability score: {:.2}",
                v.address,
                v.public_key,
                v.number,
                v.stake,
                v.last_bonding_height,
                v.last_sortition_height,
                v.availability_score
            ),
            Tone::Info,
        ),
        Outcome::ValidatorUnavailable(address) => Reply::new(
            "Validator",
            format!("No validator information found for {}", address),
            Tone::Failure,
        ),
        Outcome::Rejected(e) => Reply::new("Faucet request", e.user_message(), Tone::Failure),
        Outcome::UnknownCommand(name) => Reply::new(
            "Unknown command",
            format!("Unknown command /{}. Try /help.", name),
            Tone::Failure,
        ),
    }
}

fn network_body(report: &NetworkReport) -> String {
    let mut body = NETWORK_INTRO.to_string();

    let Some(network) = &report.network else {
        return body;
    };

    body.push_str("\nThe following are the current statistics:\n");
    if let Some(node) = &report.node {
        body.push_str(&format!("Node: {} ({})\n", node.moniker, node.agent));
    }
    let started = DateTime::from_timestamp(network.started_at, 0)
        .map(|t| t.format("%d/%m/%Y, %H:%M:%S").to_string())
        .unwrap_or_else(|| network.started_at.to_string());
    body.push_str(&format!("Network started at : {}\n", started));
    body.push_str(&format!("Total bytes sent : {}\n", network.total_sent_bytes));
    body.push_str(&format!("Total received bytes : {}\n", network.total_received_bytes));
    body.push_str(&format!("Number of peer nodes: {}\n", network.connected_peers.len()));

    if let Some(chain) = &report.blockchain {
        body.push_str(&format!("Block height: {}\n", chain.last_block_height));
        body.push_str(&format!("Total power: {}\n", chain.total_power));
        body.push_str(&format!("Total committee power: {}\n", chain.committee_power));
        body.push_str(&format!("Total validators: {}\n", chain.total_validators));
    }
    body
}
