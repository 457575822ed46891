//! # Status Task
//!
//! Periodically refreshes a chain status snapshot and publishes it on a
//! `watch` channel. Stops when its shutdown receiver flips to `true` or its
//! sender is dropped.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::NodeError;
use crate::ports::outbound::NodeConnector;

/// Chain status as last observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Last block height.
    pub height: u32,
    /// Peers connected to our node.
    pub connected_peers: usize,
    /// Registered validators.
    pub total_validators: u32,
}

/// Scheduled status refresher.
pub struct StatusTask {
    connector: Arc<dyn NodeConnector>,
    interval: Duration,
    request_timeout: Duration,
    publisher: watch::Sender<Option<StatusSnapshot>>,
}

impl StatusTask {
    /// Create the task and the receiver its snapshots are published on.
    pub fn new(
        connector: Arc<dyn NodeConnector>,
        interval: Duration,
        request_timeout: Duration,
    ) -> (Self, watch::Receiver<Option<StatusSnapshot>>) {
        let (publisher, receiver) = watch::channel(None);
        (
            Self {
                connector,
                interval,
                request_timeout,
                publisher,
            },
            receiver,
        )
    }

    /// Take one snapshot.
    pub async fn refresh(&self) -> Result<StatusSnapshot, NodeError> {
        let fetch = async {
            let node = self.connector.connect().await?;
            let chain = node.get_blockchain_info().await?;
            let network = node.get_network_info().await?;
            Ok::<_, NodeError>(StatusSnapshot {
                height: chain.last_block_height,
                connected_peers: network.connected_peers.len(),
                total_validators: chain.total_validators,
            })
        };
        tokio::time::timeout(self.request_timeout, fetch)
            .await
            .unwrap_or_else(|_| Err(NodeError::Connection("status refresh timed out".to_string())))
    }

    /// Refresh every interval until shutdown. Failed refreshes keep the last
    /// snapshot.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("[status] refreshing every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh().await {
                        Ok(snapshot) => {
                            debug!(
                                height = snapshot.height,
                                peers = snapshot.connected_peers,
                                "[status] refreshed"
                            );
                            faucet_telemetry::CHAIN_HEIGHT.set(f64::from(snapshot.height));
                            self.publisher.send_replace(Some(snapshot));
                        }
                        Err(e) => warn!("[status] refresh failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("[status] stopped");
    }
}
