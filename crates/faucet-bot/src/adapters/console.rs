//! # Console Transport
//!
//! Line based chat transport for running the bot against a live node
//! without a chat platform.
//!
//! ```text
//! alice: tpc1pxl333elgnrdtk0kjpjdvky44yu62x0cwupnpjl
//! bob: network
//! /validator address:tpc1pxl333elgnrdtk0kjpjdvky44yu62x0cwupnpjl
//! /faucet tpc1pxl333elgnrdtk0kjpjdvky44yu62x0cwupnpjl
//! ```
//!
//! Lines without a `name:` prefix are sent as the default user.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::application::{Dispatcher, Inbound, Reply, Tone};

/// Parse one console line. Blank lines yield `None`.
pub fn parse_line(line: &str, default_user: &str) -> Option<Inbound> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(command) = line.strip_prefix('/') {
        let mut tokens = command.split_whitespace();
        let name = tokens.next()?.to_string();
        let options = tokens
            .map(|token| match token.split_once(':') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => ("address".to_string(), token.to_string()),
            })
            .collect();
        return Some(Inbound::SlashCommand {
            user_id: default_user.to_string(),
            username: default_user.to_string(),
            name,
            options,
        });
    }

    let (author, content) = match line.split_once(':') {
        Some((author, content)) if !author.trim().is_empty() && !author.contains(char::is_whitespace) => {
            (author.trim(), content)
        }
        _ => (default_user, line),
    };
    Some(Inbound::Message {
        author_id: author.to_string(),
        author_name: author.to_string(),
        author_is_bot: false,
        content: content.to_string(),
    })
}

/// Format a reply for the terminal.
pub fn format_reply(reply: &Reply) -> String {
    let marker = match reply.tone {
        Tone::Success => "ok",
        Tone::Failure => "error",
        Tone::Info => "info",
    };
    format!("[{}] {}\n{}\n", marker, reply.title, reply.body)
}

/// Reads inbound lines and writes rendered replies.
pub struct ConsoleTransport {
    dispatcher: Dispatcher,
    default_user: String,
}

impl ConsoleTransport {
    /// Create a transport routing to `dispatcher`.
    pub fn new(dispatcher: Dispatcher, default_user: impl Into<String>) -> Self {
        Self {
            dispatcher,
            default_user: default_user.into(),
        }
    }

    /// Serve until the input ends or shutdown is signalled.
    ///
    /// Every line is handled on its own task; replies are written in
    /// completion order. In-flight requests finish before this returns.
    pub async fn run<R, W>(
        self,
        input: R,
        mut output: W,
        mut shutdown: watch::Receiver<bool>,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Reply>();
        let mut tasks = JoinSet::new();
        let mut reading = true;

        info!("[console] ready for input");
        while reading {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => {
                        let Some(inbound) = parse_line(&line, &self.default_user) else {
                            continue;
                        };
                        debug!("[console] inbound {:?}", inbound);
                        let dispatcher = self.dispatcher.clone();
                        let replies = reply_tx.clone();
                        tasks.spawn(async move {
                            if let Some(reply) = dispatcher.handle(inbound).await {
                                let _ = replies.send(reply);
                            }
                        });
                    }
                    None => reading = false,
                },
                Some(reply) = reply_rx.recv() => {
                    output.write_all(format_reply(&reply).as_bytes()).await?;
                    output.flush().await?;
                }
                Some(joined) = tasks.join_next() => {
                    if let Err(e) = joined {
                        warn!("[console] handler task failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        reading = false;
                    }
                }
            }
        }

        drop(reply_tx);
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("[console] handler task failed: {}", e);
            }
        }
        while let Some(reply) = reply_rx.recv().await {
            output.write_all(format_reply(&reply).as_bytes()).await?;
        }
        output.flush().await?;
        info!("[console] input closed");
        Ok(())
    }
}
