//! JSON-RPC 2.0 client over HTTP.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::domain::{NodeError, WalletError};

/// JSON-RPC request structure.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Errors that can occur when talking to a JSON-RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Endpoint URL is malformed.
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Configured endpoint
        endpoint: String,
        /// Parse failure
        reason: String,
    },

    /// Could not connect or the HTTP exchange failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request exceeded its timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The response had neither result nor error.
    #[error("Missing result in response")]
    MissingResult,
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RpcError::Timeout
        } else if e.is_decode() {
            RpcError::Parse(e.to_string())
        } else {
            RpcError::Connection(e.to_string())
        }
    }
}

impl From<RpcError> for NodeError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Parse(_) | RpcError::MissingResult => NodeError::InvalidResponse(e.to_string()),
            other => NodeError::Connection(other.to_string()),
        }
    }
}

impl From<RpcError> for WalletError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Rpc { .. } => WalletError::Rejected(e.to_string()),
            other => WalletError::Rpc(other.to_string()),
        }
    }
}

/// JSON-RPC client bound to one endpoint.
pub struct JsonRpcClient {
    http_client: reqwest::Client,
    endpoint: String,
    request_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a client. Fails if the endpoint is not a URL or the HTTP client
    /// cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, RpcError> {
        let endpoint = endpoint.into();
        reqwest::Url::parse(&endpoint).map_err(|e| RpcError::InvalidEndpoint {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| RpcError::Connection(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            request_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Make a JSON-RPC call.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        debug!("[rpc] {} -> {} (id {})", method, self.endpoint, id);

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let rpc_response: JsonRpcResponse<R> = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response.result.ok_or(RpcError::MissingResult)
    }
}

/// Accept protojson 64-bit integers, which arrive as strings, as well as plain numbers.
pub(crate) fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("integer out of range: {}", n))),
        serde_json::Value::String(s) => s.parse().map_err(de::Error::custom),
        serde_json::Value::Null => Ok(0),
        other => Err(de::Error::custom(format!("expected integer, got {}", other))),
    }
}
