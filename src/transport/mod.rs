//! Transport - the EIP-1193 request primitive every wallet backend speaks
//!
//! A `Provider` answers `request({method, params})` with a JSON result. Browser
//! extensions, remote sessions and the embedding host's native bridge all look
//! the same from here.
//!
//! # Implementations
//!
//! | Type | Backend |
//! |------|---------|
//! | `JsonLinesBridge` | Embedding host over newline-delimited JSON (native) |
//! | `MockProvider` | Scripted in-memory provider for tests and demos |

#[cfg(feature = "native")]
mod json_lines;
mod mock;

#[cfg(feature = "native")]
pub use json_lines::JsonLinesBridge;
pub use mock::MockProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Transport errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Provider error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transport closed")]
    Closed,

    #[error("Transport I/O: {0}")]
    Io(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc { code, message: message.into() }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A single `request({method, params})` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>) -> Self { Self { method: method.into(), params: None } }
    pub fn with_params(mut self, params: Value) -> Self { self.params = Some(params); self }
}

/// Push notification from a backend (`accountsChanged`, `chainChanged`, `disconnect`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostNotification {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl HostNotification {
    pub fn new(event: impl Into<String>, data: Value) -> Self { Self { event: event.into(), data } }
}

#[async_trait]
pub trait Provider: Send + Sync {
    async fn request(&self, request: RpcRequest) -> Result<Value, TransportError>;

    /// Injected provider flags such as `isRainbow`.
    fn flag(&self, _name: &str) -> bool { false }
}

/// Shared handle to a provider; what `getProvider` hands out.
pub type ProviderHandle = Arc<dyn Provider>;

/// Decode an `eth_accounts`-style result into addresses.
pub fn parse_accounts(value: &Value) -> Result<Vec<crate::core::Address>, TransportError> {
    let list = value
        .as_array()
        .ok_or_else(|| TransportError::Malformed(format!("expected account list, got {}", value)))?;
    list.iter()
        .map(|v| {
            v.as_str()
                .ok_or_else(|| TransportError::Malformed(format!("account is not a string: {}", v)))?
                .parse()
                .map_err(|e: crate::core::AddressError| TransportError::Malformed(e.to_string()))
        })
        .collect()
}
