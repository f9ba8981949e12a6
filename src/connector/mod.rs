//! Connector - one contract for every wallet backend
//!
//! The rest of the client talks to a `dyn Connector` and never learns whether
//! the account lives in a browser extension, a remote session, or the iOS
//! host's native wallet.
//!
//! # Architecture
//!
//! ```text
//! Connector (trait)
//!     │
//!     ├── BridgeConnector ──→ embedding host bridge (single chain)
//!     │
//!     └── Eip1193Connector ─→ extension / remote session (multi chain)
//!             │
//!             ▼
//!      Provider::request({method, params})
//! ```
//!
//! # Events
//!
//! | Backend notification | Event |
//! |----------------------|-------|
//! | `accountsChanged([])` | `Disconnected` |
//! | `accountsChanged([a, ..])` | `AccountsChanged(a)` |
//! | `chainChanged(id)` | `ChainChanged { id, unsupported }` |
//! | `disconnect(reason)` | `Disconnected` |

mod bridge;
mod eip1193;
mod events;

pub use bridge::BridgeConnector;
pub use eip1193::Eip1193Connector;
pub use events::{ConnectorEvent, EventHub, EventReceiver, EventRelay};

use crate::core::{Address, Chain, ChainId, ChainStatus};
use crate::core::names::codes;
use crate::transport::{ProviderHandle, TransportError};
use async_trait::async_trait;
use thiserror::Error;

/// Connector errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectorError {
    #[error("User rejected the request")]
    UserRejected,

    #[error("Wallet backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Chain {0} is not supported by this connector")]
    UnsupportedChain(ChainId),
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

impl From<TransportError> for ConnectorError {
    fn from(e: TransportError) -> Self {
        match e.code() {
            Some(codes::USER_REJECTED) => ConnectorError::UserRejected,
            _ => ConnectorError::BackendUnavailable(e.to_string()),
        }
    }
}

/// Account produced by a successful `connect`.
#[derive(Clone)]
pub struct WalletAccount {
    pub address: Address,
    pub chain: ChainStatus,
    pub provider: ProviderHandle,
}

impl std::fmt::Debug for WalletAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletAccount")
            .field("address", &self.address)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

/// Signing-capable client bound to one account and chain.
#[derive(Clone)]
pub struct WalletClient {
    pub account: Address,
    pub chain: ChainStatus,
    pub transport: ProviderHandle,
}

impl std::fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletClient")
            .field("account", &self.account)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    /// Statically configured chains this connector reports as supported.
    fn chains(&self) -> &[Chain];

    async fn connect(&self, chain_id: Option<ChainId>) -> ConnectorResult<WalletAccount>;
    /// Idempotent.
    async fn disconnect(&self) -> ConnectorResult<()>;
    async fn account(&self) -> ConnectorResult<Option<Address>>;
    async fn chain_id(&self) -> ConnectorResult<ChainId>;
    async fn provider(&self, chain_id: Option<ChainId>) -> ConnectorResult<ProviderHandle>;
    async fn wallet_client(&self, chain_id: Option<ChainId>) -> ConnectorResult<WalletClient>;
    /// Never fails; any internal error reads as `false`.
    async fn is_authorized(&self) -> bool;
    async fn switch_chain(&self, chain_id: ChainId) -> ConnectorResult<Chain>;
    fn subscribe(&self) -> EventReceiver;

    fn is_chain_unsupported(&self, chain_id: ChainId) -> bool {
        !self.chains().iter().any(|c| c.id == chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_mapping() {
        assert_eq!(ConnectorError::from(TransportError::rpc(4001, "nope")), ConnectorError::UserRejected);
        assert!(matches!(
            ConnectorError::from(TransportError::Closed),
            ConnectorError::BackendUnavailable(_)
        ));
        assert!(matches!(
            ConnectorError::from(TransportError::rpc(-32603, "internal")),
            ConnectorError::BackendUnavailable(_)
        ));
    }
}
