//! kiwi-connect: wallet connectors and local identity for Kiwi News.
//!
//! # Architecture
//!
//! ```text
//! ClientConfig (environment decided once)
//!   │
//!   ├── ConnectorRegistry
//!   │     ├── NativeBridge → BridgeConnector ──→ JsonLinesBridge (iOS host)
//!   │     └── Browser → Eip1193Connector × wallets ──→ Provider
//!   │
//!   ├── LocalAccounts
//!   │     ├── KeyStore (durable key material)
//!   │     └── CookieJar (active-identity pointer)
//!   │
//!   └── Session
//!         └── current() → address + eligibility → IdentityView
//! ```
//!
//! # Features
//!
//! - `native` - tokio host bridge transport, file-backed stores, logging, CLI
//!
//! # Usage
//!
//! ```ignore
//! use kiwi_connect::{ClientConfig, ConnectorRegistry, LocalAccounts, Session};
//!
//! let registry = ConnectorRegistry::new(&config, &providers)?;
//! let connector = registry.preferred().expect("wallet").connector.clone();
//! let session = Session::new(connector, LocalAccounts::new(keys, cookies));
//! session.connect(None).await?;
//! let view = session.view(&allowlist, &delegations)?;
//! ```

pub mod config;
pub mod connector;
pub mod core;
pub mod identity;
pub mod registry;
pub mod session;
pub mod transport;

#[cfg(feature = "native")]
pub mod logging;

pub use config::{ClientConfig, Device, Environment, UnknownEnvironment};
pub use connector::{
    BridgeConnector, Connector, ConnectorError, ConnectorEvent, ConnectorResult, Eip1193Connector, WalletAccount,
    WalletClient,
};
pub use self::core::{Address, AddressError, Chain, ChainId, ChainStatus};
pub use identity::{
    scan_local_keys, CookieJar, DocumentCookieJar, KeyStore, LocalAccounts, LocalIdentity, LocalKeys, MemoryCookieJar,
    MemoryKeyStore, SecretKey, StoreError,
};
pub use registry::{ConnectorDescriptor, ConnectorRegistry, ProviderFactory, WalletSpec};
pub use session::{current_address, eligible, is_eligible, AccountState, Allowlist, Delegations, IdentityView, Session};
pub use transport::{HostNotification, MockProvider, Provider, ProviderHandle, RpcRequest, TransportError};

#[cfg(feature = "native")]
pub use identity::{FileCookieJar, FileKeyStore};
#[cfg(feature = "native")]
pub use transport::JsonLinesBridge;
