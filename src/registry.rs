//! Connector registry - which wallets the client offers, decided once
//!
//! | Environment | Group | Wallets |
//! |-------------|-------|---------|
//! | NativeBridge | Coinbase Wallet | host bridge only |
//! | Browser | Popular | injected, WalletConnect, Safe, Coinbase, MetaMask, Brave, (Rainbow) |
//!
//! Rainbow is offered on desktop, or on mobile only when the injected
//! provider is Rainbow itself.

use crate::config::{ClientConfig, Environment};
use crate::connector::{BridgeConnector, Connector, ConnectorError, ConnectorResult, Eip1193Connector};
use crate::transport::ProviderHandle;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub const BRIDGE_WALLET_ID: &str = "ios-coinbase-wallet";
pub const INJECTED_WALLET_ID: &str = "injected";
pub const RAINBOW_WALLET_ID: &str = "rainbow";

/// Static description of a wallet option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub group: &'static str,
    pub icon_url: Option<&'static str>,
    pub icon_background: Option<&'static str>,
}

impl WalletSpec {
    const fn popular(id: &'static str, name: &'static str) -> Self {
        Self { id, name, group: "Popular", icon_url: None, icon_background: None }
    }
}

pub const BRIDGE_WALLET: WalletSpec = WalletSpec {
    id: BRIDGE_WALLET_ID,
    name: "Coinbase Wallet",
    group: "Coinbase Wallet",
    icon_url: Some("coinbase_wallet_appicon.png"),
    icon_background: Some("#2c5ff6"),
};

pub const STANDARD_WALLETS: &[WalletSpec] = &[
    WalletSpec::popular(INJECTED_WALLET_ID, "Injected Wallet"),
    WalletSpec::popular("walletConnect", "WalletConnect"),
    WalletSpec::popular("safe", "Safe"),
    WalletSpec::popular("coinbase", "Coinbase Wallet"),
    WalletSpec::popular("metaMask", "MetaMask"),
    WalletSpec::popular("brave", "Brave Wallet"),
];

pub const RAINBOW_WALLET: WalletSpec = WalletSpec::popular(RAINBOW_WALLET_ID, "Rainbow");

/// Hands out the transport behind each wallet option. The host wires real
/// extension/session/bridge transports in here.
pub trait ProviderFactory: Send + Sync {
    fn provider(&self, wallet: &WalletSpec, config: &ClientConfig) -> Option<ProviderHandle>;
}

impl<F> ProviderFactory for F
where
    F: Fn(&WalletSpec, &ClientConfig) -> Option<ProviderHandle> + Send + Sync,
{
    fn provider(&self, wallet: &WalletSpec, config: &ClientConfig) -> Option<ProviderHandle> { self(wallet, config) }
}

/// Wallet options for an environment, in preference order.
pub fn plan(config: &ClientConfig, injected_is_rainbow: bool) -> Vec<WalletSpec> {
    match config.environment {
        Environment::NativeBridge => vec![BRIDGE_WALLET],
        Environment::Browser => {
            let mut wallets = STANDARD_WALLETS.to_vec();
            if config.device.is_desktop() || injected_is_rainbow {
                wallets.push(RAINBOW_WALLET);
            }
            wallets
        }
    }
}

#[derive(Clone)]
pub struct ConnectorDescriptor {
    pub spec: WalletSpec,
    pub connector: Arc<dyn Connector>,
}

impl ConnectorDescriptor {
    pub fn id(&self) -> &str { self.spec.id }
    pub fn name(&self) -> &str { self.spec.name }
}

impl fmt::Debug for ConnectorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorDescriptor")
            .field("spec", &self.spec)
            .field("connector", &self.connector.id())
            .finish()
    }
}

pub struct ConnectorRegistry {
    environment: Environment,
    descriptors: Vec<ConnectorDescriptor>,
}

impl ConnectorRegistry {
    pub fn new(config: &ClientConfig, providers: &dyn ProviderFactory) -> ConnectorResult<Self> {
        // Fetched once: it decides the plan and then backs its own descriptor
        let mut injected = match config.environment {
            Environment::Browser => STANDARD_WALLETS
                .iter()
                .find(|w| w.id == INJECTED_WALLET_ID)
                .and_then(|w| providers.provider(w, config)),
            Environment::NativeBridge => None,
        };
        let injected_is_rainbow = injected.as_ref().is_some_and(|p| p.flag("isRainbow"));

        let mut descriptors = Vec::new();
        for spec in plan(config, injected_is_rainbow) {
            let provider = if spec.id == INJECTED_WALLET_ID {
                injected.take()
            } else {
                providers.provider(&spec, config)
            };
            let Some(provider) = provider else {
                tracing::debug!(wallet = spec.id, "no transport for wallet, skipping");
                continue;
            };
            let connector: Arc<dyn Connector> = match config.environment {
                Environment::NativeBridge => Arc::new(BridgeConnector::new(provider, config.chains.clone())),
                Environment::Browser => {
                    Arc::new(Eip1193Connector::new(spec.id, spec.name, provider, config.chains.clone()))
                }
            };
            descriptors.push(ConnectorDescriptor { spec, connector });
        }

        if config.environment == Environment::NativeBridge && descriptors.is_empty() {
            return Err(ConnectorError::BackendUnavailable("embedding host bridge not present".into()));
        }
        tracing::info!(
            environment = config.environment.as_str(),
            connectors = descriptors.len(),
            "connector registry ready"
        );
        Ok(Self { environment: config.environment, descriptors })
    }

    pub fn environment(&self) -> Environment { self.environment }
    pub fn descriptors(&self) -> &[ConnectorDescriptor] { &self.descriptors }
    pub fn get(&self, id: &str) -> Option<&ConnectorDescriptor> { self.descriptors.iter().find(|d| d.id() == id) }

    /// First connector in preference order.
    pub fn preferred(&self) -> Option<&ConnectorDescriptor> { self.descriptors.first() }
}
