//! Session - one authoritative current address
//!
//! A connected external wallet always wins; otherwise the local identity
//! stands in. Nothing is cached: every `current()` rescans the key store.
//!
//! ```text
//! Connector events ──→ AccountState ─┐
//!                                    ├──→ current() ──→ IdentityView
//! KeyStore + CookieJar ──→ resolve ──┘         (eligibility)
//! ```

mod eligibility;

pub use eligibility::{eligible, is_eligible, Allowlist, Delegations, IdentityView};

use crate::connector::{Connector, ConnectorEvent, ConnectorResult, WalletAccount};
use crate::core::{Address, ChainId, ChainStatus};
use crate::identity::{LocalAccounts, LocalIdentity, StoreResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// External wallet first, local identity second.
pub fn current_address(connected: Option<&Address>, local: Option<&LocalIdentity>) -> Option<Address> {
    connected.copied().or_else(|| local.map(|l| l.address))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Connected-account state as the UI sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountState {
    pub status: ConnectionStatus,
    pub address: Option<Address>,
    pub chain: Option<ChainStatus>,
}

impl AccountState {
    pub fn is_connected(&self) -> bool { self.status == ConnectionStatus::Connected && self.address.is_some() }

    /// Connected address, only while connected.
    pub fn connected_address(&self) -> Option<Address> {
        if self.is_connected() { self.address } else { None }
    }

    pub fn connected(account: &WalletAccount) -> Self {
        Self { status: ConnectionStatus::Connected, address: Some(account.address), chain: Some(account.chain) }
    }

    /// Fold one connector event in. Re-applying an event is a no-op.
    pub fn apply(&mut self, event: &ConnectorEvent) {
        match event {
            ConnectorEvent::Disconnected => *self = Self::default(),
            ConnectorEvent::AccountsChanged(address) if self.status == ConnectionStatus::Connected => {
                self.address = Some(*address);
            }
            ConnectorEvent::ChainChanged(chain) if self.status == ConnectionStatus::Connected => {
                self.chain = Some(*chain);
            }
            _ => {}
        }
    }
}

/// Where the current address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    Connected,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub address: Option<Address>,
    pub source: Option<IdentitySource>,
    pub local: Option<LocalIdentity>,
}

/// Connector account state merged with local identities.
pub struct Session {
    connector: Arc<dyn Connector>,
    local: LocalAccounts,
    state: Mutex<AccountState>,
}

impl Session {
    pub fn new(connector: Arc<dyn Connector>, local: LocalAccounts) -> Self {
        Self { connector, local, state: Mutex::new(AccountState::default()) }
    }

    pub fn connector(&self) -> &Arc<dyn Connector> { &self.connector }
    pub fn local(&self) -> &LocalAccounts { &self.local }

    pub fn state(&self) -> AccountState {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }

    fn set_state(&self, state: AccountState) {
        if let Ok(mut current) = self.state.lock() { *current = state; }
    }

    pub fn apply(&self, event: &ConnectorEvent) {
        if let Ok(mut state) = self.state.lock() { state.apply(event); }
    }

    pub async fn connect(&self, chain_id: Option<ChainId>) -> ConnectorResult<WalletAccount> {
        let previous = self.state();
        self.set_state(AccountState { status: ConnectionStatus::Connecting, ..previous });
        match self.connector.connect(chain_id).await {
            Ok(account) => {
                self.set_state(AccountState::connected(&account));
                Ok(account)
            }
            Err(e) => {
                self.set_state(previous);
                Err(e)
            }
        }
    }

    pub async fn disconnect(&self) -> ConnectorResult<()> {
        self.connector.disconnect().await?;
        self.set_state(AccountState::default());
        Ok(())
    }

    /// Reconnect silently when the backend still holds an authorization.
    pub async fn reconnect(&self) -> ConnectorResult<Option<WalletAccount>> {
        if !self.connector.is_authorized().await {
            return Ok(None);
        }
        tracing::debug!(connector = self.connector.id(), "restoring authorized session");
        self.connect(None).await.map(Some)
    }

    /// Apply connector events until the connector drops its side.
    pub async fn watch(&self) {
        let mut events = self.connector.subscribe();
        while let Some(event) = events.next().await {
            tracing::debug!(?event, "connector event");
            self.apply(&event);
        }
    }

    /// Preference: connected address, else the cookie pointer.
    pub fn current(&self) -> StoreResult<ResolvedIdentity> {
        let connected = self.state().connected_address();
        let preferred = match connected {
            Some(address) => Some(address),
            None => self.local.active()?,
        };
        let local = self.local.resolve(preferred.as_ref())?;
        let address = current_address(connected.as_ref(), local.as_ref());
        let source = match (connected, &local) {
            (Some(_), _) => Some(IdentitySource::Connected),
            (None, Some(_)) => Some(IdentitySource::Local),
            (None, None) => None,
        };
        Ok(ResolvedIdentity { address, source, local })
    }

    pub fn view(&self, allowlist: &Allowlist, delegations: &Delegations) -> StoreResult<IdentityView> {
        let resolved = self.current()?;
        Ok(IdentityView::new(resolved.address, resolved.local.is_some(), allowlist, delegations))
    }
}
