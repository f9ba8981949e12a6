//! Eip1193Connector - browser extensions and remote sessions
//!
//! Anything that exposes an EIP-1193 `request` function: injected wallets,
//! WalletConnect-style relays, Safe, Coinbase, MetaMask, Brave, Rainbow.

use super::events::{EventReceiver, EventRelay};
use super::{Connector, ConnectorError, ConnectorResult, WalletAccount, WalletClient};
use crate::core::names::{codes, methods};
use crate::core::{Address, Chain, ChainId, ChainStatus};
use crate::transport::{parse_accounts, HostNotification, ProviderHandle, RpcRequest, TransportError};
use async_trait::async_trait;
use futures::Stream;
use serde_json::json;

pub struct Eip1193Connector {
    id: String,
    name: String,
    provider: ProviderHandle,
    relay: EventRelay,
}

impl Eip1193Connector {
    pub fn new(id: impl Into<String>, name: impl Into<String>, provider: ProviderHandle, chains: Vec<Chain>) -> Self {
        Self { id: id.into(), name: name.into(), provider, relay: EventRelay::new(chains) }
    }

    async fn accounts(&self, method: &str) -> Result<Vec<Address>, TransportError> {
        let value = self.provider.request(RpcRequest::new(method)).await?;
        parse_accounts(&value)
    }

    async fn current_chain(&self) -> Result<ChainId, TransportError> {
        let value = self.provider.request(RpcRequest::new(methods::CHAIN_ID)).await?;
        ChainId::from_value(&value).ok_or_else(|| TransportError::Malformed(format!("chain id: {}", value)))
    }

    pub async fn relay<S>(&self, notifications: S)
    where
        S: Stream<Item = HostNotification> + Unpin,
    {
        self.relay.relay(notifications).await
    }

    pub fn on_notification(&self, notification: &HostNotification) { self.relay.handle(notification) }
}

#[async_trait]
impl Connector for Eip1193Connector {
    fn id(&self) -> &str { &self.id }
    fn name(&self) -> &str { &self.name }
    fn chains(&self) -> &[Chain] { self.relay.chains() }

    async fn connect(&self, chain_id: Option<ChainId>) -> ConnectorResult<WalletAccount> {
        let accounts = self.accounts(methods::REQUEST_ACCOUNTS).await?;
        let address = *accounts
            .first()
            .ok_or_else(|| ConnectorError::BackendUnavailable(format!("{} returned no accounts", self.id)))?;
        let mut active = self.current_chain().await?;

        if let Some(requested) = chain_id.filter(|id| *id != active) {
            match self.switch_chain(requested).await {
                Ok(chain) => active = chain.id,
                Err(e) => tracing::warn!(connector = %self.id, %requested, "staying on chain {}: {}", active, e),
            }
        }

        self.relay.set_account(Some(address));
        tracing::info!(connector = %self.id, %address, chain = %active, "wallet connected");
        Ok(WalletAccount {
            address,
            chain: ChainStatus::against(active, self.chains()),
            provider: self.provider.clone(),
        })
    }

    async fn disconnect(&self) -> ConnectorResult<()> {
        self.relay.set_account(None);
        Ok(())
    }

    async fn account(&self) -> ConnectorResult<Option<Address>> {
        Ok(self.accounts(methods::ACCOUNTS).await?.first().copied())
    }

    async fn chain_id(&self) -> ConnectorResult<ChainId> { Ok(self.current_chain().await?) }

    async fn provider(&self, _chain_id: Option<ChainId>) -> ConnectorResult<ProviderHandle> {
        Ok(self.provider.clone())
    }

    async fn wallet_client(&self, chain_id: Option<ChainId>) -> ConnectorResult<WalletClient> {
        let (account, active) = futures::join!(self.account(), self.chain_id());
        let account = account?
            .ok_or_else(|| ConnectorError::BackendUnavailable("no authorized account".into()))?;
        let id = match chain_id {
            Some(id) => id,
            None => active?,
        };
        Ok(WalletClient {
            account,
            chain: ChainStatus::against(id, self.chains()),
            transport: self.provider.clone(),
        })
    }

    async fn is_authorized(&self) -> bool {
        match self.accounts(methods::ACCOUNTS).await {
            Ok(accounts) => !accounts.is_empty(),
            Err(e) => {
                tracing::debug!(connector = %self.id, "authorization probe failed: {}", e);
                false
            }
        }
    }

    async fn switch_chain(&self, chain_id: ChainId) -> ConnectorResult<Chain> {
        let chain = self
            .chains()
            .iter()
            .find(|c| c.id == chain_id)
            .cloned()
            .ok_or(ConnectorError::UnsupportedChain(chain_id))?;
        let request = RpcRequest::new(methods::SWITCH_CHAIN).with_params(json!([{ "chainId": chain_id.to_hex() }]));
        match self.provider.request(request).await {
            Ok(_) => Ok(chain),
            Err(e) if e.code() == Some(codes::UNRECOGNIZED_CHAIN) => Err(ConnectorError::UnsupportedChain(chain_id)),
            Err(e) => Err(e.into()),
        }
    }

    fn subscribe(&self) -> EventReceiver { self.relay.subscribe() }
}
