//! BridgeConnector - wallet access through the iOS host's native bridge
//!
//! The host owns the real wallet session; this connector only forwards
//! `eth_requestAccounts` / `eth_accounts` and pins everything to one chain.

use super::events::{EventReceiver, EventRelay};
use super::{Connector, ConnectorError, ConnectorResult, WalletAccount, WalletClient};
use crate::core::names::methods;
use crate::core::{Address, Chain, ChainId, ChainStatus};
use crate::transport::{parse_accounts, HostNotification, ProviderHandle, RpcRequest, TransportError};
use async_trait::async_trait;
use futures::Stream;

pub struct BridgeConnector {
    bridge: ProviderHandle,
    home: Chain,
    relay: EventRelay,
}

impl BridgeConnector {
    pub const ID: &'static str = "iosCoinbaseWallet";
    pub const NAME: &'static str = "Coinbase Wallet";

    /// Home chain defaults to Optimism.
    pub fn new(bridge: ProviderHandle, chains: Vec<Chain>) -> Self {
        let home = chains.iter().find(|c| c.id == ChainId::OPTIMISM).cloned().unwrap_or_else(Chain::optimism);
        Self { bridge, home, relay: EventRelay::new(chains) }
    }

    pub fn with_home_chain(mut self, home: Chain) -> Self { self.home = home; self }

    pub fn home_chain(&self) -> &Chain { &self.home }

    fn home_status(&self) -> ChainStatus { ChainStatus { id: self.home.id, unsupported: false } }

    async fn accounts(&self, method: &str) -> Result<Vec<Address>, TransportError> {
        let value = self.bridge.request(RpcRequest::new(method)).await?;
        parse_accounts(&value)
    }

    /// Forward host notifications until the host closes the stream.
    pub async fn relay<S>(&self, notifications: S)
    where
        S: Stream<Item = HostNotification> + Unpin,
    {
        self.relay.relay(notifications).await
    }

    pub fn on_notification(&self, notification: &HostNotification) { self.relay.handle(notification) }
}

#[async_trait]
impl Connector for BridgeConnector {
    fn id(&self) -> &str { Self::ID }
    fn name(&self) -> &str { Self::NAME }
    fn chains(&self) -> &[Chain] { self.relay.chains() }

    async fn connect(&self, chain_id: Option<ChainId>) -> ConnectorResult<WalletAccount> {
        if let Some(requested) = chain_id.filter(|id| *id != self.home.id) {
            tracing::debug!(%requested, home = %self.home.id, "bridge ignores requested chain");
        }
        let accounts = self.accounts(methods::REQUEST_ACCOUNTS).await.map_err(|e| {
            tracing::warn!("bridge connect failed: {}", e);
            ConnectorError::from(e)
        })?;
        let address = *accounts
            .first()
            .ok_or_else(|| ConnectorError::BackendUnavailable("bridge returned no accounts".into()))?;
        self.relay.set_account(Some(address));
        tracing::info!(%address, chain = %self.home.id, "bridge connected");
        Ok(WalletAccount { address, chain: self.home_status(), provider: self.bridge.clone() })
    }

    async fn disconnect(&self) -> ConnectorResult<()> {
        // Host owns the session
        self.relay.set_account(None);
        Ok(())
    }

    async fn account(&self) -> ConnectorResult<Option<Address>> {
        let accounts = self.accounts(methods::ACCOUNTS).await?;
        Ok(accounts.first().copied())
    }

    async fn chain_id(&self) -> ConnectorResult<ChainId> { Ok(self.home.id) }

    async fn provider(&self, _chain_id: Option<ChainId>) -> ConnectorResult<ProviderHandle> {
        Ok(self.bridge.clone())
    }

    async fn wallet_client(&self, chain_id: Option<ChainId>) -> ConnectorResult<WalletClient> {
        let (account, provider) = futures::join!(self.account(), self.provider(chain_id));
        let account = account?
            .ok_or_else(|| ConnectorError::BackendUnavailable("no authorized account".into()))?;
        if let Some(requested) = chain_id.filter(|id| *id != self.home.id) {
            tracing::debug!(%requested, home = %self.home.id, "bridge wallet client stays on home chain");
        }
        Ok(WalletClient { account, chain: self.home_status(), transport: provider? })
    }

    async fn is_authorized(&self) -> bool {
        match self.accounts(methods::ACCOUNTS).await {
            Ok(accounts) => !accounts.is_empty(),
            Err(e) => {
                tracing::debug!("bridge authorization probe failed: {}", e);
                false
            }
        }
    }

    async fn switch_chain(&self, chain_id: ChainId) -> ConnectorResult<Chain> {
        if chain_id == self.home.id {
            return Ok(self.chains().iter().find(|c| c.id == chain_id).cloned().unwrap_or_else(|| self.home.clone()));
        }
        Err(ConnectorError::UnsupportedChain(chain_id))
    }

    fn subscribe(&self) -> EventReceiver { self.relay.subscribe() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ConnectorEvent;
    use crate::core::default_chains;
    use crate::transport::MockProvider;
    use serde_json::json;
    use std::sync::Arc;

    const ADDR: &str = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";

    fn connector(mock: MockProvider) -> (Arc<MockProvider>, BridgeConnector) {
        let mock = Arc::new(mock);
        (mock.clone(), BridgeConnector::new(mock, default_chains()))
    }

    #[tokio::test]
    async fn test_connect_binds_home_chain() {
        let (mock, bridge) = connector(MockProvider::new().with_response("eth_requestAccounts", json!([ADDR])));
        let account = bridge.connect(Some(ChainId::BASE)).await.unwrap();
        assert_eq!(account.address, ADDR.parse().unwrap());
        assert_eq!(account.chain, ChainStatus { id: ChainId::OPTIMISM, unsupported: false });
        assert_eq!(mock.call_count("eth_requestAccounts"), 1);
    }

    #[tokio::test]
    async fn test_connect_without_accounts_is_unavailable() {
        let (_, bridge) = connector(MockProvider::new().with_response("eth_requestAccounts", json!([])));
        assert!(matches!(bridge.connect(None).await, Err(ConnectorError::BackendUnavailable(_))));

        let (_, bridge) = connector(MockProvider::new().with_error("eth_requestAccounts", TransportError::Closed));
        assert!(matches!(bridge.connect(None).await, Err(ConnectorError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn test_switch_chain_never_touches_bridge() {
        let (mock, bridge) = connector(MockProvider::new());
        let chain = bridge.switch_chain(ChainId::OPTIMISM).await.unwrap();
        assert_eq!(chain.id, ChainId::OPTIMISM);
        assert_eq!(bridge.switch_chain(ChainId::MAINNET).await, Err(ConnectorError::UnsupportedChain(ChainId::MAINNET)));
        assert_eq!(bridge.switch_chain(ChainId(137)).await, Err(ConnectorError::UnsupportedChain(ChainId(137))));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_chain_id_is_fixed() {
        let (mock, bridge) = connector(MockProvider::new().with_response("eth_chainId", json!("0x1")));
        assert_eq!(bridge.chain_id().await.unwrap(), ChainId::OPTIMISM);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_is_authorized_swallows_errors() {
        let (mock, bridge) = connector(MockProvider::new().with_error("eth_accounts", TransportError::Closed));
        assert!(!bridge.is_authorized().await);
        mock.respond("eth_accounts", json!([ADDR]));
        assert!(bridge.is_authorized().await);
        mock.respond("eth_accounts", json!([]));
        assert!(!bridge.is_authorized().await);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_local() {
        let (mock, bridge) = connector(MockProvider::new());
        bridge.disconnect().await.unwrap();
        bridge.disconnect().await.unwrap();
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_wallet_client_composes_account_and_provider() {
        let (_, bridge) = connector(MockProvider::new().with_response("eth_accounts", json!([ADDR])));
        let client = bridge.wallet_client(None).await.unwrap();
        assert_eq!(client.account, ADDR.parse().unwrap());
        assert_eq!(client.chain.id, ChainId::OPTIMISM);

        let (_, bridge) = connector(MockProvider::new().with_response("eth_accounts", json!([])));
        assert!(matches!(bridge.wallet_client(None).await, Err(ConnectorError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn test_wallet_client_ignores_requested_chain() {
        let (_, bridge) = connector(MockProvider::new().with_response("eth_accounts", json!([ADDR])));
        let client = bridge.wallet_client(Some(ChainId(137))).await.unwrap();
        assert_eq!(client.chain, ChainStatus { id: ChainId::OPTIMISM, unsupported: false });

        let client = bridge.wallet_client(Some(ChainId::BASE)).await.unwrap();
        assert_eq!(client.chain.id, ChainId::OPTIMISM);
    }

    #[tokio::test]
    async fn test_relay_translates_host_notifications() {
        let (_, bridge) = connector(MockProvider::new());
        let mut rx = bridge.subscribe();
        let (tx, notifications) = futures::channel::mpsc::unbounded();
        tx.unbounded_send(HostNotification::new("accountsChanged", json!([ADDR]))).unwrap();
        tx.unbounded_send(HostNotification::new("accountsChanged", json!([]))).unwrap();
        drop(tx);
        bridge.relay(notifications).await;

        use futures::StreamExt;
        assert_eq!(rx.next().await, Some(ConnectorEvent::AccountsChanged(ADDR.parse().unwrap())));
        assert_eq!(rx.next().await, Some(ConnectorEvent::Disconnected));
    }
}
