//! Integration Tests: BridgeConnector over the JSON-lines host bridge
//!
//! A fake iOS host answers requests on one end of an in-memory duplex
//! pipe and pushes notifications before hanging up.

use futures::StreamExt;
use kiwi_connect::core::default_chains;
use kiwi_connect::{
    Address, BridgeConnector, ChainId, ChainStatus, Connector, ConnectorError, ConnectorEvent, JsonLinesBridge,
    RpcRequest,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::runtime::Runtime;

const WALLET: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

/// Answers account requests; after the first `eth_accounts` it pushes a
/// chain change and an empty account list, then closes the pipe.
async fn fake_host(io: DuplexStream) -> Vec<String> {
    let (reader, mut writer) = tokio::io::split(io);
    let mut lines = BufReader::new(reader).lines();
    let mut seen = Vec::new();

    while let Ok(Some(line)) = lines.next_line().await {
        let request: Value = serde_json::from_str(&line).expect("request json");
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let reply = match method.as_str() {
            "eth_requestAccounts" | "eth_accounts" => json!({"id": request["id"], "result": [WALLET]}),
            _ => json!({"id": request["id"], "error": {"code": 4200, "message": "unsupported"}}),
        };
        writer.write_all(format!("{}\n", reply).as_bytes()).await.expect("write");
        seen.push(method.clone());

        if method == "eth_accounts" {
            for note in [json!({"event": "chainChanged", "data": "0x2105"}), json!({"event": "accountsChanged", "data": []})] {
                writer.write_all(format!("{}\n", note).as_bytes()).await.expect("write");
            }
            writer.flush().await.expect("flush");
            break;
        }
    }
    seen
}

/// Test: connect, authorize and relay host notifications end to end
#[test]
fn bridge_roundtrip_and_notifications() {
    let rt = Runtime::new().expect("runtime");
    rt.block_on(async {
        let (client, host) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(client);
        let (bridge, notifications) = JsonLinesBridge::spawn(reader, writer);
        let host = tokio::spawn(fake_host(host));

        let connector = Arc::new(BridgeConnector::new(Arc::new(bridge), default_chains()));
        let mut events = connector.subscribe();

        let account = connector.connect(Some(ChainId::MAINNET)).await.expect("connect");
        assert_eq!(account.address, WALLET.parse::<Address>().expect("address"));
        assert_eq!(account.chain, ChainStatus { id: ChainId::OPTIMISM, unsupported: false });

        // Home chain answers locally
        assert_eq!(connector.chain_id().await.expect("chain"), ChainId::OPTIMISM);
        assert_eq!(connector.switch_chain(ChainId::OPTIMISM).await.expect("switch").id, ChainId::OPTIMISM);
        assert_eq!(
            connector.switch_chain(ChainId::BASE).await.expect_err("pinned"),
            ConnectorError::UnsupportedChain(ChainId::BASE)
        );

        assert!(connector.is_authorized().await);

        let relay = {
            let connector = connector.clone();
            tokio::spawn(async move { connector.relay(notifications).await })
        };
        relay.await.expect("relay");

        assert_eq!(
            events.next().await,
            Some(ConnectorEvent::ChainChanged(ChainStatus { id: ChainId::BASE, unsupported: false }))
        );
        assert_eq!(events.next().await, Some(ConnectorEvent::Disconnected));
        // Host is gone once the notification stream has ended
        assert!(matches!(connector.account().await, Err(ConnectorError::BackendUnavailable(_))));

        let seen = host.await.expect("host");
        assert_eq!(seen, vec!["eth_requestAccounts", "eth_accounts"]);
    });
}

/// Test: host hangup turns every call into a backend failure, but
/// disconnect still succeeds
#[test]
fn bridge_host_hangup() {
    let rt = Runtime::new().expect("runtime");
    rt.block_on(async {
        let (client, host) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(client);
        let (bridge, _notifications) = JsonLinesBridge::spawn(reader, writer);
        drop(host);

        let bridge = Arc::new(bridge);
        let connector = BridgeConnector::new(bridge.clone(), default_chains());

        assert!(matches!(connector.connect(None).await, Err(ConnectorError::BackendUnavailable(_))));
        assert!(!connector.is_authorized().await);
        assert!(connector.disconnect().await.is_ok());
        assert!(bridge.is_closed());
        assert!(kiwi_connect::Provider::request(bridge.as_ref(), RpcRequest::new("eth_accounts")).await.is_err());
    });
}
