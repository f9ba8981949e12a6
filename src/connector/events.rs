//! Connector events: typed fan-out plus translation of raw backend notifications

use crate::core::names::events;
use crate::core::{Address, Chain, ChainId, ChainStatus};
use crate::transport::{parse_accounts, HostNotification};
use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorEvent {
    AccountsChanged(Address),
    ChainChanged(ChainStatus),
    Disconnected,
}

pub type EventReceiver = mpsc::UnboundedReceiver<ConnectorEvent>;

/// Fan-out to subscribers. Each emitted event reaches each live subscriber once;
/// dropped receivers are pruned on the next emit.
#[derive(Default)]
pub struct EventHub {
    watchers: Mutex<Vec<mpsc::UnboundedSender<ConnectorEvent>>>,
}

impl EventHub {
    pub fn new() -> Self { Self::default() }

    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded();
        if let Ok(mut watchers) = self.watchers.lock() { watchers.push(tx); }
        rx
    }

    pub fn emit(&self, event: ConnectorEvent) {
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.retain(|tx| tx.unbounded_send(event).is_ok());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.watchers.lock().map(|w| w.len()).unwrap_or(0)
    }
}

/// Backend-side event handling shared by connectors: keeps the cached account
/// in step with notifications and re-emits them as `ConnectorEvent`s.
pub struct EventRelay {
    hub: EventHub,
    chains: Vec<Chain>,
    account: Mutex<Option<Address>>,
}

impl EventRelay {
    pub fn new(chains: Vec<Chain>) -> Self {
        Self { hub: EventHub::new(), chains, account: Mutex::new(None) }
    }

    pub fn chains(&self) -> &[Chain] { &self.chains }
    pub fn subscribe(&self) -> EventReceiver { self.hub.subscribe() }

    pub fn cached_account(&self) -> Option<Address> {
        self.account.lock().ok().and_then(|a| *a)
    }

    pub fn set_account(&self, account: Option<Address>) {
        if let Ok(mut cached) = self.account.lock() { *cached = account; }
    }

    pub fn on_accounts_changed(&self, accounts: &[Address]) {
        match accounts.first() {
            None => {
                self.set_account(None);
                self.hub.emit(ConnectorEvent::Disconnected);
            }
            Some(&first) => {
                self.set_account(Some(first));
                self.hub.emit(ConnectorEvent::AccountsChanged(first));
            }
        }
    }

    pub fn on_chain_changed(&self, chain_id: ChainId) {
        self.hub.emit(ConnectorEvent::ChainChanged(ChainStatus::against(chain_id, &self.chains)));
    }

    pub fn on_disconnect(&self, reason: &str) {
        tracing::debug!(reason, "backend disconnected");
        self.set_account(None);
        self.hub.emit(ConnectorEvent::Disconnected);
    }

    /// Dispatch one raw notification. Malformed ones are logged and dropped.
    pub fn handle(&self, notification: &HostNotification) {
        match notification.event.as_str() {
            events::ACCOUNTS_CHANGED => match parse_accounts(&notification.data) {
                Ok(accounts) => self.on_accounts_changed(&accounts),
                Err(e) => tracing::warn!("ignoring accountsChanged: {}", e),
            },
            events::CHAIN_CHANGED => match ChainId::from_value(&notification.data) {
                Some(id) => self.on_chain_changed(id),
                None => tracing::warn!("ignoring chainChanged: {}", notification.data),
            },
            events::DISCONNECT => {
                let reason = notification.data.as_str().map(String::from).unwrap_or_else(|| notification.data.to_string());
                self.on_disconnect(&reason);
            }
            other => tracing::debug!(event = other, "unhandled backend notification"),
        }
    }

    /// Relay notifications until the stream ends.
    pub async fn relay<S>(&self, mut notifications: S)
    where
        S: Stream<Item = HostNotification> + Unpin,
    {
        while let Some(n) = notifications.next().await {
            self.handle(&n);
        }
        tracing::debug!("notification stream ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::default_chains;
    use serde_json::json;

    const ADDR: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    fn drain(rx: &mut EventReceiver) -> Vec<ConnectorEvent> {
        let mut out = Vec::new();
        while let Ok(Some(e)) = rx.try_next() { out.push(e); }
        out
    }

    #[test]
    fn test_empty_accounts_emit_single_disconnect() {
        let relay = EventRelay::new(default_chains());
        let mut rx = relay.subscribe();
        relay.handle(&HostNotification::new("accountsChanged", json!([])));
        assert_eq!(drain(&mut rx), vec![ConnectorEvent::Disconnected]);
    }

    #[test]
    fn test_accounts_changed_carries_first_address() {
        let relay = EventRelay::new(default_chains());
        let mut rx = relay.subscribe();
        relay.handle(&HostNotification::new("accountsChanged", json!([ADDR])));
        let addr: Address = ADDR.parse().unwrap();
        assert_eq!(drain(&mut rx), vec![ConnectorEvent::AccountsChanged(addr)]);
        assert_eq!(relay.cached_account(), Some(addr));
    }

    #[test]
    fn test_chain_changed_flags_unsupported() {
        let relay = EventRelay::new(default_chains());
        let mut rx = relay.subscribe();
        relay.handle(&HostNotification::new("chainChanged", json!("0x89")));
        relay.handle(&HostNotification::new("chainChanged", json!(10)));
        assert_eq!(
            drain(&mut rx),
            vec![
                ConnectorEvent::ChainChanged(ChainStatus { id: ChainId(137), unsupported: true }),
                ConnectorEvent::ChainChanged(ChainStatus { id: ChainId::OPTIMISM, unsupported: false }),
            ]
        );
    }

    #[test]
    fn test_malformed_notifications_are_dropped() {
        let relay = EventRelay::new(default_chains());
        let mut rx = relay.subscribe();
        relay.handle(&HostNotification::new("accountsChanged", json!("not-a-list")));
        relay.handle(&HostNotification::new("chainChanged", json!({})));
        relay.handle(&HostNotification::new("message", json!({"type": "x"})));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_each_subscriber_gets_each_event_once() {
        let hub = EventHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        let c = hub.subscribe();
        drop(c);
        hub.emit(ConnectorEvent::Disconnected);
        assert_eq!(drain(&mut a), vec![ConnectorEvent::Disconnected]);
        assert_eq!(drain(&mut b), vec![ConnectorEvent::Disconnected]);
        assert_eq!(hub.subscriber_count(), 2);
    }
}
