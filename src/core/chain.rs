//! Chains - network identifiers and the configured chain list

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const MAINNET: ChainId = ChainId(1);
    pub const OPTIMISM: ChainId = ChainId(10);
    pub const BASE: ChainId = ChainId(8453);
    pub const ARBITRUM: ChainId = ChainId(42161);

    /// `0x`-prefixed hex, as `wallet_switchEthereumChain` expects.
    pub fn to_hex(&self) -> String { format!("{:#x}", self.0) }

    /// Parse a chain id from a provider value: `"0xa"`, `"10"` or `10`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(ChainId),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok().map(ChainId),
            None => s.parse().ok().map(ChainId),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self { ChainId(id) }
}

/// A network the client knows how to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub id: ChainId,
    pub name: String,
}

impl Chain {
    pub fn new(id: ChainId, name: impl Into<String>) -> Self { Self { id, name: name.into() } }
    pub fn optimism() -> Self { Self::new(ChainId::OPTIMISM, "OP Mainnet") }
    pub fn mainnet() -> Self { Self::new(ChainId::MAINNET, "Ethereum") }
    pub fn arbitrum() -> Self { Self::new(ChainId::ARBITRUM, "Arbitrum One") }
    pub fn base() -> Self { Self::new(ChainId::BASE, "Base") }
}

/// Default chain list, in preference order.
pub fn default_chains() -> Vec<Chain> {
    vec![Chain::optimism(), Chain::mainnet(), Chain::arbitrum(), Chain::base()]
}

/// Active chain as reported to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
    pub id: ChainId,
    pub unsupported: bool,
}

impl ChainStatus {
    pub fn against(id: ChainId, chains: &[Chain]) -> Self {
        Self { id, unsupported: !chains.iter().any(|c| c.id == id) }
    }
}
