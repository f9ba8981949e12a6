//! Name constants: storage keys, cookies, RPC methods, host events
//!
//! Centralized registry for every string the connectors and stores agree on.

/// Local key store naming
pub mod keys {
    /// Prefix of a local signing key entry: `-kiwi-news-<address>-key`
    pub const PREFIX: &str = "-kiwi-news-";
    pub const SUFFIX: &str = "-key";
    /// Full entry pattern; capture 1 is the address
    pub const PATTERN: &str = r"^-kiwi-news-(0x[a-fA-F0-9]{40})-key$";
}

/// Cookie naming
pub mod cookies {
    pub const IDENTITY: &str = "identity";
    pub const PATH: &str = "/";
    /// Seven days
    pub const DEFAULT_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;
    /// 400 days, the cap browsers apply to `max-age`
    pub const MAX_AGE_LIMIT_SECS: i64 = 60 * 60 * 24 * 400;
}

/// EIP-1193 request methods
pub mod methods {
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
}

/// Host notification names
pub mod events {
    pub const ACCOUNTS_CHANGED: &str = "accountsChanged";
    pub const CHAIN_CHANGED: &str = "chainChanged";
    pub const DISCONNECT: &str = "disconnect";
}

/// EIP-1193 provider error codes
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
}

/// Document-root class set by the iOS shell
pub const IOS_APP_CLASS: &str = "kiwi-ios-app";

/// Key store entry name for an address.
pub fn key_entry(address: &crate::core::Address) -> String {
    format!("{}{}{}", keys::PREFIX, address.to_lower_hex(), keys::SUFFIX)
}
