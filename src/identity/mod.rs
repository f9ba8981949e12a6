//! Identity - local signing identities and the active-identity pointer
//!
//! A local identity is key material provisioned into the browser's key/value
//! store under `-kiwi-news-<address>-key`. When several exist, a short-lived
//! `identity=<address>` cookie says which one is active. The cookie never
//! owns the key; the key store does.
//!
//! # Resolution
//!
//! | Stored keys | `preferred` | Result | Cookie |
//! |-------------|-------------|--------|--------|
//! | 1 | any | that key | set to it |
//! | >1 | matches one | that key | unchanged |
//! | >1 | none / no match | none (ambiguous) | unchanged |
//! | 0 | some | none | set to `preferred` |
//! | 0 | none | none | unchanged |
//!
//! The single-key row ignores `preferred` even when it names another address.
//! Entries that differ only in hex case but hold different secrets count
//! separately and never resolve.

mod cookie;
#[cfg(feature = "native")]
mod file;
mod store;

pub use cookie::{format_cookie, parse_cookie, DocumentCookieJar};
#[cfg(feature = "native")]
pub use file::{FileCookieJar, FileKeyStore};
pub use store::{clamp_max_age, CookieJar, KeyStore, MemoryCookieJar, MemoryKeyStore, StoreError, StoreResult};

use crate::core::names::{cookies, keys};
use crate::core::Address;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Opaque secret string. Redacted in `Debug`, wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(secret: impl Into<String>) -> Self { Self(secret.into()) }
    pub fn expose(&self) -> &str { &self.0 }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("SecretKey(<redacted>)") }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub address: Address,
    pub private_key: SecretKey,
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(keys::PATTERN).expect("static key pattern"))
}

/// Matching key entries, grouped by address. Entries whose names differ
/// only in hex case land on the same address; distinct secrets are all
/// kept so that address counts once per secret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalKeys {
    by_address: BTreeMap<Address, Vec<SecretKey>>,
}

impl LocalKeys {
    fn insert(&mut self, address: Address, secret: SecretKey) {
        let secrets = self.by_address.entry(address).or_default();
        if secrets.contains(&secret) {
            return;
        }
        if !secrets.is_empty() {
            tracing::warn!(%address, "conflicting key entries for one address");
        }
        secrets.push(secret);
    }

    /// Number of distinct key entries.
    pub fn len(&self) -> usize { self.by_address.values().map(Vec::len).sum() }
    pub fn is_empty(&self) -> bool { self.by_address.is_empty() }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> { self.by_address.keys() }
    pub fn contains(&self, address: &Address) -> bool { self.by_address.contains_key(address) }

    /// Addresses stored under more than one distinct secret.
    pub fn conflicts(&self) -> impl Iterator<Item = &Address> {
        self.by_address.iter().filter(|(_, s)| s.len() > 1).map(|(a, _)| a)
    }

    /// The secret for `address`, unless it is missing or conflicted.
    pub fn get(&self, address: &Address) -> Option<&SecretKey> {
        match self.by_address.get(address).map(Vec::as_slice) {
            Some([secret]) => Some(secret),
            _ => None,
        }
    }

    fn take(mut self, address: &Address) -> Option<LocalIdentity> {
        match self.by_address.remove(address) {
            Some(mut secrets) if secrets.len() == 1 => {
                secrets.pop().map(|private_key| LocalIdentity { address: *address, private_key })
            }
            Some(_) => {
                tracing::warn!(%address, "local identity ambiguous: conflicting key entries");
                None
            }
            None => None,
        }
    }

    fn into_single(self) -> Option<LocalIdentity> {
        if self.len() != 1 {
            return None;
        }
        let (address, mut secrets) = self.by_address.into_iter().next()?;
        secrets.pop().map(|private_key| LocalIdentity { address, private_key })
    }
}

/// Every store entry whose name matches the key pattern, grouped by address.
/// Other entries are ignored whatever their value looks like.
pub fn scan_local_keys(store: &dyn KeyStore) -> StoreResult<LocalKeys> {
    let pattern = key_pattern();
    let mut found = LocalKeys::default();
    for (name, value) in store.entries()? {
        let Some(caps) = pattern.captures(&name) else { continue };
        match caps[1].parse::<Address>() {
            Ok(address) => found.insert(address, SecretKey::new(value)),
            Err(e) => tracing::warn!(entry = %name, "skipping key entry: {}", e),
        }
    }
    Ok(found)
}

/// Key store + cookie pointer, read fresh on every call.
#[derive(Clone)]
pub struct LocalAccounts {
    keys: Arc<dyn KeyStore>,
    cookies: Arc<dyn CookieJar>,
    cookie_max_age: i64,
}

impl LocalAccounts {
    pub fn new(keys: Arc<dyn KeyStore>, cookies: Arc<dyn CookieJar>) -> Self {
        Self { keys, cookies, cookie_max_age: cookies::DEFAULT_MAX_AGE_SECS }
    }

    pub fn with_cookie_max_age(mut self, secs: i64) -> Self { self.cookie_max_age = secs; self }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> { &self.keys }
    pub fn cookie_jar(&self) -> &Arc<dyn CookieJar> { &self.cookies }

    pub fn scan(&self) -> StoreResult<LocalKeys> { scan_local_keys(self.keys.as_ref()) }

    /// Point the active-identity cookie at `address`.
    pub fn remember(&self, address: &Address) -> StoreResult<()> {
        self.cookies.set(cookies::IDENTITY, &address.to_string(), self.cookie_max_age)
    }

    pub fn forget(&self) -> StoreResult<()> { self.cookies.remove(cookies::IDENTITY) }

    /// The cookie pointer, if it still names a stored identity. A pointer
    /// whose target is gone while other keys remain is stale and is cleared;
    /// with no keys stored it is left for a not-yet-provisioned identity.
    pub fn active(&self) -> StoreResult<Option<Address>> {
        let Some(raw) = self.cookies.get(cookies::IDENTITY)? else { return Ok(None) };
        let stored = self.scan()?;
        match raw.parse::<Address>() {
            Ok(address) if stored.contains(&address) => Ok(Some(address)),
            Ok(address) => {
                if !stored.is_empty() {
                    tracing::debug!(%address, "clearing stale identity cookie");
                    self.forget()?;
                }
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("clearing malformed identity cookie: {}", e);
                self.forget()?;
                Ok(None)
            }
        }
    }

    pub fn resolve(&self, preferred: Option<&Address>) -> StoreResult<Option<LocalIdentity>> {
        let stored = self.scan()?;
        match (stored.len(), preferred) {
            (1, _) => {
                let Some(identity) = stored.into_single() else { return Ok(None) };
                self.remember(&identity.address)?;
                Ok(Some(identity))
            }
            (0, Some(preferred)) => {
                self.remember(preferred)?;
                Ok(None)
            }
            (_, Some(preferred)) => Ok(stored.take(preferred)),
            (n, None) => {
                if n > 1 {
                    tracing::debug!(count = n, "local identity ambiguous without a preference");
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::names::key_entry;

    const A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

    fn addr(s: &str) -> Address { s.parse().unwrap() }

    fn accounts(entries: &[(&str, &str)]) -> (Arc<MemoryCookieJar>, LocalAccounts) {
        let store = MemoryKeyStore::new();
        for (a, secret) in entries {
            store.set(&key_entry(&addr(a)), secret).unwrap();
        }
        let jar = Arc::new(MemoryCookieJar::new());
        (jar.clone(), LocalAccounts::new(Arc::new(store), jar))
    }

    fn cookie(jar: &MemoryCookieJar) -> Option<Address> {
        jar.get("identity").unwrap().map(|v| v.parse().unwrap())
    }

    #[test]
    fn test_scan_only_matches_pattern() {
        let store = MemoryKeyStore::new()
            .with_entry(&format!("-kiwi-news-{}-key", A), "secret-a")
            .with_entry(&format!("-kiwi-news-{}-key", B.to_uppercase().replace("0X", "0x")), "secret-b")
            .with_entry(&format!("kiwi-news-{}-key", C), "0xdeadbeef")
            .with_entry(&format!("-kiwi-news-{}-key-backup", C), "0xdeadbeef")
            .with_entry("-kiwi-news-0x1234-key", "short")
            .with_entry("theme", "dark");
        let found = scan_local_keys(&store).unwrap();
        assert_eq!(found.addresses().copied().collect::<Vec<_>>(), vec![addr(A), addr(B)]);
        assert_eq!(found.get(&addr(A)).map(SecretKey::expose), Some("secret-a"));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_single_entry_wins_regardless_of_preference() {
        let (jar, local) = accounts(&[(A, "secret-a")]);
        let identity = local.resolve(Some(&addr(B))).unwrap().expect("identity");
        assert_eq!(identity.address, addr(A));
        assert_eq!(identity.private_key.expose(), "secret-a");
        assert_eq!(cookie(&jar), Some(addr(A)));
    }

    #[test]
    fn test_multiple_entries_need_exact_preference() {
        let (jar, local) = accounts(&[(A, "secret-a"), (B, "secret-b")]);
        local.remember(&addr(C)).unwrap();

        assert_eq!(local.resolve(None).unwrap(), None);
        assert_eq!(local.resolve(Some(&addr(C))).unwrap(), None);
        assert_eq!(cookie(&jar), Some(addr(C)));

        let identity = local.resolve(Some(&addr(B))).unwrap().expect("identity");
        assert_eq!(identity.private_key.expose(), "secret-b");
        assert_eq!(cookie(&jar), Some(addr(C)));
    }

    #[test]
    fn test_case_variants_with_different_secrets_are_ambiguous() {
        let upper = format!("0x{}", &A[2..].to_uppercase());
        let store = MemoryKeyStore::new()
            .with_entry(&format!("-kiwi-news-{}-key", A), "secret-lower")
            .with_entry(&format!("-kiwi-news-{}-key", upper), "secret-upper");
        let found = scan_local_keys(&store).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.conflicts().copied().collect::<Vec<_>>(), vec![addr(A)]);
        assert_eq!(found.get(&addr(A)), None);

        let jar = Arc::new(MemoryCookieJar::new());
        let local = LocalAccounts::new(Arc::new(store), jar.clone());
        local.remember(&addr(B)).unwrap();
        assert_eq!(local.resolve(None).unwrap(), None);
        assert_eq!(local.resolve(Some(&addr(A))).unwrap(), None);
        assert_eq!(cookie(&jar), Some(addr(B)));
    }

    #[test]
    fn test_case_variants_with_same_secret_are_one_entry() {
        let upper = format!("0x{}", &A[2..].to_uppercase());
        let store = MemoryKeyStore::new()
            .with_entry(&format!("-kiwi-news-{}-key", A), "secret-a")
            .with_entry(&format!("-kiwi-news-{}-key", upper), "secret-a");
        let jar = Arc::new(MemoryCookieJar::new());
        let local = LocalAccounts::new(Arc::new(store), jar.clone());

        assert_eq!(local.scan().unwrap().len(), 1);
        let identity = local.resolve(None).unwrap().expect("identity");
        assert_eq!(identity.private_key.expose(), "secret-a");
        assert_eq!(cookie(&jar), Some(addr(A)));
    }

    #[test]
    fn test_no_entries_remembers_preference() {
        let (jar, local) = accounts(&[]);
        assert_eq!(local.resolve(Some(&addr(B))).unwrap(), None);
        assert_eq!(cookie(&jar), Some(addr(B)));

        let (jar, local) = accounts(&[]);
        assert_eq!(local.resolve(None).unwrap(), None);
        assert_eq!(cookie(&jar), None);
    }

    #[test]
    fn test_active_pointer_staleness() {
        let (jar, local) = accounts(&[(A, "a"), (B, "b")]);
        local.remember(&addr(B)).unwrap();
        assert_eq!(local.active().unwrap(), Some(addr(B)));

        // Target cleared from the key store while others remain
        local.key_store().remove(&key_entry(&addr(B))).unwrap();
        local.key_store().set(&key_entry(&addr(C)), "c").unwrap();
        assert_eq!(local.active().unwrap(), None);
        assert_eq!(cookie(&jar), None);
    }

    #[test]
    fn test_active_pointer_kept_while_store_empty() {
        let (jar, local) = accounts(&[]);
        local.remember(&addr(A)).unwrap();
        assert_eq!(local.active().unwrap(), None);
        assert_eq!(cookie(&jar), Some(addr(A)));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let identity = LocalIdentity { address: addr(A), private_key: SecretKey::new("0xsecret") };
        assert!(!format!("{:?}", identity).contains("0xsecret"));
    }
}
