//! Stores: durable key material and the short-lived active-identity pointer
//!
//! `KeyStore` owns secrets (browser localStorage). `CookieJar` holds only a
//! pointer by address with an expiry (document.cookie). Neither caches reads.

use crate::core::names::cookies;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store data corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Lock,
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait KeyStore: Send + Sync {
    fn entries(&self) -> StoreResult<Vec<(String, String)>>;
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

pub trait CookieJar: Send + Sync {
    /// Expired cookies read as absent.
    fn get(&self, name: &str) -> StoreResult<Option<String>>;
    /// `max_age_secs` is clamped to `±cookies::MAX_AGE_LIMIT_SECS`;
    /// zero or negative expires the cookie immediately.
    fn set(&self, name: &str, value: &str, max_age_secs: i64) -> StoreResult<()>;
    fn remove(&self, name: &str) -> StoreResult<()>;
}

/// Clamp a cookie lifetime the way browsers do.
pub fn clamp_max_age(max_age_secs: i64) -> i64 {
    max_age_secs.clamp(-cookies::MAX_AGE_LIMIT_SECS, cookies::MAX_AGE_LIMIT_SECS)
}

#[derive(Default)]
pub struct MemoryKeyStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() { entries.insert(key.into(), value.into()); }
        self
    }
}

impl KeyStore for MemoryKeyStore {
    fn entries(&self) -> StoreResult<Vec<(String, String)>> {
        let entries = self.entries.lock().map_err(|_| StoreError::Lock)?;
        Ok(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.lock().map_err(|_| StoreError::Lock)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.lock().map_err(|_| StoreError::Lock)?.insert(key.into(), value.into());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().map_err(|_| StoreError::Lock)?.remove(key);
        Ok(())
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
    clock: Clock,
}

impl Default for MemoryCookieJar {
    fn default() -> Self { Self::new() }
}

impl MemoryCookieJar {
    pub fn new() -> Self { Self::with_clock(Arc::new(Utc::now)) }

    pub fn with_clock(clock: Clock) -> Self { Self { cookies: Mutex::new(HashMap::new()), clock } }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> StoreResult<Option<String>> {
        let now = (self.clock)();
        let cookies = self.cookies.lock().map_err(|_| StoreError::Lock)?;
        Ok(cookies.get(name).filter(|(_, expires)| *expires > now).map(|(v, _)| v.clone()))
    }

    fn set(&self, name: &str, value: &str, max_age_secs: i64) -> StoreResult<()> {
        let expires = (self.clock)() + Duration::seconds(clamp_max_age(max_age_secs));
        self.cookies.lock().map_err(|_| StoreError::Lock)?.insert(name.into(), (value.into(), expires));
        Ok(())
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        self.cookies.lock().map_err(|_| StoreError::Lock)?.remove(name);
        Ok(())
    }
}
