//! File-backed stores for the native host: one JSON document per store,
//! re-read on every call so external writers are always seen.

use super::store::{clamp_max_age, CookieJar, KeyStore, StoreResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn load<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> StoreResult<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&raw)?)
}

fn save<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// localStorage stand-in: `{"<key>": "<value>", ...}`
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn open(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }

    fn read(&self) -> StoreResult<BTreeMap<String, String>> { load(&self.path) }
}

impl KeyStore for FileKeyStore {
    fn entries(&self) -> StoreResult<Vec<(String, String)>> { Ok(self.read()?.into_iter().collect()) }

    fn get(&self, key: &str) -> StoreResult<Option<String>> { Ok(self.read()?.remove(key)) }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.read()?;
        entries.insert(key.into(), value.into());
        save(&self.path, &entries)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.read()?;
        if entries.remove(key).is_some() {
            save(&self.path, &entries)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    /// Unix seconds
    expires_at: i64,
}

/// Cookie jar persisted as `{"<name>": {"value": .., "expires_at": ..}}`
#[derive(Debug, Clone)]
pub struct FileCookieJar {
    path: PathBuf,
}

impl FileCookieJar {
    pub fn open(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }

    fn read(&self) -> StoreResult<BTreeMap<String, StoredCookie>> { load(&self.path) }
}

impl CookieJar for FileCookieJar {
    fn get(&self, name: &str) -> StoreResult<Option<String>> {
        let now = Utc::now().timestamp();
        Ok(self.read()?.remove(name).filter(|c| c.expires_at > now).map(|c| c.value))
    }

    fn set(&self, name: &str, value: &str, max_age_secs: i64) -> StoreResult<()> {
        let mut cookies = self.read()?;
        let now = Utc::now().timestamp();
        cookies.retain(|_, c| c.expires_at > now);
        let expires_at = now + clamp_max_age(max_age_secs);
        cookies.insert(name.into(), StoredCookie { value: value.into(), expires_at });
        save(&self.path, &cookies)
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        let mut cookies = self.read()?;
        if cookies.remove(name).is_some() {
            save(&self.path, &cookies)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StoreError;
    use tempfile::TempDir;

    #[test]
    fn test_key_store_sees_external_writes() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("keys.json");
        let store = FileKeyStore::open(&path);
        assert!(store.entries().unwrap().is_empty());

        std::fs::write(&path, r#"{"-kiwi-news-0x0000000000000000000000000000000000000001-key": "secret"}"#).unwrap();
        assert_eq!(store.entries().unwrap().len(), 1);

        store.set("other", "value").unwrap();
        store.remove("-kiwi-news-0x0000000000000000000000000000000000000001-key").unwrap();
        assert_eq!(store.entries().unwrap(), vec![("other".to_string(), "value".to_string())]);
    }

    #[test]
    fn test_cookie_jar_expiry_and_remove() {
        let dir = TempDir::new().expect("tempdir");
        let jar = FileCookieJar::open(dir.path().join("nested").join("cookies.json"));
        jar.set("identity", "0xabc", 60).unwrap();
        assert_eq!(jar.get("identity").unwrap().as_deref(), Some("0xabc"));

        jar.set("stale", "x", -1).unwrap();
        assert_eq!(jar.get("stale").unwrap(), None);

        jar.remove("identity").unwrap();
        assert_eq!(jar.get("identity").unwrap(), None);
    }

    #[test]
    fn test_oversized_max_age_is_clamped() {
        use crate::core::names::key_entry;
        use crate::core::Address;
        use crate::identity::LocalAccounts;
        use std::sync::Arc;

        let dir = TempDir::new().expect("tempdir");
        let keys = Arc::new(FileKeyStore::open(dir.path().join("keys.json")));
        let jar = Arc::new(FileCookieJar::open(dir.path().join("cookies.json")));
        let address = Address::from_bytes([0x11; 20]);
        keys.set(&key_entry(&address), "secret").unwrap();

        let local = LocalAccounts::new(keys, jar.clone()).with_cookie_max_age(i64::MAX);
        assert_eq!(local.resolve(None).unwrap().map(|i| i.address), Some(address));
        assert_eq!(jar.get("identity").unwrap().map(|v| v.parse::<Address>().unwrap()), Some(address));

        jar.set("identity", "0x1", i64::MIN).unwrap();
        assert_eq!(jar.get("identity").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(FileKeyStore::open(&path).entries(), Err(StoreError::Corrupt(_))));
    }
}
