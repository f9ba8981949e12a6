//! document.cookie formatting, lookup, and a jar over the cookie string
//!
//! A browser host mirrors `document.cookie` into a `DocumentCookieJar` and
//! applies the `Set-Cookie`-style strings it hands back. The browser owns
//! expiry, so the mirrored string only ever holds live cookies.

use super::store::{clamp_max_age, CookieJar, StoreError, StoreResult};
use crate::core::names::cookies;
use std::sync::Mutex;

/// `name=value;path=/;max-age=<secs>`
pub fn format_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!("{}={};path={};max-age={}", name, value, cookies::PATH, max_age_secs)
}

/// Find `name` in a `a=1; b=2` cookie string. The value is percent-decoded;
/// undecodable values are returned as-is.
pub fn parse_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim_start)
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| percent_decode(v).unwrap_or_else(|| v.to_string()))
}

fn percent_decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let mut byte = [0u8; 1];
            hex::decode_to_slice(hex, &mut byte).ok()?;
            out.push(byte[0]);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[derive(Default)]
struct Document {
    header: String,
    writes: Vec<String>,
}

/// Cookie jar backed by a mirrored `document.cookie` string.
#[derive(Default)]
pub struct DocumentCookieJar {
    document: Mutex<Document>,
}

impl DocumentCookieJar {
    pub fn new(header: impl Into<String>) -> Self {
        Self { document: Mutex::new(Document { header: header.into(), writes: Vec::new() }) }
    }

    /// Replace the mirrored string with the browser's current `document.cookie`.
    pub fn sync(&self, header: impl Into<String>) -> StoreResult<()> {
        self.document.lock().map_err(|_| StoreError::Lock)?.header = header.into();
        Ok(())
    }

    pub fn header(&self) -> StoreResult<String> {
        Ok(self.document.lock().map_err(|_| StoreError::Lock)?.header.clone())
    }

    /// Cookie strings to assign to `document.cookie`, oldest first.
    pub fn drain_writes(&self) -> StoreResult<Vec<String>> {
        Ok(std::mem::take(&mut self.document.lock().map_err(|_| StoreError::Lock)?.writes))
    }

    fn write(&self, name: &str, value: Option<&str>, max_age_secs: i64) -> StoreResult<()> {
        let mut document = self.document.lock().map_err(|_| StoreError::Lock)?;
        let mut pairs: Vec<String> = document
            .header
            .split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty() && pair.split_once('=').map_or(*pair, |(k, _)| k) != name)
            .map(String::from)
            .collect();
        if let Some(value) = value {
            pairs.push(format!("{}={}", name, value));
        }
        document.header = pairs.join("; ");
        document.writes.push(format_cookie(name, value.unwrap_or_default(), max_age_secs));
        Ok(())
    }
}

impl CookieJar for DocumentCookieJar {
    fn get(&self, name: &str) -> StoreResult<Option<String>> {
        Ok(parse_cookie(&self.header()?, name))
    }

    fn set(&self, name: &str, value: &str, max_age_secs: i64) -> StoreResult<()> {
        let max_age = clamp_max_age(max_age_secs);
        let live = if max_age > 0 { Some(value) } else { None };
        self.write(name, live, max_age)
    }

    fn remove(&self, name: &str) -> StoreResult<()> { self.write(name, None, 0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::names::key_entry;
    use crate::core::Address;
    use crate::identity::{KeyStore, LocalAccounts, MemoryKeyStore};
    use std::sync::Arc;

    #[test]
    fn test_format_cookie() {
        assert_eq!(
            format_cookie("identity", "0xabc", 604800),
            "identity=0xabc;path=/;max-age=604800"
        );
    }

    #[test]
    fn test_parse_cookie_exact_name() {
        let header = "theme=dark; myidentity=0x1; identity=0xabc%20; other=1";
        assert_eq!(parse_cookie(header, "identity").as_deref(), Some("0xabc "));
        assert_eq!(parse_cookie(header, "missing"), None);
        assert_eq!(parse_cookie("identity=%zz", "identity").as_deref(), Some("%zz"));
    }

    #[test]
    fn test_document_jar_tracks_writes() {
        let jar = DocumentCookieJar::new("theme=dark; identity=0xold");
        assert_eq!(jar.get("identity").unwrap().as_deref(), Some("0xold"));

        jar.set("identity", "0xnew", 60).unwrap();
        assert_eq!(jar.header().unwrap(), "theme=dark; identity=0xnew");

        jar.remove("identity").unwrap();
        assert_eq!(jar.get("identity").unwrap(), None);
        assert_eq!(jar.header().unwrap(), "theme=dark");
        assert_eq!(
            jar.drain_writes().unwrap(),
            vec!["identity=0xnew;path=/;max-age=60".to_string(), "identity=;path=/;max-age=0".to_string()]
        );
        assert!(jar.drain_writes().unwrap().is_empty());
    }

    #[test]
    fn test_document_jar_behind_local_accounts() {
        let address = Address::from_bytes([0x22; 20]);
        let keys = Arc::new(MemoryKeyStore::new());
        keys.set(&key_entry(&address), "secret").unwrap();
        let jar = Arc::new(DocumentCookieJar::new(""));
        let local = LocalAccounts::new(keys, jar.clone()).with_cookie_max_age(i64::MAX);

        let identity = local.resolve(None).unwrap().expect("identity");
        assert_eq!(identity.address, address);
        assert_eq!(local.active().unwrap(), Some(address));
        assert_eq!(
            jar.drain_writes().unwrap(),
            vec![format_cookie("identity", &address.to_string(), cookies::MAX_AGE_LIMIT_SECS)]
        );

        // Browser dropped the cookie
        jar.sync("").unwrap();
        assert_eq!(local.active().unwrap(), None);
    }
}
