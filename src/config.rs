//! Client configuration - decided once at startup, passed down explicitly

use crate::core::names::{cookies, IOS_APP_CLASS};
use crate::core::{default_chains, Chain};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Which connector set the client runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Embedded in the iOS app; the host bridge is the only wallet
    NativeBridge,
    #[default]
    Browser,
}

impl Environment {
    /// Detect from the document root's class list.
    pub fn from_root_classes(classes: &str) -> Self {
        if classes.split_whitespace().any(|c| c == IOS_APP_CLASS) { Self::NativeBridge } else { Self::Browser }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::NativeBridge => "native-bridge",
            Environment::Browser => "browser",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "native" | "native-bridge" | "ios" => Ok(Environment::NativeBridge),
            "browser" | "web" => Ok(Environment::Browser),
            _ => Err(UnknownEnvironment(value.to_string())),
        }
    }
}

/// Device traits that decide the browser wallet list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    pub touch: bool,
    pub width: u32,
}

impl Default for Device {
    fn default() -> Self { Self { touch: false, width: 1280 } }
}

impl Device {
    pub fn mobile() -> Self { Self { touch: true, width: 390 } }
    pub fn is_desktop(&self) -> bool { !self.touch && self.width > 800 }
}

/// Client configuration. Higher layers construct this.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub app: String,
    pub app_name: String,
    pub project_id: Option<String>,
    pub chains: Vec<Chain>,
    pub environment: Environment,
    pub device: Device,
    pub data_root: Option<PathBuf>,
    pub cookie_max_age: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app: "kiwi-connect".into(),
            app_name: "Kiwi News".into(),
            project_id: None,
            chains: default_chains(),
            environment: Environment::default(),
            device: Device::default(),
            data_root: None,
            cookie_max_age: cookies::DEFAULT_MAX_AGE_SECS,
        }
    }
}

impl ClientConfig {
    pub fn new(app: impl Into<String>) -> Self { Self { app: app.into(), ..Default::default() } }
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self { self.app_name = name.into(); self }
    pub fn with_project_id(mut self, id: impl Into<String>) -> Self { self.project_id = Some(id.into()); self }
    pub fn with_chains(mut self, chains: Vec<Chain>) -> Self { self.chains = chains; self }
    pub fn with_environment(mut self, env: Environment) -> Self { self.environment = env; self }
    pub fn with_device(mut self, device: Device) -> Self { self.device = device; self }
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self { self.data_root = Some(root.into()); self }
    pub fn with_cookie_max_age(mut self, secs: i64) -> Self { self.cookie_max_age = secs; self }

    /// Overlay `KIWI_*` environment variables on the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::new(std::env::var("KIWI_APP").unwrap_or_else(|_| "kiwi-connect".into()));
        if let Ok(id) = std::env::var("KIWI_PROJECT_ID") { config.project_id = Some(id); }
        if let Ok(root) = std::env::var("KIWI_ROOT") { config.data_root = Some(PathBuf::from(root)); }
        match std::env::var("KIWI_ENV").map(|v| v.parse::<Environment>()) {
            Ok(Ok(env)) => config.environment = env,
            Ok(Err(e)) => tracing::warn!("ignoring KIWI_ENV: {}", e),
            Err(_) => {}
        }
        match std::env::var("KIWI_COOKIE_MAX_AGE").map(|v| v.trim().parse::<i64>()) {
            Ok(Ok(secs)) if (1..=cookies::MAX_AGE_LIMIT_SECS).contains(&secs) => config.cookie_max_age = secs,
            Ok(Ok(secs)) => tracing::warn!(
                "ignoring KIWI_COOKIE_MAX_AGE={}: must be 1..={}",
                secs,
                cookies::MAX_AGE_LIMIT_SECS
            ),
            Ok(Err(e)) => tracing::warn!("ignoring KIWI_COOKIE_MAX_AGE: {}", e),
            Err(_) => {}
        }
        config
    }

    /// `<root>/<app>/data`, root from `data_root` or the platform data dir.
    #[cfg(feature = "native")]
    pub fn data_dir(&self) -> PathBuf {
        let root = self
            .data_root
            .clone()
            .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")));
        root.join(&self.app).join("data")
    }
}
