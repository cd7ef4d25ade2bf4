use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::error::{RelayError, Result};
use crate::loader::CacheFailurePolicy;
use crate::view::LocalePreferences;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub cache: CacheConfig,
    pub locales: LocaleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: String,
    pub key_prefix: String,
    pub ttl_secs: u64,
    pub on_unavailable: CacheFailurePolicy,
    /// Sweep interval for the in-memory backend; 0 disables the sweep.
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub display: Vec<String>,
    pub flavor: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_URL.to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: String::new(),
            ttl_secs: crate::cache::CACHE_TTL.as_secs(),
            on_unavailable: CacheFailurePolicy::Bypass,
            cleanup_interval_secs: 3600,
        }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        let prefs = LocalePreferences::default();
        Self {
            display: prefs.display,
            flavor: prefs.flavor,
        }
    }
}

impl Config {
    /// Reads the TOML file named by `CONFIG_PATH` if set, otherwise starts
    /// from defaults; then applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RelayError::Config(e.to_string()))
    }

    /// `LISTEN_ADDR`, `CATALOG_BASE_URL`, `REDIS_URL`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("LISTEN_ADDR") {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| RelayError::Config(format!("LISTEN_ADDR {}: {}", addr, e)))?;
            self.server.host = addr.ip().to_string();
            self.server.port = addr.port();
        }
        if let Some(url) = lookup("CATALOG_BASE_URL") {
            self.catalog.base_url = url;
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.cache.backend = CacheBackend::Redis;
            self.cache.redis_url = url;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|e| RelayError::Config(format!("server host {}: {}", self.server.host, e)))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn locale_preferences(&self) -> LocalePreferences {
        LocalePreferences {
            display: self.locales.display.clone(),
            flavor: self.locales.flavor.clone(),
        }
    }
}
