// src/config.rs
//! Process configuration, read once from the environment at startup.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use bb8_redis::redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};

use crate::error::{HarvestError, Result};
use crate::harvest::dedup::DEFAULT_DEDUP_TTL;

pub const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";
pub const DEFAULT_SOURCES_DB_PATH: &str = "config/sources.db";
pub const DEFAULT_ALLOWED_STATUSES: &str = "green,yellow";
pub const DEFAULT_SERVICE_NAME: &str = "smart-harvester";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Where the source catalog lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogBackend {
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl RedisSettings {
    /// `REDIS_URL` when set, otherwise host/port with the password kept out of any URL.
    pub fn connection_info(&self) -> Result<ConnectionInfo> {
        if let Some(url) = &self.url {
            return url
                .as_str()
                .into_connection_info()
                .map_err(|e| HarvestError::config(format!("REDIS_URL: {e}")));
        }
        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                password: self.password.clone(),
                ..Default::default()
            },
        })
    }

    /// Loggable target without credentials.
    pub fn display_target(&self) -> String {
        match &self.url {
            Some(url) => match url.rsplit_once('@') {
                Some((_, host)) => format!("redis://***@{host}"),
                None => url.clone(),
            },
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    pub harvest_interval: Duration,
    pub allowed_statuses: Vec<String>,
    pub dedup_ttl: Duration,
    pub fetch_timeout: Duration,
    pub max_concurrent_fetches: usize,
    pub sources_path: PathBuf,
    pub catalog_backend: CatalogBackend,
    pub store_backend: StoreBackend,
    pub redis: RedisSettings,
    pub queue_key: String,
    pub cache_prefix: String,
    pub port: u16,
    pub service_name: String,
    pub user_agent: String,
}

impl HarvesterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let interval_secs: u64 = parse_num(&get, "HARVEST_INTERVAL", 60)?;
        if interval_secs == 0 {
            return Err(HarvestError::config("HARVEST_INTERVAL must be > 0"));
        }
        let max_concurrent: usize = parse_num(&get, "MAX_CONCURRENT_FETCHES", 8)?;
        if max_concurrent == 0 {
            return Err(HarvestError::config("MAX_CONCURRENT_FETCHES must be > 0"));
        }

        let allowed_statuses = parse_statuses(
            &get("ALLOWED_STATUSES").unwrap_or_else(|| DEFAULT_ALLOWED_STATUSES.to_string()),
        );
        if allowed_statuses.is_empty() {
            return Err(HarvestError::config("ALLOWED_STATUSES lists no status"));
        }

        let dedup_ttl_secs: u64 = parse_num(&get, "DEDUP_TTL_SECS", DEFAULT_DEDUP_TTL.as_secs())?;
        if dedup_ttl_secs == 0 {
            return Err(HarvestError::config("DEDUP_TTL_SECS must be > 0"));
        }
        let fetch_timeout_secs: u64 = parse_num(&get, "FETCH_TIMEOUT_SECS", 20)?;
        if fetch_timeout_secs == 0 {
            return Err(HarvestError::config("FETCH_TIMEOUT_SECS must be > 0"));
        }

        let catalog_backend = match get("CATALOG_BACKEND").as_deref().map(str::to_ascii_lowercase) {
            None => CatalogBackend::File,
            Some(b) if b == "file" => CatalogBackend::File,
            Some(b) if b == "sqlite" => CatalogBackend::Sqlite,
            Some(other) => {
                return Err(HarvestError::config(format!(
                    "CATALOG_BACKEND must be file or sqlite, got {other}"
                )))
            }
        };
        let default_sources_path = match catalog_backend {
            CatalogBackend::File => DEFAULT_SOURCES_PATH,
            CatalogBackend::Sqlite => DEFAULT_SOURCES_DB_PATH,
        };

        let store_backend = match get("STORE_BACKEND").as_deref().map(str::to_ascii_lowercase) {
            None => StoreBackend::Redis,
            Some(b) if b == "redis" => StoreBackend::Redis,
            Some(b) if b == "memory" => StoreBackend::Memory,
            Some(other) => {
                return Err(HarvestError::config(format!(
                    "STORE_BACKEND must be redis or memory, got {other}"
                )))
            }
        };

        Ok(Self {
            harvest_interval: Duration::from_secs(interval_secs),
            allowed_statuses,
            dedup_ttl: Duration::from_secs(dedup_ttl_secs),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            max_concurrent_fetches: max_concurrent,
            sources_path: get("SOURCES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default_sources_path)),
            catalog_backend,
            store_backend,
            redis: RedisSettings {
                url: get("REDIS_URL"),
                host: get("REDIS_HOST").unwrap_or_else(|| "redis".to_string()),
                port: parse_num(&get, "REDIS_PORT", 6379)?,
                password: get("REDIS_PASSWORD"),
            },
            queue_key: get("QUEUE_KEY").unwrap_or_else(|| "articles:queue".to_string()),
            cache_prefix: get("CACHE_PREFIX").unwrap_or_else(|| "article:".to_string()),
            port: parse_num(&get, "PORT", 3000)?,
            service_name: get("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            user_agent: get("USER_AGENT")
                .unwrap_or_else(|| format!("feed-harvester/{}", env!("CARGO_PKG_VERSION"))),
        })
    }
}

fn parse_num<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| HarvestError::config(format!("{key}: invalid number {raw:?}"))),
    }
}

/// Comma list → trimmed, lowercased, de-duplicated, order preserved.
pub fn parse_statuses(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
