// src/harvest/sources.rs
//! Source catalog access and the status allow-list filter.

use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{HarvestError, Result};
use crate::harvest::types::Source;

/// Read-only view of the configuration store.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<Source>>;
}

pub fn is_allowed<S: AsRef<str>>(status: S, allowed: &[String]) -> bool {
    let s = status.as_ref().trim();
    allowed.iter().any(|a| a.eq_ignore_ascii_case(s))
}

/// Resolves the eligible sources for one cycle. Nothing is cached between
/// calls: a status change in the catalog applies to the next cycle.
#[derive(Clone)]
pub struct SourceLister {
    store: Arc<dyn SourceStore>,
    allowed: Vec<String>,
}

impl SourceLister {
    pub fn new(store: Arc<dyn SourceStore>, allowed: Vec<String>) -> Self {
        Self { store, allowed }
    }

    pub fn allowed_statuses(&self) -> &[String] {
        &self.allowed
    }

    pub async fn list_eligible_sources(&self) -> Result<Vec<Source>> {
        let all = self.store.list_sources().await?;
        let total = all.len();
        let mut seen = HashSet::new();
        let eligible: Vec<Source> = all
            .into_iter()
            .filter(|s| !s.url.trim().is_empty())
            .filter(|s| is_allowed(&s.status, &self.allowed))
            .filter(|s| seen.insert(s.url.clone()))
            .collect();
        tracing::debug!(target: "harvest", total, eligible = eligible.len(), "sources listed");
        Ok(eligible)
    }
}

/// In-process catalog; `replace` simulates operators editing the store.
#[derive(Debug, Default)]
pub struct MemorySourceStore {
    sources: RwLock<Vec<Source>>,
}

impl MemorySourceStore {
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            sources: RwLock::new(sources),
        }
    }

    pub fn replace(&self, sources: Vec<Source>) {
        match self.sources.write() {
            Ok(mut g) => *g = sources,
            Err(poison) => *poison.into_inner() = sources,
        }
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        let g = match self.sources.read() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        Ok(g.clone())
    }
}

/// Catalog file (TOML `[[sources]]` tables or a JSON array), re-read on every listing.
#[derive(Debug, Clone)]
pub struct FileSourceStore {
    path: PathBuf,
}

impl FileSourceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourceStore for FileSourceStore {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| HarvestError::store(format!("reading {}: {e}", self.path.display())))?;
        let ext = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_catalog(&content, &ext)
            .map_err(|e| HarvestError::store(format!("parsing {}: {e}", self.path.display())))
    }
}

/// Operator-maintained `feeds (url, status)` table in a SQLite database.
///
/// The database is opened read-only on every listing, so edits made by other
/// processes apply to the next cycle. A missing database is `StoreUnavailable`.
#[derive(Debug, Clone)]
pub struct SqliteSourceStore {
    path: PathBuf,
    statuses: Vec<String>,
}

impl SqliteSourceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            statuses: Vec::new(),
        }
    }

    /// Filter on status in the query itself (`WHERE status IN (...)`).
    pub fn with_statuses(mut self, statuses: &[String]) -> Self {
        self.statuses = statuses.iter().map(|s| s.trim().to_ascii_lowercase()).collect();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn query_feeds(path: &Path, statuses: &[String]) -> rusqlite::Result<Vec<Source>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let mut sql = String::from("SELECT url, status FROM feeds");
    if !statuses.is_empty() {
        let marks = vec!["?"; statuses.len()].join(", ");
        sql.push_str(&format!(" WHERE lower(trim(status)) IN ({marks})"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let sources = stmt
        .query_map(params_from_iter(statuses.iter()), |row| {
            Ok(Source {
                url: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                status: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sources)
}

#[async_trait]
impl SourceStore for SqliteSourceStore {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        let path = self.path.clone();
        let statuses = self.statuses.clone();
        tokio::task::spawn_blocking(move || query_feeds(&path, &statuses))
            .await
            .map_err(|e| HarvestError::store(format!("catalog query task: {e}")))?
            .map_err(|e| HarvestError::store(format!("querying {}: {e}", self.path.display())))
    }
}

/// `json` files are JSON arrays, `toml` files are `[[sources]]` tables. Without
/// a known extension TOML is tried first, then JSON.
pub fn parse_catalog(s: &str, hint_ext: &str) -> std::result::Result<Vec<Source>, String> {
    #[derive(serde::Deserialize)]
    struct TomlCatalog {
        #[serde(default)]
        sources: Vec<Source>,
    }

    let json = |s: &str| serde_json::from_str::<Vec<Source>>(s).map_err(|e| e.to_string());
    if hint_ext == "json" {
        return json(s);
    }
    match toml::from_str::<TomlCatalog>(s) {
        Ok(c) => Ok(c.sources),
        Err(e) if hint_ext == "toml" => Err(e.to_string()),
        Err(e) => json(s).map_err(|_| e.to_string()),
    }
}
