// src/error.rs
//! Error taxonomy of the harvesting pipeline.
//!
//! Only [`HarvestError::StoreUnavailable`] aborts a cycle. Everything else is
//! scoped to one source or one item and ends up in logs and cycle tallies.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

/// Why fetching a single source failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Timeout,
    Status(u16),
    Malformed,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Network => f.write_str("network"),
            FetchErrorKind::Timeout => f.write_str("timeout"),
            FetchErrorKind::Status(code) => write!(f, "http status {code}"),
            FetchErrorKind::Malformed => f.write_str("malformed feed"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HarvestError {
    /// Configuration store (source catalog) could not be read.
    #[error("configuration store unavailable: {0}")]
    StoreUnavailable(String),

    /// One source could not be fetched or parsed.
    #[error("fetch failed for {url} ({kind}): {message}")]
    Fetch {
        url: String,
        kind: FetchErrorKind,
        message: String,
    },

    /// Dedup cache backend unreachable.
    #[error("dedup cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Work queue backend unreachable.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Work queue could not be read (depth, stats).
    #[error("work queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl HarvestError {
    pub fn store(message: impl fmt::Display) -> Self {
        Self::StoreUnavailable(message.to_string())
    }

    pub fn fetch(url: impl Into<String>, kind: FetchErrorKind, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            kind,
            message: message.to_string(),
        }
    }

    pub fn cache(message: impl fmt::Display) -> Self {
        Self::CacheUnavailable(message.to_string())
    }

    pub fn publish(message: impl fmt::Display) -> Self {
        Self::Publish(message.to_string())
    }

    pub fn queue(message: impl fmt::Display) -> Self {
        Self::QueueUnavailable(message.to_string())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the error must abort the whole cycle.
    pub fn is_cycle_fatal(&self) -> bool {
        matches!(self, HarvestError::StoreUnavailable(_))
    }
}
