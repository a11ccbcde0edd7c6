// src/harvest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of one catalog row, valid for a single cycle only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub status: String,
}

impl Source {
    pub fn new(url: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: status.into(),
        }
    }
}

/// One parsed feed item, discarded once the enqueue decision is made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub published_at: Option<String>,
    pub content_snippet: String,
    pub origin: String,
}

/// Hex SHA-256 of an item's identity field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unit handed to downstream workers. Field names follow the queue's JSON contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub title: String,
    pub link: Option<String>,
    #[serde(rename = "pubDate")]
    pub published_at: Option<String>,
    pub content: String,
    pub source: String,
    #[serde(rename = "hash")]
    pub fingerprint: Fingerprint,
}

impl QueueEntry {
    pub fn from_item(item: RawItem, fingerprint: Fingerprint) -> Self {
        Self {
            title: item.title,
            link: item.link,
            published_at: item.published_at,
            content: item.content_snippet,
            source: item.origin,
            fingerprint,
        }
    }
}

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scheduled,
    Manual,
}

/// Orchestrator states; a cycle walks Idle → Listing → FanningOut → Aggregating → Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Listing,
    FanningOut,
    Aggregating,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Listing => "listing",
            CyclePhase::FanningOut => "fanning_out",
            CyclePhase::Aggregating => "aggregating",
        }
    }
}

/// Tallies for one source within a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    pub fetch_failed: bool,
    pub fetched: usize,
    pub novel: usize,
    pub duplicate: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources_listed: usize,
    pub sources_processed: usize,
    pub sources_failed: usize,
    pub items_fetched: usize,
    pub items_novel: usize,
    pub items_duplicate: usize,
    pub items_failed: usize,
}

impl CycleReport {
    pub fn begin(trigger: Trigger, sources_listed: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            trigger,
            started_at,
            finished_at: started_at,
            sources_listed,
            sources_processed: 0,
            sources_failed: 0,
            items_fetched: 0,
            items_novel: 0,
            items_duplicate: 0,
            items_failed: 0,
        }
    }

    pub fn absorb(&mut self, outcome: SourceOutcome) {
        self.sources_processed += 1;
        if outcome.fetch_failed {
            self.sources_failed += 1;
        }
        self.items_fetched += outcome.fetched;
        self.items_novel += outcome.novel;
        self.items_duplicate += outcome.duplicate;
        self.items_failed += outcome.failed;
    }
}
