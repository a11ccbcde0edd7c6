// src/harvest/stats.rs
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::harvest::types::CycleReport;
use crate::harvest::Harvester;

/// Point-in-time view; may interleave with a running cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    #[serde(rename = "queue_length")]
    pub queue_depth: usize,
    #[serde(rename = "cached_articles")]
    pub cached_fingerprint_count: usize,
    #[serde(rename = "harvest_interval")]
    pub harvest_interval_seconds: u64,
    pub allowed_statuses: Vec<String>,
    pub last_cycle: Option<CycleReport>,
}

#[derive(Clone)]
pub struct StatsReporter {
    harvester: Arc<Harvester>,
    interval: Duration,
}

impl StatsReporter {
    pub fn new(harvester: Arc<Harvester>, interval: Duration) -> Self {
        Self { harvester, interval }
    }

    pub async fn stats(&self) -> Result<Stats> {
        let ctx = self.harvester.context();
        let queue_depth = ctx.queue.depth().await?;
        let cached_fingerprint_count = ctx.cache.len().await?;
        Ok(Stats {
            queue_depth,
            cached_fingerprint_count,
            harvest_interval_seconds: self.interval.as_secs(),
            allowed_statuses: ctx.lister.allowed_statuses().to_vec(),
            last_cycle: self.harvester.last_report(),
        })
    }
}
