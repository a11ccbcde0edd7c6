// src/harvest/mod.rs
//! Harvest orchestration: list sources, fan out fetch → fingerprint → dedup → publish
//! per source, aggregate the tallies.
//!
//! Delivery is at-most-once per dedup window. An item is marked seen before it is
//! published, so a failed publish drops it rather than re-delivering it on every
//! later cycle once the queue comes back.

pub mod dedup;
pub mod fetch;
pub mod fingerprint;
pub mod parse;
pub mod publish;
pub mod scheduler;
pub mod sources;
pub mod stats;
pub mod types;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::harvest::dedup::DedupCache;
use crate::harvest::fetch::FeedFetcher;
use crate::harvest::fingerprint::fingerprint;
use crate::harvest::publish::WorkQueue;
use crate::harvest::sources::SourceLister;
use crate::harvest::types::{CyclePhase, CycleReport, QueueEntry, Source, SourceOutcome, Trigger};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("harvest_cycles_total", "Harvest cycles by outcome.");
        describe_counter!(
            "harvest_sources_failed_total",
            "Sources whose fetch or parse failed."
        );
        describe_counter!("harvest_items_fetched_total", "Items parsed from sources.");
        describe_counter!("harvest_items_novel_total", "Items pushed onto the work queue.");
        describe_counter!(
            "harvest_items_duplicate_total",
            "Items skipped because their fingerprint was already seen."
        );
        describe_counter!(
            "harvest_items_failed_total",
            "Items skipped on cache or queue errors."
        );
        describe_histogram!("harvest_fetch_ms", "Source fetch+parse time in milliseconds.");
        describe_gauge!("harvest_last_cycle_ts", "Unix ts of the last completed cycle.");
    });
}

/// Explicit handles to every collaborator of a cycle.
#[derive(Clone)]
pub struct HarvestContext {
    pub lister: SourceLister,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub cache: Arc<dyn DedupCache>,
    pub queue: Arc<dyn WorkQueue>,
}

pub struct Harvester {
    ctx: Arc<HarvestContext>,
    dedup_ttl: Duration,
    max_concurrent: usize,
    last_report: RwLock<Option<CycleReport>>,
}

impl Harvester {
    pub fn new(ctx: HarvestContext, dedup_ttl: Duration, max_concurrent: usize) -> Self {
        Self {
            ctx: Arc::new(ctx),
            dedup_ttl,
            max_concurrent: max_concurrent.max(1),
            last_report: RwLock::new(None),
        }
    }

    pub fn context(&self) -> &HarvestContext {
        &self.ctx
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        match self.last_report.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    /// Run one cycle. Fails only when the source list cannot be obtained;
    /// per-source and per-item failures are tallied in the report.
    pub async fn run_cycle(&self, trigger: Trigger) -> Result<CycleReport> {
        ensure_metrics_described();
        let started_at = Utc::now();
        info!(target: "harvest", ?trigger, "starting feed harvest cycle");

        log_phase(CyclePhase::Listing);
        let sources = match self.ctx.lister.list_eligible_sources().await {
            Ok(s) => s,
            Err(e) => {
                error!(target: "harvest", error = %e, "harvest cycle aborted: cannot list sources");
                counter!("harvest_cycles_total", "outcome" => "failed").increment(1);
                log_phase(CyclePhase::Idle);
                return Err(e);
            }
        };
        info!(target: "harvest", sources = sources.len(), "found feeds to harvest");

        log_phase(CyclePhase::FanningOut);
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();
        let mut report = CycleReport::begin(trigger, sources.len(), started_at);
        for source in sources {
            let ctx = self.ctx.clone();
            let permits = permits.clone();
            let ttl = self.dedup_ttl;
            tasks.spawn(async move {
                // The semaphore is never closed; a missing permit only loses the bound.
                let _permit = permits.acquire_owned().await.ok();
                harvest_source(&ctx, &source, ttl).await
            });
        }

        log_phase(CyclePhase::Aggregating);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.absorb(outcome),
                Err(e) => {
                    error!(target: "harvest", error = %e, "source task panicked");
                    counter!("harvest_sources_failed_total").increment(1);
                    report.absorb(SourceOutcome {
                        fetch_failed: true,
                        ..Default::default()
                    });
                }
            }
        }
        report.finished_at = Utc::now();

        counter!("harvest_cycles_total", "outcome" => "completed").increment(1);
        gauge!("harvest_last_cycle_ts").set(report.finished_at.timestamp() as f64);
        info!(
            target: "harvest",
            sources = report.sources_processed,
            sources_failed = report.sources_failed,
            fetched = report.items_fetched,
            novel = report.items_novel,
            duplicate = report.items_duplicate,
            failed = report.items_failed,
            "harvest cycle completed"
        );

        self.record_report(&report);
        log_phase(CyclePhase::Idle);
        Ok(report)
    }

    // Overlapping cycles can finish out of order; the latest-started one wins.
    fn record_report(&self, report: &CycleReport) {
        let mut last = match self.last_report.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        if last.as_ref().map_or(true, |cur| report.started_at >= cur.started_at) {
            *last = Some(report.clone());
        }
    }
}

fn log_phase(phase: CyclePhase) {
    debug!(target: "harvest", phase = phase.as_str(), "cycle phase");
}

/// Fetch one source and push its unseen items. Never fails: every error is
/// logged with its source and counted in the returned outcome.
pub async fn harvest_source(ctx: &HarvestContext, source: &Source, ttl: Duration) -> SourceOutcome {
    let mut out = SourceOutcome::default();
    debug!(target: "harvest", source = %source.url, "harvesting feed");

    let items = match ctx.fetcher.fetch(&source.url).await {
        Ok(items) => items,
        Err(e) => {
            warn!(target: "harvest", source = %source.url, error = %e, "error harvesting feed");
            counter!("harvest_sources_failed_total").increment(1);
            out.fetch_failed = true;
            return out;
        }
    };
    out.fetched = items.len();
    counter!("harvest_items_fetched_total").increment(items.len() as u64);

    for item in items {
        let fp = fingerprint(&item);
        match ctx.cache.check_and_mark(&fp, ttl).await {
            Ok(false) => {
                out.duplicate += 1;
                counter!("harvest_items_duplicate_total").increment(1);
            }
            Err(e) => {
                // Treated as seen: a missed item beats a duplicate storm.
                error!(
                    target: "harvest",
                    source = %source.url, fingerprint = %fp, error = %e,
                    "dedup check failed, skipping item"
                );
                out.failed += 1;
                counter!("harvest_items_failed_total").increment(1);
            }
            Ok(true) => {
                let entry = QueueEntry::from_item(item, fp);
                match ctx.queue.publish(&entry).await {
                    Ok(()) => {
                        info!(target: "harvest", source = %source.url, title = %entry.title, "queued article");
                        out.novel += 1;
                        counter!("harvest_items_novel_total").increment(1);
                    }
                    Err(e) => {
                        error!(
                            target: "harvest",
                            source = %source.url, fingerprint = %entry.fingerprint, error = %e,
                            "publish failed, item dropped"
                        );
                        out.failed += 1;
                        counter!("harvest_items_failed_total").increment(1);
                    }
                }
            }
        }
    }
    out
}
