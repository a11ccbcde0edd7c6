// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use feed_harvester::error::{HarvestError, Result};
use feed_harvester::harvest::dedup::{DedupCache, MemoryDedupCache, DEFAULT_DEDUP_TTL};
use feed_harvester::harvest::fetch::{FeedFetcher, FixtureFetcher};
use feed_harvester::harvest::publish::{MemoryQueue, WorkQueue};
use feed_harvester::harvest::sources::{MemorySourceStore, SourceLister, SourceStore};
use feed_harvester::harvest::types::{Fingerprint, QueueEntry, Source};
use feed_harvester::{HarvestContext, Harvester};

/// Minimal RSS 2.0 document with one item per (title, link).
pub fn rss(items: &[(&str, &str)]) -> String {
    let mut body = String::from(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title>"#);
    for (title, link) in items {
        body.push_str(&format!(
            "<item><title>{title}</title><link>{link}</link><description>about {title}</description></item>"
        ));
    }
    body.push_str("</channel></rss>");
    body
}

pub fn allowed() -> Vec<String> {
    vec!["green".to_string(), "yellow".to_string()]
}

pub struct Harness {
    pub harvester: Arc<Harvester>,
    pub store: Arc<MemorySourceStore>,
    pub fetcher: Arc<FixtureFetcher>,
    pub cache: Arc<MemoryDedupCache>,
    pub queue: Arc<MemoryQueue>,
}

pub fn harness(sources: Vec<Source>, fetcher: FixtureFetcher) -> Harness {
    harness_with_ttl(sources, fetcher, DEFAULT_DEDUP_TTL)
}

pub fn harness_with_ttl(sources: Vec<Source>, fetcher: FixtureFetcher, ttl: Duration) -> Harness {
    let store = Arc::new(MemorySourceStore::new(sources));
    let fetcher = Arc::new(fetcher);
    let cache = Arc::new(MemoryDedupCache::new());
    let queue = Arc::new(MemoryQueue::new());
    let ctx = HarvestContext {
        lister: SourceLister::new(store.clone(), allowed()),
        fetcher: fetcher.clone(),
        cache: cache.clone(),
        queue: queue.clone(),
    };
    Harness {
        harvester: Arc::new(Harvester::new(ctx, ttl, 4)),
        store,
        fetcher,
        cache,
        queue,
    }
}

pub fn harvester_with(
    store: Arc<dyn SourceStore>,
    fetcher: Arc<dyn FeedFetcher>,
    cache: Arc<dyn DedupCache>,
    queue: Arc<dyn WorkQueue>,
) -> Arc<Harvester> {
    let ctx = HarvestContext {
        lister: SourceLister::new(store, allowed()),
        fetcher,
        cache,
        queue,
    };
    Arc::new(Harvester::new(ctx, DEFAULT_DEDUP_TTL, 4))
}

pub struct DownStore;

#[async_trait]
impl SourceStore for DownStore {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        Err(HarvestError::store("connection refused"))
    }
}

pub struct DownCache;

#[async_trait]
impl DedupCache for DownCache {
    async fn check_and_mark(&self, _fingerprint: &Fingerprint, _ttl: Duration) -> Result<bool> {
        Err(HarvestError::cache("connection refused"))
    }

    async fn len(&self) -> Result<usize> {
        Err(HarvestError::cache("connection refused"))
    }
}

pub struct DownQueue;

#[async_trait]
impl WorkQueue for DownQueue {
    async fn publish(&self, _entry: &QueueEntry) -> Result<()> {
        Err(HarvestError::publish("connection refused"))
    }

    async fn depth(&self) -> Result<usize> {
        Err(HarvestError::queue("connection refused"))
    }
}
