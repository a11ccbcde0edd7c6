// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod harvest;
pub mod logging;
pub mod metrics;
pub mod store;

pub use crate::api::router;
pub use crate::error::{HarvestError, Result};
pub use crate::harvest::{HarvestContext, Harvester};

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::config::{CatalogBackend, HarvesterConfig, StoreBackend};
use crate::harvest::dedup::{DedupCache, MemoryDedupCache, RedisDedupCache};
use crate::harvest::fetch::HttpFeedFetcher;
use crate::harvest::publish::{MemoryQueue, RedisQueue, WorkQueue};
use crate::harvest::sources::{FileSourceStore, SourceLister, SourceStore, SqliteSourceStore};

/// Wire the production collaborators described by `config`.
pub async fn build_harvester(config: &HarvesterConfig) -> anyhow::Result<Arc<Harvester>> {
    let (cache, queue): (Arc<dyn DedupCache>, Arc<dyn WorkQueue>) = match config.store_backend {
        StoreBackend::Redis => {
            info!(
                redis = %config.redis.display_target(),
                password = config.redis.password.is_some(),
                "connecting to redis"
            );
            let pool = store::create_redis_pool(
                config.redis.connection_info()?,
                (config.max_concurrent_fetches as u32).saturating_mul(2).max(4),
            )
            .await
            .context("connecting to redis")?;
            (
                Arc::new(RedisDedupCache::new(pool.clone(), config.cache_prefix.clone())),
                Arc::new(RedisQueue::new(pool, config.queue_key.clone())),
            )
        }
        StoreBackend::Memory => {
            info!("using in-memory dedup cache and queue");
            (Arc::new(MemoryDedupCache::new()), Arc::new(MemoryQueue::new()))
        }
    };

    let fetcher = HttpFeedFetcher::new(config.fetch_timeout, &config.user_agent)
        .context("building feed fetcher")?;
    let store: Arc<dyn SourceStore> = match config.catalog_backend {
        CatalogBackend::File => {
            let store = FileSourceStore::new(config.sources_path.clone());
            info!(catalog = %store.path().display(), "file source catalog configured");
            Arc::new(store)
        }
        CatalogBackend::Sqlite => {
            let store = SqliteSourceStore::new(config.sources_path.clone())
                .with_statuses(&config.allowed_statuses);
            info!(catalog = %store.path().display(), "sqlite source catalog configured");
            Arc::new(store)
        }
    };

    let ctx = HarvestContext {
        lister: SourceLister::new(store, config.allowed_statuses.clone()),
        fetcher: Arc::new(fetcher),
        cache,
        queue,
    };
    Ok(Arc::new(Harvester::new(
        ctx,
        config.dedup_ttl,
        config.max_concurrent_fetches,
    )))
}
