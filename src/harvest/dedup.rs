// src/harvest/dedup.rs
//! Time-bounded record of fingerprints that were already enqueued.

use async_trait::async_trait;
use bb8_redis::redis::cmd;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{HarvestError, Result};
use crate::harvest::types::Fingerprint;
use crate::store::RedisPool;

pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

#[async_trait]
pub trait DedupCache: Send + Sync {
    /// Atomically record `fingerprint` if absent. Returns true when the item is
    /// novel. A present entry is left untouched, so its TTL is never extended.
    async fn check_and_mark(&self, fingerprint: &Fingerprint, ttl: Duration) -> Result<bool>;

    /// Number of live (non-expired) entries.
    async fn len(&self) -> Result<usize>;
}

/// In-process cache keyed by fingerprint, holding each entry's expiry instant.
#[derive(Debug, Default)]
pub struct MemoryDedupCache {
    entries: Mutex<HashMap<Fingerprint, Instant>>,
}

const PURGE_EVERY: usize = 1024;

impl MemoryDedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Fingerprint, Instant>> {
        match self.entries.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

#[async_trait]
impl DedupCache for MemoryDedupCache {
    async fn check_and_mark(&self, fingerprint: &Fingerprint, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut map = self.lock();
        if let Some(expires_at) = map.get(fingerprint) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        map.insert(fingerprint.clone(), now + ttl);
        if map.len() % PURGE_EVERY == 0 {
            map.retain(|_, expires_at| *expires_at > now);
        }
        Ok(true)
    }

    async fn len(&self) -> Result<usize> {
        let now = Instant::now();
        let mut map = self.lock();
        map.retain(|_, expires_at| *expires_at > now);
        Ok(map.len())
    }
}

/// Redis-backed cache: one `SET key 1 NX EX ttl` per check, expiry left to Redis.
#[derive(Debug, Clone)]
pub struct RedisDedupCache {
    pool: RedisPool,
    prefix: String,
}

impl RedisDedupCache {
    pub fn new(pool: RedisPool, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    fn key(&self, fingerprint: &Fingerprint) -> String {
        format!("{}{}", self.prefix, fingerprint)
    }
}

#[async_trait]
impl DedupCache for RedisDedupCache {
    async fn check_and_mark(&self, fingerprint: &Fingerprint, ttl: Duration) -> Result<bool> {
        let mut conn = self.pool.get().await.map_err(HarvestError::cache)?;
        // Redis rejects EX 0.
        let secs = ttl.as_secs().max(1);
        let reply: Option<String> = cmd("SET")
            .arg(self.key(fingerprint))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(secs)
            .query_async(&mut *conn)
            .await
            .map_err(HarvestError::cache)?;
        Ok(reply.is_some())
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.pool.get().await.map_err(HarvestError::cache)?;
        let pattern = format!("{}*", self.prefix);
        let mut cursor: u64 = 0;
        let mut total = 0usize;
        // SCAN may repeat keys during a rehash; the count is a point-in-time estimate.
        loop {
            let (next, keys): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(500)
                .query_async(&mut *conn)
                .await
                .map_err(HarvestError::cache)?;
            total += keys.len();
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::fingerprint::fingerprint;
    use crate::harvest::types::RawItem;

    fn fp(link: &str) -> Fingerprint {
        fingerprint(&RawItem {
            link: Some(link.into()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn second_mark_is_duplicate() {
        let cache = MemoryDedupCache::new();
        let f = fp("http://a/1");
        assert!(cache.check_and_mark(&f, DEFAULT_DEDUP_TTL).await.unwrap());
        assert!(!cache.check_and_mark(&f, DEFAULT_DEDUP_TTL).await.unwrap());
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_sighting_does_not_extend_ttl() {
        let cache = MemoryDedupCache::new();
        let f = fp("http://a/1");
        let ttl = Duration::from_secs(10);
        assert!(cache.check_and_mark(&f, ttl).await.unwrap());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!cache.check_and_mark(&f, ttl).await.unwrap());

        // 11s after first insert: expired even though it was seen at 6s.
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.len().await.unwrap(), 0);
        assert!(cache.check_and_mark(&f, ttl).await.unwrap());
    }
}
