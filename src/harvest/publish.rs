// src/harvest/publish.rs
//! Append-only push of novel items onto the downstream work queue.

use async_trait::async_trait;
use bb8_redis::redis::cmd;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{HarvestError, Result};
use crate::harvest::types::QueueEntry;
use crate::store::RedisPool;

#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn publish(&self, entry: &QueueEntry) -> Result<()>;

    async fn depth(&self) -> Result<usize>;
}

/// In-process queue. Newest entry first, like `LPUSH`.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<QueueEntry>> {
        match self.entries.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn publish(&self, entry: &QueueEntry) -> Result<()> {
        self.lock().push_front(entry.clone());
        Ok(())
    }

    async fn depth(&self) -> Result<usize> {
        Ok(self.lock().len())
    }
}

/// Redis list holding one JSON document per entry.
#[derive(Debug, Clone)]
pub struct RedisQueue {
    pool: RedisPool,
    key: String,
}

impl RedisQueue {
    pub fn new(pool: RedisPool, key: impl Into<String>) -> Self {
        Self {
            pool,
            key: key.into(),
        }
    }
}

#[async_trait]
impl WorkQueue for RedisQueue {
    async fn publish(&self, entry: &QueueEntry) -> Result<()> {
        let json = serde_json::to_string(entry).map_err(HarvestError::publish)?;
        let mut conn = self.pool.get().await.map_err(HarvestError::publish)?;
        let _len: u64 = cmd("LPUSH")
            .arg(&self.key)
            .arg(json)
            .query_async(&mut *conn)
            .await
            .map_err(HarvestError::publish)?;
        Ok(())
    }

    async fn depth(&self) -> Result<usize> {
        let mut conn = self.pool.get().await.map_err(HarvestError::queue)?;
        let len: u64 = cmd("LLEN")
            .arg(&self.key)
            .query_async(&mut *conn)
            .await
            .map_err(HarvestError::queue)?;
        Ok(len as usize)
    }
}
