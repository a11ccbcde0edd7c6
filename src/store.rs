// src/store.rs
//! Redis connection pool shared by the dedup cache and the work queue.

use anyhow::{Context, Result};
use bb8_redis::redis::{cmd, ConnectionInfo};
use bb8_redis::{bb8, RedisConnectionManager};
use std::time::Duration;

pub type RedisPool = bb8::Pool<RedisConnectionManager>;

/// Build the pool and PING once so a bad URL fails at startup, not mid-cycle.
pub async fn create_redis_pool(info: ConnectionInfo, max_size: u32) -> Result<RedisPool> {
    let manager = RedisConnectionManager::new(info).context("invalid redis connection info")?;
    let pool = bb8::Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(5))
        .idle_timeout(Some(Duration::from_secs(60 * 5)))
        .build(manager)
        .await
        .context("building redis pool")?;

    {
        let mut conn = pool.get().await.context("redis connection")?;
        let pong: String = cmd("PING")
            .query_async(&mut *conn)
            .await
            .context("redis ping")?;
        tracing::info!(%pong, "redis ping successful");
    }

    Ok(pool)
}
