// src/harvest/fetch.rs
use async_trait::async_trait;
use metrics::histogram;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::error::{FetchErrorKind, HarvestError, Result};
use crate::harvest::parse::parse_feed;
use crate::harvest::types::RawItem;

/// Turns one source URL into raw items. Errors are scoped to that source.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<RawItem>>;
}

pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| HarvestError::config(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    fn classify(url: &str, e: reqwest::Error) -> HarvestError {
        let kind = if e.is_timeout() {
            FetchErrorKind::Timeout
        } else if let Some(status) = e.status() {
            FetchErrorKind::Status(status.as_u16())
        } else {
            FetchErrorKind::Network
        };
        HarvestError::fetch(url, kind, e)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<RawItem>> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarvestError::fetch(
                url,
                FetchErrorKind::Status(status.as_u16()),
                "unexpected response status",
            ));
        }

        let body = resp.text().await.map_err(|e| Self::classify(url, e))?;
        let items = parse_feed(&body, url)?;

        histogram!("harvest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(items)
    }
}

/// Serves feed bodies from memory; unknown URLs fail like an unreachable host.
#[derive(Debug, Default)]
pub struct FixtureFetcher {
    bodies: RwLock<HashMap<String, String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(self, url: impl Into<String>, xml: impl Into<String>) -> Self {
        self.insert(url, xml);
        self
    }

    pub fn insert(&self, url: impl Into<String>, xml: impl Into<String>) {
        let mut g = match self.bodies.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        g.insert(url.into(), xml.into());
    }
}

#[async_trait]
impl FeedFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<RawItem>> {
        let body = {
            let g = match self.bodies.read() {
                Ok(g) => g,
                Err(poison) => poison.into_inner(),
            };
            g.get(url).cloned()
        };
        match body {
            Some(xml) => parse_feed(&xml, url),
            None => Err(HarvestError::fetch(url, FetchErrorKind::Network, "no such feed")),
        }
    }
}
