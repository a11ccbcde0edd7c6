// tests/api_http.rs
//
// HTTP-level tests for the control surface without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

mod common;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt as _; // for `oneshot`

use common::{harness, harvester_with, rss, DownQueue};
use feed_harvester::api::{self, AppState};
use feed_harvester::harvest::dedup::MemoryDedupCache;
use feed_harvester::harvest::fetch::FixtureFetcher;
use feed_harvester::harvest::scheduler::Scheduler;
use feed_harvester::harvest::sources::MemorySourceStore;
use feed_harvester::harvest::stats::StatsReporter;
use feed_harvester::harvest::types::Source;
use feed_harvester::Harvester;

const BODY_LIMIT: usize = 1024 * 1024;

fn app_for(harvester: Arc<Harvester>) -> (Router, Arc<Scheduler>) {
    let scheduler = Arc::new(Scheduler::new(harvester.clone()));
    let state = AppState {
        scheduler: scheduler.clone(),
        stats: StatsReporter::new(harvester, Duration::from_secs(60)),
        service_name: Arc::from("smart-harvester"),
    };
    (api::router(state), scheduler)
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

fn one_feed() -> common::Harness {
    harness(
        vec![Source::new("http://a/feed", "green")],
        FixtureFetcher::new().with_feed("http://a/feed", rss(&[("one", "http://a/1"), ("two", "http://a/2")])),
    )
}

#[tokio::test]
async fn health_reports_service() {
    let (app, _) = app_for(one_feed().harvester);
    let (status, v) = call(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "ok");
    assert_eq!(v["service"], "smart-harvester");
    assert_eq!(v["health"], "good");
}

#[tokio::test]
async fn stats_before_any_cycle() {
    let (app, _) = app_for(one_feed().harvester);
    let (status, v) = call(&app, "GET", "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["queue_length"], 0);
    assert_eq!(v["cached_articles"], 0);
    assert_eq!(v["harvest_interval"], 60);
    assert_eq!(v["allowed_statuses"], serde_json::json!(["green", "yellow"]));
    assert!(v["last_cycle"].is_null());
}

#[tokio::test]
async fn manual_harvest_is_observable_through_stats() {
    let (app, scheduler) = app_for(one_feed().harvester);

    let (status, v) = call(&app, "POST", "/harvest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "harvest started");

    scheduler.shutdown().await;

    let (_, v) = call(&app, "GET", "/stats").await;
    assert_eq!(v["queue_length"], 2);
    assert_eq!(v["cached_articles"], 2);
    assert_eq!(v["last_cycle"]["trigger"], "manual");
    assert_eq!(v["last_cycle"]["items_novel"], 2);
}

#[tokio::test]
async fn harvest_after_shutdown_is_refused() {
    let (app, scheduler) = app_for(one_feed().harvester);
    scheduler.shutdown().await;
    let (status, v) = call(&app, "POST", "/harvest").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(v["error"].is_string());
}

#[tokio::test]
async fn stats_returns_500_when_a_store_is_down() {
    let harvester = harvester_with(
        Arc::new(MemorySourceStore::default()),
        Arc::new(FixtureFetcher::new()),
        Arc::new(MemoryDedupCache::new()),
        Arc::new(DownQueue),
    );
    let (app, _) = app_for(harvester);
    let (status, v) = call(&app, "GET", "/stats").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let msg = v["error"].as_str().unwrap();
    assert!(msg.contains("connection refused"));
    assert!(msg.starts_with("work queue unavailable"));
}

#[tokio::test]
async fn get_on_harvest_is_not_allowed() {
    let (app, _) = app_for(one_feed().harvester);
    let req = Request::builder()
        .method("GET")
        .uri("/harvest")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
