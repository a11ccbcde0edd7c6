// tests/dedup_concurrency.rs
use std::sync::Arc;
use tokio::sync::Barrier;

use feed_harvester::harvest::dedup::{DedupCache, MemoryDedupCache, DEFAULT_DEDUP_TTL};
use feed_harvester::harvest::fingerprint::fingerprint;
use feed_harvester::harvest::types::RawItem;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn exactly_one_concurrent_caller_wins() {
    const N: usize = 64;
    let cache = Arc::new(MemoryDedupCache::new());
    let fp = fingerprint(&RawItem {
        link: Some("http://a/contended".into()),
        ..Default::default()
    });
    let barrier = Arc::new(Barrier::new(N));

    let mut handles = Vec::with_capacity(N);
    for _ in 0..N {
        let cache = cache.clone();
        let fp = fp.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            cache.check_and_mark(&fp, DEFAULT_DEDUP_TTL).await.unwrap()
        }));
    }

    let mut winners = 0;
    for h in handles {
        if h.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_fingerprints_do_not_interfere() {
    let cache = Arc::new(MemoryDedupCache::new());
    let mut handles = Vec::new();
    for i in 0..100 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let fp = fingerprint(&RawItem {
                link: Some(format!("http://a/{i}")),
                ..Default::default()
            });
            cache.check_and_mark(&fp, DEFAULT_DEDUP_TTL).await.unwrap()
        }));
    }
    for h in handles {
        assert!(h.await.unwrap());
    }
    assert_eq!(cache.len().await.unwrap(), 100);
}
