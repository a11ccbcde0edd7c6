// tests/config_env.rs
use bb8_redis::redis::ConnectionAddr;
use feed_harvester::config::{HarvesterConfig, StoreBackend};
use std::env;
use std::time::Duration;

const KEYS: &[&str] = &[
    "HARVEST_INTERVAL",
    "ALLOWED_STATUSES",
    "STORE_BACKEND",
    "REDIS_URL",
    "SOURCES_PATH",
    "DEDUP_TTL_SECS",
    "FETCH_TIMEOUT_SECS",
];

fn clear() {
    for k in KEYS {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn env_overrides_defaults() {
    clear();
    env::set_var("HARVEST_INTERVAL", "15");
    env::set_var("ALLOWED_STATUSES", "Green");
    env::set_var("STORE_BACKEND", "memory");
    env::set_var("SOURCES_PATH", "/etc/harvester/sources.json");
    env::set_var("DEDUP_TTL_SECS", "3600");

    let c = HarvesterConfig::from_env().expect("valid env");
    assert_eq!(c.harvest_interval, Duration::from_secs(15));
    assert_eq!(c.allowed_statuses, vec!["green".to_string()]);
    assert_eq!(c.store_backend, StoreBackend::Memory);
    assert_eq!(c.sources_path.to_str(), Some("/etc/harvester/sources.json"));
    assert_eq!(c.dedup_ttl, Duration::from_secs(3600));
    clear();
}

#[serial_test::serial]
#[test]
fn redis_url_wins_over_host_and_port() {
    clear();
    env::set_var("REDIS_URL", "redis://cache.internal:6390/2");
    let c = HarvesterConfig::from_env().expect("valid env");
    let info = c.redis.connection_info().expect("url parses");
    assert_eq!(info.addr, ConnectionAddr::Tcp("cache.internal".into(), 6390));
    assert_eq!(info.redis.db, 2);
    clear();
}

#[serial_test::serial]
#[test]
fn zero_dedup_ttl_is_a_config_error() {
    clear();
    env::set_var("DEDUP_TTL_SECS", "0");
    let err = HarvesterConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("DEDUP_TTL_SECS"));
    clear();
}

#[serial_test::serial]
#[test]
fn invalid_interval_is_a_config_error() {
    clear();
    env::set_var("HARVEST_INTERVAL", "-5");
    let err = HarvesterConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("HARVEST_INTERVAL"));
    clear();
}
