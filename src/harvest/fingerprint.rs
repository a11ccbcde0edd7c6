// src/harvest/fingerprint.rs
//! Stable item identity: SHA-256 over the first non-empty of link, guid, title.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::harvest::types::{Fingerprint, RawItem};

/// Identity field of an item. Falls back to the (possibly empty) title so that
/// malformed items still get enqueued once instead of vanishing silently.
pub fn identity_of(item: &RawItem) -> &str {
    [item.link.as_deref(), item.guid.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or(item.title.as_str())
}

pub fn fingerprint(item: &RawItem) -> Fingerprint {
    let identity = identity_of(item);
    if identity.is_empty() {
        tracing::debug!(target: "harvest", source = %item.origin, "item without identity fields");
    }
    digest(identity)
}

fn digest(identity: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    let bytes = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in bytes.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    Fingerprint::from_hex(out)
}
