//! A TTL-tracked set: entries carry their insertion time and are swept
//! after a configurable bound regardless of whether anything consumed
//! them. Used for both `pendingInjections` and `pendingAuthTags`, which
//! share the same 60 s-default lifetime rule.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct TtlSet {
    entries: HashMap<String, Instant>,
}

impl TtlSet {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: String) {
        self.entries.insert(key, Instant::now());
    }

    /// Remove and report whether `key` was present — the matching-frame
    /// path uses this to decide whether a response was for an injection.
    pub fn take(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every entry older than `ttl`. Tolerates concurrent removal by
    /// `take` — sweeping an already-removed key is simply a no-op.
    pub fn sweep(&mut self, ttl: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, inserted_at| now.duration_since(*inserted_at) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
