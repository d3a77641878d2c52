//! Response caching for gateway RPC calls
//!
//! Read-heavy portal pages (product catalogues, country lists) hammer the
//! gateway with identical requests. This module memoizes successful RPC
//! results keyed by method and canonicalized parameters so repeated lookups
//! within the TTL are served without a network round trip.
//!
//! # Cache Keys
//!
//! Keys are `tryton:{method}:{sha256}` where the digest covers the JSON
//! parameters serialized with object keys sorted recursively. Two calls that
//! differ only in map iteration order therefore share a key; array order is
//! significant and changes the key.
//!
//! # Expiry
//!
//! Every entry carries its own deadline, so callers can request a per-call
//! TTL that differs from the configured default. Reads check the deadline and
//! never return a stale value. A TTL of zero disables storage entirely.

use std::time::{Duration, Instant};

use moka::sync::Cache;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Default maximum number of cached responses
pub const DEFAULT_RESPONSE_CACHE_CAPACITY: u64 = 1_000;

/// Response cache configuration
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// TTL applied when the caller does not specify one
    pub default_ttl: Duration,
    /// Maximum number of entries before LRU eviction
    pub max_capacity: u64,
}

impl Default for ResponseCacheConfig {
    /// Creates config with the stock TTL, honoring the
    /// `PORTICO_ERP_CACHE_CAPACITY` environment variable for capacity.
    fn default() -> Self {
        let max_capacity = std::env::var("PORTICO_ERP_CACHE_CAPACITY")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_RESPONSE_CACHE_CAPACITY);

        Self {
            default_ttl: Duration::from_secs(
                portico_domain::constants::DEFAULT_RESPONSE_CACHE_TTL_SECS,
            ),
            max_capacity,
        }
    }
}

impl ResponseCacheConfig {
    /// Creates config with a specific default TTL
    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self { default_ttl, ..Default::default() }
    }

    /// Logs the configuration at startup
    pub fn log_config(&self) {
        info!(
            default_ttl_secs = self.default_ttl.as_secs(),
            max_capacity = self.max_capacity,
            "Response cache configured"
        );
    }
}

#[derive(Debug, Clone)]
struct CachedEntry {
    value: Value,
    expires_at: Instant,
}

/// Memoization layer for gateway RPC results
///
/// Eviction is by capacity; freshness is enforced per entry at read time so
/// a long-TTL entry is never cut short by a store-wide policy.
pub struct ResponseCache {
    entries: Cache<String, CachedEntry>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(config: ResponseCacheConfig) -> Self {
        let entries = Cache::builder().max_capacity(config.max_capacity).build();
        Self { entries, default_ttl: config.default_ttl }
    }

    /// TTL used when a caller passes no explicit one
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the cached value for `key` if present and fresh
    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            debug!(key, "Evicting expired cache entry");
            self.entries.invalidate(key);
            return None;
        }
        Some(entry.value)
    }

    /// Stores `value` under `key` for `ttl`; a zero TTL stores nothing
    pub fn store(&self, key: &str, value: &Value, ttl: Duration) {
        if ttl.is_zero() {
            debug!(key, "Skipping cache store (zero TTL)");
            return;
        }
        self.store_until(key, value, Instant::now() + ttl);
    }

    fn store_until(&self, key: &str, value: &Value, expires_at: Instant) {
        self.entries
            .insert(key.to_string(), CachedEntry { value: value.clone(), expires_at });
    }

    /// Drops a single entry
    pub fn invalidate(&self, key: &str) {
        self.entries.invalidate(key);
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Approximate number of live entries (for diagnostics and tests)
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("default_ttl", &self.default_ttl)
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

/// Builds the cache key for an RPC call
///
/// `params` of `None` hashes the literal string `null`, matching the digest
/// of an explicit JSON null.
pub fn cache_key(method: &str, params: Option<&Value>) -> String {
    let serialized = match params {
        None => "null".to_string(),
        Some(value) => canonical_json(value),
    };
    let digest = Sha256::digest(serialized.as_bytes());
    format!("tryton:{method}:{digest:x}")
}

/// Serializes JSON with object keys sorted recursively
///
/// Array element order is preserved: `[1, 2]` and `[2, 1]` are different
/// requests and must not collide.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
            pairs.sort_by_key(|(key, _)| key.as_str());
            out.push('{');
            for (index, (key, item)) in pairs.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
