//! Bounded TTL cache for per-batch column-role detection.
//!
//! Dashboards re-derive pivots and axes on every keystroke over the same
//! result set; detection is the only part worth memoizing. Entries are keyed
//! by a cheap batch signature, evicted by age and by capacity.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use crate::config::RoleCacheConfig;
use crate::rows::Row;

#[derive(Debug, Clone)]
struct CacheEntry {
    datetime_columns: Vec<String>,
    inserted_at: Instant,
}

/// Detection-result cache with TTL and size limits.
#[derive(Debug)]
pub struct RoleCache {
    entries: HashMap<u64, CacheEntry>,
    ttl: Duration,
    max_size: usize,
}

impl Default for RoleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleCache {
    pub fn new() -> Self {
        Self::with_config(&RoleCacheConfig::default())
    }

    pub fn with_config(config: &RoleCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            max_size: config.max_size,
        }
    }

    pub fn insert(&mut self, signature: u64, datetime_columns: Vec<String>) {
        if self.entries.len() >= self.max_size {
            self.evict_oldest();
        }
        self.entries.insert(
            signature,
            CacheEntry {
                datetime_columns,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, signature: u64) -> Option<&[String]> {
        self.entries.get(&signature).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(entry.datetime_columns.as_slice())
            } else {
                // Expired - treat as cache miss
                None
            }
        })
    }

    /// Remove expired entries.
    pub fn evict_expired(&mut self) {
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(k, _)| *k)
        {
            tracing::debug!(signature = oldest_key, "evicting oldest detection result");
            self.entries.remove(&oldest_key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Cheap identity for a batch: column names, row count, and the first row's
/// serialized values. Collisions only cost a stale detection result within
/// the TTL window.
pub fn batch_signature(rows: &[Row]) -> u64 {
    let mut hasher = DefaultHasher::new();
    rows.len().hash(&mut hasher);
    if let Some(first) = rows.first() {
        for key in first.keys() {
            key.hash(&mut hasher);
        }
        if let Ok(json) = serde_json::to_string(first) {
            json.hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn insert_and_get() {
        let mut cache = RoleCache::new();
        cache.insert(42, vec!["order_date".to_string()]);
        assert_eq!(cache.get(42), Some(&["order_date".to_string()][..]));
        assert_eq!(cache.get(7), None);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut cache = RoleCache::with_config(&RoleCacheConfig {
            ttl_secs: 3600,
            max_size: 2,
        });
        cache.insert(1, vec![]);
        cache.insert(2, vec![]);
        cache.insert(3, vec![]);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(1).is_none());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let mut cache = RoleCache::with_config(&RoleCacheConfig {
            ttl_secs: 0,
            max_size: 8,
        });
        cache.insert(1, vec!["d".to_string()]);
        assert!(cache.get(1).is_none());
        cache.evict_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn signature_distinguishes_batches() {
        let a = vec![row(&[("day", json!("2024-01-01")), ("n", json!(1))])];
        let b = vec![row(&[("day", json!("2024-01-02")), ("n", json!(1))])];
        assert_ne!(batch_signature(&a), batch_signature(&b));
        assert_eq!(batch_signature(&a), batch_signature(&a.clone()));
    }
}
