use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

/// TTL-bounded cache keyed by `kind:name`.
///
/// Readers share the read lock; writers and eviction take the exclusive
/// lock. Reads past the TTL report a miss and evict the entry.
#[derive(Debug, Clone)]
pub struct TtlCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
}

/// One row of the admin cache view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheView {
    pub key: String,
    pub age_secs: u64,
    pub ttl_secs: u64,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        TtlCache { entries: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    pub fn cache_key(kind: &str, name: &str) -> String {
        format!("{}:{}", kind, name)
    }

    /// Fetch an unexpired entry; expired entries are evicted eagerly.
    pub fn get(&self, kind: &str, name: &str) -> Option<Value> {
        let key = Self::cache_key(kind, name);
        {
            let entries = self.entries.read().unwrap();
            match entries.get(&key) {
                Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // The entry exists but is beyond the TTL.
        self.entries.write().unwrap().remove(&key);
        None
    }

    pub fn put(&self, kind: &str, name: &str, value: Value) {
        let key = Self::cache_key(kind, name);
        self.entries
            .write()
            .unwrap()
            .insert(key, CacheEntry { value, inserted_at: Instant::now() });
    }

    /// Drop every entry; returns how many were evicted.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Current content for the admin observability endpoint.
    pub fn snapshot(&self) -> Vec<CacheView> {
        let entries = self.entries.read().unwrap();
        let mut views: Vec<CacheView> = entries
            .iter()
            .map(|(key, entry)| CacheView {
                key: key.clone(),
                age_secs: entry.inserted_at.elapsed().as_secs(),
                ttl_secs: self.ttl.as_secs(),
            })
            .collect();
        views.sort_by(|a, b| a.key.cmp(&b.key));
        views
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_get_roundtrip() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put("archetype", "node-fullstack", json!({"name": "node-fullstack"}));
        let hit = cache.get("archetype", "node-fullstack").unwrap();
        assert_eq!(hit["name"], "node-fullstack");
    }

    #[test]
    fn test_kind_segregates_keys() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put("archetype", "x", json!(1));
        assert!(cache.get("rule", "x").is_none());
    }

    #[test]
    fn test_expired_entry_misses_and_evicts() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.put("rule", "r", json!(1));
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("rule", "r").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_reports_count() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put("a", "1", json!(1));
        cache.put("a", "2", json!(2));
        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_snapshot_sorted_by_key() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put("rule", "zeta", json!(1));
        cache.put("archetype", "alpha", json!(2));
        let views = cache.snapshot();
        assert_eq!(views[0].key, "archetype:alpha");
        assert_eq!(views[1].key, "rule:zeta");
        assert_eq!(views[0].ttl_secs, 60);
    }
}
