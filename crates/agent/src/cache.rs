use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key for one declared engine: a tenant may run several properties, each
/// with its own personality and knowledge scope.
pub type EngineKey = (String, String);

/// Bounded cache of constructed engines. Eviction is least-recently-used
/// over a monotonic touch counter. Builders run under the lock; engine
/// construction is cheap and synchronous.
pub struct EngineCache<V> {
    capacity: usize,
    inner: Mutex<CacheInner<V>>,
}

struct CacheInner<V> {
    entries: HashMap<EngineKey, CacheEntry<V>>,
    clock: u64,
}

struct CacheEntry<V> {
    value: Arc<V>,
    touched: u64,
}

impl<V> EngineCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner { entries: HashMap::new(), clock: 0 }),
        }
    }

    /// Returns the cached engine for this tenant and property, building it
    /// with `build` on first use. Evicts the least recently used entry when
    /// the cache is full.
    pub fn get_or_insert_with(
        &self,
        tenant_id: &str,
        property_id: &str,
        build: impl FnOnce() -> V,
    ) -> Arc<V> {
        let key = (tenant_id.to_string(), property_id.to_string());
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.clock += 1;
        let now = inner.clock;

        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.touched = now;
            return Arc::clone(&entry.value);
        }

        if inner.entries.len() >= self.capacity {
            if let Some(stale) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(key, _)| key.clone())
            {
                inner.entries.remove(&stale);
            }
        }

        let value = Arc::new(build());
        inner.entries.insert(key, CacheEntry { value: Arc::clone(&value), touched: now });
        value
    }

    pub fn remove(&self, tenant_id: &str, property_id: &str) -> bool {
        let key = (tenant_id.to_string(), property_id.to_string());
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.entries.remove(&key).is_some()
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.entries.len(),
            Err(poisoned) => poisoned.into_inner().entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::EngineCache;

    #[test]
    fn builds_once_per_key_and_reuses() {
        let cache: EngineCache<String> = EngineCache::new(4);
        let first = cache.get_or_insert_with("t1", "p1", || "engine".to_string());
        let second = cache.get_or_insert_with("t1", "p1", || panic!("must not rebuild"));
        assert!(std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_properties_get_distinct_engines() {
        let cache: EngineCache<u32> = EngineCache::new(4);
        cache.get_or_insert_with("t1", "p1", || 1);
        cache.get_or_insert_with("t1", "p2", || 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn evicts_least_recently_used_when_full() {
        let cache: EngineCache<u32> = EngineCache::new(2);
        cache.get_or_insert_with("t1", "p1", || 1);
        cache.get_or_insert_with("t1", "p2", || 2);
        // touch p1 so p2 becomes the eviction candidate
        cache.get_or_insert_with("t1", "p1", || panic!("cached"));
        cache.get_or_insert_with("t1", "p3", || 3);

        assert_eq!(cache.len(), 2);
        let rebuilt = cache.get_or_insert_with("t1", "p2", || 22);
        assert_eq!(*rebuilt, 22);
    }

    #[test]
    fn remove_reports_whether_an_entry_existed() {
        let cache: EngineCache<u32> = EngineCache::new(2);
        cache.get_or_insert_with("t1", "p1", || 1);
        assert!(cache.remove("t1", "p1"));
        assert!(!cache.remove("t1", "p1"));
        assert!(cache.is_empty());
    }
}
