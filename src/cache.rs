//! Bounded in-memory ETag cache for conditional GET requests.
//!
//! Entries are keyed by request URL and evicted in insertion order once
//! `max_entries` is reached. Re-storing an existing URL refreshes it to the
//! most-recently-inserted position, so frequently revalidated resources are
//! not the first to go.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// Default capacity of an [`EtagCache`].
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug)]
struct CacheEntry {
    etag: String,
    body: Bytes,
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    // insertion sequence -> key, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

/// Thread-safe URL → (ETag, body) store.
#[derive(Debug)]
pub struct EtagCache {
    max_entries: usize,
    inner: Mutex<Inner>,
}

impl Default for EtagCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl EtagCache {
    /// Create a cache holding at most `max_entries` responses (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The stored ETag for `url`.
    pub fn get(&self, url: &str) -> Option<String> {
        self.lock().entries.get(url).map(|e| e.etag.clone())
    }

    /// The stored response body for `url`.
    pub fn get_body(&self, url: &str) -> Option<Bytes> {
        self.lock().entries.get(url).map(|e| e.body.clone())
    }

    /// Store a response, evicting the oldest entry if the cache is full.
    pub fn store(&self, url: &str, body: Bytes, etag: &str) {
        let mut inner = self.lock();

        if let Some(old) = inner.entries.remove(url) {
            inner.order.remove(&old.seq);
        }

        while inner.entries.len() >= self.max_entries {
            let Some((_, oldest)) = inner.order.pop_first() else {
                break;
            };
            inner.entries.remove(&oldest);
            tracing::trace!(url = %oldest, "etag cache evicted");
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, url.to_string());
        inner.entries.insert(
            url.to_string(),
            CacheEntry {
                etag: etag.to_string(),
                body,
                seq,
            },
        );
    }

    /// Drop the entry for `url`, if any.
    pub fn invalidate(&self, url: &str) {
        let mut inner = self.lock();
        if let Some(old) = inner.entries.remove(url) {
            inner.order.remove(&old.seq);
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of cached responses.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn url(n: usize) -> String {
        format!("https://3.basecampapi.com/1/projects/{n}.json")
    }

    #[test]
    fn test_store_and_get() {
        let cache = EtagCache::new(10);
        cache.store(&url(1), Bytes::from_static(b"{\"id\":1}"), "\"abc\"");

        assert_eq!(cache.get(&url(1)).as_deref(), Some("\"abc\""));
        assert_eq!(cache.get_body(&url(1)).unwrap(), Bytes::from_static(b"{\"id\":1}"));
        assert_eq!(cache.get(&url(2)), None);
        assert_eq!(cache.get_body(&url(2)), None);
    }

    #[test]
    fn test_evicts_oldest_by_insertion_order() {
        let cache = EtagCache::new(3);
        for n in 1..=4 {
            cache.store(&url(n), Bytes::new(), &format!("e{n}"));
        }

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&url(1)), None);
        for n in 2..=4 {
            assert!(cache.get(&url(n)).is_some(), "entry {n} should survive");
        }
    }

    #[test]
    fn test_restore_refreshes_position() {
        let cache = EtagCache::new(3);
        cache.store(&url(1), Bytes::new(), "a");
        cache.store(&url(2), Bytes::new(), "b");
        cache.store(&url(3), Bytes::new(), "c");

        // refresh the oldest key, then overflow
        cache.store(&url(1), Bytes::new(), "a2");
        cache.store(&url(4), Bytes::new(), "d");

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&url(1)).as_deref(), Some("a2"));
        assert_eq!(cache.get(&url(2)), None);
        assert!(cache.get(&url(3)).is_some());
        assert!(cache.get(&url(4)).is_some());
    }

    #[test]
    fn test_clear_empties_all_keys() {
        let cache = EtagCache::default();
        for n in 0..20 {
            cache.store(&url(n), Bytes::new(), "e");
        }
        cache.clear();

        assert!(cache.is_empty());
        for n in 0..20 {
            assert_eq!(cache.get(&url(n)), None);
        }
    }

    #[test]
    fn test_invalidate_single_key() {
        let cache = EtagCache::new(5);
        cache.store(&url(1), Bytes::new(), "a");
        cache.store(&url(2), Bytes::new(), "b");
        cache.invalidate(&url(1));

        assert_eq!(cache.get(&url(1)), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_writers_respect_capacity() {
        let cache = Arc::new(EtagCache::new(50));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for n in 0..200 {
                        cache.store(&url(t * 1000 + n), Bytes::new(), "e");
                        assert!(cache.len() <= 50);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 50);
    }
}
