//! Whole-document memoization behind a key and a TTL.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::trace;

use crate::context::QueryParams;
use crate::document::Document;

/// TTL cache of compiled documents.
///
/// Concurrent misses on the same key may both compute; the last writer wins.
/// Expired entries are evicted by the cache's own maintenance.
pub struct DocumentCache {
    ttl: Duration,
    entries: Cache<String, Arc<Document>>,
}

impl DocumentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Cache key: resource name plus canonical request parameters.
    pub fn key(name: &str, params: &QueryParams) -> String {
        let canonical = params.canonical();
        if canonical.is_empty() {
            name.to_string()
        } else {
            format!("{}?{}", name, canonical)
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached document for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<Document>> {
        self.entries.get(key)
    }

    pub fn insert(&self, key: impl Into<String>, document: Document) -> Arc<Document> {
        let document = Arc::new(document);
        self.entries.insert(key.into(), Arc::clone(&document));
        document
    }

    /// Return the cached document for `key`, or compute and store it.
    ///
    /// # Errors
    ///
    /// Errors from `compute` are returned as-is and nothing is stored.
    pub fn get_or_compute<E, F>(&self, key: &str, compute: F) -> Result<Arc<Document>, E>
    where
        F: FnOnce() -> Result<Document, E>,
    {
        if let Some(document) = self.get(key) {
            trace!(key, "document cache hit");
            return Ok(document);
        }
        trace!(key, "document cache miss");
        let document = compute()?;
        Ok(self.insert(key, document))
    }

    /// Run pending maintenance, evicting expired entries now.
    pub fn purge_expired(&self) {
        self.entries.run_pending_tasks();
    }

    /// Live entry count, after pending maintenance has run.
    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        usize::try_from(self.entries.entry_count()).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PrimaryData;
    use std::cell::Cell;
    use std::thread;

    fn document() -> Document {
        Document::new(PrimaryData::Many(Vec::new()))
    }

    #[test]
    fn computes_once_while_fresh() {
        let cache = DocumentCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);
        let compute = || -> Result<Document, ()> {
            calls.set(calls.get() + 1);
            Ok(document())
        };

        let first = cache.get_or_compute("articles", compute).unwrap();
        let second = cache.get_or_compute("articles", compute).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn expired_entries_recompute() {
        let cache = DocumentCache::new(Duration::from_millis(1));
        cache.insert("articles", document());
        thread::sleep(Duration::from_millis(20));
        assert!(cache.get("articles").is_none());

        let calls = Cell::new(0);
        cache
            .get_or_compute("articles", || -> Result<Document, ()> {
                calls.set(calls.get() + 1);
                Ok(document())
            })
            .unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = DocumentCache::new(Duration::from_millis(1));
        for i in 0..100 {
            cache.insert(format!("articles?page.number={}", i), document());
        }
        thread::sleep(Duration::from_millis(20));

        cache.purge_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = DocumentCache::new(Duration::from_secs(60));
        let result = cache.get_or_compute("articles", || Err::<Document, _>("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());
    }

    #[test]
    fn key_ignores_parameter_order() {
        let a = QueryParams::parse("includes=author&page[number]=2");
        let b = QueryParams::parse("page.number=2&includes=author");
        assert_eq!(DocumentCache::key("articles", &a), DocumentCache::key("articles", &b));
        assert_eq!(DocumentCache::key("articles", &QueryParams::new()), "articles");
    }
}
