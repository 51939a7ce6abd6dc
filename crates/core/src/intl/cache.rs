use super::matcher::CompiledMatcher;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    matcher: Arc<CompiledMatcher>,
    last_used: Instant,
}

/// Compiled matchers keyed by the exact ordered supported-tag list.
///
/// Entries idle longer than the TTL are swept on the next miss. Concurrent
/// misses for one key may both compile; the results are interchangeable and
/// the last insert wins.
pub struct MatcherCache {
    entries: DashMap<String, CacheEntry>,
    idle_ttl: Duration,
}

impl MatcherCache {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            idle_ttl,
        }
    }

    pub fn key<S: AsRef<str>>(supported: &[S]) -> String {
        supported
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn get_or_compile<S: AsRef<str>>(&self, supported: &[S]) -> Arc<CompiledMatcher> {
        let key = Self::key(supported);
        let now = Instant::now();

        if let Some(mut entry) = self.entries.get_mut(&key) {
            if now.duration_since(entry.last_used) < self.idle_ttl {
                entry.last_used = now;
                return Arc::clone(&entry.matcher);
            }
        }

        self.sweep(now);
        let matcher = Arc::new(CompiledMatcher::compile(supported));
        tracing::trace!("compiled language matcher for [{}]", key);
        self.entries.insert(
            key,
            CacheEntry {
                matcher: Arc::clone(&matcher),
                last_used: now,
            },
        );
        matcher
    }

    fn sweep(&self, now: Instant) {
        let ttl = self.idle_ttl;
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_used) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl fmt::Debug for MatcherCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherCache")
            .field("entries", &self.entries.len())
            .field("idle_ttl", &self.idle_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_order_sensitive() {
        assert_eq!(MatcherCache::key(&["en", "zh"]), "en,zh");
        assert_ne!(MatcherCache::key(&["en", "zh"]), MatcherCache::key(&["zh", "en"]));
    }

    #[test]
    fn test_hit_returns_same_matcher() {
        let cache = MatcherCache::new(Duration::from_secs(60));
        let a = cache.get_or_compile(&["en", "zh"]);
        let b = cache.get_or_compile(&["en", "zh"]);
        assert!(Arc::ptr_eq(&a, &b));
        cache.get_or_compile(&["zh", "en"]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_idle_entries_expire() {
        let cache = MatcherCache::new(Duration::ZERO);
        let a = cache.get_or_compile(&["en"]);
        cache.get_or_compile(&["fr"]);
        // With a zero TTL every lookup is a miss and sweeps everything older.
        assert_eq!(cache.len(), 1);
        let b = cache.get_or_compile(&["en"]);
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
