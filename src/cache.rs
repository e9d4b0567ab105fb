use crate::api::SearchResponse;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

pub const DEFAULT_CAPACITY: usize = 256;
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

struct CachedPreview {
    response: SearchResponse,
    fetched_at: Instant,
}

/// Word-keyed preview responses, fresh for `ttl` after they were fetched.
/// Shared by every content instance on the page so repeated hovers on the
/// same word do not refetch.
pub struct PreviewCache {
    entries: Mutex<LruCache<String, CachedPreview>>,
    ttl: Duration,
}

impl PreviewCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, word: &str, now: Instant) -> Option<SearchResponse> {
        let mut guard = self.entries.lock();
        let fresh = guard
            .get(word)
            .map(|cached| now.saturating_duration_since(cached.fetched_at) < self.ttl)?;
        if fresh {
            guard.get(word).map(|cached| cached.response.clone())
        } else {
            guard.pop(word);
            None
        }
    }

    pub fn insert(&self, word: &str, response: SearchResponse, now: Instant) {
        self.entries.lock().put(
            word.to_string(),
            CachedPreview {
                response,
                fetched_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}
