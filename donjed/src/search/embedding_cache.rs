use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe LRU cache of chunk embeddings, keyed by chunk id.
///
/// Lives beside the knowledge base rather than on the chunks so the
/// snapshot stays immutable. Entries are advisory and never persisted.
#[derive(Clone)]
pub struct EmbeddingCache {
    cache: Arc<Mutex<LruCache<String, Vec<f32>>>>,
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` vectors. A zero capacity
    /// is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn get(&self, chunk_id: &str) -> Option<Vec<f32>> {
        self.lock().get(chunk_id).cloned()
    }

    /// Store an embedding, evicting the least recently used entry when full.
    pub fn put(&self, chunk_id: impl Into<String>, embedding: Vec<f32>) {
        self.lock().put(chunk_id.into(), embedding);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Vec<f32>>> {
        // A panic mid-insert leaves the LRU consistent; keep serving.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
