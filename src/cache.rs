use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::body::Bytes;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::Locale;

/// A serialized response body and its strong ETag.
#[derive(Debug, Clone)]
pub struct CachedBody {
    pub body: Bytes,
    pub etag: String,
    /// Row the body was rendered from.
    pub entity_id: Option<i64>,
    stored_at: Instant,
}

/// In-process cache of rendered JSON bodies with a fixed lifetime.
///
/// Every invalidation starts a new generation. A body rendered under an
/// older generation is handed back to its caller but never stored.
pub struct ResponseCache {
    ttl: Duration,
    generation: AtomicU64,
    entries: RwLock<HashMap<String, CachedBody>>,
}

pub fn etag_for(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

pub fn celebrity_key(slug: &str, locale: Locale) -> String {
    format!("celebrity:{}:{}", slug, locale)
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            generation: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read this before loading the data a body is rendered from.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn get(&self, key: &str) -> Option<CachedBody> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .cloned()
    }

    pub async fn insert(
        &self,
        key: String,
        body: Bytes,
        entity_id: Option<i64>,
        generation: u64,
    ) -> CachedBody {
        let entry = CachedBody {
            etag: etag_for(&body),
            body,
            entity_id,
            stored_at: Instant::now(),
        };
        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Not caching {}: invalidated while rendering", key);
            return entry;
        }
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        entries.insert(key, entry.clone());
        entry
    }

    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if !entries.is_empty() {
            debug!("Invalidating {} cached responses", entries.len());
        }
        entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_invalidate() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let key = celebrity_key("tarkan", Locale::Tr);
        assert_eq!(key, "celebrity:tarkan:tr");
        assert!(cache.get(&key).await.is_none());

        let stored = cache
            .insert(key.clone(), Bytes::from_static(b"{}"), Some(7), cache.generation())
            .await;
        let hit = cache.get(&key).await.unwrap();
        assert_eq!(hit.etag, stored.etag);
        assert_eq!(hit.body, Bytes::from_static(b"{}"));
        assert_eq!(hit.entity_id, Some(7));

        cache.invalidate_all().await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_expired_entries_miss() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache
            .insert("k".to_string(), Bytes::from_static(b"x"), None, cache.generation())
            .await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_body_rendered_before_invalidation_is_not_stored() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let generation = cache.generation();

        cache.invalidate_all().await;
        assert_ne!(cache.generation(), generation);

        let stale = cache
            .insert("k".to_string(), Bytes::from_static(b"old"), Some(1), generation)
            .await;
        assert_eq!(stale.body, Bytes::from_static(b"old"));
        assert!(cache.get("k").await.is_none());

        cache
            .insert("k".to_string(), Bytes::from_static(b"new"), Some(1), cache.generation())
            .await;
        assert_eq!(cache.get("k").await.unwrap().body, Bytes::from_static(b"new"));
    }

    #[test]
    fn test_etag_is_quoted_digest() {
        let etag = etag_for(b"hello");
        assert!(etag.starts_with('"') && etag.ends_with('"'));
        assert_eq!(etag.len(), 66);
        assert_ne!(etag, etag_for(b"hello!"));
    }
}
