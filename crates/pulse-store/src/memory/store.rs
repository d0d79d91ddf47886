//! In-memory store implementation using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use pulse_core::config::store::MemoryStoreConfig;
use pulse_core::result::AppResult;
use pulse_core::traits::store::PresenceStore;

/// A stored value together with its optional per-entry TTL.
///
/// Ban flags expire on their own schedule while presence records live until
/// deleted, so expiry must be tracked per entry rather than cache-wide.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
}

/// Expiry policy that reads each entry's own TTL.
struct PerEntryExpiry;

impl Expiry<String, Entry> for PerEntryExpiry {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        entry.ttl
    }

    // Overwrites take the new entry's TTL, not the remaining old one.
    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// In-memory presence store provider using moka.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// The underlying moka cache.
    cache: Cache<String, Entry>,
}

impl MemoryStore {
    /// Create a new in-memory store from configuration.
    pub fn new(config: &MemoryStoreConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryExpiry)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl: None,
                },
            )
            .await;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl: Some(ttl),
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.get(key).await.is_some())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> MemoryStore {
        MemoryStore::new(&MemoryStoreConfig { max_capacity: 1000 })
    }

    #[tokio::test]
    async fn test_set_get() {
        let store = make_store();
        store.set("key1", "value1").await.unwrap();
        let val = store.get("key1").await.unwrap();
        assert_eq!(val, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = make_store();
        store.set("key2", "value2").await.unwrap();
        store.delete("key2").await.unwrap();
        let val = store.get("key2").await.unwrap();
        assert_eq!(val, None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = make_store();
        store
            .set_with_ttl("short", "gone soon", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(store.exists("short").await.unwrap());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!store.exists("short").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_ttl() {
        let store = make_store();
        store
            .set_with_ttl("k", "v1", Duration::from_millis(50))
            .await
            .unwrap();
        store.set("k", "v2").await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_no_ttl_persists() {
        let store = make_store();
        store.set("durable", "stays").await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(
            store.get("durable").await.unwrap(),
            Some("stays".to_string())
        );
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let store = make_store();
        let data = serde_json::json!({"last_active": 42, "connection_handle": "abc"});
        store.set_json("json_key", &data).await.unwrap();
        let result: Option<serde_json::Value> = store.get_json("json_key").await.unwrap();
        assert_eq!(result, Some(data));
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = make_store();
        assert!(store.health_check().await.unwrap());
    }
}
