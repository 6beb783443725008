use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::store::{matches_pattern, KeyValueStore, Versioned};
use crate::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    value: Option<String>,
    version: u64,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn live_value(&self, now: DateTime<Utc>) -> Option<&String> {
        match self.expires_at {
            Some(expires_at) if expires_at <= now => None,
            _ => self.value.as_ref(),
        }
    }
}

/// Process-local store used when no Redis is configured, and by the test suites.
///
/// Deleted and expired keys keep their version counter so a stale reader can never win a
/// compare-and-set against a recreated key.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn expiry(ttl_seconds: Option<u64>) -> Option<DateTime<Utc>> {
        ttl_seconds.map(|ttl| Utc::now() + Duration::seconds(ttl as i64))
    }

    fn write(entries: &mut HashMap<String, Entry>, key: &str, value: &str, ttl_seconds: Option<u64>) {
        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: None,
            version: 0,
            expires_at: None,
        });
        entry.value = Some(value.to_string());
        entry.version += 1;
        entry.expires_at = Self::expiry(ttl_seconds);
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).and_then(|entry| entry.live_value(Utc::now()).cloned()))
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        Self::write(&mut entries, key, value, ttl_seconds);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let occupied = entries
            .get(key)
            .map(|entry| entry.live_value(Utc::now()).is_some())
            .unwrap_or(false);

        if occupied {
            return Ok(false);
        }

        Self::write(&mut entries, key, value, ttl_seconds);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        match entries.get_mut(key) {
            Some(entry) if entry.live_value(now).is_some() => {
                entry.value = None;
                entry.expires_at = None;
                entry.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().await;
        let now = Utc::now();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| entry.live_value(now).is_some() && matches_pattern(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn get_versioned(&self, key: &str) -> Result<Versioned, StoreError> {
        let entries = self.entries.read().await;
        Ok(match entries.get(key) {
            Some(entry) => Versioned {
                value: entry.live_value(Utc::now()).cloned(),
                version: entry.version,
            },
            None => Versioned {
                value: None,
                version: 0,
            },
        })
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected_version: u64,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let current = entries.get(key).map(|entry| entry.version).unwrap_or(0);
        if current != expected_version {
            return Ok(false);
        }

        Self::write(&mut entries, key, value, None);
        Ok(true)
    }
}
