use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::StoreError;

/// A value read together with the version it was written at.
///
/// Absent keys still carry a version; a fresh key starts at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: Option<String>,
    pub version: u64,
}

/// Key-value contract the scheduling core runs against.
///
/// Patterns passed to `keys` only support `*` wildcards.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), StoreError>;

    /// Writes only when the key is absent or expired. Returns whether the write happened.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    async fn get_versioned(&self, key: &str) -> Result<Versioned, StoreError>;

    /// Writes `value` only if the key is still at `expected_version`.
    async fn compare_and_set(
        &self,
        key: &str,
        expected_version: u64,
        value: &str,
    ) -> Result<bool, StoreError>;
}

pub async fn get_json<T>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn set_json<T>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
    ttl_seconds: Option<u64>,
) -> Result<(), StoreError>
where
    T: Serialize,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw, ttl_seconds).await
}

/// Optimistic read-modify-write of a JSON document.
///
/// `apply` sees the current document (or `T::default()` when the key is absent) and may
/// mutate it in place. Returning an error aborts the update without writing. On a version
/// mismatch the document is re-read and `apply` runs again, up to `max_retries` times.
pub async fn update_json<T, R, E, F>(
    store: &dyn KeyValueStore,
    key: &str,
    max_retries: u32,
    mut apply: F,
) -> Result<R, E>
where
    T: Serialize + DeserializeOwned + Default,
    F: FnMut(&mut T) -> Result<R, E>,
    E: From<StoreError>,
{
    let attempts = max_retries + 1;

    for attempt in 1..=attempts {
        let current = store.get_versioned(key).await?;
        let mut document: T = match current.value.as_deref() {
            Some(raw) => serde_json::from_str(raw).map_err(StoreError::from)?,
            None => T::default(),
        };

        let output = apply(&mut document)?;
        let raw = serde_json::to_string(&document).map_err(StoreError::from)?;

        if store.compare_and_set(key, current.version, &raw).await? {
            debug!("Updated {} at version {} (attempt {})", key, current.version + 1, attempt);
            return Ok(output);
        }

        warn!("Version conflict on {} (attempt {}/{})", key, attempt, attempts);
        tokio::time::sleep(Duration::from_millis(5 * u64::from(attempt))).await;
    }

    Err(StoreError::Conflict {
        key: key.to_string(),
        attempts,
    }
    .into())
}

/// Glob match supporting `*` only, mirroring how Redis `KEYS` treats the patterns we issue.
pub fn matches_pattern(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !key.starts_with(first) || key.len() < first.len() + last.len() || !key.ends_with(last) {
        return false;
    }

    let mut rest = &key[first.len()..key.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    true
}
