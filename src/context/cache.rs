//! Fetch-and-cache with a TTL, backed by a persisted snapshot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::backend::BackendError;
use crate::db::store::Store;
use crate::monitoring::health::HealthState;

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

/// A single backend resource cached in memory and mirrored to the snapshot store.
///
/// Readers get the cached value while it is younger than the TTL. A failed
/// refresh keeps serving the stale value, or `T::default()` if there is none.
pub struct CachedResource<T> {
    key: &'static str,
    ttl: Duration,
    store: Arc<Store>,
    health: HealthState,
    state: RwLock<Option<Cached<T>>>,
}

impl<T> CachedResource<T>
where
    T: Clone + Default + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(key: &'static str, ttl: Duration, store: Arc<Store>, health: HealthState) -> Self {
        Self {
            key,
            ttl,
            store,
            health,
            state: RwLock::new(None),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Load the persisted snapshot, keeping its original fetch time.
    pub async fn hydrate(&self) -> Result<bool> {
        let Some(record) = self.store.get_snapshot(self.key).await? else {
            return Ok(false);
        };
        let Some(fetched_at) = record.fetched_at() else {
            warn!(key = self.key, "Snapshot has an unreadable timestamp, ignoring it");
            return Ok(false);
        };
        let value: T = match serde_json::from_str(&record.payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = self.key, error = %e, "Snapshot payload no longer decodes, ignoring it");
                return Ok(false);
            }
        };

        *self.state.write().await = Some(Cached { value, fetched_at });
        debug!(key = self.key, %fetched_at, "Hydrated cached resource");
        Ok(true)
    }

    /// Cached value if fresh, otherwise the result of `fetch`.
    pub async fn get_with<F, Fut>(&self, fetch: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let stale = {
            let state = self.state.read().await;
            match state.as_ref() {
                Some(cached) if self.is_fresh(cached.fetched_at) => return cached.value.clone(),
                Some(cached) => Some(cached.value.clone()),
                None => None,
            }
        };

        match fetch().await {
            Ok(value) => {
                let fetched_at = Utc::now();
                if let Err(e) = self.persist(&value, fetched_at).await {
                    warn!(key = self.key, error = %e, "Failed to persist snapshot");
                }
                *self.state.write().await = Some(Cached {
                    value: value.clone(),
                    fetched_at,
                });
                value
            }
            Err(e) => {
                warn!(
                    key = self.key,
                    error = %e,
                    has_stale = stale.is_some(),
                    "Refresh failed, serving fallback"
                );
                self.health.record_backend_failure();
                stale.unwrap_or_default()
            }
        }
    }

    /// Drop the in-memory copy so the next read refetches.
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }

    /// Write the current in-memory value back to the store.
    pub async fn flush(&self) -> Result<()> {
        let state = self.state.read().await;
        if let Some(cached) = state.as_ref() {
            self.persist(&cached.value, cached.fetched_at).await?;
        }
        Ok(())
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        // A timestamp from the future counts as fresh.
        (Utc::now() - fetched_at)
            .to_std()
            .map_or(true, |age| age < self.ttl)
    }

    async fn persist(&self, value: &T, fetched_at: DateTime<Utc>) -> Result<()> {
        let payload = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize snapshot {}", self.key))?;
        self.store.put_snapshot(self.key, &payload, fetched_at).await
    }
}
