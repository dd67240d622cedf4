//! Shared site state handed to every request handler.
//!
//! Adverts, bonuses and member sessions live here instead of in process-wide
//! globals. A context is built once with [`SiteContext::init`] and released
//! with [`SiteContext::shutdown`].

pub mod auth;
pub mod cache;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::backend::models::{Advert, Bonus};
use crate::backend::ContentApi;
use crate::config::CacheConfig;
use crate::db::store::Store;
use crate::monitoring::health::HealthState;

pub use auth::AuthContext;
pub use cache::CachedResource;

pub struct SiteContext {
    pub api: Arc<dyn ContentApi>,
    pub health: HealthState,
    pub auth: AuthContext,
    adverts: CachedResource<Vec<Advert>>,
    bonuses: CachedResource<Vec<Bonus>>,
    store: Arc<Store>,
}

impl SiteContext {
    /// Build the context and restore whatever the store remembers.
    ///
    /// A snapshot that fails to load is logged and skipped; the resource will
    /// simply be fetched on first use.
    pub async fn init(
        config: &CacheConfig,
        store: Store,
        api: Arc<dyn ContentApi>,
        health: HealthState,
    ) -> Result<Self> {
        let store = Arc::new(store);

        let context = Self {
            api,
            auth: AuthContext::new(store.clone()),
            adverts: CachedResource::new(
                "adverts",
                Duration::from_secs(config.advert_ttl_seconds),
                store.clone(),
                health.clone(),
            ),
            bonuses: CachedResource::new(
                "bonuses",
                Duration::from_secs(config.bonus_ttl_seconds),
                store.clone(),
                health.clone(),
            ),
            health,
            store,
        };

        for (key, hydrated) in [
            (context.adverts.key(), context.adverts.hydrate().await),
            (context.bonuses.key(), context.bonuses.hydrate().await),
        ] {
            match hydrated {
                Ok(found) => info!(key, found, "Cached resource hydrated"),
                Err(e) => warn!(key, error = %e, "Failed to hydrate cached resource"),
            }
        }

        let sessions = context.auth.hydrate().await?;
        info!(sessions, "Site context initialized");

        Ok(context)
    }

    pub async fn adverts(&self) -> Vec<Advert> {
        self.adverts.get_with(|| self.api.adverts()).await
    }

    /// Active adverts, optionally limited to one placement.
    pub async fn active_adverts(&self, placement: Option<&str>) -> Vec<Advert> {
        self.adverts()
            .await
            .into_iter()
            .filter(|advert| advert.active)
            .filter(|advert| placement.map_or(true, |p| advert.placement == p))
            .collect()
    }

    pub async fn bonuses(&self) -> Vec<Bonus> {
        self.bonuses.get_with(|| self.api.bonuses()).await
    }

    /// Drop cached adverts and bonuses so the next read goes to the backend.
    pub async fn refresh(&self) {
        self.adverts.invalidate().await;
        self.bonuses.invalidate().await;
    }

    /// Flush cached state and close the store.
    pub async fn shutdown(&self) -> Result<()> {
        self.adverts.flush().await?;
        self.bonuses.flush().await?;
        self.store.close().await;
        info!("Site context shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HttpBackend;
    use crate::config::BackendConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cache_config() -> CacheConfig {
        CacheConfig {
            advert_ttl_seconds: 60,
            bonus_ttl_seconds: 60,
        }
    }

    async fn context(server: &MockServer) -> SiteContext {
        let backend = HttpBackend::new(
            &BackendConfig {
                base_url: server.uri(),
                timeout_seconds: 5,
            },
            None,
        )
        .unwrap();
        let store = Store::new(":memory:").await.unwrap();
        SiteContext::init(&cache_config(), store, Arc::new(backend), HealthState::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_active_adverts_filtered_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/adverts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "placement": "home", "active": true},
                {"id": 2, "placement": "home", "active": false},
                {"id": 3, "placement": "sidebar"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server).await;
        let home: Vec<u64> = ctx.active_adverts(Some("home")).await.iter().map(|a| a.id).collect();
        assert_eq!(home, vec![1]);
        let all: Vec<u64> = ctx.active_adverts(None).await.iter().map(|a| a.id).collect();
        assert_eq!(all, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_bonus_failure_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bonuses"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ctx = context(&server).await;
        assert!(ctx.bonuses().await.is_empty());
        assert_eq!(ctx.health.snapshot().backend_failures, 1);
    }

    #[tokio::test]
    async fn test_refresh_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bonuses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 10, "bookmaker": "Acme Bet", "title": "Welcome bonus"}
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let ctx = context(&server).await;
        assert_eq!(ctx.bonuses().await.len(), 1);
        ctx.refresh().await;
        assert_eq!(ctx.bonuses().await.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_flushes() {
        let server = MockServer::start().await;
        let ctx = context(&server).await;
        ctx.shutdown().await.unwrap();
    }
}
