//! Content backend: the external API serving predictions, articles, bonuses and auth.

pub mod http;
pub mod models;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::backend::models::{
    Advert, Article, AuthSession, Bonus, Credentials, Offer, Prediction,
};
use crate::monitoring::health::HealthState;
use crate::routing::Sport;

pub use http::HttpBackend;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status} for {endpoint}")]
    Status {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    #[error("failed to decode backend response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend rejected credentials")]
    Unauthorized,
}

/// Everything the site reads from the backend.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn predictions(&self, sport: Sport, date: NaiveDate) -> Result<Vec<Prediction>, BackendError>;

    /// `Ok(None)` when the backend has no such prediction.
    async fn prediction(&self, sport: Sport, slug: &str) -> Result<Option<Prediction>, BackendError>;

    async fn blogs(&self, page: u32) -> Result<Vec<Article>, BackendError>;

    async fn blog(&self, slug: &str) -> Result<Option<Article>, BackendError>;

    async fn news(&self, page: u32) -> Result<Vec<Article>, BackendError>;

    async fn news_item(&self, slug: &str) -> Result<Option<Article>, BackendError>;

    /// Tips reserved for signed-in members; `token` is the member's session token.
    async fn vip_tips(&self, token: &str) -> Result<Vec<Prediction>, BackendError>;

    async fn offers(&self) -> Result<Vec<Offer>, BackendError>;

    async fn bonuses(&self) -> Result<Vec<Bonus>, BackendError>;

    async fn adverts(&self) -> Result<Vec<Advert>, BackendError>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, BackendError>;
}

/// Site-wide fallback for listings: a failed fetch renders as an empty page.
pub fn or_empty<T>(result: Result<Vec<T>, BackendError>, what: &str, health: &HealthState) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(resource = what, error = %e, "Backend fetch failed, serving empty result");
            health.record_backend_failure();
            Vec::new()
        }
    }
}
