//! `reqwest` implementation of [`ContentApi`].

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::models::{
    Advert, Article, AuthSession, Bonus, Credentials, Offer, Prediction,
};
use crate::backend::{BackendError, ContentApi};
use crate::config::BackendConfig;
use crate::routing::Sport;

const API_KEY_HEADER: &str = "x-api-key";

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, api_key: Option<SecretString>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(format!("{}{path}", self.base_url)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.expose_secret()),
            None => request,
        }
    }

    /// Send and decode, mapping non-success statuses to [`BackendError`].
    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Result<T, BackendError> {
        self.fetch_optional(endpoint, request)
            .await?
            .ok_or_else(|| BackendError::Status {
                status: StatusCode::NOT_FOUND,
                endpoint: endpoint.to_string(),
            })
    }

    /// Like [`Self::fetch`], but a 404 is `Ok(None)`.
    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                status,
                endpoint: endpoint.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|source| BackendError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })
    }
}

/// Percent-encode a page slug one `/`-separated segment at a time.
///
/// Empty, `.` and `..` segments yield `None`: they would address a different
/// backend resource than the one under the endpoint prefix.
fn slug_path(slug: &str) -> Option<String> {
    slug.split('/')
        .map(|segment| match segment {
            "" | "." | ".." => None,
            _ => Some(urlencoding::encode(segment)),
        })
        .collect::<Option<Vec<_>>>()
        .map(|segments| segments.join("/"))
}

#[async_trait]
impl ContentApi for HttpBackend {
    async fn predictions(&self, sport: Sport, date: NaiveDate) -> Result<Vec<Prediction>, BackendError> {
        let endpoint = format!("/predictions/{sport}");
        let request = self
            .get(&endpoint)
            .query(&[("date", date.format("%Y-%m-%d").to_string())]);
        self.fetch(&endpoint, request).await
    }

    async fn prediction(&self, sport: Sport, slug: &str) -> Result<Option<Prediction>, BackendError> {
        let Some(slug) = slug_path(slug) else {
            debug!(%sport, slug, "Rejected prediction slug");
            return Ok(None);
        };
        let endpoint = format!("/predictions/{sport}/{slug}");
        self.fetch_optional(&endpoint, self.get(&endpoint)).await
    }

    async fn blogs(&self, page: u32) -> Result<Vec<Article>, BackendError> {
        let request = self.get("/blogs").query(&[("page", page)]);
        self.fetch("/blogs", request).await
    }

    async fn blog(&self, slug: &str) -> Result<Option<Article>, BackendError> {
        let Some(slug) = slug_path(slug) else {
            debug!(slug, "Rejected blog slug");
            return Ok(None);
        };
        let endpoint = format!("/blogs/{slug}");
        self.fetch_optional(&endpoint, self.get(&endpoint)).await
    }

    async fn news(&self, page: u32) -> Result<Vec<Article>, BackendError> {
        let request = self.get("/news").query(&[("page", page)]);
        self.fetch("/news", request).await
    }

    async fn news_item(&self, slug: &str) -> Result<Option<Article>, BackendError> {
        let Some(slug) = slug_path(slug) else {
            debug!(slug, "Rejected news slug");
            return Ok(None);
        };
        let endpoint = format!("/news/{slug}");
        self.fetch_optional(&endpoint, self.get(&endpoint)).await
    }

    async fn vip_tips(&self, token: &str) -> Result<Vec<Prediction>, BackendError> {
        let request = self.get("/vip-tips").bearer_auth(token);
        self.fetch("/vip-tips", request).await
    }

    async fn offers(&self) -> Result<Vec<Offer>, BackendError> {
        self.fetch("/offers", self.get("/offers")).await
    }

    async fn bonuses(&self) -> Result<Vec<Bonus>, BackendError> {
        self.fetch("/bonuses", self.get("/bonuses")).await
    }

    async fn adverts(&self) -> Result<Vec<Advert>, BackendError> {
        self.fetch("/adverts", self.get("/adverts")).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, BackendError> {
        let request = self
            .authorize(self.client.post(format!("{}/auth/login", self.base_url)))
            .json(credentials);
        self.fetch("/auth/login", request).await
    }
}
