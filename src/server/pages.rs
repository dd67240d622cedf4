//! Page handlers. Each answers with the JSON view-model its page renders.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::backend::models::Article;
use crate::backend::{or_empty, BackendError};
use crate::context::SiteContext;
use crate::routing::Sport;
use crate::server::auth::bearer_token;
use crate::server::error::PageError;

type PageResult = Result<Json<Value>, PageError>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const HOME_SPORT: Sport = Sport::Football;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
}

impl PageQuery {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct PlacementQuery {
    placement: Option<String>,
}

fn parse_sport(segment: &str) -> Result<Sport, PageError> {
    segment
        .parse()
        .map_err(|_| PageError::NotFound(format!("page /{segment}")))
}

/// Path dates are only accepted in canonical `YYYY-MM-DD` form.
fn parse_date(raw: &str) -> Result<NaiveDate, PageError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .filter(|date| date.format(DATE_FORMAT).to_string() == raw)
        .ok_or_else(|| PageError::NotFound(format!("date {raw}")))
}

pub async fn home(State(ctx): State<Arc<SiteContext>>) -> Json<Value> {
    let today = Utc::now().date_naive();
    let predictions = or_empty(
        ctx.api.predictions(HOME_SPORT, today).await,
        "predictions",
        &ctx.health,
    );
    let adverts = ctx.active_adverts(Some("home")).await;
    let bonuses = ctx.bonuses().await;

    Json(json!({
        "date": today,
        "sport": HOME_SPORT,
        "predictions": predictions,
        "adverts": adverts,
        "bonuses": bonuses,
    }))
}

pub async fn sport_index(State(ctx): State<Arc<SiteContext>>, Path(sport): Path<String>) -> PageResult {
    let sport = parse_sport(&sport)?;
    Ok(predictions_page(&ctx, sport, Utc::now().date_naive()).await)
}

pub async fn sport_by_date(
    State(ctx): State<Arc<SiteContext>>,
    Path((sport, date)): Path<(String, String)>,
) -> PageResult {
    let sport = parse_sport(&sport)?;
    let date = parse_date(&date)?;
    Ok(predictions_page(&ctx, sport, date).await)
}

async fn predictions_page(ctx: &SiteContext, sport: Sport, date: NaiveDate) -> Json<Value> {
    let predictions = or_empty(ctx.api.predictions(sport, date).await, "predictions", &ctx.health);
    Json(json!({
        "sport": sport,
        "date": date,
        "predictions": predictions,
    }))
}

pub async fn prediction_by_date(
    State(ctx): State<Arc<SiteContext>>,
    Path((sport, date, slug)): Path<(String, String, String)>,
) -> PageResult {
    let sport = parse_sport(&sport)?;
    let date = parse_date(&date)?;
    prediction_page(&ctx, sport, Some(date), &slug).await
}

pub async fn prediction(
    State(ctx): State<Arc<SiteContext>>,
    Path((sport, slug)): Path<(String, String)>,
) -> PageResult {
    let sport = parse_sport(&sport)?;
    prediction_page(&ctx, sport, None, &slug).await
}

async fn prediction_page(ctx: &SiteContext, sport: Sport, date: Option<NaiveDate>, slug: &str) -> PageResult {
    match ctx.api.prediction(sport, slug).await {
        Ok(Some(prediction)) => Ok(Json(json!({
            "sport": sport,
            "date": date.unwrap_or(prediction.date),
            "prediction": prediction,
        }))),
        Ok(None) => Err(PageError::NotFound(format!("prediction {slug}"))),
        Err(e) => {
            warn!(%sport, slug, error = %e, "Prediction fetch failed, serving empty page");
            ctx.health.record_backend_failure();
            Ok(Json(json!({
                "sport": sport,
                "date": date,
                "prediction": null,
            })))
        }
    }
}

pub async fn blog_list(State(ctx): State<Arc<SiteContext>>, Query(query): Query<PageQuery>) -> Json<Value> {
    let page = query.page();
    let posts = or_empty(ctx.api.blogs(page).await, "blogs", &ctx.health);
    Json(json!({ "page": page, "posts": posts }))
}

pub async fn blog_post(State(ctx): State<Arc<SiteContext>>, Path(slug): Path<String>) -> PageResult {
    article_page(&ctx, ctx.api.blog(&slug).await, "blog post", &slug)
}

pub async fn news_list(State(ctx): State<Arc<SiteContext>>, Query(query): Query<PageQuery>) -> Json<Value> {
    let page = query.page();
    let items = or_empty(ctx.api.news(page).await, "news", &ctx.health);
    Json(json!({ "page": page, "items": items }))
}

pub async fn news_item(State(ctx): State<Arc<SiteContext>>, Path(slug): Path<String>) -> PageResult {
    article_page(&ctx, ctx.api.news_item(&slug).await, "news item", &slug)
}

fn article_page(
    ctx: &SiteContext,
    result: Result<Option<Article>, BackendError>,
    what: &str,
    slug: &str,
) -> PageResult {
    match result {
        Ok(Some(article)) => Ok(Json(json!({ "article": article }))),
        Ok(None) => Err(PageError::NotFound(format!("{what} {slug}"))),
        Err(e) => {
            warn!(resource = what, slug, error = %e, "Article fetch failed, serving empty page");
            ctx.health.record_backend_failure();
            Ok(Json(json!({ "article": null })))
        }
    }
}

/// Members-only tips. Requires a bearer token from `/auth/login`.
pub async fn vip(State(ctx): State<Arc<SiteContext>>, headers: HeaderMap) -> PageResult {
    let token = bearer_token(&headers).ok_or(PageError::Unauthorized)?;
    let user = ctx.auth.session(token).await.ok_or(PageError::Unauthorized)?;
    let tips = or_empty(ctx.api.vip_tips(token).await, "vip_tips", &ctx.health);
    Ok(Json(json!({ "member": user.username, "tips": tips })))
}

pub async fn offers(State(ctx): State<Arc<SiteContext>>) -> Json<Value> {
    let offers = or_empty(ctx.api.offers().await, "offers", &ctx.health);
    Json(json!({ "offers": offers }))
}

pub async fn bonuses(State(ctx): State<Arc<SiteContext>>) -> Json<Value> {
    let bonuses = ctx.bonuses().await;
    Json(json!({ "bonuses": bonuses }))
}

pub async fn adverts(State(ctx): State<Arc<SiteContext>>, Query(query): Query<PlacementQuery>) -> Json<Value> {
    let adverts = ctx.active_adverts(query.placement.as_deref()).await;
    Json(json!({ "adverts": adverts }))
}
