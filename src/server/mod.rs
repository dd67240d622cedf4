//! HTTP server: page routes, auth, health, and the date-route rewriter layer.

pub mod auth;
pub mod error;
pub mod pages;
pub mod request_id;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::context::SiteContext;
use crate::routing::middleware::canonicalize_date_routes;
use crate::server::error::PageError;

/// Build the full application router.
///
/// Every sport route shape is registered, so the rewriter layer sees all
/// legacy `?date=` requests before their handlers would.
pub fn router(ctx: Arc<SiteContext>, config: &ServerConfig) -> Router {
    let (set_request_id, propagate_request_id) = request_id::request_id_layers();
    let health = ctx.health.clone();

    Router::new()
        .route("/", get(pages::home))
        .route("/blog", get(pages::blog_list))
        .route("/blog/{slug}", get(pages::blog_post))
        .route("/news", get(pages::news_list))
        .route("/news/{slug}", get(pages::news_item))
        .route("/vip", get(pages::vip))
        .route("/offers", get(pages::offers))
        .route("/bonuses", get(pages::bonuses))
        .route("/adverts", get(pages::adverts))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/api/health", get(health_handler))
        .route("/api/cache/refresh", post(refresh_cache_handler))
        .route("/{sport}", get(pages::sport_index))
        .route("/{sport}/{date}", get(pages::sport_by_date))
        .route("/{sport}/prediction/{*slug}", get(pages::prediction))
        .route("/{sport}/{date}/prediction/{*slug}", get(pages::prediction_by_date))
        .fallback(not_found)
        .with_state(ctx)
        .layer(axum::middleware::from_fn_with_state(
            health,
            canonicalize_date_routes,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .layer(cors_layer(&config.allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Serve until Ctrl-C.
pub async fn serve(app: Router, config: &ServerConfig) -> Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Site server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Site server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// -- Route Handlers --

async fn health_handler(State(ctx): State<Arc<SiteContext>>) -> Json<Value> {
    let mut data = json!(ctx.health.snapshot());
    data["active_sessions"] = json!(ctx.auth.active_sessions().await);
    Json(data)
}

async fn refresh_cache_handler(State(ctx): State<Arc<SiteContext>>) -> StatusCode {
    ctx.refresh().await;
    StatusCode::NO_CONTENT
}

async fn not_found() -> impl IntoResponse {
    PageError::NotFound("page".to_string())
}
