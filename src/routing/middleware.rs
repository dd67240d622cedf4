//! Axum adapter for the date-route rewriter.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::monitoring::health::HealthState;
use crate::routing::rewrite::{rewrite, RewriteOutcome};

/// Redirect legacy `?date=` sport URLs with a 301, forward everything else.
pub async fn canonicalize_date_routes(
    State(health): State<HealthState>,
    request: Request,
    next: Next,
) -> Response {
    let uri = request.uri();
    let RewriteOutcome::Redirect(redirect) = rewrite(uri.path(), uri.query()) else {
        return next.run(request).await;
    };

    let location = redirect.location();
    let Ok(value) = HeaderValue::from_str(&location) else {
        warn!(location = %location, "Rewritten location is not a valid header value");
        return next.run(request).await;
    };

    debug!(
        from = %uri,
        to = %location,
        pattern = ?redirect.pattern,
        "Canonicalized date route"
    );
    health.record_redirect();

    permanent_redirect(value)
}

/// 301 with a `Location` header. `axum::response::Redirect::permanent` is 308.
fn permanent_redirect(location: HeaderValue) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn app() -> Router {
        let health = HealthState::new();
        Router::new()
            .route("/football", get(|| async { "index" }))
            .route("/blog", get(|| async { "blog" }))
            .layer(axum::middleware::from_fn_with_state(
                health,
                canonicalize_date_routes,
            ))
    }

    #[tokio::test]
    async fn test_redirects_with_301() {
        let request = Request::builder()
            .uri("/football?date=2024-03-01&page=2")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/football/2024-03-01?page=2"
        );
    }

    #[tokio::test]
    async fn test_forwards_without_date() {
        let request = Request::builder()
            .uri("/football?page=2")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ignores_other_roots() {
        let request = Request::builder()
            .uri("/blog?date=2024-01-01")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_ignores_sport_lookalike_roots() {
        let request = Request::builder()
            .uri("/footballer?date=2024-01-01")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::LOCATION).is_none());
    }
}
