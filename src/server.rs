//! HTTP surface: one extraction endpoint plus a health probe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::debug;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ExtractError;
use crate::extract::{self, AppState};
use crate::{ExtractionResult, error};

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
    /// Per-request language preference, tried before the configured list.
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

fn status_for(err: &ExtractError) -> StatusCode {
    match err {
        ExtractError::InvalidReference(_) => StatusCode::BAD_REQUEST,
        ExtractError::VideoUnavailable(_) | ExtractError::NoCaptionsAvailable(_) => {
            StatusCode::NOT_FOUND
        }
        ExtractError::UpstreamRateLimited => StatusCode::TOO_MANY_REQUESTS,
        ExtractError::UpstreamUnreachable(_)
        | ExtractError::FetchFailed(_)
        | ExtractError::ParseError(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ExtractError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        debug!("Request failed with {status}: {self}");
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

async fn extract_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> error::Result<Json<ExtractionResult>> {
    let result = extract::extract(&state, &req.url, req.lang.as_deref()).await?;
    Ok(Json(result))
}

async fn health_check() -> &'static str {
    "ok"
}

/// Build the router. The browser client calls the extraction endpoint
/// cross-origin, so CORS stays permissive.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE]);

    Router::new()
        .route("/api/extract", post(extract_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TranscriptCache;
    use crate::youtube::RetryPolicy;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            client: reqwest::Client::new(),
            cache: TranscriptCache::new(Duration::from_secs(3600), 16),
            preferred_langs: vec!["en".to_string()],
            retry: RetryPolicy::default(),
        })
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ExtractError::InvalidReference("x".into()), StatusCode::BAD_REQUEST),
            (ExtractError::VideoUnavailable("x".into()), StatusCode::NOT_FOUND),
            (ExtractError::NoCaptionsAvailable("x".into()), StatusCode::NOT_FOUND),
            (ExtractError::UpstreamRateLimited, StatusCode::TOO_MANY_REQUESTS),
            (ExtractError::UpstreamUnreachable("x".into()), StatusCode::BAD_GATEWAY),
            (ExtractError::FetchFailed("x".into()), StatusCode::BAD_GATEWAY),
            (ExtractError::ParseError("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, expected) in cases {
            assert_eq!(status_for(&err), expected, "wrong status for {err}");
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_reference_is_400_with_detail() {
        // Fails at the resolver, before any network call
        let app = create_router(test_state());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/extract")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"url": "not a video reference"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_string(response).await;
        assert!(body.contains("\"detail\""), "missing detail in {body}");
        assert!(body.contains("not a video reference"));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = create_router(test_state());
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/extract")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
