//! HTTP adapter over [`RecsysContext`].
//!
//! Routes:
//!
//! | Method | Path         | Body / query                              |
//! |--------|--------------|-------------------------------------------|
//! | GET    | `/health`    |                                           |
//! | GET    | `/search`    | `?query=&limit=`                          |
//! | POST   | `/recommend` | `{"query", "top_k"?, "max_per_artist"?}`  |
//!
//! Scoring runs on the blocking pool; the context is shared read-only.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::artifacts::ArtifactStore;
use crate::config::DscvrConfig;
use crate::engine::{Health, RecommendResponse, RecsysContext, SearchResponse};
use crate::error::DscvrError;

/// Largest `top_k` / `limit` a request may ask for.
pub const MAX_RESULTS: usize = 100;

pub type AppState = Arc<RecsysContext>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] DscvrError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Core(DscvrError::IndexOutOfRange { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Core(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Core(e) if e.is_not_found() => "NO_MATCH",
            ApiError::Core(DscvrError::IndexOutOfRange { .. }) => "INDEX_OUT_OF_RANGE",
            ApiError::Core(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
    pub top_k: Option<usize>,
    pub max_per_artist: Option<usize>,
}

fn check_range(name: &str, value: usize) -> Result<usize, ApiError> {
    if (1..=MAX_RESULTS).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::BadRequest(format!(
            "{name} must be between 1 and {MAX_RESULTS}, got {value}"
        )))
    }
}

/// Run CPU-bound work against the context on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&RecsysContext) -> Result<T, DscvrError> + Send + 'static,
{
    let ctx = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&ctx))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(state.health())
}

async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(params) = params?;
    let limit = check_range(
        "limit",
        params.limit.unwrap_or(state.retrieval().search_limit),
    )?;
    let response = blocking(&state, move |ctx| Ok(ctx.search(&params.query, limit))).await?;
    Ok(Json(response))
}

async fn recommend(
    State(state): State<AppState>,
    body: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let Json(req) = body?;
    let top_k = check_range(
        "top_k",
        req.top_k.unwrap_or(state.retrieval().default_top_k),
    )?;
    let max_per_artist = req
        .max_per_artist
        .unwrap_or(state.retrieval().max_per_artist);
    if max_per_artist == 0 {
        return Err(ApiError::BadRequest(
            "max_per_artist must be at least 1".into(),
        ));
    }

    let response = blocking(&state, move |ctx| {
        ctx.recommend(&req.query, top_k, max_per_artist)
    })
    .await?;
    Ok(Json(response))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/recommend", post(recommend))
        .with_state(state)
}

/// Load the published artifacts and serve until ctrl-c.
pub async fn serve(config: DscvrConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let artifact_dir = config.resolved_artifact_dir();

    let retrieval = config.retrieval.clone();
    let ctx = tokio::task::spawn_blocking(move || {
        RecsysContext::from_store(&ArtifactStore::new(&artifact_dir), retrieval)
    })
    .await?
    .context("failed to load artifacts (run `dscvr build` first)")?;

    let app = router(Arc::new(ctx));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "dscvr listening at http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TrackMeta;
    use crate::config::RetrievalConfig;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use ndarray::array;
    use tower::ServiceExt;

    fn meta(title: &str, artist: &str) -> TrackMeta {
        TrackMeta {
            title: title.into(),
            artist: artist.into(),
            preview_url: None,
            artwork_url: None,
        }
    }

    fn app() -> Router {
        let ctx = RecsysContext::from_parts(
            array![[1.0, 0.1], [0.9, 0.3], [0.2, 1.0], [0.7, 0.6]],
            vec![
                meta("Snooze", "SZA"),
                meta("Kill Bill", "SZA"),
                meta("Blinding Lights", "The Weeknd"),
                meta("Bad Habit", "Steve Lacy"),
            ],
            RetrievalConfig::default(),
        )
        .unwrap();
        router(Arc::new(ctx))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_tracks() {
        let (status, body) = send(app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["tracks"], 4);
        assert_eq!(body["dims"], 2);
    }

    #[tokio::test]
    async fn search_returns_ranked_hits() {
        let (status, body) = send(app(), get("/search?query=snooze&limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "snooze");
        assert_eq!(body["results"].as_array().unwrap().len(), 2);
        assert_eq!(body["results"][0]["title"], "Snooze");
    }

    #[tokio::test]
    async fn search_limit_out_of_range_is_bad_request() {
        let (status, body) = send(app(), get("/search?query=snooze&limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (status, _) = send(app(), get("/search?query=snooze&limit=101")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recommend_excludes_resolved_track() {
        let req = post_json("/recommend", json!({"query": "Snooze — SZA", "top_k": 2}));
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resolved_index"], 0);
        let recs = body["recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r["row_index"] != 0));
    }

    #[tokio::test]
    async fn unknown_track_is_not_found() {
        let req = post_json("/recommend", json!({"query": "qqqqqqqqqqqqqqqq"}));
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NO_MATCH");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let req = post_json("/recommend", json!({"top_k": 3}));
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = post_json("/recommend", json!({"query": "snooze", "top_k": 500}));
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn core_errors_map_to_status_codes() {
        let oob = ApiError::from(DscvrError::IndexOutOfRange { index: 9, len: 4 });
        assert_eq!(oob.status_code(), StatusCode::BAD_REQUEST);
        let missing = ApiError::from(DscvrError::ArtifactMissing {
            path: "CURRENT".into(),
        });
        assert_eq!(missing.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
