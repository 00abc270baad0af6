//! HTTP search API.
//!
//! `GET /health`, `GET /api/search?q=...` and `POST /api/search` with a JSON
//! body. Search goes through the result cache, so repeated queries inside
//! the TTL never touch the browser.

use crate::error::ApiError;
use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use jobtap_core::{ScrapeResult, ServerConfig};
use jobtap_scraper::{ResultCache, ScrapeError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

const QUERY_REQUIRED: &str = "query is required (GET: ?q=..., POST: {\"query\":\"...\"})";

/// Anything that can answer a search query.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str) -> Result<Arc<ScrapeResult>, ScrapeError>;
}

#[async_trait::async_trait]
impl SearchBackend for ResultCache {
    async fn search(&self, query: &str) -> Result<Arc<ScrapeResult>, ScrapeError> {
        ResultCache::search(self, query).await
    }
}

type SharedBackend = Arc<dyn SearchBackend>;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    time: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

/// POST body. Only `query` drives the scrape; the filters are accepted for
/// client compatibility.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
    pub location: Option<String>,
    pub location_country: Option<String>,
    pub workplace_types: Vec<String>,
    pub commitment_types: Vec<String>,
    pub seniority_levels: Vec<String>,
    pub max_pages: Option<u32>,
    pub page_size: Option<u32>,
    pub date_past_days: Option<u32>,
}

impl SearchRequest {
    fn has_filters(&self) -> bool {
        self.location.is_some()
            || self.location_country.is_some()
            || !self.workplace_types.is_empty()
            || !self.commitment_types.is_empty()
            || !self.seniority_levels.is_empty()
            || self.max_pages.is_some()
            || self.page_size.is_some()
            || self.date_past_days.is_some()
    }
}

/// Build the API router around `backend`.
pub fn router(backend: SharedBackend) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", get(search_get).post(search_post))
        .layer(middleware::from_fn(cors))
        .with_state(backend)
}

/// Serve the API on the configured address until Ctrl-C.
pub async fn serve(config: &ServerConfig, backend: SharedBackend) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Search API listening on http://{}", addr);
    info!("  GET  /health");
    info!("  GET  /api/search?q=<query>");
    info!("  POST /api/search {{\"query\": \"...\"}}");

    axum::serve(listener, router(backend))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        time: chrono::Utc::now().to_rfc3339(),
    })
}

async fn search_get(
    State(backend): State<SharedBackend>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ScrapeResult>, ApiError> {
    run_search(backend.as_ref(), params.q.as_deref().unwrap_or_default()).await
}

async fn search_post(
    State(backend): State<SharedBackend>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<ScrapeResult>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;
    if request.has_filters() {
        debug!("Ignoring search filters: {:?}", request);
    }
    run_search(backend.as_ref(), &request.query).await
}

async fn run_search(
    backend: &dyn SearchBackend,
    query: &str,
) -> Result<Json<ScrapeResult>, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request(QUERY_REQUIRED));
    }

    info!("Search request: {:?}", query);
    match backend.search(query).await {
        Ok(result) => Ok(Json(Arc::unwrap_or_clone(result))),
        Err(e) => {
            warn!("Search {:?} failed: {}", query, e);
            Err(e.into())
        }
    }
}

/// Permissive CORS; preflight requests are answered here without routing.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}
