use jobtap_app::error::ErrorBody;
use jobtap_app::server::{router, SearchBackend};
use jobtap_core::{JobRecord, ScrapeResult, SessionState};
use jobtap_scraper::ScrapeError;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers every query with one listing, except a few reserved queries that fail.
#[derive(Default)]
struct StubBackend {
    queries: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl SearchBackend for StubBackend {
    async fn search(&self, query: &str) -> Result<Arc<ScrapeResult>, ScrapeError> {
        self.queries.lock().unwrap().push(query.to_string());
        match query {
            "busy" => Err(ScrapeError::NotReady {
                state: SessionState::Searching,
            }),
            "slow" => Err(ScrapeError::Timeout {
                phase: "first page",
                waited: Duration::from_secs(45),
            }),
            _ => {
                let job = JobRecord::from_value(json!({"id": "j1", "title": query})).unwrap();
                Ok(Arc::new(ScrapeResult::new(query, vec![job])))
            }
        }
    }
}

async fn spawn_server(backend: Arc<StubBackend>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(backend);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_health() {
    let base = spawn_server(Arc::default()).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    let time = body["time"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok());
}

#[tokio::test]
async fn test_get_search() {
    let backend = Arc::new(StubBackend::default());
    let base = spawn_server(backend.clone()).await;

    let response = reqwest::get(format!("{base}/api/search?q=rust%20engineer"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*",
        "CORS on normal responses"
    );

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["query"], "rust engineer");
    assert_eq!(body["scraped"], 1);
    assert_eq!(body["jobs"][0]["id"], "j1");
    assert_eq!(*backend.queries.lock().unwrap(), vec!["rust engineer"]);
}

#[tokio::test]
async fn test_post_search_ignores_filters() {
    let backend = Arc::new(StubBackend::default());
    let base = spawn_server(backend.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({"query": " go ", "workplace_types": ["Remote"], "page_size": 20}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["query"], "go");
    assert_eq!(*backend.queries.lock().unwrap(), vec!["go"]);
}

#[tokio::test]
async fn test_missing_query_is_bad_request() {
    let backend = Arc::new(StubBackend::default());
    let base = spawn_server(backend.clone()).await;
    let client = reqwest::Client::new();

    for response in [
        client.get(format!("{base}/api/search")).send().await.unwrap(),
        client.get(format!("{base}/api/search?q=%20")).send().await.unwrap(),
        client
            .post(format!("{base}/api/search"))
            .json(&json!({}))
            .send()
            .await
            .unwrap(),
    ] {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.error, "Bad Request");
        assert!(body.message.starts_with("query is required"));
    }
    assert!(backend.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let base = spawn_server(Arc::default()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.error, "Bad Request");
    assert!(body.message.starts_with("Invalid JSON"));
}

#[tokio::test]
async fn test_preflight() {
    let base = spawn_server(Arc::default()).await;

    let response = reqwest::Client::new()
        .request(Method::OPTIONS, format!("{base}/api/search"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, Authorization"
    );
    assert_eq!(headers["access-control-max-age"], "86400");
}

#[tokio::test]
async fn test_scrape_failures_map_to_status() {
    let base = spawn_server(Arc::default()).await;

    let busy = reqwest::get(format!("{base}/api/search?q=busy")).await.unwrap();
    assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = busy.json().await.unwrap();
    assert_eq!(body.error, "Service Unavailable");
    assert!(body.message.starts_with("Scraping failed:"));

    let slow = reqwest::get(format!("{base}/api/search?q=slow")).await.unwrap();
    assert_eq!(slow.status(), StatusCode::GATEWAY_TIMEOUT);
}
