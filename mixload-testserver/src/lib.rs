use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_PRODUCTS: &str = "/api/products";
pub const PATH_SEARCH: &str = "/api/search";
pub const PATH_HEALTH: &str = "/api/health";
pub const PATH_SLOW: &str = "/api/slow";

const SEARCH_COLUMNS: [&str; 5] = ["name", "category", "brand", "model", "description"];

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    products_total: Arc<AtomicU64>,
    search_total: Arc<AtomicU64>,
    health_total: Arc<AtomicU64>,
    health_errors_total: Arc<AtomicU64>,
    saw_json_content_type: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn products_total(&self) -> u64 {
        self.products_total.load(Ordering::Relaxed)
    }

    pub fn search_total(&self) -> u64 {
        self.search_total.load(Ordering::Relaxed)
    }

    pub fn health_total(&self) -> u64 {
        self.health_total.load(Ordering::Relaxed)
    }

    pub fn health_errors_total(&self) -> u64 {
        self.health_errors_total.load(Ordering::Relaxed)
    }

    pub fn saw_json_content_type(&self) -> u64 {
        self.saw_json_content_type.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    /// Origin plus `/api`; this is what `BASE_URL` should point at.
    pub base_url: String,
    pub products: String,
    pub search: String,
    pub health: String,
    pub slow: String,
}

impl TestServerUrls {
    pub fn new(origin: &str) -> Self {
        Self {
            base_url: format!("{origin}/api"),
            products: format!("{origin}{PATH_PRODUCTS}"),
            search: format!("{origin}{PATH_SEARCH}"),
            health: format!("{origin}{PATH_HEALTH}"),
            slow: format!("{origin}{PATH_SLOW}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub model: String,
    pub description: String,
    pub price: f64,
}

impl Product {
    fn column(&self, column: &str) -> Option<&str> {
        match column {
            "name" => Some(&self.name),
            "category" => Some(&self.category),
            "brand" => Some(&self.brand),
            "model" => Some(&self.model),
            "description" => Some(&self.description),
            _ => None,
        }
    }
}

/// A small deterministic catalog shaped like the real backend's product table.
pub fn catalog() -> Vec<Product> {
    const LINES: [&str; 7] = ["Pro", "Phone", "Max", "Mini", "Ultra", "Plus", "Neo"];
    const CATEGORIES: [&str; 3] = ["smartphone", "tablet", "laptop"];
    const BRANDS: [&str; 4] = ["Acme", "Globex", "Initech", "Umbrella"];

    (0u64..60)
        .map(|i| {
            let line = LINES[(i % 7) as usize];
            let category = CATEGORIES[(i % 3) as usize];
            let brand = BRANDS[(i % 4) as usize];
            Product {
                id: i + 1,
                name: format!("{brand} {line} {}", i / 7 + 1),
                category: category.to_string(),
                brand: brand.to_string(),
                model: format!("{}-{:03}", line.to_ascii_uppercase(), i + 1),
                description: format!("{line} series {category} by {brand}"),
                price: 199.0 + (i as f64) * 25.0,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
struct AppState {
    stats: TestServerStats,
    catalog: Arc<[Product]>,
}

#[derive(Debug, Serialize)]
struct PaginatedResponse<'a> {
    products: Vec<&'a Product>,
    page: u64,
    limit: u64,
    total_pages: u64,
    count: u64,
}

fn paginate<'a>(items: Vec<&'a Product>, page: i64, limit: i64) -> PaginatedResponse<'a> {
    let page = if page < 1 { 1 } else { page as u64 };
    let limit = if !(1..=100).contains(&limit) {
        10
    } else {
        limit as u64
    };

    let count = items.len() as u64;
    let offset = (page - 1).saturating_mul(limit);
    let products = items
        .into_iter()
        .skip(offset.min(usize::MAX as u64) as usize)
        .take(limit as usize)
        .collect();

    PaginatedResponse {
        products,
        page,
        limit,
        total_pages: count.div_ceil(limit),
        count,
    }
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(bytes) => (
            status,
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encode error").into_response(),
    }
}

fn query_int(query: &HashMap<String, String>, key: &str) -> i64 {
    query
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

async fn handle_products(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    TestServerStats::inc(&state.stats.requests_total);
    TestServerStats::inc(&state.stats.products_total);

    let items = state.catalog.iter().collect();
    let res = paginate(items, query_int(&query, "page"), query_int(&query, "limit"));
    json_response(StatusCode::OK, &res)
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    column: String,
    keyword: String,
    #[serde(default)]
    page: i64,
    #[serde(default)]
    limit: i64,
}

async fn handle_search(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    TestServerStats::inc(&state.stats.requests_total);
    TestServerStats::inc(&state.stats.search_total);

    if headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("application/json"))
    {
        TestServerStats::inc(&state.stats.saw_json_content_type);
    }

    let req: SearchRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid request body").into_response(),
    };

    if !SEARCH_COLUMNS.contains(&req.column.as_str()) {
        return (StatusCode::BAD_REQUEST, "Invalid search column").into_response();
    }

    let needle = req.keyword.trim().to_ascii_lowercase();
    let items = state
        .catalog
        .iter()
        .filter(|p| {
            p.column(&req.column)
                .is_some_and(|v| v.to_ascii_lowercase().contains(&needle))
        })
        .collect();

    json_response(StatusCode::OK, &paginate(items, req.page, req.limit))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    message: &'static str,
}

async fn handle_health(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    TestServerStats::inc(&state.stats.requests_total);
    TestServerStats::inc(&state.stats.health_total);

    if query.get("test_error").map(String::as_str) == Some("true") {
        TestServerStats::inc(&state.stats.health_errors_total);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Health check failed").into_response();
    }

    let res = HealthResponse {
        status: "ok",
        timestamp: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
        message: "server is running",
    };
    json_response(StatusCode::OK, &res)
}

async fn handle_slow(State(state): State<AppState>) -> &'static str {
    TestServerStats::inc(&state.stats.requests_total);
    sleep(Duration::from_millis(50)).await;
    "slow"
}

pub fn router(stats: TestServerStats) -> Router {
    let state = AppState {
        stats,
        catalog: Arc::from(catalog()),
    };

    Router::new()
        .route(PATH_PRODUCTS, get(handle_products))
        .route(PATH_SEARCH, post(handle_search))
        .route(PATH_HEALTH, get(handle_health))
        .route(PATH_SLOW, get(handle_slow))
        .with_state(state)
}

pub struct TestServer {
    addr: SocketAddr,
    origin: String,
    urls: TestServerUrls,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        let origin = format!("http://{addr}");
        let urls = TestServerUrls::new(&origin);

        Ok(Self {
            addr,
            origin,
            urls,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The `/api` base URL the workload profiles expect.
    pub fn base_url(&self) -> &str {
        &self.urls.base_url
    }

    pub fn urls(&self) -> &TestServerUrls {
        &self.urls
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
