use std::collections::HashMap;
use std::future::IntoFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::to_bytes;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{any, get, post};
use axum::Router;
use serde_json::{json, Value};

use campus_gateway::config::{
    ApiConfig, BackendConfig, Environment, GatewayConfig, SecurityConfig,
};
use campus_gateway::{app, AppState};

/// Canonical identifier the mock directory resolves the known domain to.
pub const TENANT_UUID: &str = "9a1f0c1e-2b3d-4e5f-8a9b-0c1d2e3f4a5b";
/// Domain alias the mock directory knows about.
pub const KNOWN_DOMAIN: &str = "springfield-high";
/// Domain alias that makes the mock directory fail with a 500.
pub const BROKEN_DOMAIN: &str = "broken-directory";

/// One request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub tenant: Option<String>,
    pub cookie: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    requests: Arc<Mutex<Vec<Recorded>>>,
    lookup_calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    fn record_request(&self, request: Request) -> impl std::future::Future<Output = Recorded> {
        let requests = self.requests.clone();
        async move {
            let (parts, body) = request.into_parts();
            let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

            let header = |name: &str| {
                parts
                    .headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string())
            };
            let recorded = Recorded {
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
                query: parts.uri.query().map(|q| q.to_string()),
                authorization: header("authorization"),
                tenant: header("x-tenant-id"),
                cookie: header("cookie"),
                body,
            };
            requests.lock().unwrap().push(recorded.clone());
            recorded
        }
    }
}

async fn lookup(
    State(backend): State<MockBackend>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    backend.lookup_calls.fetch_add(1, Ordering::SeqCst);
    let domain = params.get("domain").map(String::as_str).unwrap_or("");
    if domain == BROKEN_DOMAIN {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": true, "message": "directory unavailable"})),
        )
            .into_response()
    } else if domain == KNOWN_DOMAIN {
        Json(json!({"success": true, "data": {"id": TENANT_UUID}})).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": true, "message": "unknown domain"})),
        )
            .into_response()
    }
}

async fn login(State(backend): State<MockBackend>, request: Request) -> Response {
    let recorded = backend.record_request(request).await;

    if recorded.body.get("password").and_then(Value::as_str) == Some("wrong") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": true, "message": "Invalid credentials"})),
        )
            .into_response();
    }
    if recorded.body.get("password").and_then(Value::as_str) == Some("garbled") {
        // A reply that claims to be JSON but is not parseable as JSON
        return (
            StatusCode::OK,
            [("content-type", "application/json")],
            "{\"success\": true, \"data\":",
        )
            .into_response();
    }

    let role = recorded
        .body
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or("teacher");
    Json(json!({
        "success": true,
        "data": {
            "accessToken": "issued-token-123",
            "role": role,
            "tenantId": TENANT_UUID,
        }
    }))
    .into_response()
}

async fn attendance(State(backend): State<MockBackend>, request: Request) -> Response {
    let recorded = backend.record_request(request).await;

    if recorded.body.get("status").and_then(Value::as_str) == Some("invalid") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": true, "message": "unknown attendance status"})),
        )
            .into_response();
    }
    Json(json!({"success": true, "data": {"recorded": true}})).into_response()
}

async fn promotions(State(backend): State<MockBackend>, request: Request) -> Response {
    backend.record_request(request).await;
    Json(json!({"success": true, "data": {"promoted": true}})).into_response()
}

async fn slow(State(backend): State<MockBackend>, request: Request) -> Response {
    backend.record_request(request).await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({"success": true, "data": {"slept": true}})).into_response()
}

async fn echo(State(backend): State<MockBackend>, request: Request) -> Response {
    let recorded = backend.record_request(request).await;

    if recorded.path.ends_with("/missing") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "resource not found"})),
        )
            .into_response();
    }
    if recorded.path.ends_with("/boom") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "backend exploded"})),
        )
            .into_response();
    }

    Json(json!({
        "success": true,
        "data": {
            "method": recorded.method,
            "path": recorded.path,
            "query": recorded.query,
            "tenant": recorded.tenant,
            "authorization": recorded.authorization,
            "body": recorded.body,
        }
    }))
    .into_response()
}

fn mock_router(backend: MockBackend) -> Router {
    Router::new()
        .route("/api/v1/tenants/lookup", get(lookup))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/attendance", post(attendance))
        .route("/api/v1/promotions", post(promotions))
        .route("/api/v1/slow", any(slow))
        .fallback(echo)
        .with_state(backend)
}

pub struct TestStack {
    pub gateway_url: String,
    pub backend: MockBackend,
}

/// Boot a mock backend and a gateway pointed at it, both in-process on
/// ephemeral ports. Each test gets its own stack so request recorders and
/// lookup counters start from zero.
pub async fn spawn() -> Result<TestStack> {
    let backend = MockBackend::default();

    let backend_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind mock backend")?;
    let backend_url = format!("http://{}", backend_listener.local_addr()?);
    tokio::spawn(axum::serve(backend_listener, mock_router(backend.clone())).into_future());

    let config = GatewayConfig {
        environment: Environment::Development,
        backend: BackendConfig {
            base_url: backend_url,
            timeout_secs: 1,
            lookup_timeout_secs: 1,
        },
        api: ApiConfig {
            enable_request_logging: true,
            max_request_size_bytes: 1024 * 1024,
            max_bulk_items: 100,
        },
        security: SecurityConfig {
            enable_cors: true,
            cors_origins: vec![],
            secure_cookies: false,
        },
    };
    let state = AppState::with_config(Arc::new(config))?;

    let gateway_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind gateway")?;
    let gateway_url = format!("http://{}", gateway_listener.local_addr()?);
    tokio::spawn(axum::serve(gateway_listener, app(state)).into_future());

    let stack = TestStack {
        gateway_url,
        backend,
    };
    stack.wait_ready(Duration::from_secs(5)).await?;
    Ok(stack)
}

impl TestStack {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.gateway_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!(
            "gateway did not become ready on {} within {:?}",
            self.gateway_url,
            timeout
        )
    }
}
