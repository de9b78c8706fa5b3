pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod session;
pub mod tenant;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{any, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Environment, GatewayConfig};
use crate::services::BackendClient;
use crate::tenant::TenantDirectory;

/// Shared request state: config snapshot, the backend client, and the
/// tenant directory handle. The directory is a trait object so tests can
/// substitute a canned resolver without a live backend.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub backend: BackendClient,
    pub directory: Arc<dyn TenantDirectory>,
}

impl AppState {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Arc::new(config::config().clone());
        Self::with_config(config)
    }

    pub fn with_config(config: Arc<GatewayConfig>) -> anyhow::Result<Self> {
        let backend = BackendClient::new(&config)?;
        let directory: Arc<dyn TenantDirectory> = Arc::new(backend.clone());
        Ok(Self {
            config,
            backend,
            directory,
        })
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let log_requests = state.config.api.enable_request_logging;

    let mut router = Router::new()
        // Public
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        // Public auth routes (session cookie lifecycle)
        .merge(auth_routes())
        // Protected proxy surface
        .merge(api_routes(state.clone()))
        .with_state(state)
        // Global middleware
        .layer(cors);
    if log_requests {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
}

fn api_routes(state: AppState) -> Router<AppState> {
    use handlers::{bulk, proxy};

    Router::new()
        // Bulk fan-out endpoints take precedence over the catch-all
        .route("/api/attendance/bulk", post(bulk::attendance_bulk))
        .route("/api/promotions/bulk", post(bulk::promotions_bulk))
        // Everything else relays straight through
        .route("/api/*path", any(proxy::relay))
        // Tenant resolution runs after authentication
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::tenant_context_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::session_auth_middleware,
        ))
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    match config.environment {
        Environment::Development => CorsLayer::permissive(),
        _ => {
            let origins: Vec<HeaderValue> = config
                .security
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}
