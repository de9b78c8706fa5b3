use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::AppState;

/// GET / - service info
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Campus Gateway",
            "version": version,
            "description": "Tenant-aware API gateway for the school management platform",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/auth/login, /auth/logout (public - session cookies)",
                "api": "/api/* (protected - relayed to the backend)",
                "bulk": "/api/attendance/bulk, /api/promotions/bulk (protected)",
            }
        }
    }))
}

/// GET /health - liveness check. The gateway holds no state of its own, so
/// this never touches the backend; it only reports the configured target.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let now = chrono::Utc::now();

    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": now,
            "backend": state.backend.base_url(),
        }
    }))
}
