//! Session lifecycle: login forwards credentials to the backend and persists
//! the issued token as role-scoped cookies; logout clears every slot.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::session::{clear_session_cookies, issue_session_cookies, SessionRole};
use crate::AppState;

/// POST /auth/login - forward credentials to the backend; on success persist
/// the issued token and tenant identifier as cookies in the namespace that
/// matches the reported role, and relay the backend body to the browser.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<Value>,
) -> Result<(CookieJar, (StatusCode, Json<Value>)), ApiError> {
    let (status, body) = state.backend.login(&payload).await?;

    if !status.is_success() {
        // Failed logins relay the backend's own status and body
        return Err(ApiError::upstream(status, body));
    }

    let data = body.get("data").unwrap_or(&Value::Null);
    let token = data
        .get("accessToken")
        .or_else(|| data.get("token"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            tracing::error!("login reply carried no access token: {}", body);
            ApiError::internal_server_error("Backend login reply was incomplete")
        })?;

    let role = data
        .get("role")
        .and_then(Value::as_str)
        .map(SessionRole::from_backend_role)
        .unwrap_or(SessionRole::Default);
    let tenant_id = data.get("tenantId").and_then(Value::as_str);

    let jar = issue_session_cookies(
        jar,
        role,
        token,
        tenant_id,
        state.config.security.secure_cookies,
    );

    tracing::info!(role = ?role, "session issued");
    Ok((jar, (status, Json(body))))
}

/// POST /auth/logout - clear every session cookie, namespaced or not.
/// Nothing is forwarded upstream; the bearer token simply stops being sent.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = clear_session_cookies(jar);
    (
        jar,
        Json(json!({
            "success": true,
            "data": { "message": "Logged out" }
        })),
    )
}
