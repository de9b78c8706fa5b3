//! Catch-all relay for the backend's REST resources (students, teachers,
//! classes, academic years, enrollments, grades, attendance, timetables,
//! promotions). Tenant and credential context arrive via middleware; this
//! handler only rebuilds the outbound call and relays the reply.

use axum::body::to_bytes;
use axum::extract::{Path, Request, State};
use axum::response::Response;
use axum::Extension;

use crate::error::ApiError;
use crate::session::SessionCredential;
use crate::tenant::TenantContext;
use crate::AppState;

/// ANY /api/*path - relay to `{backend}/api/v1/{path}` with the original
/// method, query string, and body. Upstream status and body come back
/// verbatim, 2xx and error alike.
pub async fn relay(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    Extension(credential): Extension<SessionCredential>,
    Extension(tenant): Extension<TenantContext>,
    request: Request,
) -> Result<Response, ApiError> {
    let method = request.method().clone();
    let headers = request.headers().clone();

    let mut path_and_query = format!("/api/v1/{}", rest.trim_start_matches('/'));
    if let Some(query) = request.uri().query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    let body = to_bytes(
        request.into_body(),
        state.config.api.max_request_size_bytes,
    )
    .await
    .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {}", e)))?;

    let response = state
        .backend
        .forward(
            method,
            &path_and_query,
            &headers,
            body,
            &credential,
            Some(&tenant),
        )
        .await?;

    Ok(response)
}
