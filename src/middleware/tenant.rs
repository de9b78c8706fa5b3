use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::ApiError;
use crate::session::SessionCredential;
use crate::tenant::resolve_tenant;
use crate::AppState;

/// Tenant middleware: resolve the canonical tenant identifier for the
/// request (header, cookies, path segment, domain lookup — in that order)
/// and inject the context for the forwarder to attach as a routing header.
/// Must run after the credential middleware.
pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.extensions().get::<SessionCredential>().is_none() {
        return Err(ApiError::unauthorized(
            "Authentication required before tenant resolution",
        ));
    }

    let path = request.uri().path().to_string();
    let context = resolve_tenant(request.headers(), &jar, &path, state.directory.as_ref()).await?;

    tracing::debug!(
        tenant_id = %context.tenant_id,
        source = ?context.source,
        "tenant context resolved"
    );

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
