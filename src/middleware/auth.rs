use axum::{extract::Request, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;

use crate::error::ApiError;
use crate::session::{find_access_token, SessionCredential};

/// Credential middleware: locate a bearer token among the Authorization
/// header and the role-namespaced cookie chain, and inject it into request
/// extensions. Requests with no recognized credential are rejected with 401
/// before any backend traffic happens.
pub async fn session_auth_middleware(
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = find_access_token(request.headers(), &jar)
        .ok_or_else(|| ApiError::unauthorized("Missing access token"))?;

    request.extensions_mut().insert(SessionCredential { token });
    Ok(next.run(request).await)
}
