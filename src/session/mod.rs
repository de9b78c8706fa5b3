use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

/// Credential cookie names, checked in fixed priority order: role-namespaced
/// slots first, the generic slot last. Every login flow writes exactly one of
/// these; a browser that has been through several login flows may carry more.
pub const ACCESS_TOKEN_COOKIES: [&str; 3] = ["tn_accessToken", "sa_accessToken", "accessToken"];

/// Tenant identifier cookie names, same ordering discipline.
pub const TENANT_ID_COOKIES: [&str; 3] = ["tn_tenantId", "sa_tenantId", "tenantId"];

/// Which login surface issued the session, deciding the cookie namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionRole {
    Default,
    TenantAdmin,
    SuperAdmin,
}

impl SessionRole {
    /// Cookie name prefix for this role context.
    pub fn cookie_prefix(&self) -> &'static str {
        match self {
            SessionRole::Default => "",
            SessionRole::TenantAdmin => "tn_",
            SessionRole::SuperAdmin => "sa_",
        }
    }

    /// Map the role string reported by the backend login endpoint.
    pub fn from_backend_role(role: &str) -> Self {
        match role.to_ascii_lowercase().as_str() {
            "super_admin" | "super-admin" | "superadmin" => SessionRole::SuperAdmin,
            "tenant_admin" | "tenant-admin" | "admin" => SessionRole::TenantAdmin,
            _ => SessionRole::Default,
        }
    }
}

/// Bearer credential located for the current request, injected into request
/// extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    pub token: String,
}

/// Locate a bearer credential: an explicit `Authorization: Bearer` header
/// wins, then the cookie chain in priority order. Returns `None` if no
/// non-empty value is found anywhere, which the caller turns into a 401.
pub fn find_access_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(token) = bearer_from_headers(headers) {
        return Some(token);
    }

    ACCESS_TOKEN_COOKIES
        .iter()
        .filter_map(|name| jar.get(name))
        .map(|c| c.value().trim())
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Extract a bearer token from the Authorization header, if present and
/// well-formed. Malformed headers are ignored rather than rejected so the
/// cookie chain still gets a chance.
fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))?
        .to_str()
        .ok()?;

    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn session_cookie(name: String, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Persist a freshly issued session: role-prefixed access token and tenant
/// identifier cookies, scoped to the whole site.
pub fn issue_session_cookies(
    jar: CookieJar,
    role: SessionRole,
    token: &str,
    tenant_id: Option<&str>,
    secure: bool,
) -> CookieJar {
    let prefix = role.cookie_prefix();
    let mut jar = jar.add(session_cookie(
        format!("{}accessToken", prefix),
        token.to_string(),
        secure,
    ));
    if let Some(tenant_id) = tenant_id {
        jar = jar.add(session_cookie(
            format!("{}tenantId", prefix),
            tenant_id.to_string(),
            secure,
        ));
    }
    jar
}

/// Clear every known session cookie regardless of which role issued it.
/// Removal cookies are added unconditionally: the request jar only shows the
/// cookies the browser chose to send, and logout must not leave a stale
/// namespaced credential behind in any slot.
pub fn clear_session_cookies(mut jar: CookieJar) -> CookieJar {
    for name in ACCESS_TOKEN_COOKIES.iter().chain(TENANT_ID_COOKIES.iter()) {
        let mut removal = Cookie::new(name.to_string(), "");
        removal.set_path("/");
        removal.make_removal();
        jar = jar.add(removal);
    }
    jar
}
