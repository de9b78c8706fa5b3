//! Tenant context resolution: ordered fallback over header, cookies, and
//! path, with a remote directory lookup for human-readable domain aliases.

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::TENANT_ID_COOKIES;

/// Header name carrying an explicit tenant identifier.
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Canonical tenant identifier: the fixed-format token the backend keys
/// tenant data by. Anything that does not parse as one is treated as a
/// human-readable domain alias and resolved through the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(TenantId)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the identifier was found, kept for request tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantSource {
    Header,
    Cookie,
    Path,
    DomainLookup,
}

/// Resolved tenant context, injected into request extensions by the tenant
/// middleware and attached as a routing header on every backend call.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub source: TenantSource,
}

#[derive(Debug, thiserror::Error)]
pub enum TenantResolveError {
    #[error("no tenant identifier found in header, cookies, or path")]
    NotFound,
    #[error("domain '{0}' does not name a known tenant")]
    UnknownDomain(String),
    #[error("tenant directory lookup failed: {0}")]
    Lookup(String),
}

/// Remote directory resolving a domain alias to its canonical identifier.
/// The production implementation calls the backend; tests substitute a mock.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn lookup_domain(&self, domain: &str) -> anyhow::Result<Option<TenantId>>;
}

/// Resolve the tenant for a request by checking, in order: the explicit
/// header, the role-namespaced cookies, the generic cookie, and finally a
/// UUID-shaped path segment. A candidate already in canonical form is used
/// without any lookup; a non-canonical candidate triggers exactly one
/// directory lookup and its result is used verbatim.
pub async fn resolve_tenant(
    headers: &HeaderMap,
    jar: &CookieJar,
    path: &str,
    directory: &dyn TenantDirectory,
) -> Result<TenantContext, TenantResolveError> {
    let candidate = header_candidate(headers)
        .map(|v| (v, TenantSource::Header))
        .or_else(|| cookie_candidate(jar).map(|v| (v, TenantSource::Cookie)));

    if let Some((raw, source)) = candidate {
        if let Some(tenant_id) = TenantId::parse(&raw) {
            return Ok(TenantContext { tenant_id, source });
        }
        // Non-canonical: treat as domain alias, one lookup, result verbatim
        return match directory.lookup_domain(raw.trim()).await {
            Ok(Some(tenant_id)) => Ok(TenantContext {
                tenant_id,
                source: TenantSource::DomainLookup,
            }),
            Ok(None) => Err(TenantResolveError::UnknownDomain(raw.trim().to_string())),
            Err(e) => Err(TenantResolveError::Lookup(e.to_string())),
        };
    }

    // Last resort: a canonical identifier embedded in the path. Only
    // UUID-shaped segments qualify; arbitrary path words are never aliases.
    if let Some(tenant_id) = path_candidate(path) {
        return Ok(TenantContext {
            tenant_id,
            source: TenantSource::Path,
        });
    }

    Err(TenantResolveError::NotFound)
}

fn header_candidate(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(TENANT_ID_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn cookie_candidate(jar: &CookieJar) -> Option<String> {
    TENANT_ID_COOKIES
        .iter()
        .filter_map(|name| jar.get(name))
        .map(|c| c.value().trim())
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn path_candidate(path: &str) -> Option<TenantId> {
    path.split('/').find_map(TenantId::parse)
}
