//! Outbound client for the backend service that owns all business data. The
//! gateway never persists anything; every data operation is a relayed call.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Response, StatusCode};
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::session::SessionCredential;
use crate::tenant::{TenantContext, TenantDirectory, TenantId, TENANT_ID_HEADER};

/// Request headers copied onto the outbound call. Cookies and the inbound
/// Authorization header never cross the boundary; the gateway attaches its
/// own credential and routing headers.
const FORWARDED_REQUEST_HEADERS: [&str; 4] =
    ["content-type", "accept", "accept-language", "x-request-id"];

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend call to '{path}' timed out")]
    Timeout { path: String },
    #[error("backend transport error: {0}")]
    Transport(String),
    #[error("backend returned malformed JSON: {0}")]
    MalformedResponse(String),
}

#[derive(Clone, Debug)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    lookup_timeout: Duration,
}

impl BackendClient {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let base_url = config.backend.base_url.clone();
        url::Url::parse(&base_url)
            .with_context(|| format!("invalid backend base URL '{}'", base_url))?;

        // One pooled client for the process; per-call timeouts are attached
        // at request time so lookups can run on a tighter bound.
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url,
            timeout: config.backend_timeout(),
            lookup_timeout: config.lookup_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    fn map_send_error(err: reqwest::Error, path: &str) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                path: path.to_string(),
            }
        } else {
            BackendError::Transport(err.to_string())
        }
    }

    /// Relay one request to the backend: original method, body, and a fixed
    /// set of forwarded headers, plus the bearer credential and the tenant
    /// routing header. The backend's status and body come back verbatim,
    /// whatever the status was; classification is the caller's concern.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
        credential: &SessionCredential,
        tenant: Option<&TenantContext>,
    ) -> Result<Response<Body>, BackendError> {
        let url = self.url(path_and_query);
        tracing::debug!("forwarding {} {}", method, url);

        let mut request = self.client.request(method, &url).timeout(self.timeout);

        for name in FORWARDED_REQUEST_HEADERS {
            if let Some(value) = headers.get(name) {
                request = request.header(name, value);
            }
        }
        request = request.header(
            header::AUTHORIZATION,
            format!("Bearer {}", credential.token),
        );
        if let Some(tenant) = tenant {
            request = request.header(TENANT_ID_HEADER, tenant.tenant_id.to_string());
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let upstream = request
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, path_and_query))?;

        let status = upstream.status();
        let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let mut response = Response::builder().status(status);
        if let Some(content_type) = content_type {
            response = response.header(header::CONTENT_TYPE, content_type);
        }
        response
            .body(Body::from(bytes))
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    /// POST a JSON payload and parse the JSON reply. Used by the bulk
    /// fan-out endpoints, which need the per-item status and body rather
    /// than a relayable response. An empty body parses as `null`.
    pub async fn post_json(
        &self,
        path: &str,
        payload: &Value,
        credential: &SessionCredential,
        tenant: &TenantContext,
    ) -> Result<(StatusCode, Value), BackendError> {
        let url = self.url(path);
        let upstream = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", credential.token),
            )
            .header(TENANT_ID_HEADER, tenant.tenant_id.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, path))?;

        let status = upstream.status();
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| BackendError::MalformedResponse(e.to_string()))?
        };
        Ok((status, body))
    }

    /// Forward a login attempt. The gateway needs the parsed reply to pick
    /// the cookie namespace, so unlike `forward` this parses the JSON and
    /// treats garbage as a hard error.
    pub async fn login(&self, payload: &Value) -> Result<(StatusCode, Value), BackendError> {
        let path = "/api/v1/auth/login";
        let upstream = self
            .client
            .post(self.url(path))
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, path))?;

        let status = upstream.status();
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Ok((status, Value::Null));
        }
        let body = serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl TenantDirectory for BackendClient {
    /// Resolve a domain alias to its canonical identifier via the backend
    /// tenant directory. A 404 (or an empty reply) is "no match"; any other
    /// failure bubbles up so the caller can reject the request.
    async fn lookup_domain(&self, domain: &str) -> anyhow::Result<Option<TenantId>> {
        let path = "/api/v1/tenants/lookup";
        let response = self
            .client
            .get(self.url(path))
            .timeout(self.lookup_timeout)
            .query(&[("domain", domain)])
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, path))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("tenant lookup returned {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        // Envelope: {"success": true, "data": {"id": "<uuid>"}}
        let id = body
            .get("data")
            .and_then(|d| d.get("id"))
            .and_then(Value::as_str)
            .and_then(TenantId::parse);
        Ok(id)
    }
}
