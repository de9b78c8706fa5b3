use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub backend: BackendConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend service that owns all business data.
    pub base_url: String,
    /// Single timeout bound applied to every proxied call.
    pub timeout_secs: u64,
    /// Timeout for tenant directory lookups (small, blocks the request path).
    pub lookup_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
    /// Upper bound on items accepted by the bulk fan-out endpoints.
    pub max_bulk_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub secure_cookies: bool,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Backend overrides. BACKEND_API_URL is the canonical variable; the
        // NEXT_PUBLIC_API_URL alias is honored for parity with older deploys.
        if let Ok(v) = env::var("BACKEND_API_URL").or_else(|_| env::var("NEXT_PUBLIC_API_URL")) {
            self.backend.base_url = v;
        }
        if let Ok(v) = env::var("BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = v.parse().unwrap_or(self.backend.timeout_secs);
        }
        if let Ok(v) = env::var("LOOKUP_TIMEOUT_SECS") {
            self.backend.lookup_timeout_secs = v.parse().unwrap_or(self.backend.lookup_timeout_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_MAX_BULK_ITEMS") {
            self.api.max_bulk_items = v.parse().unwrap_or(self.api.max_bulk_items);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }

        self.backend.base_url = normalize_base_url(&self.backend.base_url);
        self
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.lookup_timeout_secs)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 30,
                lookup_timeout_secs: 5,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                max_bulk_items: 500,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                secure_cookies: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 15,
                lookup_timeout_secs: 5,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
                max_bulk_items: 300,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                secure_cookies: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 10,
                lookup_timeout_secs: 3,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                max_bulk_items: 200,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                secure_cookies: true,
            },
        }
    }
}

/// Normalize a backend base URL: trim whitespace and trailing slashes so path
/// joining never produces `//`. Parsing is validated when the backend client
/// is built, so a bad URL fails at startup rather than on first use.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<GatewayConfig> = Lazy::new(GatewayConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static GatewayConfig {
    &CONFIG
}
