pub mod auth;
pub mod tenant;

pub use auth::session_auth_middleware;
pub use tenant::tenant_context_middleware;
