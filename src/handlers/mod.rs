pub mod auth;
pub mod bulk;
pub mod health;
pub mod proxy;
