//! Caching image proxy library.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod imaging;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod transport;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, StartupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
