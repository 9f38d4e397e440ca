//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the image proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Remote hosts that images may be proxied from. Entries are either an
    /// exact host or `*.suffix`. Empty means all hosts are allowed.
    pub whitelist: Vec<String>,

    /// Hosts that requests must be referred from. Empty disables the check.
    pub referrers: Vec<String>,

    /// Base URL that relative remote URLs are resolved against.
    pub base_url: Option<String>,

    /// HMAC key used to verify signed requests. A leading `@` names a file
    /// holding the key.
    pub signature_key: Option<String>,

    /// Allow images to scale beyond their original dimensions.
    pub scale_up: bool,

    /// Time limit for image requests in seconds. Zero means no timeout.
    pub timeout_secs: u64,

    /// Log additional debug messages (cache provenance, passthrough fetches).
    pub verbose: bool,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Path-prefix remapping settings.
    pub route_mapping: RouteMappingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Which store backs the response cache.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Nothing is cached.
    #[default]
    None,
    /// Bounded in-process cache.
    Memory,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Upper bound on cached bytes for the memory backend.
    pub max_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::None,
            max_bytes: 256 * 1024 * 1024, // 256MB
        }
    }
}

/// Route mapping configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteMappingConfig {
    /// URL of the JSON mapping document. Remapping is disabled when unset.
    pub url: Option<String>,

    /// Reject requests that match no mapping entry.
    pub exclusive: bool,

    /// Refresh interval in seconds.
    pub refresh_secs: u64,
}

impl Default for RouteMappingConfig {
    fn default() -> Self {
        Self {
            url: None,
            exclusive: false,
            refresh_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
