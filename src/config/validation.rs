//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that URLs parse and use http(s)
//! - Validate value ranges (refresh interval > 0, cache size > 0)
//! - Reject exclusive remapping without a mapping source
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{CacheBackend, ProxyConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("invalid {field} {value:?}: {reason}")]
    Url {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field} entry {index} is empty")]
    EmptyHost { field: &'static str, index: usize },

    #[error("route_mapping.exclusive requires route_mapping.url")]
    ExclusiveWithoutMapping,

    #[error("route_mapping.refresh_secs must be greater than zero")]
    ZeroRefreshInterval,

    #[error("cache.max_bytes must be greater than zero for the memory backend")]
    ZeroCacheSize,
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(base_url) = &config.base_url {
        check_http_url("base_url", base_url, &mut errors);
    }

    check_hosts("whitelist", &config.whitelist, &mut errors);
    check_hosts("referrers", &config.referrers, &mut errors);

    match &config.route_mapping.url {
        Some(url) => check_http_url("route_mapping.url", url, &mut errors),
        None if config.route_mapping.exclusive => {
            errors.push(ValidationError::ExclusiveWithoutMapping)
        }
        None => {}
    }

    if config.route_mapping.refresh_secs == 0 {
        errors.push(ValidationError::ZeroRefreshInterval);
    }

    if config.cache.backend == CacheBackend::Memory && config.cache.max_bytes == 0 {
        errors.push(ValidationError::ZeroCacheSize);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_hosts(field: &'static str, hosts: &[String], errors: &mut Vec<ValidationError>) {
    for (index, host) in hosts.iter().enumerate() {
        if host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost { field, index });
        }
    }
}

fn check_http_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    let reason = match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => return,
        Ok(url) => format!("unsupported scheme {}", url.scheme()),
        Err(e) => e.to_string(),
    };
    errors.push(ValidationError::Url {
        field,
        value: value.to_string(),
        reason,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_exclusive_requires_mapping_url() {
        let mut config = ProxyConfig::default();
        config.route_mapping.exclusive = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ExclusiveWithoutMapping]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.base_url = Some("ftp://example.com/".into());
        config.whitelist = vec!["".into()];
        config.route_mapping.refresh_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[1], ValidationError::Url { field: "base_url", .. }));
    }

    #[test]
    fn test_empty_host_names_its_list() {
        let mut config = ProxyConfig::default();
        config.whitelist = vec!["a.test".into(), "b.test".into()];
        config.referrers = vec![" ".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::EmptyHost { field: "referrers", index: 0 }]
        );
        assert_eq!(errors[0].to_string(), "referrers entry 0 is empty");
    }

    #[test]
    fn test_memory_cache_needs_capacity() {
        let mut config = ProxyConfig::default();
        config.cache.backend = CacheBackend::Memory;
        config.cache.max_bytes = 0;

        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::ZeroCacheSize]
        );
    }
}
