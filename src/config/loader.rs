//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse configuration from a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the configured signature key into raw key bytes.
///
/// A value starting with `@` is a path; the file's contents (trimmed) are the
/// key. Anything else is used verbatim. An absent key yields no bytes, which
/// disables signature checks.
pub fn load_signature_key(raw: Option<&str>) -> Result<Vec<u8>, std::io::Error> {
    match raw {
        None => Ok(Vec::new()),
        Some(value) => match value.strip_prefix('@') {
            Some(path) => {
                let contents = fs::read(path)?;
                Ok(contents.trim_ascii().to_vec())
            }
            None => Ok(value.as_bytes().to_vec()),
        },
    }
}
