//! Command line flags.
//!
//! Flags mirror the configuration file; any flag given overrides the value
//! read from `--config`.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::{CacheBackend, CacheConfig, ProxyConfig};
use crate::config::validation::validate_config;

#[derive(Debug, Default, Parser)]
#[command(name = "imageproxy", version, about = "Caching image proxy server")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "IMAGEPROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// TCP address to listen on.
    #[arg(long, env = "IMAGEPROXY_ADDR")]
    pub addr: Option<String>,

    /// Cache backend: "none", "memory" or "memory:<megabytes>".
    #[arg(long, env = "IMAGEPROXY_CACHE", value_parser = parse_cache)]
    pub cache: Option<CacheConfig>,

    /// Comma separated list of allowed remote hosts.
    #[arg(long, value_delimiter = ',')]
    pub whitelist: Vec<String>,

    /// Comma separated list of allowed referring hosts.
    #[arg(long, value_delimiter = ',')]
    pub referrers: Vec<String>,

    /// Base URL for relative remote URLs.
    #[arg(long)]
    pub base_url: Option<String>,

    /// HMAC key used for signing URLs; prefix with "@" to read from a file.
    #[arg(long, env = "IMAGEPROXY_SIGNATURE_KEY")]
    pub signature_key: Option<String>,

    /// Allow images to scale beyond their original dimensions.
    #[arg(long)]
    pub scale_up: bool,

    /// Time limit for image requests, in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print verbose logging messages.
    #[arg(short, long)]
    pub verbose: bool,

    /// Reject requests that match no route mapping entry.
    #[arg(long)]
    pub exclusive: bool,

    /// URL of the JSON route mapping document.
    #[arg(long, env = "IMAGEPROXY_MAPPING_URL")]
    pub mapping_url: Option<String>,
}

impl Cli {
    /// Read the configuration file (if any), apply flags, and validate.
    pub fn load(&self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Override `config` with every flag that was given.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(addr) = &self.addr {
            config.listener.bind_address = addr.clone();
        }
        if let Some(cache) = &self.cache {
            config.cache = cache.clone();
        }
        if !self.whitelist.is_empty() {
            config.whitelist = self.whitelist.clone();
        }
        if !self.referrers.is_empty() {
            config.referrers = self.referrers.clone();
        }
        if self.base_url.is_some() {
            config.base_url = self.base_url.clone();
        }
        if self.signature_key.is_some() {
            config.signature_key = self.signature_key.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if self.mapping_url.is_some() {
            config.route_mapping.url = self.mapping_url.clone();
        }
        config.scale_up |= self.scale_up;
        config.verbose |= self.verbose;
        config.route_mapping.exclusive |= self.exclusive;
    }
}

fn parse_cache(value: &str) -> Result<CacheConfig, String> {
    let (backend, size) = match value.split_once(':') {
        Some((backend, size)) => (backend, Some(size)),
        None => (value, None),
    };

    let mut config = CacheConfig::default();
    match backend {
        "" | "none" => config.backend = CacheBackend::None,
        "memory" => config.backend = CacheBackend::Memory,
        other => return Err(format!("unsupported cache backend {other:?}")),
    }

    if let Some(size) = size {
        let megabytes: u64 = size
            .parse()
            .map_err(|_| format!("invalid cache size {size:?}"))?;
        config.max_bytes = megabytes
            .checked_mul(1024 * 1024)
            .ok_or_else(|| format!("cache size {size:?} is too large"))?;
    }

    Ok(config)
}
