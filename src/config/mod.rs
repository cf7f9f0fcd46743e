use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::errors::{AppError, AppResult};
use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
    /// Only needed for publishing avatars
    pub gravatar: Option<GravatarConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed by CORS
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Built frontend served for non-API paths
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Upper bound on request bodies, in bytes
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    #[serde(default = "default_max_size")]
    pub default_max_size: usize,
    #[serde(default = "default_quality")]
    pub default_quality: u8,
    #[serde(default = "default_min_width")]
    pub min_width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStoreConfig {
    /// How long a compressed result stays downloadable
    #[serde(default = "default_blob_ttl", with = "duration_serde::duration")]
    pub ttl: Duration,
    /// How often expired results are purged
    #[serde(default = "default_sweep_interval", with = "duration_serde::duration")]
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GravatarConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_gravatar_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_gravatar_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_authorization_timeout", with = "duration_serde::duration")]
    pub authorization_timeout: Duration,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_frontend_url() -> String {
    DEFAULT_FRONTEND_URL.to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATIC_DIR)
}

fn default_max_request_size() -> usize {
    DEFAULT_MAX_REQUEST_SIZE
}

// Compression defaults
fn default_max_size() -> usize {
    DEFAULT_MAX_SIZE
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_min_width() -> u32 {
    DEFAULT_MIN_WIDTH
}

// Blob store defaults
fn default_blob_ttl() -> Duration {
    DEFAULT_BLOB_TTL
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

// Gravatar defaults
fn default_gravatar_redirect_uri() -> String {
    DEFAULT_GRAVATAR_REDIRECT_URI.to_string()
}

fn default_gravatar_api_base_url() -> String {
    DEFAULT_GRAVATAR_API_BASE_URL.to_string()
}

fn default_authorize_url() -> String {
    DEFAULT_AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_authorization_timeout() -> Duration {
    DEFAULT_AUTHORIZATION_TIMEOUT
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            frontend_url: default_frontend_url(),
            static_dir: default_static_dir(),
            max_request_size: default_max_request_size(),
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            default_max_size: default_max_size(),
            default_quality: default_quality(),
            min_width: default_min_width(),
        }
    }
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            ttl: default_blob_ttl(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl GravatarConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: default_gravatar_redirect_uri(),
            api_base_url: default_gravatar_api_base_url(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            authorization_timeout: default_authorization_timeout(),
        }
    }
}

impl Config {
    /// Load `config_file`, writing out the defaults first if it does not exist
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }

    /// Load `config_file` if present, otherwise fall back to defaults without
    /// touching the filesystem
    pub fn load_or_default(config_file: &str) -> Result<Self> {
        if Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `PORT`, `FRONTEND_URL` and `GRAVATAR_*` from the process environment
    pub fn apply_env_overrides(&mut self) -> AppResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.web.port = port
                .trim()
                .parse()
                .map_err(|_| AppError::configuration(format!("PORT must be a valid port number, got '{port}'")))?;
        }

        if let Some(frontend_url) = get("FRONTEND_URL") {
            self.web.frontend_url = frontend_url;
        }

        let client_id = get("GRAVATAR_CLIENT_ID");
        let client_secret = get("GRAVATAR_CLIENT_SECRET");
        let redirect_uri = get("GRAVATAR_REDIRECT_URI");

        if self.gravatar.is_none() && (client_id.is_some() || client_secret.is_some()) {
            self.gravatar = Some(GravatarConfig::new("", ""));
        }

        if let Some(gravatar) = self.gravatar.as_mut() {
            if let Some(client_id) = client_id {
                gravatar.client_id = client_id;
            }
            if let Some(client_secret) = client_secret {
                gravatar.client_secret = client_secret;
            }
            if let Some(redirect_uri) = redirect_uri {
                gravatar.redirect_uri = redirect_uri;
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.web.max_request_size == 0 {
            return Err(AppError::configuration("web.max_request_size must be greater than zero"));
        }
        if self.compression.default_max_size == 0 {
            return Err(AppError::configuration("compression.default_max_size must be greater than zero"));
        }
        if !(1..=100).contains(&self.compression.default_quality) {
            return Err(AppError::configuration("compression.default_quality must be between 1 and 100"));
        }
        if self.compression.min_width == 0 {
            return Err(AppError::configuration("compression.min_width must be at least 1"));
        }
        if self.blob_store.ttl.is_zero() {
            return Err(AppError::configuration("blob_store.ttl must be greater than zero"));
        }
        if self.blob_store.sweep_interval.is_zero() {
            return Err(AppError::configuration("blob_store.sweep_interval must be greater than zero"));
        }
        if let Some(gravatar) = &self.gravatar {
            if gravatar.client_id.is_empty() || gravatar.client_secret.is_empty() {
                return Err(AppError::configuration(
                    "gravatar.client_id and gravatar.client_secret are both required",
                ));
            }
        }
        Ok(())
    }
}
