//! Configuration default values
//!
//! All defaults live here so they can be changed in one place.
use std::time::Duration;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
pub const DEFAULT_STATIC_DIR: &str = "./web/dist";
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 10 * 1024 * 1024; // 10MB

// Compression defaults
pub const DEFAULT_MAX_SIZE: usize = crate::compression::DEFAULT_MAX_SIZE;
pub const DEFAULT_QUALITY: u8 = crate::compression::DEFAULT_QUALITY;
pub const DEFAULT_MIN_WIDTH: u32 = crate::compression::MIN_WIDTH_FLOOR;

// Blob store defaults
pub const DEFAULT_BLOB_TTL: Duration = crate::blob_store::DEFAULT_TTL;
pub const DEFAULT_SWEEP_INTERVAL: Duration = crate::blob_store::DEFAULT_SWEEP_INTERVAL;

// Gravatar defaults
pub const DEFAULT_GRAVATAR_REDIRECT_URI: &str = "http://localhost:8080/callback";
pub const DEFAULT_GRAVATAR_API_BASE_URL: &str = "https://api.gravatar.com/v3";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://public-api.wordpress.com/oauth2/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://public-api.wordpress.com/oauth2/token";
pub const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);
