//! Error type definitions for gitfit
//!
//! The core (size search and blob store) returns typed failures and never
//! reports them itself; the CLI and HTTP facades decide how to surface them.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Size search and codec errors
    #[error("Compression error: {0}")]
    Compression(#[from] CompressionError),

    /// Blob store lookup errors
    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobStoreError),

    /// Avatar publishing errors
    #[error("Avatar error: {0}")]
    Avatar(#[from] AvatarError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Filesystem errors in the facades
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while searching for an encoding that fits a byte budget
#[derive(Error, Debug)]
pub enum CompressionError {
    /// Input bytes are not a decodable image
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Target format outside jpeg, png and gif
    #[error("unsupported file format: {format}. Supported formats are: jpeg, png, gif")]
    UnsupportedFormat { format: String },

    /// No probed width, down to the floor, met the budget
    #[error("failed to compress image under {budget} bytes")]
    BudgetUnattainable { budget: usize },

    /// A probe failed to encode; fatal to the whole search
    #[error("failed to encode image at width {width}: {source}")]
    Encode {
        width: u32,
        #[source]
        source: image::ImageError,
    },

    /// Request parameters outside their documented ranges
    #[error("invalid compression request: {message}")]
    InvalidRequest { message: String },

    /// Reading the input or writing the output failed (CLI path)
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Blob store lookup failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobStoreError {
    /// Unknown id, or the entry has expired
    #[error("file not found or expired")]
    NotFound,

    /// The id exists but the token does not match
    #[error("invalid token")]
    Forbidden,
}

/// Errors from the OAuth authorization flow and the Gravatar upload
#[derive(Error, Debug)]
pub enum AvatarError {
    /// Upload attempted before a token was obtained
    #[error("not authenticated - authorize before uploading")]
    NotAuthenticated,

    /// The user (or provider) denied the authorization request
    #[error("authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    /// Callback state did not match the one we issued
    #[error("invalid state parameter (CSRF protection)")]
    InvalidState,

    /// Callback carried neither a code nor an error
    #[error("no authorization code received")]
    MissingCode,

    /// No callback arrived in time
    #[error("authorization timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The flow was cancelled by its owner
    #[error("authorization cancelled")]
    Cancelled,

    /// Code for token exchange was rejected
    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },

    /// The avatar API rejected the upload
    #[error("API request failed with status {status}: {body}")]
    Upload { status: u16, body: String },

    /// Transport-level HTTP failures
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Cropping or re-encoding the avatar failed
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Callback listener or file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl CompressionError {
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn io<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the failure was caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::UnsupportedFormat { .. } | Self::InvalidRequest { .. }
        )
    }
}
