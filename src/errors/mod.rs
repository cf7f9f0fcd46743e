//! Centralized error handling for gitfit
//!
//! Every layer owns a small `thiserror` enum and the top-level [`AppError`]
//! wraps them, so facades can convert whatever the core returns into an exit
//! code or an HTTP status in one place.
//!
//! # Error Categories
//!
//! - **Compression Errors**: decoding, unsupported formats, unreachable budgets
//! - **Blob Store Errors**: unknown/expired ids and bad tokens
//! - **Avatar Errors**: OAuth authorization and Gravatar upload failures
//! - **Configuration / Validation Errors**: bad config files and bad input
//!
//! # Usage
//!
//! ```rust
//! use gitfit::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for the size search and codec layer
pub type CompressionResult<T> = Result<T, CompressionError>;

/// Convenience type alias for blob store lookups
pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

/// Convenience type alias for the avatar publishing facade
pub type AvatarResult<T> = Result<T, AvatarError>;
