//! Publish a compressed image as the user's Gravatar avatar
//!
//! Gravatar only accepts square images, so uploads are center-cropped first.
//! Access comes from a WordPress.com OAuth authorization-code flow run
//! against a short-lived local callback listener.

pub mod crop;
pub mod gravatar;
pub mod oauth;

use std::path::Path;

use crate::config::GravatarConfig;
use crate::errors::AvatarResult;

pub use crop::{AVATAR_JPEG_QUALITY, crop_to_square, square_avatar};
pub use gravatar::GravatarClient;
pub use oauth::{AccessToken, AuthorizationFlow, FlowState, SCOPES};

/// Authorize interactively, then upload `image_path` as the selected avatar
pub async fn publish_avatar(config: &GravatarConfig, image_path: &Path) -> AvatarResult<()> {
    let mut client = GravatarClient::new(&config.api_base_url);
    client.authenticate(config).await?;
    client.upload_avatar(image_path).await
}
