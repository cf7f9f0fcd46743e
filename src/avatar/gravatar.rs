//! Gravatar REST client

use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::{debug, info};

use super::crop::square_avatar;
use super::oauth::{AccessToken, AuthorizationFlow};
use crate::config::GravatarConfig;
use crate::errors::{AvatarError, AvatarResult};
use crate::imaging::OutputFormat;

/// Multipart field the avatar endpoint expects
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone)]
pub struct GravatarClient {
    http: reqwest::Client,
    api_base_url: String,
    access_token: Option<AccessToken>,
}

impl GravatarClient {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: api_base_url.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Run the interactive OAuth flow and keep the resulting token
    pub async fn authenticate(&mut self, config: &GravatarConfig) -> AvatarResult<()> {
        let mut flow = AuthorizationFlow::new(config.clone());
        let token = flow.authorize().await?;
        self.access_token = Some(token);
        Ok(())
    }

    /// Crop the image at `path` to a square and make it the selected avatar
    pub async fn upload_avatar(&self, path: &Path) -> AvatarResult<()> {
        if self.access_token.is_none() {
            return Err(AvatarError::NotAuthenticated);
        }

        let source = tokio::fs::read(path).await?;
        let (bytes, format) = tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&source)?;
            let source_format = crate::imaging::detect_format(&source);
            square_avatar(&image, source_format)
        })
        .await
        .map_err(|e| AvatarError::Io(std::io::Error::other(e)))??;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("avatar")
            .to_string();

        self.upload_bytes(bytes, &file_name, format).await
    }

    /// POST already-square image bytes to `/me/avatars?select_avatar=true`
    pub async fn upload_bytes(&self, bytes: Vec<u8>, file_name: &str, format: OutputFormat) -> AvatarResult<()> {
        let token = self.access_token.as_ref().ok_or(AvatarError::NotAuthenticated)?;

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(format.mime_type())?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let url = format!("{}/me/avatars", self.api_base_url.trim_end_matches('/'));
        debug!("Uploading avatar {} to {}", file_name, url);

        let response = self
            .http
            .post(&url)
            .query(&[("select_avatar", "true")])
            .bearer_auth(token.secret())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AvatarError::Upload {
                status: status.as_u16(),
                body,
            });
        }

        info!("Avatar {} uploaded and selected", file_name);
        Ok(())
    }
}
