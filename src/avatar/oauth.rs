//! OAuth 2.0 authorization-code flow against WordPress.com
//!
//! [`AuthorizationFlow`] moves through `AwaitingCallback -> Exchanging ->
//! Done | Failed`. While awaiting, a one-route axum listener receives the
//! browser redirect and hands the code over a oneshot channel. The wait ends
//! on the first of: a callback, the timeout, or cancellation. The listener is
//! shut down before the code is exchanged.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
};
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::blob_store::credentials::{random_hex, tokens_match};
use crate::config::GravatarConfig;
use crate::errors::{AvatarError, AvatarResult};

/// Scopes needed to replace the user's avatar
pub const SCOPES: [&str; 2] = ["auth", "gravatar-profile:manage"];

const DEFAULT_CALLBACK_PATH: &str = "/callback";

/// Bearer token from a completed flow. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Where a flow is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    AwaitingCallback,
    Exchanging,
    Done,
    Failed(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Shared with the callback route; the sender is taken by the first callback
struct CallbackState {
    expected_state: String,
    sender: Mutex<Option<oneshot::Sender<AvatarResult<String>>>>,
}

pub struct AuthorizationFlow {
    config: GravatarConfig,
    csrf_state: String,
    state: FlowState,
    cancellation_token: CancellationToken,
    http: reqwest::Client,
}

impl AuthorizationFlow {
    pub fn new(config: GravatarConfig) -> Self {
        Self {
            config,
            csrf_state: random_hex(),
            state: FlowState::AwaitingCallback,
            cancellation_token: CancellationToken::new(),
            http: reqwest::Client::new(),
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Random value the callback must echo back
    pub fn csrf_state(&self) -> &str {
        &self.csrf_state
    }

    /// Cancelling this token aborts a pending wait with [`AvatarError::Cancelled`]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// URL the user opens to grant access
    pub fn authorization_url(&self) -> AvatarResult<Url> {
        let mut url = Url::parse(&self.config.authorize_url).map_err(invalid_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("state", &self.csrf_state);
        Ok(url)
    }

    /// Bind the listener named by `redirect_uri`, point the user at the
    /// authorization page and run the flow to completion
    pub async fn authorize(&mut self) -> AvatarResult<AccessToken> {
        let redirect = Url::parse(&self.config.redirect_uri).map_err(invalid_url)?;
        let host = redirect.host_str().unwrap_or("localhost");
        let port = redirect.port_or_known_default().unwrap_or(80);

        let listener = TcpListener::bind((host, port)).await?;
        let auth_url = self.authorization_url()?;

        info!("Opening browser for authorization...");
        info!("If the browser doesn't open, visit: {}", auth_url);
        if let Err(e) = open_browser(auth_url.as_str()) {
            warn!("Failed to open browser automatically: {}", e);
        }

        self.run(listener).await
    }

    /// Serve the callback on `listener`, wait for it, then exchange the code
    pub async fn run(&mut self, listener: TcpListener) -> AvatarResult<AccessToken> {
        let result = self.run_inner(listener).await;
        self.state = match &result {
            Ok(_) => FlowState::Done,
            Err(e) => FlowState::Failed(e.to_string()),
        };
        result
    }

    async fn run_inner(&mut self, listener: TcpListener) -> AvatarResult<AccessToken> {
        if self.state != FlowState::AwaitingCallback {
            return Err(AvatarError::InvalidState);
        }

        let code = self.await_callback(listener).await?;

        self.state = FlowState::Exchanging;
        debug!("Authorization successful, exchanging code for token");
        self.exchange_code(&code).await
    }

    async fn await_callback(&self, listener: TcpListener) -> AvatarResult<String> {
        let (sender, receiver) = oneshot::channel();
        let callback_state = Arc::new(CallbackState {
            expected_state: self.csrf_state.clone(),
            sender: Mutex::new(Some(sender)),
        });

        let path = callback_path(&self.config.redirect_uri);
        let app = Router::new()
            .route(&path, get(handle_callback))
            .with_state(callback_state);

        let server_token = self.cancellation_token.child_token();
        let shutdown = server_token.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
        });

        let timeout = self.config.authorization_timeout;
        let outcome = tokio::select! {
            received = receiver => received.unwrap_or(Err(AvatarError::Cancelled)),
            _ = tokio::time::sleep(timeout) => Err(AvatarError::Timeout { seconds: timeout.as_secs() }),
            _ = self.cancellation_token.cancelled() => Err(AvatarError::Cancelled),
        };

        server_token.cancel();
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Callback listener failed: {}", e),
            Err(e) => warn!("Callback listener task failed: {}", e),
        }

        outcome
    }

    async fn exchange_code(&self, code: &str) -> AvatarResult<AccessToken> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AvatarError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| AvatarError::TokenExchange {
            status: status.as_u16(),
            body: format!("failed to parse token response: {e}"),
        })?;

        Ok(AccessToken::new(token.access_token))
    }
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let outcome = validate_callback(&state.expected_state, params);

    let page = match &outcome {
        Ok(_) => (
            StatusCode::OK,
            page("Success!", "Authorization successful. You can close this window and return to the terminal."),
        ),
        Err(AvatarError::AuthorizationDenied { reason }) => (
            StatusCode::BAD_REQUEST,
            page("Authorization Denied", &html_escape(reason)),
        ),
        Err(e) => (StatusCode::BAD_REQUEST, page("Error", &html_escape(&e.to_string()))),
    };

    let sender = state
        .sender
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    match sender {
        Some(sender) => {
            let _ = sender.send(outcome);
        }
        None => debug!("Ignoring repeated authorization callback"),
    }

    page
}

/// Order matters: a provider error wins, then CSRF, then the code itself
fn validate_callback(expected_state: &str, params: CallbackParams) -> AvatarResult<String> {
    if let Some(reason) = params.error.filter(|e| !e.is_empty()) {
        return Err(AvatarError::AuthorizationDenied { reason });
    }

    let state = params.state.unwrap_or_default();
    if !tokens_match(&state, expected_state) {
        return Err(AvatarError::InvalidState);
    }

    params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(AvatarError::MissingCode)
}

fn callback_path(redirect_uri: &str) -> String {
    Url::parse(redirect_uri)
        .ok()
        .map(|url| url.path().to_string())
        .filter(|path| path != "/" && !path.is_empty())
        .unwrap_or_else(|| DEFAULT_CALLBACK_PATH.to_string())
}

fn page(title: &str, message: &str) -> Html<String> {
    Html(format!(
        "<html><body><h1>{title}</h1><p>{message}</p><p>You can close this window.</p></body></html>"
    ))
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn invalid_url(e: url::ParseError) -> AvatarError {
    AvatarError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
}

/// Best effort; failure just means the user copies the URL by hand
fn open_browser(url: &str) -> std::io::Result<()> {
    let mut child = browser_command(url).spawn()?;
    // Launchers exit as soon as the browser has the URL
    tokio::task::spawn_blocking(move || child.wait());
    Ok(())
}

/// Platform launcher with the URL as a single argument, never through a shell
fn browser_command(url: &str) -> std::process::Command {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("rundll32");
        c.arg("url.dll,FileProtocolHandler");
        c
    } else {
        std::process::Command::new("xdg-open")
    };
    command.arg(url);
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Form, Json, routing::post};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::time::Duration;

    async fn spawn_token_server() -> SocketAddr {
        async fn token(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
            if form.get("code").map(String::as_str) == Some("good-code")
                && form.get("grant_type").map(String::as_str) == Some("authorization_code")
                && form.get("client_secret").map(String::as_str) == Some("secret")
            {
                (
                    StatusCode::OK,
                    Json(serde_json::json!({ "access_token": "tok-123", "token_type": "bearer" })),
                )
                    .into_response()
            } else {
                (StatusCode::BAD_REQUEST, "invalid_grant").into_response()
            }
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/oauth2/token", post(token));
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    fn config(token_addr: SocketAddr) -> GravatarConfig {
        let mut config = GravatarConfig::new("client", "secret");
        config.redirect_uri = "http://127.0.0.1:0/callback".to_string();
        config.token_url = format!("http://{token_addr}/oauth2/token");
        config.authorization_timeout = Duration::from_secs(10);
        config
    }

    /// Run the flow on an ephemeral port and hit its callback with `query`
    async fn run_with_callback(config: GravatarConfig, query: impl FnOnce(&str) -> String) -> (AuthorizationFlow, AvatarResult<AccessToken>, StatusCode) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut flow = AuthorizationFlow::new(config);
        let query = query(flow.csrf_state());

        let handle = tokio::spawn(async move {
            let result = flow.run(listener).await;
            (flow, result)
        });

        let response = reqwest::get(format!("http://{addr}/callback?{query}")).await.unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();

        let (flow, result) = handle.await.unwrap();
        (flow, result, status)
    }

    #[test]
    fn test_authorization_url() {
        let flow = AuthorizationFlow::new(GravatarConfig::new("client", "secret"));
        let url = flow.authorization_url().unwrap();

        assert!(url.as_str().starts_with("https://public-api.wordpress.com/oauth2/authorize?"));
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client");
        assert_eq!(params["redirect_uri"], "http://localhost:8080/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "auth gravatar-profile:manage");
        assert_eq!(params["state"], flow.csrf_state());
        assert_eq!(flow.csrf_state().len(), 32);
    }

    #[test]
    fn test_validate_callback_order() {
        let params = |code: Option<&str>, state: Option<&str>, error: Option<&str>| CallbackParams {
            code: code.map(String::from),
            state: state.map(String::from),
            error: error.map(String::from),
        };

        assert!(matches!(
            validate_callback("s", params(Some("c"), Some("wrong"), Some("access_denied"))),
            Err(AvatarError::AuthorizationDenied { ref reason }) if reason == "access_denied"
        ));
        assert!(matches!(
            validate_callback("s", params(Some("c"), Some("wrong"), None)),
            Err(AvatarError::InvalidState)
        ));
        assert!(matches!(validate_callback("s", params(None, Some("s"), None)), Err(AvatarError::MissingCode)));
        assert_eq!(validate_callback("s", params(Some("c"), Some("s"), None)).unwrap(), "c");
    }

    #[test]
    fn test_callback_path() {
        assert_eq!(callback_path("http://localhost:8080/callback"), "/callback");
        assert_eq!(callback_path("http://localhost:9000/oauth/done"), "/oauth/done");
        assert_eq!(callback_path("http://localhost:9000"), "/callback");
        assert_eq!(callback_path("not a url"), "/callback");
    }

    #[test]
    fn test_browser_command_passes_url_intact() {
        let flow = AuthorizationFlow::new(GravatarConfig::new("client", "secret"));
        let url = flow.authorization_url().unwrap();
        assert!(url.as_str().contains('&'));

        let command = browser_command(url.as_str());
        assert_ne!(command.get_program(), "cmd");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.last().copied(), Some(std::ffi::OsStr::new(url.as_str())));
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
        assert_eq!(token.secret(), "super-secret");
    }

    #[tokio::test]
    async fn test_flow_completes_with_token() {
        let token_addr = spawn_token_server().await;
        let (flow, result, status) =
            run_with_callback(config(token_addr), |state| format!("code=good-code&state={state}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(result.unwrap().secret(), "tok-123");
        assert_eq!(flow.state(), &FlowState::Done);
    }

    #[tokio::test]
    async fn test_flow_rejects_wrong_state() {
        let token_addr = spawn_token_server().await;
        let (flow, result, status) =
            run_with_callback(config(token_addr), |_| "code=good-code&state=forged".to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(matches!(result, Err(AvatarError::InvalidState)));
        assert!(matches!(flow.state(), FlowState::Failed(_)));
    }

    #[tokio::test]
    async fn test_flow_reports_denial() {
        let token_addr = spawn_token_server().await;
        let (_flow, result, status) =
            run_with_callback(config(token_addr), |state| format!("error=access_denied&state={state}")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(matches!(result, Err(AvatarError::AuthorizationDenied { .. })));
    }

    #[tokio::test]
    async fn test_flow_surfaces_token_exchange_failure() {
        let token_addr = spawn_token_server().await;
        let (flow, result, _status) =
            run_with_callback(config(token_addr), |state| format!("code=bad-code&state={state}")).await;

        assert!(matches!(result, Err(AvatarError::TokenExchange { status: 400, .. })));
        assert!(matches!(flow.state(), FlowState::Failed(_)));
    }

    #[tokio::test]
    async fn test_flow_times_out() {
        let token_addr = spawn_token_server().await;
        let mut config = config(token_addr);
        config.authorization_timeout = Duration::from_millis(50);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut flow = AuthorizationFlow::new(config);
        let result = flow.run(listener).await;

        assert!(matches!(result, Err(AvatarError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_flow_can_be_cancelled() {
        let token_addr = spawn_token_server().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut flow = AuthorizationFlow::new(config(token_addr));

        flow.cancellation_token().cancel();
        let result = flow.run(listener).await;

        assert!(matches!(result, Err(AvatarError::Cancelled)));
    }

    #[tokio::test]
    async fn test_finished_flow_cannot_rerun() {
        let token_addr = spawn_token_server().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut flow = AuthorizationFlow::new(config(token_addr));
        flow.cancellation_token().cancel();
        let _ = flow.run(listener).await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        assert!(matches!(flow.run(listener).await, Err(AvatarError::InvalidState)));
    }
}
