// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: mock backends, scripted prompts, and assertion helpers.

use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use reqwest::Url;
use tokio::net::TcpListener;

use crate::api::cloud::CloudClient;
use crate::api::mds::MdsClient;
use crate::error::{AuthError, AuthResult};
use crate::handler::{CloudTokenHandler, OnPremTokenHandler};
use crate::http::build_client;
use crate::prompt::Prompt;
use crate::sso::{BrowserLauncher, ProviderConfig, SsoFlow};

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// In-memory log sink for checking what a code path emits.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Subscriber recording every event, down to `trace`, into this sink.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut b) = self.0.lock() {
            b.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Unsigned JWT with the given subject and `exp` claim.
pub fn fake_jwt(sub: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = serde_json::json!({ "sub": sub, "exp": exp, "iat": now_secs() });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

// ---------------------------------------------------------------------------
// Scripted prompt
// ---------------------------------------------------------------------------

/// [`Prompt`] fed from queued answers. Running out of answers is an error.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    lines: Mutex<VecDeque<String>>,
    secrets: Mutex<VecDeque<String>>,
    said: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(self, line: impl Into<String>) -> Self {
        if let Ok(mut q) = self.lines.lock() {
            q.push_back(line.into());
        }
        self
    }

    pub fn with_secret(self, secret: impl Into<String>) -> Self {
        if let Ok(mut q) = self.secrets.lock() {
            q.push_back(secret.into());
        }
        self
    }

    /// Messages shown so far.
    pub fn said(&self) -> Vec<String> {
        self.said.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Answers not consumed yet, lines then secrets.
    pub fn remaining(&self) -> usize {
        let lines = self.lines.lock().map(|q| q.len()).unwrap_or_default();
        let secrets = self.secrets.lock().map(|q| q.len()).unwrap_or_default();
        lines + secrets
    }
}

impl Prompt for ScriptedPrompt {
    fn say(&self, message: &str) {
        if let Ok(mut said) = self.said.lock() {
            said.push(message.to_owned());
        }
    }

    fn read_line(&self, label: &str) -> AuthResult<String> {
        self.lines
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .ok_or_else(|| AuthError::malformed(format!("no scripted answer for {label:?}")))
    }

    fn read_secret(&self, label: &str) -> AuthResult<String> {
        self.secrets
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .ok_or_else(|| AuthError::malformed(format!("no scripted secret for {label:?}")))
    }
}

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

/// Shared state behind [`MockBackend`]. Tests seed and inspect it directly.
#[derive(Debug, Default)]
pub struct MockState {
    /// Cloud users: email -> password.
    pub cloud_users: Mutex<HashMap<String, String>>,
    /// Cloud users in SSO organizations: email -> connection name.
    pub sso_users: Mutex<HashMap<String, String>>,
    /// MDS users: username -> password.
    pub mds_users: Mutex<HashMap<String, String>>,
    /// Queued `/oauth/token` responses; when empty a fresh token pair is issued.
    pub token_responses: Mutex<VecDeque<(u16, String)>>,
    /// Form bodies posted to `/oauth/token`.
    pub token_requests: Mutex<Vec<HashMap<String, String>>>,
    /// JSON bodies posted to `/api/sessions`.
    pub login_requests: Mutex<Vec<serde_json::Value>>,
    /// Session tokens issued: token -> email.
    pub sessions: Mutex<HashMap<String, String>>,
    /// Make `/api/check_email` fail with a 500.
    pub check_email_fails: AtomicBool,
    pub token_calls: AtomicU32,
    pub mds_calls: AtomicU32,
}

impl MockState {
    pub fn add_cloud_user(&self, email: &str, password: &str) {
        if let Ok(mut users) = self.cloud_users.lock() {
            users.insert(email.to_owned(), password.to_owned());
        }
    }

    pub fn add_sso_user(&self, email: &str, connection: &str) {
        if let Ok(mut users) = self.sso_users.lock() {
            users.insert(email.to_owned(), connection.to_owned());
        }
    }

    pub fn add_mds_user(&self, username: &str, password: &str) {
        if let Ok(mut users) = self.mds_users.lock() {
            users.insert(username.to_owned(), password.to_owned());
        }
    }

    pub fn queue_token_response(&self, status: u16, body: serde_json::Value) {
        if let Ok(mut q) = self.token_responses.lock() {
            q.push_back((status, body.to_string()));
        }
    }

    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.token_requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn login_requests(&self) -> Vec<serde_json::Value> {
        self.login_requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn issue_session(&self, email: &str) -> String {
        let token = fake_jwt(email, now_secs() + 3600);
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(token.clone(), email.to_owned());
        }
        token
    }
}

/// In-process identity provider, cloud API, and MDS on one loopback port.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/oauth/token", post(oauth_token))
            .route("/api/sessions", post(cloud_login))
            .route("/api/check_email", post(check_email))
            .route("/api/me", get(me))
            .route("/security/1.0/authenticate", get(mds_authenticate))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr, state })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn provider(&self) -> ProviderConfig {
        ProviderConfig {
            host: self.url(),
            client_id: "test-client".to_owned(),
            audience: format!("{}/api", self.url()),
            callback_url: format!("{}/cli_callback", self.url()),
        }
    }

    /// SSO flow against this backend whose "browser" follows the redirect.
    pub fn sso_flow(&self, launcher: BrowserLauncher) -> anyhow::Result<SsoFlow> {
        Ok(SsoFlow::new(self.provider(), build_client(None)?)
            .with_callback_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .with_callback_timeout(Duration::from_secs(5))
            .with_launcher(launcher))
    }

    pub fn cloud_handler(&self) -> anyhow::Result<CloudTokenHandler> {
        let client = CloudClient::new(self.url(), build_client(None)?);
        Ok(CloudTokenHandler::new(client, self.sso_flow(simulated_browser("code-123"))?))
    }

    pub fn onprem_handler(&self) -> anyhow::Result<OnPremTokenHandler> {
        Ok(OnPremTokenHandler::new(MdsClient::new(self.url(), build_client(None)?)))
    }
}

/// A "browser" that immediately follows the authorization redirect with `code`
/// and the state it was given.
pub fn simulated_browser(code: &str) -> BrowserLauncher {
    let code = code.to_owned();
    Arc::new(move |authorize_url: &str| -> anyhow::Result<()> {
        let url = Url::parse(authorize_url)?;
        let param = |name: &str| {
            url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned()).unwrap_or_default()
        };
        let mut callback = Url::parse(&param("redirect_uri"))?;
        callback.query_pairs_mut().append_pair("code", &code).append_pair("state", &param("state"));
        spawn_get(callback);
        Ok(())
    })
}

/// A "browser" that follows the redirect with a forged state.
pub fn forging_browser() -> BrowserLauncher {
    Arc::new(move |authorize_url: &str| -> anyhow::Result<()> {
        let url = Url::parse(authorize_url)?;
        let redirect = url
            .query_pairs()
            .find(|(k, _)| k == "redirect_uri")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        let mut callback = Url::parse(&redirect)?;
        callback.query_pairs_mut().append_pair("code", "stolen").append_pair("state", "forged");
        spawn_get(callback);
        Ok(())
    })
}

/// A "browser" that never comes back.
pub fn idle_browser() -> BrowserLauncher {
    Arc::new(|_: &str| Ok(()))
}

fn spawn_get(url: Url) {
    tokio::spawn(async move {
        if let Ok(client) = build_client(None) {
            let _ = client.get(url).send().await;
        }
    });
}

async fn oauth_token(
    State(s): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = s.token_calls.fetch_add(1, Ordering::Relaxed);
    if let Ok(mut reqs) = s.token_requests.lock() {
        reqs.push(form);
    }
    let queued = s.token_responses.lock().ok().and_then(|mut q| q.pop_front());
    let (status, body) = queued.unwrap_or_else(|| {
        let body = serde_json::json!({
            "id_token": format!("idt-{n}"),
            "refresh_token": format!("rt-{n}"),
            "token_type": "Bearer",
        });
        (200, body.to_string())
    });
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, body).into_response()
}

async fn cloud_login(
    State(s): State<Arc<MockState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if let Ok(mut reqs) = s.login_requests.lock() {
        reqs.push(body.clone());
    }
    let email = body["email"].as_str().unwrap_or_default().to_owned();
    let accepted = match (body["password"].as_str(), body["id_token"].as_str()) {
        (Some(password), None) => s
            .cloud_users
            .lock()
            .map(|users| users.get(&email).is_some_and(|p| p == password))
            .unwrap_or(false),
        (None, Some(id_token)) => id_token.starts_with("idt-"),
        _ => false,
    };
    if !accepted {
        let body = serde_json::json!({ "error": { "message": "invalid credentials" } });
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }
    let token = s.issue_session(&email);
    Json(serde_json::json!({ "token": token })).into_response()
}

async fn check_email(
    State(s): State<Arc<MockState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if s.check_email_fails.load(Ordering::Relaxed) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let email = body["email"].as_str().unwrap_or_default();
    let connection = s.sso_users.lock().ok().and_then(|users| users.get(email).cloned());
    let sso = match connection {
        Some(name) => serde_json::json!({ "enabled": true, "auth0_connection_name": name }),
        None => serde_json::json!({ "enabled": false }),
    };
    Json(serde_json::json!({ "user": { "email": email, "sso": sso } })).into_response()
}

async fn me(State(s): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    let email = s.sessions.lock().ok().and_then(|sessions| sessions.get(token).cloned());
    let Some(email) = email else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    Json(serde_json::json!({
        "user": { "id": 7, "email": email, "first_name": "Test" },
        "organization": { "id": 42, "resource_id": "org-abc", "name": "Acme" },
        "accounts": [
            { "id": "env-1", "name": "default" },
            { "id": "env-2", "name": "staging" },
        ],
    }))
    .into_response()
}

async fn mds_authenticate(State(s): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    s.mds_calls.fetch_add(1, Ordering::Relaxed);
    let decoded = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|b64| STANDARD.decode(b64).ok())
        .and_then(|raw| String::from_utf8(raw).ok());
    let Some((user, password)) = decoded.as_deref().and_then(|d| d.split_once(':')) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let ok = s
        .mds_users
        .lock()
        .map(|users| users.get(user).is_some_and(|p| p == password))
        .unwrap_or(false);
    if !ok {
        return (StatusCode::UNAUTHORIZED, "{\"status_code\":401}").into_response();
    }
    Json(serde_json::json!({
        "auth_token": fake_jwt(user, now_secs() + 3600),
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
    .into_response()
}
