// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loopback HTTP server that receives the identity provider's redirect.
//!
//! Serves a single route. The first request on it resolves a one-shot
//! channel; later requests still get a page but are otherwise ignored. The
//! waiting side races that channel against a timeout and then shuts the
//! server down, so the port is free again once [`CallbackServer::wait`]
//! returns.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult, ErrorKind};
use crate::pkce::constant_time_eq;

pub const CALLBACK_PATH: &str = "/cli_callback";
pub const DEFAULT_CALLBACK_PORT: u16 = 26635;

/// How long to wait for the browser round trip.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on graceful shutdown before the server task is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><head><title>Confluent CLI</title></head>\
<body><h1>Authentication complete</h1>\
<p>You may close this window and return to the command line.</p></body></html>";

const FAILURE_PAGE: &str = "<!DOCTYPE html><html><head><title>Confluent CLI</title></head>\
<body><h1>Authentication failed</h1>\
<p>Return to the command line for details and try logging in again.</p></body></html>";

pub fn default_callback_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_CALLBACK_PORT))
}

/// Query parameters the identity provider appends to the redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Validate against the expected state and pull out the authorization code.
    pub fn into_code(self, expected_state: &str) -> AuthResult<String> {
        if let Some(error) = self.error {
            debug!(
                error = %error,
                description = self.error_description.as_deref().unwrap_or_default(),
                "identity provider returned an error"
            );
            return Err(AuthError::auth_failure("the identity provider rejected the login"));
        }
        let state = self.state.unwrap_or_default();
        if !constant_time_eq(&state, expected_state) {
            return Err(AuthError::new(
                ErrorKind::StateMismatch,
                "authentication failed: state parameter invalid",
            ));
        }
        match self.code {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(AuthError::malformed("authentication callback did not include a code")),
        }
    }
}

type CallbackSender = oneshot::Sender<AuthResult<String>>;

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    tx: Arc<Mutex<Option<CallbackSender>>>,
}

async fn handle_callback(
    State(s): State<CallbackState>,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Html<&'static str> {
    let outcome = match query {
        Ok(Query(params)) => params.into_code(&s.expected_state),
        Err(rejection) => {
            debug!("undecodable authentication callback: {rejection}");
            Err(AuthError::malformed("authentication callback query could not be decoded"))
        }
    };
    let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };

    let sender = match s.tx.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    match sender {
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => debug!("ignoring repeated authentication callback"),
    }
    Html(page)
}

/// Router serving only the callback route.
pub fn build_router(expected_state: &str, tx: CallbackSender) -> Router {
    let state = CallbackState {
        expected_state: Arc::from(expected_state),
        tx: Arc::new(Mutex::new(Some(tx))),
    };
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A bound, not yet serving, callback listener.
pub struct CallbackServer {
    listener: TcpListener,
    expected_state: String,
}

impl CallbackServer {
    pub async fn bind(addr: SocketAddr, expected_state: impl Into<String>) -> AuthResult<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            AuthError::configuration(format!(
                "unable to listen on {addr} for the authentication callback: {e}"
            ))
        })?;
        Ok(Self { listener, expected_state: expected_state.into() })
    }

    pub fn local_addr(&self) -> AuthResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| AuthError::configuration(format!("callback listener address: {e}")))
    }

    /// Redirect URI pointing at this listener.
    pub fn redirect_uri(&self) -> AuthResult<String> {
        let addr = self.local_addr()?;
        Ok(format!("http://{}:{}{CALLBACK_PATH}", addr.ip(), addr.port()))
    }

    /// Serve until the first callback or `timeout`, whichever comes first.
    ///
    /// The listener is closed before this returns on every path.
    pub async fn wait(self, timeout: Duration) -> AuthResult<String> {
        let (tx, rx) = oneshot::channel();
        let router = build_router(&self.expected_state, tx);
        let shutdown = CancellationToken::new();

        let sd = shutdown.clone();
        let listener = self.listener;
        let mut server = tokio::spawn(async move {
            let result = axum::serve(listener, router).with_graceful_shutdown(sd.cancelled_owned()).await;
            if let Err(e) = result {
                warn!("authentication callback server error: {e}");
            }
        });

        let outcome = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(AuthError::auth_failure("authentication callback server stopped")),
            Err(_) => Err(AuthError::new(
                ErrorKind::Timeout,
                format!("authentication timed out after {}s", timeout.as_secs()),
            )),
        };

        shutdown.cancel();
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            server.abort();
            let _ = server.await;
        }
        outcome
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
