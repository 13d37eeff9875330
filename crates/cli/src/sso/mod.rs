// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single sign-on via OAuth2 authorization code + PKCE.
//!
//! One [`AuthFlowState`] per attempt. The browser path waits on a loopback
//! [`server::CallbackServer`]; the no-browser path asks the user to paste
//! `state/code` back. Both end in a token exchange yielding an ID token and
//! a refresh token.

pub mod provider;
pub mod server;
pub mod token;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult, ErrorKind};
use crate::pkce::{constant_time_eq, PkceArtifacts, CODE_CHALLENGE_METHOD};
use crate::prompt::Prompt;

pub use provider::ProviderConfig;
pub use token::SsoTokens;

/// Where an [`AuthFlowState`] is in its single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Init,
    BrowserWait,
    ManualPaste,
    CodeReceived,
    TokenExchanged,
}

/// Per-attempt PKCE session. Never persisted.
#[derive(Debug)]
pub struct AuthFlowState {
    pub stage: FlowStage,
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
    pub authorization_code: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub provider: ProviderConfig,
    pub callback_url: String,
}

impl AuthFlowState {
    pub fn new(provider: ProviderConfig, callback_url: impl Into<String>) -> Self {
        let pkce = PkceArtifacts::generate();
        Self {
            stage: FlowStage::Init,
            code_verifier: pkce.code_verifier,
            code_challenge: pkce.code_challenge,
            state: pkce.state,
            authorization_code: None,
            id_token: None,
            refresh_token: None,
            provider,
            callback_url: callback_url.into(),
        }
    }

    /// Authorization URL the user opens in a browser.
    pub fn authorize_url(&self, connection: Option<&str>) -> AuthResult<String> {
        let mut url = Url::parse(&self.provider.authorize_endpoint()).map_err(|e| {
            AuthError::configuration(format!("invalid identity provider host: {e}"))
        })?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("response_type", "code")
                .append_pair("code_challenge", &self.code_challenge)
                .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD)
                .append_pair("client_id", &self.provider.client_id)
                .append_pair("redirect_uri", &self.callback_url)
                .append_pair("scope", provider::SCOPE)
                .append_pair("audience", &self.provider.audience)
                .append_pair("state", &self.state);
            if let Some(connection) = connection.filter(|c| !c.is_empty()) {
                q.append_pair("connection", connection);
            }
        }
        Ok(url.into())
    }

    /// Accept `state/code` pasted by the user in no-browser mode.
    pub fn accept_pasted(&mut self, input: &str) -> AuthResult<()> {
        let Some((state, code)) = input.trim().split_once('/') else {
            return Err(AuthError::malformed(
                "malformed pasted input: expected the value shown in the browser, formatted as state/code",
            ));
        };
        if !constant_time_eq(state, &self.state) {
            return Err(AuthError::new(
                ErrorKind::StateMismatch,
                "authentication failed: state parameter invalid",
            ));
        }
        if code.is_empty() {
            return Err(AuthError::malformed("malformed pasted input: code is empty"));
        }
        self.accept_code(code.to_owned());
        Ok(())
    }

    fn accept_code(&mut self, code: String) {
        self.authorization_code = Some(code);
        self.stage = FlowStage::CodeReceived;
    }

    /// Exchange the received code for tokens.
    pub async fn exchange(&mut self, client: &reqwest::Client) -> AuthResult<SsoTokens> {
        let code = match (&self.stage, &self.authorization_code) {
            (FlowStage::CodeReceived, Some(code)) => code.clone(),
            _ => return Err(AuthError::auth_failure("no authorization code to exchange")),
        };
        let tokens = token::exchange_code(
            client,
            &self.provider,
            &code,
            &self.code_verifier,
            &self.callback_url,
        )
        .await?;
        self.id_token = Some(tokens.id_token.clone());
        self.refresh_token = tokens.refresh_token.clone();
        self.stage = FlowStage::TokenExchanged;
        Ok(tokens)
    }
}

/// Opens a URL in the user's browser.
pub type BrowserLauncher = Arc<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

fn system_browser() -> BrowserLauncher {
    Arc::new(|url: &str| open::that(url).map_err(anyhow::Error::from))
}

/// Drives SSO logins and refreshes against one identity provider.
#[derive(Clone)]
pub struct SsoFlow {
    provider: ProviderConfig,
    http: reqwest::Client,
    callback_addr: SocketAddr,
    callback_timeout: Duration,
    launcher: BrowserLauncher,
}

impl std::fmt::Debug for SsoFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoFlow")
            .field("provider", &self.provider)
            .field("callback_addr", &self.callback_addr)
            .field("callback_timeout", &self.callback_timeout)
            .finish_non_exhaustive()
    }
}

impl SsoFlow {
    pub fn new(provider: ProviderConfig, http: reqwest::Client) -> Self {
        Self {
            provider,
            http,
            callback_addr: server::default_callback_addr(),
            callback_timeout: server::DEFAULT_CALLBACK_TIMEOUT,
            launcher: system_browser(),
        }
    }

    pub fn with_callback_addr(mut self, addr: SocketAddr) -> Self {
        self.callback_addr = addr;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn with_launcher(mut self, launcher: BrowserLauncher) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Run a full interactive login.
    pub async fn login(
        &self,
        prompt: &dyn Prompt,
        no_browser: bool,
        connection: Option<&str>,
    ) -> AuthResult<SsoTokens> {
        let mut flow = if no_browser {
            let mut flow =
                AuthFlowState::new(self.provider.clone(), self.provider.callback_url.clone());
            self.await_pasted_code(&mut flow, prompt, connection)?;
            flow
        } else {
            self.await_browser_code(prompt, connection).await?
        };
        let tokens = flow.exchange(&self.http).await?;
        info!("single sign-on completed");
        Ok(tokens)
    }

    /// Mint a new ID token from a stored refresh token, skipping the browser.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<SsoTokens> {
        token::refresh(&self.http, &self.provider, refresh_token).await
    }

    async fn await_browser_code(
        &self,
        prompt: &dyn Prompt,
        connection: Option<&str>,
    ) -> AuthResult<AuthFlowState> {
        // The provider table's callback is for the paste path; the browser
        // always comes back to the loopback listener.
        let mut flow = AuthFlowState::new(self.provider.clone(), String::new());
        let server = server::CallbackServer::bind(self.callback_addr, flow.state.clone()).await?;
        flow.callback_url = server.redirect_uri()?;
        flow.stage = FlowStage::BrowserWait;

        let url = flow.authorize_url(connection)?;
        debug!(callback = %flow.callback_url, "waiting for authentication callback");
        prompt.say("Complete the login in the browser window that was opened.");
        if let Err(e) = (self.launcher)(&url) {
            warn!("unable to open browser: {e:#}");
            prompt.say(&format!("Open this URL in a browser to log in:\n  {url}"));
        }

        let code = server.wait(self.callback_timeout).await?;
        flow.accept_code(code);
        Ok(flow)
    }

    fn await_pasted_code(
        &self,
        flow: &mut AuthFlowState,
        prompt: &dyn Prompt,
        connection: Option<&str>,
    ) -> AuthResult<()> {
        flow.stage = FlowStage::ManualPaste;
        let url = flow.authorize_url(connection)?;
        prompt.say(&format!(
            "Navigate to the following link in your browser to authenticate:\n{url}\n\n\
             After authenticating in your browser, paste the code here:"
        ));
        let pasted = prompt.read_line("")?;
        flow.accept_pasted(&pasted)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
