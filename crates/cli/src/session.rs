// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session upkeep: record a fresh token in the context store and renew an
//! expired one from stored credentials without asking the user.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, info};

use crate::backend::context_id;
use crate::context::{ContextStore, Identity, ResolvedSession};
use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};
use crate::handler::{IssuedToken, TokenHandler};
use crate::netrc::{CredentialStore, MachineFilter};

/// Seconds since the Unix epoch.
pub fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

/// The unverified `exp` claim of a JWT.
pub fn token_expiry(token: &str) -> Option<u64> {
    let payload = token.split('.').nth(1)?;
    let raw = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&raw).ok()?;
    claims.exp.and_then(|exp| u64::try_from(exp).ok())
}

/// Whether `token` has expired at `now`. Tokens without a readable `exp`
/// count as expired.
pub fn token_expired(token: &str, now: u64) -> bool {
    token_expiry(token).is_none_or(|exp| now >= exp)
}

impl ResolvedSession {
    pub fn is_expired(&self, now: u64) -> bool {
        match self.expires_at {
            Some(at) => now >= at,
            None => token_expired(&self.bearer_token, now),
        }
    }
}

/// Result of [`SessionManager::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    StillValid,
    Refreshed,
}

/// Writes sessions for one backend and renews them.
#[derive(Debug, Clone)]
pub struct SessionManager {
    handler: TokenHandler,
    store: CredentialStore,
}

impl SessionManager {
    pub fn new(handler: TokenHandler, store: CredentialStore) -> Self {
        Self { handler, store }
    }

    pub fn handler(&self) -> &TokenHandler {
        &self.handler
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Record `issued` as the session of its context and make that context
    /// current. Returns the context name.
    pub async fn establish(
        &self,
        contexts: &mut ContextStore,
        issued: &IssuedToken,
        ca_cert_path: Option<PathBuf>,
    ) -> AuthResult<String> {
        establish_with(&self.handler, contexts, issued, ca_cert_path).await
    }

    /// Renew the current context's token if it has expired.
    ///
    /// SSO sessions use a refresh token from netrc, falling back to the one
    /// kept in the context; password sessions need a netrc entry. With
    /// nothing stored the result is `NotFound` and the user has to log in.
    pub async fn refresh(&self, contexts: &mut ContextStore, now: u64) -> AuthResult<RefreshOutcome> {
        let record = contexts
            .current()
            .ok_or_else(|| AuthError::not_found("no active context; run login first"))?;
        let session = record
            .session
            .as_ref()
            .ok_or_else(|| AuthError::not_found(format!("not logged in to {}", record.name)))?;
        if !session.is_expired(now) {
            debug!(context = %record.name, "token still valid");
            return Ok(RefreshOutcome::StillValid);
        }
        if record.backend != self.handler.backend() {
            return Err(AuthError::configuration(format!(
                "context {} is not a {} context",
                record.name,
                self.handler.backend()
            )));
        }

        let handler = self.handler.scoped_to(record.organization_id.as_deref());
        let backend = record.backend;
        let name = record.name.clone();
        let username = session.credentials.username.clone();
        let issued = if session.credentials.is_sso {
            let filter = MachineFilter::new(backend).sso(true).context(&name);
            let (refresh_token, from_netrc) = match self.store.find_matching(&filter) {
                Ok(machine) => (machine.password, true),
                Err(e) if e.is_not_found() => {
                    let held = session.refresh_token.clone().ok_or_else(|| {
                        AuthError::not_found(format!("no refresh token stored for {name}; run login"))
                    })?;
                    (held, false)
                }
                Err(e) => return Err(e),
            };
            let issued = handler
                .authenticate(&Credentials::sso(&username, Some(refresh_token.clone())))
                .await?;
            if let (true, Some(rotated)) = (from_netrc, issued.credentials.refresh_token.as_deref()) {
                if rotated != refresh_token {
                    self.store.write(backend, true, &name, &username, rotated)?;
                }
            }
            issued
        } else {
            let filter = MachineFilter::new(backend).sso(false).context(&name);
            let machine = self.store.find_matching(&filter)?;
            handler.authenticate(&Credentials::password(machine.user, machine.password)).await?
        };

        establish_with(&handler, contexts, &issued, None).await?;
        info!(context = %name, "token refreshed");
        Ok(RefreshOutcome::Refreshed)
    }
}

/// Record `issued` as the session of its context, logged in through `handler`.
async fn establish_with(
    handler: &TokenHandler,
    contexts: &mut ContextStore,
    issued: &IssuedToken,
    ca_cert_path: Option<PathBuf>,
) -> AuthResult<String> {
    let url = handler.url().to_owned();
    let name = context_id(&issued.credentials.username, &url);

    let identity = match handler {
        TokenHandler::Cloud(cloud) => Identity::from(cloud.client().me(&issued.token).await?),
        TokenHandler::OnPrem(_) => Identity::user(&issued.credentials.username),
    };

    let previous = contexts
        .get(&name)
        .and_then(|r| r.session.as_ref())
        .and_then(|s| s.active_environment.clone());
    let active_environment = previous
        .filter(|env| identity.accounts.iter().any(|a| &a.id == env))
        .or_else(|| identity.accounts.first().map(|a| a.id.clone()));

    let expires_at = match issued.expires_in {
        Some(secs) => Some(now_unix().saturating_add(secs)),
        None => token_expiry(&issued.token),
    };

    let session = ResolvedSession {
        bearer_token: issued.token.clone(),
        credentials: issued.credentials.clone(),
        refresh_token: issued.credentials.refresh_token.clone(),
        identity,
        active_environment,
        expires_at,
    };
    contexts.activate(&name, handler.backend(), &url, ca_cert_path, session);
    contexts.select_organization(&name, handler.organization_id().map(str::to_owned));
    info!(context = %name, "session updated");
    Ok(name)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
