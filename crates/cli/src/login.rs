// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `login`, `logout`, `status` and `refresh` commands.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::api::cloud::CloudClient;
use crate::backend::BackendKind;
use crate::context::ContextStore;
use crate::env::EnvLookup;
use crate::error::{AuthError, AuthResult};
use crate::handler::{CloudTokenHandler, OnPremTokenHandler, TokenHandler};
use crate::http::build_client;
use crate::netrc::CredentialStore;
use crate::prompt::Prompt;
use crate::resolver::{CredentialResolver, CredentialSource, ResolverOptions};
use crate::session::{now_unix, RefreshOutcome, SessionManager};
use crate::sso::{provider, SsoFlow};

/// Connection settings for building a [`TokenHandler`].
#[derive(Debug, Clone, Default)]
pub struct HandlerSettings {
    pub ca_cert_path: Option<PathBuf>,
    pub organization_id: Option<String>,
    pub no_browser: bool,
}

/// Token handler for `backend` at `url`.
pub fn build_handler(
    backend: BackendKind,
    url: &str,
    settings: &HandlerSettings,
) -> AuthResult<TokenHandler> {
    match backend {
        BackendKind::Cloud => {
            let http = build_client(None)?;
            let sso = SsoFlow::new(provider::for_url(url)?, http.clone());
            let handler = CloudTokenHandler::new(CloudClient::new(url, http), sso)
                .with_organization(settings.organization_id.clone())
                .with_no_browser(settings.no_browser);
            Ok(TokenHandler::Cloud(handler))
        }
        BackendKind::OnPrem => Ok(TokenHandler::OnPrem(OnPremTokenHandler::for_url(
            url,
            settings.ca_cert_path.as_deref(),
        )?)),
    }
}

/// Options for [`login`].
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    pub resolver: ResolverOptions,
    pub save: bool,
    pub ca_cert_path: Option<PathBuf>,
}

/// What a successful login did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub context: String,
    pub username: String,
    pub source: CredentialSource,
    pub organization: Option<String>,
    pub saved: bool,
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Logged in as \"{}\"", self.username)?;
        if let Some(org) = &self.organization {
            write!(f, " for organization \"{org}\"")?;
        }
        write!(f, ".")?;
        if self.saved {
            write!(f, "\nCredentials saved to netrc.")?;
        }
        Ok(())
    }
}

/// Resolve credentials, record the session, and optionally save the
/// credentials to netrc.
pub async fn login(
    manager: &SessionManager,
    contexts: &mut ContextStore,
    prompt: &dyn Prompt,
    env: EnvLookup,
    options: &LoginOptions,
) -> AuthResult<LoginOutcome> {
    let store = manager.store();
    let resolved = CredentialResolver::new(manager.handler(), store, prompt)
        .with_env(env)
        .with_options(options.resolver)
        .resolve()
        .await?;
    let issued = &resolved.issued;
    let context = manager.establish(contexts, issued, options.ca_cert_path.clone()).await?;

    let mut saved = false;
    if options.save {
        match issued.credentials.secret() {
            Some(secret) => {
                store.write(
                    manager.handler().backend(),
                    issued.credentials.is_sso,
                    &context,
                    &issued.credentials.username,
                    secret,
                )?;
                saved = true;
                info!(context = %context, "saved credentials to netrc");
            }
            None => warn!("the identity provider returned no refresh token; nothing saved"),
        }
    }
    contexts.save()?;

    let organization = contexts
        .get(&context)
        .and_then(|r| r.session.as_ref())
        .and_then(|s| s.identity.organization_name.clone());
    Ok(LoginOutcome {
        context,
        username: issued.credentials.username.clone(),
        source: resolved.source,
        organization,
        saved,
    })
}

/// Clear the current session. Returns the context that was logged out.
pub fn logout(contexts: &mut ContextStore) -> AuthResult<Option<String>> {
    let name = contexts.logout();
    if name.is_some() {
        contexts.save()?;
    }
    Ok(name)
}

/// Summary of the current context for `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub context: String,
    pub backend: BackendKind,
    pub url: String,
    pub user: Option<String>,
    pub organization: Option<String>,
    pub environment: Option<String>,
    pub expired: Option<bool>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Context:      {}", self.context)?;
        writeln!(f, "Backend:      {}", self.backend)?;
        writeln!(f, "URL:          {}", self.url)?;
        let Some(user) = &self.user else {
            return write!(f, "Not logged in.");
        };
        writeln!(f, "User:         {user}")?;
        if let Some(org) = &self.organization {
            writeln!(f, "Organization: {org}")?;
        }
        if let Some(env) = &self.environment {
            writeln!(f, "Environment:  {env}")?;
        }
        let state = if self.expired == Some(true) { "expired" } else { "valid" };
        write!(f, "Token:        {state}")
    }
}

/// Describe the current context, if any.
pub fn status(contexts: &ContextStore, now: u64) -> Option<StatusReport> {
    let record = contexts.current()?;
    let session = record.session.as_ref();
    Some(StatusReport {
        context: record.name.clone(),
        backend: record.backend,
        url: record.url.clone(),
        user: session.map(|s| s.identity.user.clone()),
        organization: session.and_then(|s| {
            s.identity.organization_name.clone().or_else(|| s.identity.organization_id.clone())
        }),
        environment: session.and_then(|s| s.active_environment.clone()),
        expired: session.map(|s| s.is_expired(now)),
    })
}

/// Renew the current context's token if it expired, saving the result.
pub async fn refresh(
    contexts: &mut ContextStore,
    netrc_path: &Path,
) -> AuthResult<RefreshOutcome> {
    let record = contexts
        .current()
        .ok_or_else(|| AuthError::not_found("no active context; run login first"))?;
    let settings = HandlerSettings {
        ca_cert_path: record.ca_cert_path.clone(),
        organization_id: record.organization_id.clone(),
        ..HandlerSettings::default()
    };
    let handler = build_handler(record.backend, &record.url, &settings)?;
    let manager = SessionManager::new(handler, CredentialStore::new(netrc_path));

    let outcome = manager.refresh(contexts, now_unix()).await?;
    if outcome == RefreshOutcome::Refreshed {
        contexts.save()?;
    }
    Ok(outcome)
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
