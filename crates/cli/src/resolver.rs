// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential resolution: environment, then netrc, then the user.
//!
//! Each source either produces a token, reports `NotFound` (try the next
//! source), or fails hard. A hard failure ends resolution; weaker sources are
//! never consulted after a stronger one has errored.

use tracing::{debug, info};

use crate::backend::BackendKind;
use crate::credentials::Credentials;
use crate::env::{self, EnvLookup};
use crate::error::{AuthError, AuthResult};
use crate::handler::{IssuedToken, TokenHandler};
use crate::netrc::{CredentialStore, MachineFilter};
use crate::prompt::Prompt;

/// Where a resolved token's credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Env,
    Netrc,
    Prompt,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Env => "environment",
            Self::Netrc => "netrc",
            Self::Prompt => "prompt",
        }
    }
}

/// A token plus the source that produced it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub issued: IssuedToken,
    pub source: CredentialSource,
}

/// Which sources a resolution may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Skip environment and netrc, go straight to the user.
    pub prompt_only: bool,
    /// Whether the user can be asked at all.
    pub interactive: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self { prompt_only: false, interactive: true }
    }
}

/// Runs the precedence chain for one login.
pub struct CredentialResolver<'a> {
    handler: &'a TokenHandler,
    store: &'a CredentialStore,
    prompt: &'a dyn Prompt,
    env: EnvLookup,
    options: ResolverOptions,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(handler: &'a TokenHandler, store: &'a CredentialStore, prompt: &'a dyn Prompt) -> Self {
        Self { handler, store, prompt, env: env::process_env(), options: ResolverOptions::default() }
    }

    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Obtain a token from the first source that has credentials.
    pub async fn resolve(&self) -> AuthResult<Resolved> {
        let mut sources = Vec::with_capacity(3);
        if !self.options.prompt_only {
            sources.extend([CredentialSource::Env, CredentialSource::Netrc]);
        }
        if self.options.interactive {
            sources.push(CredentialSource::Prompt);
        }

        for source in sources {
            let attempt = match source {
                CredentialSource::Env => self.from_env().await,
                CredentialSource::Netrc => self.from_netrc().await,
                CredentialSource::Prompt => self.from_prompt().await,
            };
            match attempt {
                Ok(issued) => {
                    info!(source = source.as_str(), user = %issued.credentials.username, "resolved credentials");
                    return Ok(Resolved { issued, source });
                }
                Err(e) if e.is_not_found() => {
                    debug!(source = source.as_str(), "{e}");
                }
                Err(e) => return Err(e),
            }
        }
        Err(AuthError::not_found(format!(
            "no credentials found for {}; run login interactively or set credentials in the environment",
            self.handler.url()
        )))
    }

    async fn from_env(&self) -> AuthResult<IssuedToken> {
        let credentials = env::credentials(self.handler.backend(), &self.env)?;
        self.handler.authenticate(&credentials).await
    }

    async fn from_netrc(&self) -> AuthResult<IssuedToken> {
        let backend = self.handler.backend();
        let filter = MachineFilter::new(backend).url(self.handler.url());
        let machine = self.store.find_matching(&filter)?;
        debug!(machine = %machine.name, "found netrc credentials");

        let credentials = if machine.is_sso {
            Credentials::sso(&machine.user, Some(machine.password.clone()))
        } else {
            Credentials::password(&machine.user, &machine.password)
        };
        let issued = self.handler.authenticate(&credentials).await?;

        // A rotated refresh token replaces the one just spent.
        if let (true, Some(context_id), Some(rotated)) =
            (machine.is_sso, machine.context_id(), issued.credentials.refresh_token.as_deref())
        {
            if rotated != machine.password {
                self.store.write(backend, true, context_id, &machine.user, rotated)?;
            }
        }
        Ok(issued)
    }

    async fn from_prompt(&self) -> AuthResult<IssuedToken> {
        let backend = self.handler.backend();
        let label = match backend {
            BackendKind::Cloud => "Email: ",
            BackendKind::OnPrem => "Username: ",
        };
        let username = self.prompt.read_line(label)?.trim().to_owned();
        if username.is_empty() {
            return Err(AuthError::malformed("username must not be empty"));
        }

        if let TokenHandler::Cloud(cloud) = self.handler {
            if let Some(connection) = cloud.get_sso_identity(&username).await {
                return cloud.get_sso_token(self.prompt, &username, Some(&connection)).await;
            }
        }

        let password = self.prompt.read_secret("Password: ")?;
        self.handler.authenticate(&Credentials::password(username, password)).await
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
