// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token handlers: turn credentials into a backend bearer token.

use std::path::Path;

use tracing::debug;

use crate::api::cloud::{CloudClient, LoginRequest};
use crate::api::mds::MdsClient;
use crate::backend::BackendKind;
use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};
use crate::http::build_client;
use crate::prompt::Prompt;
use crate::sso::SsoFlow;

/// A bearer token together with the credentials that produced it.
///
/// For SSO the credentials carry the refresh token the provider returned,
/// which may be a rotated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub credentials: Credentials,
    /// Lifetime in seconds, when the backend reports one.
    pub expires_in: Option<u64>,
}

/// Cloud control plane: password and SSO logins.
#[derive(Debug, Clone)]
pub struct CloudTokenHandler {
    client: CloudClient,
    sso: SsoFlow,
    organization_id: Option<String>,
    no_browser: bool,
}

impl CloudTokenHandler {
    pub fn new(client: CloudClient, sso: SsoFlow) -> Self {
        Self { client, sso, organization_id: None, no_browser: false }
    }

    pub fn with_organization(mut self, organization_id: Option<String>) -> Self {
        self.organization_id = organization_id.filter(|o| !o.is_empty());
        self
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    pub fn with_no_browser(mut self, no_browser: bool) -> Self {
        self.no_browser = no_browser;
        self
    }

    pub fn client(&self) -> &CloudClient {
        &self.client
    }

    /// Password login.
    pub async fn get_token(&self, email: &str, password: &str) -> AuthResult<String> {
        self.client
            .login(&LoginRequest {
                email,
                password: Some(password),
                id_token: None,
                org_resource_id: self.organization_id.as_deref(),
            })
            .await
    }

    /// SSO connection name when `email` belongs to an SSO organization.
    ///
    /// Lookup failures read as "not SSO" and are only logged at debug level.
    pub async fn get_sso_identity(&self, email: &str) -> Option<String> {
        match self.client.check_email(email).await {
            Ok(info) if info.enabled => Some(info.auth0_connection_name),
            Ok(_) => None,
            Err(e) => {
                debug!(err = %e, "SSO lookup failed; continuing with password login");
                None
            }
        }
    }

    /// Interactive SSO login followed by a backend login with the ID token.
    pub async fn get_sso_token(
        &self,
        prompt: &dyn Prompt,
        email: &str,
        connection: Option<&str>,
    ) -> AuthResult<IssuedToken> {
        let tokens = self.sso.login(prompt, self.no_browser, connection).await?;
        let token = self.login_with_id_token(email, &tokens.id_token).await?;
        Ok(IssuedToken {
            token,
            credentials: Credentials::sso(email, tokens.refresh_token),
            expires_in: None,
        })
    }

    /// Non-interactive SSO login from a stored refresh token.
    pub async fn refresh_sso_token(
        &self,
        email: &str,
        refresh_token: &str,
    ) -> AuthResult<IssuedToken> {
        let tokens = self.sso.refresh(refresh_token).await?;
        let token = self.login_with_id_token(email, &tokens.id_token).await?;
        Ok(IssuedToken {
            token,
            credentials: Credentials::sso(email, tokens.refresh_token),
            expires_in: None,
        })
    }

    async fn login_with_id_token(&self, email: &str, id_token: &str) -> AuthResult<String> {
        self.client
            .login(&LoginRequest {
                email,
                password: None,
                id_token: Some(id_token),
                org_resource_id: self.organization_id.as_deref(),
            })
            .await
    }

    /// Exchange stored credentials without user interaction.
    pub async fn authenticate(&self, credentials: &Credentials) -> AuthResult<IssuedToken> {
        if credentials.is_sso {
            let refresh_token = credentials.refresh_token.as_deref().ok_or_else(|| {
                AuthError::not_found(format!("no refresh token stored for {}", credentials.username))
            })?;
            return self.refresh_sso_token(&credentials.username, refresh_token).await;
        }
        let password = credentials.password.as_deref().unwrap_or_default();
        let token = self.get_token(&credentials.username, password).await?;
        Ok(IssuedToken { token, credentials: credentials.clone(), expires_in: None })
    }
}

/// On-premises metadata service: password logins only.
#[derive(Debug, Clone)]
pub struct OnPremTokenHandler {
    client: MdsClient,
}

impl OnPremTokenHandler {
    pub fn new(client: MdsClient) -> Self {
        Self { client }
    }

    /// Handler for `url`, trusting `ca_cert_path` in addition to system roots.
    pub fn for_url(url: &str, ca_cert_path: Option<&Path>) -> AuthResult<Self> {
        let http = build_client(ca_cert_path)?;
        Ok(Self::new(MdsClient::new(url, http)))
    }

    pub fn client(&self) -> &MdsClient {
        &self.client
    }

    pub async fn get_token(&self, username: &str, password: &str) -> AuthResult<IssuedToken> {
        let token = self.client.authenticate(username, password).await?;
        Ok(IssuedToken {
            token: token.auth_token,
            credentials: Credentials::password(username, password),
            expires_in: Some(token.expires_in).filter(|s| *s > 0),
        })
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> AuthResult<IssuedToken> {
        if credentials.is_sso {
            return Err(AuthError::configuration("single sign-on is not supported for MDS logins"));
        }
        let password = credentials.password.as_deref().unwrap_or_default();
        self.get_token(&credentials.username, password).await
    }
}

/// Token strategy per backend kind.
#[derive(Debug, Clone)]
pub enum TokenHandler {
    Cloud(CloudTokenHandler),
    OnPrem(OnPremTokenHandler),
}

impl TokenHandler {
    pub fn backend(&self) -> BackendKind {
        match self {
            Self::Cloud(_) => BackendKind::Cloud,
            Self::OnPrem(_) => BackendKind::OnPrem,
        }
    }

    /// Base URL of the backend, used to scope context ids and netrc lookups.
    pub fn url(&self) -> &str {
        match self {
            Self::Cloud(h) => h.client().base_url(),
            Self::OnPrem(h) => h.client().base_url(),
        }
    }

    /// Organization logins are scoped to. Always `None` on-prem.
    pub fn organization_id(&self) -> Option<&str> {
        match self {
            Self::Cloud(h) => h.organization_id(),
            Self::OnPrem(_) => None,
        }
    }

    /// This handler with logins scoped to `organization_id`.
    pub fn scoped_to(&self, organization_id: Option<&str>) -> Self {
        match (self, organization_id) {
            (Self::Cloud(h), Some(org)) => {
                Self::Cloud(h.clone().with_organization(Some(org.to_owned())))
            }
            _ => self.clone(),
        }
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> AuthResult<IssuedToken> {
        match self {
            Self::Cloud(h) => h.authenticate(credentials).await,
            Self::OnPrem(h) => h.authenticate(credentials).await,
        }
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
