// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud control-plane RPCs used by login: sessions, check-email, and me.

use serde::{Deserialize, Serialize};

use crate::api::{join, read_json, reject};
use crate::error::{AuthError, AuthResult};

/// Body of `POST /api/sessions`. Exactly one of `password` or `id_token`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_resource_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: String,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// SSO settings of the organization an email belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoInfo {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub auth0_connection_name: String,
}

#[derive(Debug, Deserialize)]
struct CheckEmailResponse {
    #[serde(default)]
    user: Option<CheckEmailUser>,
}

#[derive(Debug, Deserialize)]
struct CheckEmailUser {
    #[serde(default)]
    sso: Option<SsoInfo>,
}

/// `GET /api/me`: who the token belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Me {
    pub user: User,
    pub organization: Organization,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub name: String,
}

/// An environment within the organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Client for the cloud control plane.
#[derive(Debug, Clone)]
pub struct CloudClient {
    base_url: String,
    http: reqwest::Client,
}

impl CloudClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self { base_url: base_url.into(), http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange a password or an external ID token for a session token.
    pub async fn login(&self, req: &LoginRequest<'_>) -> AuthResult<String> {
        if req.password.is_some() == req.id_token.is_some() {
            return Err(AuthError::configuration(
                "login requires either a password or an ID token, not both",
            ));
        }
        let resp = self.http.post(join(&self.base_url, "/api/sessions")).json(req).send().await?;
        if !resp.status().is_success() {
            return Err(reject(resp, "login").await);
        }
        let body: LoginResponse = read_json(resp, "login").await?;
        if let Some(err) = body.error {
            tracing::debug!(message = %err.message, "login rejected");
            return Err(AuthError::auth_failure("login failed: credentials were rejected"));
        }
        if body.token.is_empty() {
            return Err(AuthError::malformed("login response did not include a token"));
        }
        Ok(body.token)
    }

    /// SSO settings for the organization owning `email`.
    pub async fn check_email(&self, email: &str) -> AuthResult<SsoInfo> {
        let resp = self
            .http
            .post(join(&self.base_url, "/api/check_email"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(reject(resp, "email lookup").await);
        }
        let body: CheckEmailResponse = read_json(resp, "email lookup").await?;
        Ok(body.user.and_then(|u| u.sso).unwrap_or_default())
    }

    /// User, organization, and environments for a session token.
    pub async fn me(&self, token: &str) -> AuthResult<Me> {
        let resp =
            self.http.get(join(&self.base_url, "/api/me")).bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            return Err(reject(resp, "user lookup").await);
        }
        read_json(resp, "user lookup").await
    }
}
