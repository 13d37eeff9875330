// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metadata service (MDS) token endpoint.

use serde::Deserialize;

use crate::api::{join, read_json, reject};
use crate::error::{AuthError, AuthResult};

const AUTHENTICATE_PATH: &str = "/security/1.0/authenticate";

/// MDS bearer token and its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MdsToken {
    pub auth_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Seconds until expiry.
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct MdsClient {
    base_url: String,
    http: reqwest::Client,
}

impl MdsClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self { base_url: base_url.into(), http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticate with HTTP Basic credentials.
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<MdsToken> {
        let resp = self
            .http
            .get(join(&self.base_url, AUTHENTICATE_PATH))
            .basic_auth(username, Some(password))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(reject(resp, "MDS authentication").await);
        }
        let token: MdsToken = read_json(resp, "MDS authentication").await?;
        if token.auth_token.is_empty() {
            return Err(AuthError::malformed("MDS response did not include a token"));
        }
        Ok(token)
    }
}
