// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token endpoint calls: authorization-code and refresh-token grants.

use serde::Deserialize;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::sso::provider::ProviderConfig;

/// Raw token endpoint response. Only `id_token` is required.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Tokens minted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoTokens {
    pub id_token: String,
    pub refresh_token: Option<String>,
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
) -> AuthResult<SsoTokens> {
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", provider.client_id.as_str()),
        ("code_verifier", code_verifier),
        ("code", code),
        ("redirect_uri", redirect_uri),
    ];
    post_token(client, provider, &form).await
}

/// Mint a new ID token from a refresh token.
///
/// Providers that do not rotate refresh tokens omit one from the response;
/// the caller's token is carried over in that case.
pub async fn refresh(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    refresh_token: &str,
) -> AuthResult<SsoTokens> {
    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", provider.client_id.as_str()),
        ("refresh_token", refresh_token),
        ("redirect_uri", provider.callback_url.as_str()),
    ];
    let mut tokens = post_token(client, provider, &form).await?;
    if tokens.refresh_token.is_none() {
        tokens.refresh_token = Some(refresh_token.to_owned());
    }
    Ok(tokens)
}

async fn post_token(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    form: &[(&str, &str)],
) -> AuthResult<SsoTokens> {
    let resp = client.post(provider.token_endpoint()).form(form).send().await?;

    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        debug!(%status, body = %body, "token endpoint rejected request");
        return Err(AuthError::auth_failure(format!(
            "the identity provider rejected the token request ({status})"
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        debug!(%status, error = %e, "unparseable token response");
        AuthError::malformed(format!("malformed token response from identity provider: {e}"))
    })?;
    let id_token = token
        .id_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::malformed("identity provider response is missing id_token"))?;
    Ok(SsoTokens { id_token, refresh_token: token.refresh_token })
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
