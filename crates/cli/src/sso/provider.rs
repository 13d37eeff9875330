// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity-provider settings keyed by the cloud environment a URL belongs to.

use reqwest::Url;

use crate::error::{AuthError, AuthResult};

/// Scopes requested for every SSO login. `offline_access` yields the refresh token.
pub const SCOPE: &str = "email openid offline_access";

/// Cloud environments with their own identity-provider tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Staging,
    Development,
    /// Short-lived per-developer deployments under `*.cpdev.cloud`.
    Cpd,
}

/// Identity-provider settings for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL of the identity provider (`/authorize` and `/oauth/token` hang off it).
    pub host: String,
    pub client_id: String,
    pub audience: String,
    /// Callback used when the user pastes the code back by hand.
    pub callback_url: String,
}

impl ProviderConfig {
    pub fn authorize_endpoint(&self) -> String {
        format!("{}/authorize", self.host.trim_end_matches('/'))
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.host.trim_end_matches('/'))
    }
}

/// Classify a cloud URL.
pub fn environment_for(url: &str) -> AuthResult<Environment> {
    let parsed =
        Url::parse(url).map_err(|e| AuthError::configuration(format!("invalid URL {url:?}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AuthError::configuration(format!("URL {url:?} has no host")))?;

    match host {
        "confluent.cloud" => Ok(Environment::Production),
        h if h.ends_with(".confluent.cloud") => Ok(Environment::Production),
        "stag.cpdev.cloud" => Ok(Environment::Staging),
        "devel.cpdev.cloud" => Ok(Environment::Development),
        h if h.ends_with(".cpdev.cloud") => Ok(Environment::Cpd),
        other => Err(AuthError::configuration(format!(
            "SSO is not available for {other}; log in with a password instead"
        ))),
    }
}

/// Provider settings for the environment `url` belongs to.
pub fn for_url(url: &str) -> AuthResult<ProviderConfig> {
    let env = environment_for(url)?;
    let origin = url.trim_end_matches('/');
    let config = match env {
        Environment::Production => ProviderConfig {
            host: "https://login.confluent.io".to_owned(),
            client_id: "hPbGZM8G55HSaUsaaieiiAprnJaEc9rH".to_owned(),
            audience: "https://confluent.cloud/api".to_owned(),
            callback_url: "https://confluent.cloud/cli_callback".to_owned(),
        },
        Environment::Staging => ProviderConfig {
            host: "https://login-stag.confluent-dev.io".to_owned(),
            client_id: "8RxQmZEYtEDah4MTIIzl4hGGeFwdJS6w".to_owned(),
            audience: "https://stag.cpdev.cloud/api".to_owned(),
            callback_url: "https://stag.cpdev.cloud/cli_callback".to_owned(),
        },
        Environment::Development | Environment::Cpd => ProviderConfig {
            host: "https://login.confluent-dev.io".to_owned(),
            client_id: "sPhOuMMVRSFFR7HfB606KLxf1RAU4SSg".to_owned(),
            audience: format!("{origin}/api"),
            callback_url: format!("{origin}/cli_callback"),
        },
    };
    Ok(config)
}
