// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin clients for the two backends a login can target.

pub mod cloud;
pub mod mds;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// Turn a non-success response into an error without echoing the body.
async fn reject(resp: reqwest::Response, what: &str) -> AuthError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    debug!(%status, body = %body, "{what} failed");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AuthError::auth_failure(format!("{what} failed: credentials were rejected"))
        }
        _ => AuthError::auth_failure(format!("{what} failed ({status})")),
    }
}

/// Read a JSON body, mapping decode failures to malformed-input errors.
async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    what: &str,
) -> AuthResult<T> {
    let status = resp.status();
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        debug!(%status, error = %e, "unparseable {what} response");
        AuthError::malformed(format!("unexpected {what} response: {e}"))
    })
}

fn join(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
