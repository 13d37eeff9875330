// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client construction shared by the identity-provider and backend calls.

use std::path::Path;
use std::time::Duration;

use crate::error::{AuthError, AuthResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Install the process-wide rustls crypto provider. Safe to call repeatedly.
pub fn ensure_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Build a client, optionally trusting an extra PEM CA certificate on top of
/// the system roots.
///
/// A CA path that cannot be read or parsed is a configuration error.
pub fn build_client(ca_cert_path: Option<&Path>) -> AuthResult<reqwest::Client> {
    ensure_crypto_provider();

    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("cflogin/", env!("CARGO_PKG_VERSION")));

    if let Some(path) = ca_cert_path {
        let pem = std::fs::read(path).map_err(|e| {
            AuthError::configuration(format!(
                "unable to read CA certificate {}: {e}",
                path.display()
            ))
        })?;
        let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
            AuthError::configuration(format!(
                "unable to parse CA certificate {}: {e}",
                path.display()
            ))
        })?;
        if certs.is_empty() {
            return Err(AuthError::configuration(format!(
                "no certificates found in {}",
                path.display()
            )));
        }
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    builder
        .build()
        .map_err(|e| AuthError::configuration(format!("unable to build HTTP client: {e}")))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
