// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credentials supplied through environment variables.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::BackendKind;
use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};

/// Username and password variable names that travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvPair {
    pub username: &'static str,
    pub password: &'static str,
    pub deprecated: bool,
}

const CLOUD_PAIRS: &[EnvPair] = &[
    EnvPair {
        username: "CONFLUENT_CLOUD_EMAIL",
        password: "CONFLUENT_CLOUD_PASSWORD",
        deprecated: false,
    },
    EnvPair { username: "CCLOUD_EMAIL", password: "CCLOUD_PASSWORD", deprecated: true },
];

const ONPREM_PAIRS: &[EnvPair] = &[
    EnvPair {
        username: "CONFLUENT_PLATFORM_USERNAME",
        password: "CONFLUENT_PLATFORM_PASSWORD",
        deprecated: false,
    },
    EnvPair { username: "CONFLUENT_USERNAME", password: "CONFLUENT_PASSWORD", deprecated: true },
];

/// Variable pairs for `backend`, current names first.
pub fn pairs(backend: BackendKind) -> &'static [EnvPair] {
    match backend {
        BackendKind::Cloud => CLOUD_PAIRS,
        BackendKind::OnPrem => ONPREM_PAIRS,
    }
}

/// Reads one environment variable.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup against the process environment.
pub fn process_env() -> EnvLookup {
    Arc::new(|name: &str| std::env::var(name).ok())
}

/// Password credentials from the first complete pair for `backend`.
///
/// A half-set pair is skipped rather than reported, and halves are never
/// combined across pairs. Nothing usable is `NotFound`.
pub fn credentials(backend: BackendKind, lookup: &EnvLookup) -> AuthResult<Credentials> {
    for pair in pairs(backend) {
        let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
        match (read(pair.username), read(pair.password)) {
            (Some(username), Some(password)) => {
                if pair.deprecated {
                    let current = pairs(backend).iter().find(|p| !p.deprecated);
                    if let Some(current) = current {
                        warn!(
                            "{} and {} are deprecated; use {} and {} instead",
                            pair.username, pair.password, current.username, current.password
                        );
                    }
                }
                debug!(var = pair.username, "using credentials from environment");
                return Ok(Credentials::password(username, password));
            }
            (Some(_), None) | (None, Some(_)) => {
                debug!(username = pair.username, password = pair.password, "incomplete pair");
            }
            (None, None) => {}
        }
    }
    Err(AuthError::not_found(format!("no {backend} credentials in the environment")))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
