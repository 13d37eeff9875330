// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw credentials from one resolution attempt.
///
/// A password credential carries `password`; an SSO credential carries
/// `refresh_token` (once known). Never both.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default, skip_serializing)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub is_sso: bool,
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
            refresh_token: None,
            is_sso: false,
        }
    }

    pub fn sso(username: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self { username: username.into(), password: None, refresh_token, is_sso: true }
    }

    /// The secret persisted for these credentials.
    pub fn secret(&self) -> Option<&str> {
        if self.is_sso {
            self.refresh_token.as_deref()
        } else {
            self.password.as_deref()
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("is_sso", &self.is_sso)
            .finish()
    }
}
