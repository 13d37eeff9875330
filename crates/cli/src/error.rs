// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error categories surfaced by the login pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or malformed local configuration (paths, CA certificates, flags).
    Configuration,
    /// Credentials rejected by a backend or identity provider.
    AuthFailure,
    /// The SSO callback did not arrive in time.
    Timeout,
    /// Pasted input or a provider response did not have the expected shape.
    MalformedInput,
    /// The `state` echoed back by the identity provider did not match ours.
    StateMismatch,
    /// A credential source had nothing to offer. Not fatal on its own.
    NotFound,
    /// The credential file could not be resolved, read, or written.
    FileAccess,
    /// The credential file or context store could not be encoded.
    Serialize,
    /// The request never produced an HTTP response (DNS, TLS, refused).
    Network,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "CONFIGURATION",
            Self::AuthFailure => "AUTH_FAILURE",
            Self::Timeout => "TIMEOUT",
            Self::MalformedInput => "MALFORMED_INPUT",
            Self::StateMismatch => "STATE_MISMATCH",
            Self::NotFound => "NOT_FOUND",
            Self::FileAccess => "FILE_ACCESS",
            Self::Serialize => "SERIALIZE",
            Self::Network => "NETWORK",
        }
    }

    /// Process exit status for a command that failed with this kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::AuthFailure | Self::StateMismatch => 3,
            Self::Timeout => 4,
            Self::MalformedInput => 5,
            Self::NotFound => 6,
            Self::FileAccess | Self::Serialize => 7,
            Self::Network => 8,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error with a category and a plain-language message safe to show users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthFailure, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn file_access(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileAccess, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AuthError {}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::malformed(format!("unexpected response from server: {e}"))
        } else {
            Self::network(format!("request failed: {e}"))
        }
    }
}

/// Shorthand used across the login pipeline.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
