// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth authorization code + PKCE (RFC 7636) helpers.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Method advertised alongside the challenge.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// 32 random bytes, base64url without padding (43 chars).
fn random_urlsafe() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a PKCE code verifier (43-128 char URL-safe random string).
pub fn generate_code_verifier() -> String {
    random_urlsafe()
}

/// Compute code_challenge = base64url_nopad(sha256(verifier)).
pub fn compute_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state nonce for CSRF protection.
pub fn generate_state() -> String {
    random_urlsafe()
}

/// Verifier, challenge, and state for one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceArtifacts {
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

impl PkceArtifacts {
    pub fn generate() -> Self {
        let state = generate_state();
        let code_verifier = generate_code_verifier();
        let code_challenge = compute_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state }
    }
}

/// Constant-time string comparison for nonces echoed back by the provider.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

#[cfg(test)]
#[path = "pkce_tests.rs"]
mod tests;
