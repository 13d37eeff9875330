// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend kinds and the credential kinds each one accepts.

use serde::{Deserialize, Serialize};

/// Prefix shared by every machine name this tool writes to netrc.
pub const MACHINE_PREFIX: &str = "confluent-cli";

/// Which remote system a login targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// The cloud control plane.
    Cloud,
    /// An on-premises metadata service (MDS).
    OnPrem,
}

/// How a stored secret is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKind {
    MdsPassword,
    CloudPassword,
    CloudSsoRefreshToken,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MdsPassword => "mds-username-password",
            Self::CloudPassword => "ccloud-username-password",
            Self::CloudSsoRefreshToken => "ccloud-sso-refresh-token",
        }
    }

    pub fn is_sso(&self) -> bool {
        matches!(self, Self::CloudSsoRefreshToken)
    }

    pub fn backend(&self) -> BackendKind {
        match self {
            Self::MdsPassword => BackendKind::OnPrem,
            Self::CloudPassword | Self::CloudSsoRefreshToken => BackendKind::Cloud,
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "mds-username-password" => Some(Self::MdsPassword),
            "ccloud-username-password" => Some(Self::CloudPassword),
            "ccloud-sso-refresh-token" => Some(Self::CloudSsoRefreshToken),
            _ => None,
        }
    }
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloud => "ccloud",
            Self::OnPrem => "confluent",
        }
    }

    /// Credential kinds this backend accepts, in lookup order.
    pub fn credential_kinds(&self) -> &'static [CredentialKind] {
        match self {
            Self::OnPrem => &[CredentialKind::MdsPassword],
            Self::Cloud => &[CredentialKind::CloudPassword, CredentialKind::CloudSsoRefreshToken],
        }
    }

    /// Pick the credential kind for a stored secret.
    ///
    /// On-prem has no SSO, so `is_sso` is ignored there.
    pub fn credential_kind(&self, is_sso: bool) -> CredentialKind {
        match self {
            Self::OnPrem => CredentialKind::MdsPassword,
            Self::Cloud if is_sso => CredentialKind::CloudSsoRefreshToken,
            Self::Cloud => CredentialKind::CloudPassword,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ccloud" | "cloud" => Ok(Self::Cloud),
            "confluent" | "onprem" | "on-prem" | "mds" => Ok(Self::OnPrem),
            other => anyhow::bail!("invalid backend kind: {other}"),
        }
    }
}

/// Context identifier for a login: `login-<username>-<url>`.
pub fn context_id(username: &str, url: &str) -> String {
    format!("login-{username}-{url}")
}

/// Netrc machine name for a credential: `confluent-cli:<kind>:<context-id>`.
pub fn machine_name(backend: BackendKind, is_sso: bool, context_id: &str) -> String {
    let kind = backend.credential_kind(is_sso);
    format!("{MACHINE_PREFIX}:{}:{context_id}", kind.as_str())
}

/// Split a machine name into its credential kind and context id.
///
/// Returns `None` for names this tool did not write.
pub fn parse_machine_name(name: &str) -> Option<(CredentialKind, &str)> {
    let rest = name.strip_prefix(MACHINE_PREFIX)?.strip_prefix(':')?;
    let (kind, ctx) = rest.split_once(':')?;
    Some((CredentialKind::from_str_opt(kind)?, ctx))
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
