// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login contexts persisted in the CLI configuration file.
//!
//! The file is a JSON document `{current_context, contexts}`. Passwords are
//! never written here; an SSO session keeps its refresh token so it can be
//! renewed when netrc has none.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::cloud::{Account, Me};
use crate::backend::BackendKind;
use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult, ErrorKind};
use crate::netrc::{expand_home, write_private};

/// Who a session belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<Account>,
}

impl Identity {
    /// On-prem identity: just the username.
    pub fn user(username: impl Into<String>) -> Self {
        Self { user: username.into(), ..Self::default() }
    }
}

impl From<Me> for Identity {
    fn from(me: Me) -> Self {
        let org = me.organization;
        Self {
            user: me.user.email,
            organization_id: Some(org.resource_id).filter(|s| !s.is_empty()),
            organization_name: Some(org.name).filter(|s| !s.is_empty()),
            accounts: me.accounts,
        }
    }
}

/// The active login of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSession {
    pub bearer_token: String,
    pub credentials: Credentials,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub identity: Identity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_environment: Option<String>,
    /// Unix seconds, when the backend reported a lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

/// One named context: a backend URL plus the session logged into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub name: String,
    pub backend: BackendKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert_path: Option<PathBuf>,
    /// Organization requested at login, reused when the session is renewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<ResolvedSession>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ContextDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_context: Option<String>,
    #[serde(default)]
    contexts: BTreeMap<String, ContextRecord>,
}

/// The configuration file, loaded into memory.
#[derive(Debug, Clone)]
pub struct ContextStore {
    path: PathBuf,
    doc: ContextDocument,
}

impl ContextStore {
    /// Load from `path`. A missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = expand_home(path.as_ref())?;
        let doc = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => ContextDocument::default(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                AuthError::configuration(format!("invalid config file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ContextDocument::default(),
            Err(e) => {
                return Err(AuthError::file_access(format!(
                    "unable to read config file {}: {e}",
                    path.display()
                )))
            }
        };
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> AuthResult<()> {
        let json = serde_json::to_vec_pretty(&self.doc).map_err(|e| {
            AuthError::new(ErrorKind::Serialize, format!("unable to encode config: {e}"))
        })?;
        write_private(&self.path, &json)?;
        debug!(path = %self.path.display(), "saved config");
        Ok(())
    }

    pub fn current_name(&self) -> Option<&str> {
        self.doc.current_context.as_deref()
    }

    pub fn current(&self) -> Option<&ContextRecord> {
        self.doc.current_context.as_ref().and_then(|name| self.doc.contexts.get(name))
    }

    pub fn current_mut(&mut self) -> Option<&mut ContextRecord> {
        let name = self.doc.current_context.as_ref()?;
        self.doc.contexts.get_mut(name)
    }

    pub fn get(&self, name: &str) -> Option<&ContextRecord> {
        self.doc.contexts.get(name)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &ContextRecord> {
        self.doc.contexts.values()
    }

    /// Create or update the context `name`, store `session` in it and make it
    /// current.
    pub fn activate(
        &mut self,
        name: &str,
        backend: BackendKind,
        url: &str,
        ca_cert_path: Option<PathBuf>,
        session: ResolvedSession,
    ) -> &ContextRecord {
        let record = self.doc.contexts.entry(name.to_owned()).or_insert_with(|| ContextRecord {
            name: name.to_owned(),
            backend,
            url: url.to_owned(),
            ca_cert_path: None,
            organization_id: None,
            session: None,
        });
        record.backend = backend;
        record.url = url.to_owned();
        if ca_cert_path.is_some() {
            record.ca_cert_path = ca_cert_path;
        }
        record.session = Some(session);
        self.doc.current_context = Some(name.to_owned());
        record
    }

    /// Record the organization `name` logs into. `None` means the user's default.
    pub fn select_organization(&mut self, name: &str, organization_id: Option<String>) {
        if let Some(record) = self.doc.contexts.get_mut(name) {
            record.organization_id = organization_id;
        }
    }

    /// Clear the current context's session and unset it. Returns its name.
    pub fn logout(&mut self) -> Option<String> {
        let name = self.doc.current_context.take()?;
        if let Some(record) = self.doc.contexts.get_mut(&name) {
            record.session = None;
        }
        Some(name)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
