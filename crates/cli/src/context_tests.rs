// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn session(user: &str) -> ResolvedSession {
    ResolvedSession {
        bearer_token: "bearer".to_owned(),
        credentials: Credentials::password(user, "secret-pw"),
        refresh_token: None,
        identity: Identity::user(user),
        active_environment: None,
        expires_at: Some(1_900_000_000),
    }
}

#[test]
fn missing_file_is_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::load(dir.path().join("config.json"))?;
    assert!(store.current().is_none());
    assert_eq!(store.contexts().count(), 0);
    Ok(())
}

#[test]
fn activate_save_and_reload() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("config.json");
    let mut store = ContextStore::load(&path)?;
    store.activate("login-a-https://mds", BackendKind::OnPrem, "https://mds", None, session("a"));
    store.save()?;

    let reloaded = ContextStore::load(&path)?;
    assert_eq!(reloaded.current_name(), Some("login-a-https://mds"));
    let record = reloaded.current().ok_or_else(|| anyhow::anyhow!("no current context"))?;
    assert_eq!(record.backend, BackendKind::OnPrem);
    assert_eq!(record.session.as_ref().map(|s| s.bearer_token.as_str()), Some("bearer"));
    Ok(())
}

#[test]
fn passwords_are_not_persisted() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    let mut store = ContextStore::load(&path)?;
    store.activate("ctx", BackendKind::Cloud, "https://confluent.cloud", None, session("a"));
    store.save()?;

    let raw = std::fs::read_to_string(&path)?;
    assert!(!raw.contains("secret-pw"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn saved_with_owner_only_permissions() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    let mut store = ContextStore::load(&path)?;
    store.activate("ctx", BackendKind::Cloud, "https://confluent.cloud", None, session("a"));
    store.save()?;

    let mode = std::fs::metadata(&path)?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    Ok(())
}

#[test]
fn logout_clears_session_and_current() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = ContextStore::load(dir.path().join("config.json"))?;
    store.activate("ctx", BackendKind::OnPrem, "https://mds", None, session("a"));

    assert_eq!(store.logout(), Some("ctx".to_owned()));
    assert!(store.current().is_none());
    assert_eq!(store.get("ctx").map(|r| r.session.is_none()), Some(true));
    assert_eq!(store.logout(), None);
    Ok(())
}

#[test]
fn reactivation_keeps_ca_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = ContextStore::load(dir.path().join("config.json"))?;
    let ca = PathBuf::from("/etc/ca.pem");
    store.activate("ctx", BackendKind::OnPrem, "https://mds", Some(ca.clone()), session("a"));
    store.activate("ctx", BackendKind::OnPrem, "https://mds", None, session("a"));
    assert_eq!(store.get("ctx").and_then(|r| r.ca_cert_path.clone()), Some(ca));
    Ok(())
}

#[test]
fn invalid_json_is_configuration_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{not json")?;
    let err = ContextStore::load(&path).map(|_| ()).map_err(|e| e.kind);
    assert_eq!(err, Err(ErrorKind::Configuration));
    Ok(())
}

#[test]
fn identity_from_me() {
    let me = Me {
        user: crate::api::cloud::User { id: 1, email: "a@b.io".to_owned(), first_name: "A".to_owned() },
        organization: crate::api::cloud::Organization {
            id: 2,
            resource_id: "org-1".to_owned(),
            name: String::new(),
        },
        accounts: vec![Account { id: "env-1".to_owned(), name: "default".to_owned() }],
    };
    let identity = Identity::from(me);
    assert_eq!(identity.user, "a@b.io");
    assert_eq!(identity.organization_id.as_deref(), Some("org-1"));
    assert_eq!(identity.organization_name, None);
    assert_eq!(identity.accounts.len(), 1);
}
