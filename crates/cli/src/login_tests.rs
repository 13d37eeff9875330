// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;

use super::*;
use crate::error::ErrorKind;
use crate::netrc::MachineFilter;
use crate::test_support::{MockBackend, ScriptedPrompt};

fn no_env() -> EnvLookup {
    Arc::new(|_: &str| -> Option<String> { None })
}

fn env_of(vars: &[(&str, &str)]) -> EnvLookup {
    let map: HashMap<String, String> =
        vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    Arc::new(move |name: &str| map.get(name).cloned())
}

struct Fixture {
    backend: MockBackend,
    dir: tempfile::TempDir,
}

impl Fixture {
    async fn new() -> anyhow::Result<Self> {
        Ok(Self { backend: MockBackend::start().await?, dir: tempfile::tempdir()? })
    }

    fn store(&self) -> CredentialStore {
        CredentialStore::new(self.dir.path().join(".netrc"))
    }

    fn contexts(&self) -> anyhow::Result<ContextStore> {
        Ok(ContextStore::load(self.dir.path().join("config.json"))?)
    }

    fn onprem(&self) -> anyhow::Result<SessionManager> {
        Ok(SessionManager::new(TokenHandler::OnPrem(self.backend.onprem_handler()?), self.store()))
    }

    fn cloud(&self) -> anyhow::Result<SessionManager> {
        Ok(SessionManager::new(TokenHandler::Cloud(self.backend.cloud_handler()?), self.store()))
    }
}

#[tokio::test]
async fn onprem_login_with_save() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    fx.backend.state.add_mds_user("alice", "pw");
    let manager = fx.onprem()?;
    let mut contexts = fx.contexts()?;
    let prompt = ScriptedPrompt::new().with_line("alice").with_secret("pw");
    let options = LoginOptions { save: true, ..LoginOptions::default() };

    let outcome = login(&manager, &mut contexts, &prompt, no_env(), &options).await?;
    assert_eq!(outcome.username, "alice");
    assert_eq!(outcome.source, CredentialSource::Prompt);
    assert!(outcome.saved);
    assert!(outcome.to_string().contains("Credentials saved"));

    let machine = fx.store().find_matching(
        &MachineFilter::new(BackendKind::OnPrem).sso(false).context(&outcome.context),
    )?;
    assert_eq!((machine.user.as_str(), machine.password.as_str()), ("alice", "pw"));

    // Saved to disk, not just in memory.
    let reloaded = fx.contexts()?;
    assert_eq!(reloaded.current_name(), Some(outcome.context.as_str()));
    Ok(())
}

#[tokio::test]
async fn login_without_save_leaves_netrc_alone() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    fx.backend.state.add_mds_user("alice", "pw");
    let manager = fx.onprem()?;
    let mut contexts = fx.contexts()?;
    let env =
        env_of(&[("CONFLUENT_PLATFORM_USERNAME", "alice"), ("CONFLUENT_PLATFORM_PASSWORD", "pw")]);

    let outcome =
        login(&manager, &mut contexts, &ScriptedPrompt::new(), env, &LoginOptions::default())
            .await?;
    assert_eq!(outcome.source, CredentialSource::Env);
    assert!(!outcome.saved);
    assert!(!fx.store().resolve_path()?.exists());
    Ok(())
}

#[tokio::test]
async fn cloud_sso_login_saves_refresh_token() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    fx.backend.state.add_sso_user("sso@acme.io", "acme-okta");
    let manager = fx.cloud()?;
    let mut contexts = fx.contexts()?;
    let prompt = ScriptedPrompt::new().with_line("sso@acme.io");
    let options = LoginOptions { save: true, ..LoginOptions::default() };

    let outcome = login(&manager, &mut contexts, &prompt, no_env(), &options).await?;
    assert_eq!(outcome.organization.as_deref(), Some("Acme"));

    let machine = fx.store().find_matching(&MachineFilter::new(BackendKind::Cloud).sso(true))?;
    assert_eq!(machine.user, "sso@acme.io");
    assert_eq!(machine.password, "rt-0");
    Ok(())
}

#[tokio::test]
async fn failed_login_writes_nothing() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    fx.backend.state.add_mds_user("alice", "pw");
    let manager = fx.onprem()?;
    let mut contexts = fx.contexts()?;
    let prompt = ScriptedPrompt::new().with_line("alice").with_secret("wrong");
    let options = LoginOptions { save: true, ..LoginOptions::default() };

    let err = login(&manager, &mut contexts, &prompt, no_env(), &options).await.map_err(|e| e.kind);
    assert_eq!(err.map(|_| ()), Err(ErrorKind::AuthFailure));
    assert!(!fx.store().resolve_path()?.exists());
    assert!(!fx.dir.path().join("config.json").exists());
    Ok(())
}

#[tokio::test]
async fn logout_keeps_netrc() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    fx.backend.state.add_mds_user("alice", "pw");
    let manager = fx.onprem()?;
    let mut contexts = fx.contexts()?;
    let prompt = ScriptedPrompt::new().with_line("alice").with_secret("pw");
    let options = LoginOptions { save: true, ..LoginOptions::default() };
    let outcome = login(&manager, &mut contexts, &prompt, no_env(), &options).await?;

    assert_eq!(logout(&mut contexts)?, Some(outcome.context.clone()));
    assert!(status(&fx.contexts()?, now_unix()).is_none());
    assert!(fx.store().find_matching(&MachineFilter::new(BackendKind::OnPrem)).is_ok());
    assert_eq!(logout(&mut contexts)?, None);
    Ok(())
}

#[tokio::test]
async fn status_reports_current_session() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    fx.backend.state.add_cloud_user("ada@acme.io", "pw");
    let manager = fx.cloud()?;
    let mut contexts = fx.contexts()?;
    let prompt = ScriptedPrompt::new().with_line("ada@acme.io").with_secret("pw");
    login(&manager, &mut contexts, &prompt, no_env(), &LoginOptions::default()).await?;

    let report = status(&contexts, now_unix()).ok_or_else(|| anyhow::anyhow!("no status"))?;
    assert_eq!(report.user.as_deref(), Some("ada@acme.io"));
    assert_eq!(report.organization.as_deref(), Some("Acme"));
    assert_eq!(report.environment.as_deref(), Some("env-1"));
    assert_eq!(report.expired, Some(false));
    assert!(report.to_string().contains("Token:        valid"));

    let later = status(&contexts, now_unix() + 7200).map(|r| r.expired);
    assert_eq!(later, Some(Some(true)));
    Ok(())
}

#[tokio::test]
async fn refresh_without_context_is_not_found() -> anyhow::Result<()> {
    let fx = Fixture::new().await?;
    let mut contexts = fx.contexts()?;
    let err = refresh(&mut contexts, &fx.dir.path().join(".netrc")).await.map_err(|e| e.kind);
    assert_eq!(err, Err(ErrorKind::NotFound));
    Ok(())
}

#[test]
fn build_cloud_handler_for_unknown_host_fails() {
    let err = build_handler(BackendKind::Cloud, "https://example.com", &HandlerSettings::default());
    assert_eq!(err.map(|h| h.backend()).map_err(|e| e.kind), Err(ErrorKind::Configuration));
}

#[test]
fn build_handlers() -> anyhow::Result<()> {
    let settings = HandlerSettings::default();
    let cloud = build_handler(BackendKind::Cloud, "https://confluent.cloud", &settings)?;
    let onprem = build_handler(BackendKind::OnPrem, "https://mds:8090", &settings)?;
    assert_eq!(cloud.backend(), BackendKind::Cloud);
    assert_eq!(onprem.url(), "https://mds:8090");
    Ok(())
}
