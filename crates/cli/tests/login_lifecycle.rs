// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end login, refresh and logout against in-process mock backends.

use std::sync::Arc;

use cflogin::backend::BackendKind;
use cflogin::context::ContextStore;
use cflogin::env::EnvLookup;
use cflogin::handler::TokenHandler;
use cflogin::login::{self, LoginOptions};
use cflogin::netrc::{CredentialStore, MachineFilter};
use cflogin::resolver::{CredentialSource, ResolverOptions};
use cflogin::session::{now_unix, RefreshOutcome, SessionManager};
use cflogin::test_support::{MockBackend, ScriptedPrompt};

fn no_env() -> EnvLookup {
    Arc::new(|_: &str| -> Option<String> { None })
}

fn expire_current(contexts: &mut ContextStore) {
    if let Some(session) = contexts.current_mut().and_then(|r| r.session.as_mut()) {
        session.expires_at = Some(1);
    }
}

#[tokio::test]
async fn password_login_save_refresh_logout_relogin() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    backend.state.add_mds_user("ops+admin@corp.io", "p@ss word");
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.json");
    let store = CredentialStore::new(dir.path().join(".netrc"));
    let manager = SessionManager::new(TokenHandler::OnPrem(backend.onprem_handler()?), store.clone());

    // First login: nothing stored, so the user is asked.
    let mut contexts = ContextStore::load(&config_path)?;
    let prompt = ScriptedPrompt::new().with_line("  ops+admin@corp.io").with_secret("p@ss word");
    let options = LoginOptions { save: true, ..LoginOptions::default() };
    let first = login::login(&manager, &mut contexts, &prompt, no_env(), &options).await?;
    assert_eq!(first.source, CredentialSource::Prompt);
    assert_eq!(first.context, format!("login-ops+admin@corp.io-{}", backend.url()));

    let machine = store.find_matching(&MachineFilter::new(BackendKind::OnPrem).url(backend.url()))?;
    assert_eq!(machine.user, "ops+admin@corp.io");
    assert_eq!(machine.password, "p@ss word");

    // Expired token renews from netrc without prompting.
    let mut contexts = ContextStore::load(&config_path)?;
    expire_current(&mut contexts);
    let outcome = manager.refresh(&mut contexts, now_unix()).await?;
    assert_eq!(outcome, RefreshOutcome::Refreshed);
    assert_eq!(login::status(&contexts, now_unix()).and_then(|r| r.expired), Some(false));

    // Logout leaves netrc, so the next login needs no prompt.
    assert_eq!(login::logout(&mut contexts)?, Some(first.context.clone()));
    let prompt = ScriptedPrompt::new();
    let second =
        login::login(&manager, &mut contexts, &prompt, no_env(), &LoginOptions::default()).await?;
    assert_eq!(second.source, CredentialSource::Netrc);
    assert_eq!(second.context, first.context);
    Ok(())
}

#[tokio::test]
async fn sso_login_then_silent_renewal() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    backend.state.add_sso_user("sso@acme.io", "acme-okta");
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path().join(".netrc"));
    let manager = SessionManager::new(TokenHandler::Cloud(backend.cloud_handler()?), store.clone());
    let mut contexts = ContextStore::load(dir.path().join("config.json"))?;

    let prompt = ScriptedPrompt::new().with_line("sso@acme.io");
    let options = LoginOptions { save: true, ..LoginOptions::default() };
    let outcome = login::login(&manager, &mut contexts, &prompt, no_env(), &options).await?;
    assert!(outcome.saved);

    let requests = backend.state.token_requests();
    assert_eq!(requests[0]["grant_type"], "authorization_code");
    assert_eq!(requests[0]["code"], "code-123");
    let logins = backend.state.login_requests();
    assert_eq!(logins[0]["id_token"], "idt-0");

    // The refresh token saved by login is spent and replaced by the rotated one.
    expire_current(&mut contexts);
    manager.refresh(&mut contexts, now_unix()).await?;
    let requests = backend.state.token_requests();
    assert_eq!(requests[1]["grant_type"], "refresh_token");
    assert_eq!(requests[1]["refresh_token"], "rt-0");

    let machine = store.find_matching(&MachineFilter::new(BackendKind::Cloud).sso(true))?;
    assert_eq!(machine.password, "rt-1");
    Ok(())
}

#[tokio::test]
async fn non_interactive_login_without_credentials_fails() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let manager = SessionManager::new(
        TokenHandler::OnPrem(backend.onprem_handler()?),
        CredentialStore::new(dir.path().join(".netrc")),
    );
    let mut contexts = ContextStore::load(dir.path().join("config.json"))?;
    let options = LoginOptions {
        resolver: ResolverOptions { prompt_only: false, interactive: false },
        ..LoginOptions::default()
    };

    let err = login::login(&manager, &mut contexts, &ScriptedPrompt::new(), no_env(), &options)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
    assert!(err.is_not_found());
    assert!(err.to_string().contains("no credentials found"));
    Ok(())
}
