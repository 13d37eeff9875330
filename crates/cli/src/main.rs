// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::IsTerminal;

use clap::Parser;
use tracing::debug;

use cflogin::config::{Command, Config, LogFormat, LoginArgs};
use cflogin::context::ContextStore;
use cflogin::env;
use cflogin::error::AuthError;
use cflogin::login::{self, HandlerSettings, LoginOptions};
use cflogin::netrc::CredentialStore;
use cflogin::prompt::TerminalPrompt;
use cflogin::resolver::ResolverOptions;
use cflogin::session::{now_unix, RefreshOutcome, SessionManager};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    if let Err(e) = run(config).await {
        eprintln!("error: {e:#}");
        let code = e.downcast_ref::<AuthError>().map_or(1, |e| e.kind.exit_code());
        std::process::exit(code);
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.log_format().unwrap_or_default() {
        LogFormat::Json => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        LogFormat::Text => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let mut contexts = ContextStore::load(config.config_path())?;
    let netrc_path = config.netrc_path();
    debug!(config = %contexts.path().display(), netrc = %netrc_path.display(), "loaded configuration");

    match &config.command {
        Command::Login(args) => run_login(args, &mut contexts, CredentialStore::new(netrc_path)).await,
        Command::Logout => {
            match login::logout(&mut contexts)? {
                Some(name) => println!("Logged out of {name}."),
                None => println!("Not logged in."),
            }
            Ok(())
        }
        Command::Status => {
            match login::status(&contexts, now_unix()) {
                Some(report) => println!("{report}"),
                None => println!("Not logged in."),
            }
            Ok(())
        }
        Command::Refresh => {
            match login::refresh(&mut contexts, &netrc_path).await? {
                RefreshOutcome::StillValid => println!("Token is still valid."),
                RefreshOutcome::Refreshed => println!("Token refreshed."),
            }
            Ok(())
        }
    }
}

async fn run_login(
    args: &LoginArgs,
    contexts: &mut ContextStore,
    store: CredentialStore,
) -> anyhow::Result<()> {
    let settings = HandlerSettings {
        ca_cert_path: args.ca_cert_path.clone(),
        organization_id: args.organization_id.clone(),
        no_browser: args.no_browser,
    };
    let handler = login::build_handler(args.backend(), &args.url(), &settings)?;
    let manager = SessionManager::new(handler, store);

    let options = LoginOptions {
        resolver: ResolverOptions {
            prompt_only: args.prompt,
            interactive: std::io::stdin().is_terminal(),
        },
        save: args.save,
        ca_cert_path: args.ca_cert_path.clone(),
    };
    let outcome =
        login::login(&manager, contexts, &TerminalPrompt, env::process_env(), &options).await?;
    println!("{outcome}");
    Ok(())
}
