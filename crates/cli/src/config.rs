// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::netrc::CredentialStore;
use crate::sso::provider;

/// URL used for cloud logins when `--url` is not given.
pub const DEFAULT_CLOUD_URL: &str = "https://confluent.cloud";

/// Log output format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("invalid log format: {other}"),
        }
    }
}

/// Log in to a cloud control plane or an on-premises metadata service.
#[derive(Debug, Parser)]
#[command(name = "cflogin", version, about)]
pub struct Config {
    /// Path to the CLI configuration file holding login contexts.
    #[arg(long, env = "CFLOGIN_CONFIG", default_value = "~/.confluent/config.json", global = true)]
    pub config: PathBuf,

    /// Path to the netrc file used as the credential store.
    #[arg(long = "netrc-file", env = "NETRC", global = true)]
    pub netrc_file: Option<PathBuf>,

    /// Log format (json or text).
    #[arg(long, env = "CFLOGIN_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CFLOGIN_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and make the resulting context current.
    Login(LoginArgs),
    /// Clear the current context's session. Saved netrc credentials are kept.
    Logout,
    /// Show the current context and whether its token has expired.
    Status,
    /// Renew the current context's token from stored credentials if it expired.
    Refresh,
}

#[derive(Debug, Clone, Default, Args)]
pub struct LoginArgs {
    /// Metadata service URL for on-prem logins, or a cloud URL.
    #[arg(long, env = "CONFLUENT_PLATFORM_MDS_URL")]
    pub url: Option<String>,

    /// CA certificate bundle trusted for the metadata service.
    #[arg(long, env = "CONFLUENT_PLATFORM_CA_CERT_PATH")]
    pub ca_cert_path: Option<PathBuf>,

    /// Cloud organization to log in to.
    #[arg(long, env = "CONFLUENT_CLOUD_ORGANIZATION_ID")]
    pub organization_id: Option<String>,

    /// Ignore environment and netrc credentials and ask.
    #[arg(long)]
    pub prompt: bool,

    /// Print the SSO URL and read the code back instead of opening a browser.
    #[arg(long)]
    pub no_browser: bool,

    /// Save the credentials to netrc after a successful login.
    #[arg(long)]
    pub save: bool,

    /// Treat `--url` as a metadata service even if it looks like a cloud URL.
    #[arg(long)]
    pub on_prem: bool,
}

impl LoginArgs {
    /// Backend implied by the flags: explicit `--on-prem`, else the URL's host.
    pub fn backend(&self) -> BackendKind {
        match (&self.url, self.on_prem) {
            (_, true) => BackendKind::OnPrem,
            (None, false) => BackendKind::Cloud,
            (Some(url), false) if is_cloud_url(url) => BackendKind::Cloud,
            (Some(_), false) => BackendKind::OnPrem,
        }
    }

    /// Target URL without a trailing slash.
    pub fn url(&self) -> String {
        self.url.as_deref().unwrap_or(DEFAULT_CLOUD_URL).trim_end_matches('/').to_owned()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self.backend() {
            BackendKind::Cloud => {
                if self.ca_cert_path.is_some() {
                    anyhow::bail!("--ca-cert-path is only valid for on-prem logins");
                }
            }
            BackendKind::OnPrem => {
                if self.url.as_deref().is_none_or(str::is_empty) {
                    anyhow::bail!("--url is required for on-prem logins");
                }
                if self.no_browser {
                    anyhow::bail!("--no-browser is only valid for cloud logins");
                }
                if self.organization_id.is_some() {
                    anyhow::bail!("--organization-id is only valid for cloud logins");
                }
            }
        }
        Ok(())
    }
}

fn is_cloud_url(url: &str) -> bool {
    provider::environment_for(url).is_ok()
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.log_format()?;
        if let Command::Login(args) = &self.command {
            args.validate()?;
        }
        Ok(())
    }

    pub fn log_format(&self) -> anyhow::Result<LogFormat> {
        self.log_format.parse()
    }

    pub fn config_path(&self) -> &Path {
        &self.config
    }

    /// `--netrc-file`, else the platform default.
    pub fn netrc_path(&self) -> PathBuf {
        self.netrc_file.clone().unwrap_or_else(CredentialStore::default_path)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
