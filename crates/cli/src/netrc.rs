// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Netrc-backed credential store.
//!
//! Secrets live in the user's netrc file under machine names of the form
//! `confluent-cli:<credential-kind>:<context-id>`. Entries written by other
//! tools, `default` blocks, `macdef` bodies and comments are preserved when
//! the file is rewritten.

use std::io::Write;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::backend::{machine_name, parse_machine_name, BackendKind, MACHINE_PREFIX};
use crate::error::{AuthError, AuthResult, ErrorKind};

/// A stored credential as returned by [`CredentialStore::find_matching`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub name: String,
    pub user: String,
    /// Password, or the SSO refresh token when `is_sso` is set.
    pub password: String,
    pub is_sso: bool,
}

impl Machine {
    /// Context id encoded in the machine name, if this tool wrote it.
    pub fn context_id(&self) -> Option<&str> {
        parse_machine_name(&self.name).map(|(_, ctx)| ctx)
    }
}

/// Lookup filter for [`CredentialStore::find_matching`].
///
/// With neither `context_id` nor `url` set, any context of the backend
/// matches. With only `url`, contexts whose id ends with that URL match.
/// With `is_sso` unset, both password and SSO machines of the backend match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFilter {
    pub backend: BackendKind,
    pub is_sso: Option<bool>,
    pub context_id: Option<String>,
    pub url: Option<String>,
}

impl MachineFilter {
    pub fn new(backend: BackendKind) -> Self {
        Self { backend, is_sso: None, context_id: None, url: None }
    }

    pub fn sso(mut self, is_sso: bool) -> Self {
        self.is_sso = Some(is_sso);
        self
    }

    pub fn context(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Build the anchored name pattern. Every user-controlled fragment is
    /// escaped so `+`, `.` and brackets in emails match literally.
    pub fn to_regex(&self) -> AuthResult<Regex> {
        let kinds: Vec<String> = match self.is_sso {
            Some(is_sso) => vec![regex::escape(self.backend.credential_kind(is_sso).as_str())],
            None => self
                .backend
                .credential_kinds()
                .iter()
                .map(|k| regex::escape(k.as_str()))
                .collect(),
        };
        let context = match (&self.context_id, &self.url) {
            (Some(ctx), _) => regex::escape(ctx),
            (None, Some(url)) => format!(".*{}", regex::escape(url)),
            (None, None) => ".*".to_owned(),
        };
        let pattern =
            format!("^{}:(?:{}):{context}$", regex::escape(MACHINE_PREFIX), kinds.join("|"));
        Regex::new(&pattern)
            .map_err(|e| AuthError::configuration(format!("invalid netrc lookup pattern: {e}")))
    }
}

// ---------------------------------------------------------------------------
// File model
// ---------------------------------------------------------------------------

/// One `machine` or `default` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineEntry {
    /// `None` for the `default` block.
    pub name: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub account: Option<String>,
    /// Pairs this tool does not interpret (`port` and friends), kept for rewrite.
    pub extra: Vec<(String, String)>,
}

impl MachineEntry {
    fn named(name: Option<String>) -> Self {
        Self { name, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Machine(MachineEntry),
    /// Comment, blank line, or macdef line kept verbatim.
    Raw(String),
}

/// Parsed netrc document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Netrc {
    items: Vec<Item>,
}

impl Netrc {
    /// Parse a netrc document. Tokens are separated by any whitespace,
    /// newlines included, so a keyword may carry its value on the next line.
    pub fn parse(input: &str) -> AuthResult<Self> {
        let mut items = Vec::new();
        let mut current: Option<usize> = None;
        // Keyword still waiting for its value, with the line it appeared on.
        let mut pending: Option<(String, usize)> = None;
        let mut in_macdef = false;

        for (lineno, line) in input.lines().enumerate() {
            if in_macdef {
                items.push(Item::Raw(line.to_owned()));
                if line.trim().is_empty() {
                    in_macdef = false;
                }
                continue;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                items.push(Item::Raw(line.to_owned()));
                continue;
            }

            for (offset, token) in tokenize(line).map_err(|e| malformed(lineno, &e))? {
                if let Some((key, _)) = pending.take() {
                    if key == "machine" {
                        items.push(Item::Machine(MachineEntry::named(Some(token))));
                        current = Some(items.len() - 1);
                        continue;
                    }
                    if let Some(Item::Machine(entry)) = current.and_then(|i| items.get_mut(i)) {
                        match key.as_str() {
                            "login" => entry.login = Some(token),
                            "password" => entry.password = Some(token),
                            "account" => entry.account = Some(token),
                            _ => entry.extra.push((key, token)),
                        }
                    }
                    continue;
                }
                match token.as_str() {
                    "machine" => pending = Some((token, lineno)),
                    "default" => {
                        items.push(Item::Machine(MachineEntry::named(None)));
                        current = Some(items.len() - 1);
                    }
                    "macdef" => {
                        items.push(Item::Raw(line[offset..].to_owned()));
                        current = None;
                        in_macdef = true;
                        break;
                    }
                    _ if current.is_none() => {
                        return Err(malformed(lineno, &format!("{token:?} outside a machine")));
                    }
                    _ => pending = Some((token, lineno)),
                }
            }
        }

        if let Some((key, lineno)) = pending {
            let detail = match key.as_str() {
                "machine" => "machine without name".to_owned(),
                _ => format!("{key} without value"),
            };
            return Err(malformed(lineno, &detail));
        }
        Ok(Self { items })
    }

    pub fn machines(&self) -> impl Iterator<Item = &MachineEntry> {
        self.items.iter().filter_map(|item| match item {
            Item::Machine(m) => Some(m),
            Item::Raw(_) => None,
        })
    }

    pub fn machine(&self, name: &str) -> Option<&MachineEntry> {
        self.machines().find(|m| m.name.as_deref() == Some(name))
    }

    /// Set login and password for `name`, updating in place when it exists.
    pub fn upsert(&mut self, name: &str, login: &str, password: &str) {
        for item in &mut self.items {
            if let Item::Machine(entry) = item {
                if entry.name.as_deref() == Some(name) {
                    entry.login = Some(login.to_owned());
                    entry.password = Some(password.to_owned());
                    return;
                }
            }
        }
        // Machines must precede `default`, which is last by convention.
        let entry = Item::Machine(MachineEntry {
            login: Some(login.to_owned()),
            password: Some(password.to_owned()),
            ..MachineEntry::named(Some(name.to_owned()))
        });
        let default_pos = self
            .items
            .iter()
            .position(|item| matches!(item, Item::Machine(MachineEntry { name: None, .. })));
        match default_pos {
            Some(pos) => self.items.insert(pos, entry),
            None => self.items.push(entry),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                Item::Raw(line) => {
                    out.push_str(line);
                    out.push('\n');
                }
                Item::Machine(entry) => {
                    match &entry.name {
                        Some(name) => {
                            out.push_str("machine ");
                            out.push_str(&quote(name));
                        }
                        None => out.push_str("default"),
                    }
                    out.push('\n');
                    let known = [
                        ("login", entry.login.as_deref()),
                        ("password", entry.password.as_deref()),
                        ("account", entry.account.as_deref()),
                    ];
                    let extra = entry.extra.iter().map(|(k, v)| (k.as_str(), Some(v.as_str())));
                    for (key, value) in known.into_iter().chain(extra) {
                        if let Some(v) = value {
                            out.push('\t');
                            out.push_str(key);
                            out.push(' ');
                            out.push_str(&quote(v));
                            out.push('\n');
                        }
                    }
                }
            }
        }
        out
    }
}

fn malformed(lineno: usize, detail: &str) -> AuthError {
    AuthError::malformed(format!("malformed netrc file at line {}: {detail}", lineno + 1))
}

/// Split a line on whitespace, honoring double-quoted tokens with `\` escapes.
/// Each token comes with its byte offset in the line.
fn tokenize(line: &str) -> Result<Vec<(usize, String)>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();
    loop {
        while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            chars.next();
        }
        let Some(&(start, c)) = chars.peek() else { break };
        if c == '#' {
            break;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some((_, escaped)) => token.push(escaped),
                        None => return Err("dangling escape".to_owned()),
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    other => token.push(other),
                }
            }
            if !closed {
                return Err("unterminated quote".to_owned());
            }
        } else {
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push((start, token));
    }
    Ok(tokens)
}

fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.starts_with('#')
        || value.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\');
    if !needs_quotes {
        return value.to_owned();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Persistent credential store over a netrc file.
///
/// No internal locking: concurrent logins against the same file race.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.netrc`, or `~/_netrc` on Windows.
    pub fn default_path() -> PathBuf {
        let name = if cfg!(windows) { "_netrc" } else { ".netrc" };
        PathBuf::from("~").join(name)
    }

    /// The configured path with a leading `~` expanded.
    pub fn resolve_path(&self) -> AuthResult<PathBuf> {
        expand_home(&self.path)
    }

    /// Store a credential, replacing any existing secret under the same name.
    pub fn write(
        &self,
        backend: BackendKind,
        is_sso: bool,
        context_id: &str,
        username: &str,
        secret: &str,
    ) -> AuthResult<()> {
        let path = self.resolve_path()?;
        let mut netrc = match std::fs::read_to_string(&path) {
            Ok(contents) => Netrc::parse(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Netrc::default(),
            Err(e) => {
                return Err(AuthError::file_access(format!(
                    "unable to read netrc file {}: {e}",
                    path.display()
                )))
            }
        };

        let name = machine_name(backend, is_sso, context_id);
        netrc.upsert(&name, username, secret);
        write_private(&path, netrc.render().as_bytes())?;
        debug!(path = %path.display(), machine = %name, "wrote netrc credentials");
        Ok(())
    }

    /// First machine (in file order) matching `filter`.
    ///
    /// A missing file is `NotFound`; an unreadable or malformed one is a hard
    /// error.
    pub fn find_matching(&self, filter: &MachineFilter) -> AuthResult<Machine> {
        let path = self.resolve_path()?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::not_found(format!(
                    "netrc file {} does not exist",
                    path.display()
                )));
            }
            Err(e) => {
                return Err(AuthError::file_access(format!(
                    "unable to read netrc file {}: {e}",
                    path.display()
                )));
            }
        };
        let netrc = Netrc::parse(&contents)?;
        let re = filter.to_regex()?;

        for entry in netrc.machines() {
            let Some(name) = entry.name.as_deref() else { continue };
            if !re.is_match(name) {
                continue;
            }
            let Some((kind, _)) = parse_machine_name(name) else { continue };
            let (Some(user), Some(password)) = (
                entry.login.as_deref().filter(|u| !u.is_empty()),
                entry.password.as_deref().filter(|p| !p.is_empty()),
            ) else {
                return Err(AuthError::malformed(format!(
                    "netrc machine {name} in {} needs both login and password",
                    path.display()
                )));
            };
            return Ok(Machine {
                name: name.to_owned(),
                user: user.to_owned(),
                password: password.to_owned(),
                is_sso: kind.is_sso(),
            });
        }

        Err(AuthError::not_found(format!(
            "no matching {} credentials in {}",
            filter.backend,
            path.display()
        )))
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> AuthResult<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir()
        .ok_or_else(|| AuthError::file_access("unable to resolve home directory"))?;
    Ok(home.join(rest))
}

/// Write `contents` atomically (temp file + rename) with mode 0600.
pub fn write_private(path: &Path, contents: &[u8]) -> AuthResult<()> {
    let io_err =
        |e: std::io::Error| AuthError::file_access(format!("unable to write {}: {e}", path.display()));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp_name = format!(
        "{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
    );
    let tmp_path = path.with_file_name(tmp_name);

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&tmp_path).map_err(io_err)?;

    let replaced = (|| -> std::io::Result<()> {
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp_path, path)
    })();

    replaced.map_err(|e| {
        // The temp file holds the secret; never leave it behind.
        let _ = std::fs::remove_file(&tmp_path);
        AuthError::new(ErrorKind::FileAccess, format!("unable to replace {}: {e}", path.display()))
    })
}

#[cfg(test)]
#[path = "netrc_tests.rs"]
mod tests;
