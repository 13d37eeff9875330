// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive input for the prompt credential source and no-browser SSO.

use std::io::{BufRead, Write};

use crate::error::{AuthError, AuthResult};

/// Line-oriented user interaction.
pub trait Prompt: Send + Sync {
    /// Show an informational message.
    fn say(&self, message: &str);

    /// Read one line of visible input (without the trailing newline).
    fn read_line(&self, label: &str) -> AuthResult<String>;

    /// Read one line of input without echoing it.
    fn read_secret(&self, label: &str) -> AuthResult<String>;
}

/// Prompt on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn say(&self, message: &str) {
        println!("{message}");
    }

    fn read_line(&self, label: &str) -> AuthResult<String> {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{label}");
        let _ = stdout.flush();

        let mut line = String::new();
        let n = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| AuthError::malformed(format!("unable to read input: {e}")))?;
        if n == 0 {
            return Err(AuthError::malformed("input closed before a value was entered"));
        }
        Ok(strip_newline(line))
    }

    fn read_secret(&self, label: &str) -> AuthResult<String> {
        rpassword::prompt_password(label)
            .map_err(|e| AuthError::malformed(format!("unable to read input: {e}")))
    }
}

fn strip_newline(mut line: String) -> String {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}
