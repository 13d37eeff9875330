// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod api;
pub mod backend;
pub mod config;
pub mod context;
pub mod credentials;
pub mod env;
pub mod error;
pub mod handler;
pub mod http;
pub mod login;
pub mod netrc;
pub mod pkce;
pub mod prompt;
pub mod resolver;
pub mod session;
pub mod sso;
pub mod test_support;
