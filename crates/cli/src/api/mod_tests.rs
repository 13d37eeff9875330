// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Deserialize;
use tracing::instrument::WithSubscriber;

use super::*;
use crate::error::ErrorKind;
use crate::test_support::CapturedLogs;

#[derive(Debug, Deserialize)]
struct Session {
    #[allow(dead_code)]
    token: u64,
}

fn response(status: u16, body: &'static str) -> anyhow::Result<reqwest::Response> {
    Ok(reqwest::Response::from(axum::http::Response::builder().status(status).body(body)?))
}

#[tokio::test]
async fn unparseable_body_is_malformed_and_not_logged() -> anyhow::Result<()> {
    let logs = CapturedLogs::default();
    let resp = response(200, r#"{"token":"session-secret"}"#)?;

    let err = read_json::<Session>(resp, "login").with_subscriber(logs.subscriber()).await.err();
    assert_eq!(err.map(|e| e.kind), Some(ErrorKind::MalformedInput));

    let captured = logs.contents();
    assert!(captured.contains("unparseable login response"), "{captured}");
    assert!(!captured.contains("session-secret"), "{captured}");
    Ok(())
}

#[yare::parameterized(
    unauthorized = { 401, "credentials were rejected" },
    forbidden = { 403, "credentials were rejected" },
    server_error = { 500, "(500 Internal Server Error)" },
)]
fn rejection_messages(status: u16, expected: &str) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap_or_else(|e| panic!("runtime: {e}"));
    let resp = response(status, "nope").unwrap_or_else(|e| panic!("response: {e}"));
    let err = rt.block_on(reject(resp, "login"));
    assert!(err.to_string().contains(expected), "{err}");
}

#[test]
fn join_trims_trailing_slash() {
    assert_eq!(
        join("https://mds:8090/", "/security/1.0/authenticate"),
        "https://mds:8090/security/1.0/authenticate"
    );
}
