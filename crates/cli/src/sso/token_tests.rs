// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tracing::instrument::WithSubscriber;

use super::*;
use crate::error::ErrorKind;
use crate::http::build_client;
use crate::test_support::{CapturedLogs, MockBackend};

#[tokio::test]
async fn exchange_sends_code_and_verifier() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    let tokens = exchange_code(
        &build_client(None)?,
        &backend.provider(),
        "code-9",
        "verifier-9",
        "http://127.0.0.1:1/cli_callback",
    )
    .await?;
    assert_eq!(tokens.id_token, "idt-0");

    let requests = backend.state.token_requests();
    assert_eq!(requests[0]["code_verifier"], "verifier-9");
    assert_eq!(requests[0]["client_id"], "test-client");
    Ok(())
}

#[tokio::test]
async fn unparseable_success_body_is_not_logged() -> anyhow::Result<()> {
    let backend = MockBackend::start().await?;
    backend.state.queue_token_response(
        200,
        serde_json::json!({ "id_token": 7, "refresh_token": "rt-do-not-log" }),
    );
    let logs = CapturedLogs::default();

    let err = refresh(&build_client(None)?, &backend.provider(), "rt-old")
        .with_subscriber(logs.subscriber())
        .await
        .err();
    assert_eq!(err.map(|e| e.kind), Some(ErrorKind::MalformedInput));

    let captured = logs.contents();
    assert!(captured.contains("unparseable token response"), "{captured}");
    assert!(!captured.contains("rt-do-not-log"), "{captured}");
    Ok(())
}
