// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    mds = { BackendKind::OnPrem, false, "confluent-cli:mds-username-password:login-u-http://mds:8090" },
    mds_ignores_sso = { BackendKind::OnPrem, true, "confluent-cli:mds-username-password:login-u-http://mds:8090" },
    cloud_password = { BackendKind::Cloud, false, "confluent-cli:ccloud-username-password:login-u-http://mds:8090" },
    cloud_sso = { BackendKind::Cloud, true, "confluent-cli:ccloud-sso-refresh-token:login-u-http://mds:8090" },
)]
fn machine_names(backend: BackendKind, is_sso: bool, expected: &str) {
    let ctx = context_id("u", "http://mds:8090");
    assert_eq!(machine_name(backend, is_sso, &ctx), expected);
}

#[test]
fn parse_machine_name_roundtrips_context_with_colons() {
    let name = machine_name(BackendKind::Cloud, true, "login-a+b@c.io-https://confluent.cloud");
    let parsed = parse_machine_name(&name);
    assert_eq!(
        parsed,
        Some((CredentialKind::CloudSsoRefreshToken, "login-a+b@c.io-https://confluent.cloud"))
    );
}

#[yare::parameterized(
    foreign = { "api.github.com" },
    unknown_kind = { "confluent-cli:kafka-api-key:login-x" },
    missing_ctx = { "confluent-cli:ccloud-username-password" },
)]
fn parse_machine_name_rejects(name: &str) {
    assert_eq!(parse_machine_name(name), None);
}

#[test]
fn credential_kinds_per_backend() {
    assert_eq!(BackendKind::OnPrem.credential_kinds(), &[CredentialKind::MdsPassword]);
    assert!(BackendKind::Cloud.credential_kinds().iter().all(|k| k.backend() == BackendKind::Cloud));
    assert!(CredentialKind::CloudSsoRefreshToken.is_sso());
    assert!(!CredentialKind::CloudPassword.is_sso());
}

#[test]
fn backend_from_str() -> anyhow::Result<()> {
    assert_eq!("ccloud".parse::<BackendKind>()?, BackendKind::Cloud);
    assert_eq!("MDS".parse::<BackendKind>()?, BackendKind::OnPrem);
    assert!("kafka".parse::<BackendKind>().is_err());
    Ok(())
}
