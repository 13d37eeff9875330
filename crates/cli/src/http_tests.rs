// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::ErrorKind;

use super::*;

#[test]
fn builds_without_ca() {
    assert!(build_client(None).is_ok());
}

#[test]
fn missing_ca_file_is_configuration_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let err = build_client(Some(&tmp.path().join("missing.pem"))).err();
    assert_eq!(err.as_ref().map(|e| e.kind), Some(ErrorKind::Configuration));
    assert!(err.is_some_and(|e| e.message.contains("unable to read CA certificate")));
    Ok(())
}

#[test]
fn garbage_ca_file_is_configuration_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("ca.pem");
    std::fs::write(&path, "this is not a certificate\n")?;
    let err = build_client(Some(&path)).err();
    assert_eq!(err.map(|e| e.kind), Some(ErrorKind::Configuration));
    Ok(())
}
