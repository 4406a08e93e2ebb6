// SPDX-License-Identifier: Apache-2.0

use std::cell::Cell;
use std::path::Path;

use crate::{BackupChain, BfnetError, ErrorKind, RecoveryOutcome};

fn write(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

fn apply_error() -> BfnetError {
    BfnetError::new_with_exit_code(
        ErrorKind::ApplyError,
        "netplan rejected".to_string(),
        78,
    )
}

#[test]
fn test_backup_paths() {
    let chain = BackupChain::new(Path::new("/etc/netplan/60-mlnx.yaml"));
    assert_eq!(
        chain.original_path(),
        Path::new("/etc/netplan/60-mlnx.yaml.orig")
    );
    assert_eq!(chain.backup_path(), Path::new("/etc/netplan/60-mlnx.yaml.bak"));
    assert_eq!(chain.bad_path(), Path::new("/etc/netplan/60-mlnx.yaml.bad"));
}

#[test]
fn test_original_captured_exactly_once() {
    let tmpdir = tempfile::tempdir().unwrap();
    let live = tmpdir.path().join("60-mlnx.yaml");
    let chain = BackupChain::new(&live);

    write(&live, "first");
    chain.prepare().unwrap();
    assert_eq!(read(chain.original_path()), "first");
    assert_eq!(read(chain.backup_path()), "first");

    write(&live, "second");
    chain.prepare().unwrap();
    assert_eq!(read(chain.original_path()), "first");
    assert_eq!(read(chain.backup_path()), "second");
    assert!(!chain.capture_original().unwrap());
}

#[test]
fn test_prepare_without_live_file() {
    let tmpdir = tempfile::tempdir().unwrap();
    let chain = BackupChain::new(&tmpdir.path().join("absent.yaml"));
    let result = chain.prepare();
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::ConfigLoadError);
    }
}

#[test]
fn test_recover_restores_backup() {
    let tmpdir = tempfile::tempdir().unwrap();
    let live = tmpdir.path().join("60-mlnx.yaml");
    let chain = BackupChain::new(&live);
    write(&live, "factory");
    chain.prepare().unwrap();
    write(&live, "known good");
    chain.prepare().unwrap();
    write(&live, "rejected");

    let attempts = Cell::new(0);
    let outcome = chain
        .recover(|| {
            attempts.set(attempts.get() + 1);
            Ok(())
        })
        .unwrap();

    assert_eq!(outcome, RecoveryOutcome::RestoredBackup);
    assert_eq!(attempts.get(), 1);
    assert_eq!(read(&live), "known good");
    assert_eq!(read(chain.bad_path()), "rejected");
}

#[test]
fn test_recover_falls_back_to_original() {
    let tmpdir = tempfile::tempdir().unwrap();
    let live = tmpdir.path().join("60-mlnx.yaml");
    let chain = BackupChain::new(&live);
    write(&live, "factory");
    chain.prepare().unwrap();
    write(&live, "known good");
    chain.prepare().unwrap();
    write(&live, "rejected");

    let outcome = chain
        .recover(|| {
            if read(&live) == "factory" {
                Ok(())
            } else {
                Err(apply_error())
            }
        })
        .unwrap();

    assert_eq!(outcome, RecoveryOutcome::RestoredOriginal);
    assert_eq!(read(&live), "factory");
    assert_eq!(read(chain.bad_path()), "rejected");
}

#[test]
fn test_recover_failure_after_two_attempts() {
    let tmpdir = tempfile::tempdir().unwrap();
    let live = tmpdir.path().join("60-mlnx.yaml");
    let chain = BackupChain::new(&live);
    write(&live, "factory");
    chain.prepare().unwrap();
    write(&live, "rejected");

    let attempts = Cell::new(0);
    let result = chain.recover(|| {
        attempts.set(attempts.get() + 1);
        Err(apply_error())
    });

    assert_eq!(attempts.get(), 2);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::RecoveryFailure);
    }
}
