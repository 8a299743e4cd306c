use crate::server::{LockFile, ShellError};

#[test]
fn test_acquire_creates_and_release_removes() {
    let dir = tempfile::tempdir().unwrap();

    let mut lock = LockFile::acquire(dir.path(), 8000).unwrap();
    assert!(dir.path().join("shell.lock").exists());

    lock.release();
    assert!(!dir.path().join("shell.lock").exists());
}

#[test]
fn test_second_acquire_fails_while_held() {
    let dir = tempfile::tempdir().unwrap();
    let _lock = LockFile::acquire(dir.path(), 8000).unwrap();

    match LockFile::acquire(dir.path(), 8000) {
        Err(ShellError::AlreadyRunning { .. }) => {}
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected AlreadyRunning"),
    }
}

#[test]
fn test_stale_lock_is_replaced() {
    let dir = tempfile::tempdir().unwrap();

    // A lock left behind by a dead process: implausibly large PID
    std::fs::write(
        dir.path().join("shell.lock"),
        r#"{"pid": 2147483646, "port": 8000, "started_at": "2026-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    assert!(LockFile::acquire(dir.path(), 8000).is_ok());
}

#[test]
fn test_corrupt_lock_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("shell.lock"), "not json at all").unwrap();

    assert!(LockFile::acquire(dir.path(), 8000).is_ok());
}

#[test]
fn test_release_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();

    let mut lock = LockFile::acquire(dir.path(), 8000).unwrap();
    lock.release();
    lock.release();

    // Drop after release must not remove a lock acquired in between
    let _second = LockFile::acquire(dir.path(), 8000).unwrap();
    drop(lock);
    assert!(dir.path().join("shell.lock").exists());
}
