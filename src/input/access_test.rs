use std::{fs, path::Path};

use nix::fcntl::OFlag;

use super::access::{DeviceInterface, DeviceOpenError, RestrictedAccess};

fn open_fd_count() -> usize {
    fs::read_dir("/proc/self/fd")
        .map(|entries| entries.count())
        .unwrap_or_default()
}

#[test]
fn test_open_and_close() {
    let access = RestrictedAccess;
    let flags = OFlag::O_RDONLY | OFlag::O_NONBLOCK | OFlag::O_CLOEXEC;
    let fd = access
        .open_restricted(Path::new("/dev/null"), flags)
        .expect("/dev/null should always be readable");
    access.close_restricted(fd);
}

#[test]
fn test_open_missing_path() {
    let access = RestrictedAccess;
    let result = access.open_restricted(
        Path::new("/dev/input/does-not-exist/event0"),
        OFlag::O_RDONLY,
    );
    assert!(matches!(result, Err(DeviceOpenError::InvalidPath(_))));
}

#[test]
fn test_open_close_cycles_do_not_leak() {
    let access = RestrictedAccess;
    let flags = OFlag::O_RDONLY | OFlag::O_CLOEXEC;
    let before = open_fd_count();
    for _ in 0..200 {
        let fd = access
            .open_restricted(Path::new("/dev/null"), flags)
            .expect("/dev/null should always be readable");
        access.close_restricted(fd);
    }
    let after = open_fd_count();

    // Other tests run concurrently and may hold a few descriptors of their own
    assert!(
        after < before + 32,
        "descriptor count grew from {before} to {after}"
    );
}
