use std::{
    os::fd::{FromRawFd, IntoRawFd, OwnedFd},
    path::Path,
};

use nix::{errno::Errno, fcntl::OFlag, sys::stat::Mode};
use thiserror::Error;

/// Possible errors when opening a device node
#[derive(Error, Debug)]
pub enum DeviceOpenError {
    #[error("permission denied opening '{0}'")]
    PermissionDenied(String),
    #[error("invalid device path '{0}'")]
    InvalidPath(String),
    #[error("failed to open '{path}': {source}")]
    Failed {
        path: String,
        #[source]
        source: Errno,
    },
}

impl DeviceOpenError {
    fn from_errno(path: &Path, errno: Errno) -> Self {
        let path = path.display().to_string();
        match errno {
            Errno::EACCES | Errno::EPERM => Self::PermissionDenied(path),
            Errno::ENOENT | Errno::ENOTDIR | Errno::ENXIO | Errno::ENODEV => {
                Self::InvalidPath(path)
            }
            source => Self::Failed { path, source },
        }
    }
}

/// A [DeviceInterface] grants and revokes access to device nodes. It is handed
/// to an event source once when the session is created and is used every time
/// a device is discovered or removed.
pub trait DeviceInterface: Send {
    /// Open the device at the given path with the given flags
    fn open_restricted(&self, path: &Path, flags: OFlag) -> Result<OwnedFd, DeviceOpenError>;

    /// Release a descriptor previously returned by [DeviceInterface::open_restricted].
    /// Failures are logged and never returned.
    fn close_restricted(&self, fd: OwnedFd);
}

/// Opens device nodes directly with the permissions of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct RestrictedAccess;

impl DeviceInterface for RestrictedAccess {
    fn open_restricted(&self, path: &Path, flags: OFlag) -> Result<OwnedFd, DeviceOpenError> {
        log::trace!("Opening device at: {}", path.display());
        let raw_fd = nix::fcntl::open(path, flags, Mode::empty())
            .map_err(|errno| DeviceOpenError::from_errno(path, errno))?;

        // SAFETY: the descriptor was just returned by open(2) and nothing else owns it
        Ok(unsafe { OwnedFd::from_raw_fd(raw_fd) })
    }

    fn close_restricted(&self, fd: OwnedFd) {
        let raw_fd = fd.into_raw_fd();
        log::trace!("Closing device descriptor: {raw_fd}");
        if let Err(e) = nix::unistd::close(raw_fd) {
            log::warn!("Failed to close device descriptor {raw_fd}: {e}");
        }
    }
}
