#![deny(missing_docs)]

use crate::{Opener, Transport};
use libc;
use std::{
    ffi::CString,
    io,
    os::unix::{
        ffi::OsStrExt,
        io::{AsRawFd, RawFd},
    },
    path::{Path, PathBuf},
};

/// Where the tunnel driver publishes its character device.
pub const DEFAULT_TUN_PATH: &str = "/dev/misc/tun_interface";

/// A blocking transport over a raw file descriptor. The descriptor is closed on drop.
#[derive(Debug)]
pub struct FdTransport {
    fd: libc::c_int,
}

impl FdTransport {
    /// Opens `path` for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = CString::new(path.as_ref().as_os_str().as_bytes())?;
        // This block must be marked as unsafe because it uses FFI with C code. We believe the code
        // in this block to be safe because it only borrows the NUL-terminated path for the
        // duration of the call, and it upholds the invariant of the FdTransport type -- namely,
        // that it return an Err if it fails to open the descriptor.
        let fd = unsafe {
            // Resources:
            // man 2 open
            let fd = libc::open(path.as_ptr(), libc::O_RDWR | libc::O_CLOEXEC);
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            fd
        };
        Ok(Self { fd })
    }

    /// Creates a connected pair of datagram sockets. Each datagram is delivered as one frame, so
    /// either end can stand in for a tunnel driver.
    pub fn pair() -> io::Result<(Self, Self)> {
        let mut fds = [-1; 2];
        // This block is marked as unsafe because it uses FFI, however, we believe it to be safe
        // because the array we hand to socketpair has room for exactly the two descriptors it
        // writes, and we only read them back after checking for failure.
        unsafe {
            // Resources:
            // man 2 socketpair
            // man 7 unix regarding SOCK_DGRAM message boundaries
            let err = libc::socketpair(
                libc::AF_UNIX,
                libc::SOCK_DGRAM | socket_cloexec(),
                0,
                fds.as_mut_ptr(),
            );
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok((Self { fd: fds[0] }, Self { fd: fds[1] }))
    }

    /// Duplicates the descriptor. Both transports refer to the same endpoint.
    pub fn try_clone(&self) -> io::Result<Self> {
        // This block is marked as unsafe because it uses FFI. We believe it to be safe because
        // fcntl does not touch any memory owned by Rust and we check its result.
        // Resources used to write syscall code:
        // man 2 fcntl regarding F_DUPFD_CLOEXEC
        let fd = unsafe { libc::fcntl(self.fd, libc::F_DUPFD_CLOEXEC, 0) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd })
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn socket_cloexec() -> libc::c_int {
    libc::SOCK_CLOEXEC
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn socket_cloexec() -> libc::c_int {
    0
}

impl Transport for FdTransport {
    fn read(&self, frame: &mut [u8]) -> io::Result<usize> {
        // This block is marked as unsafe because it uses FFI. We believe this code to be safe,
        // because it mutably borrows the Rust-owned frame for the duration of the call and passes
        // its length along, so the C side never writes past the end.
        unsafe {
            // Resources:
            // man 2 read
            let bytes = libc::read(self.fd, frame.as_mut_ptr() as *mut _, frame.len());
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(bytes as usize)
            }
        }
    }

    fn write(&self, frame: &[u8]) -> io::Result<usize> {
        // Note comment in `read` call.
        unsafe {
            // Resources:
            // man 2 write
            let bytes = libc::write(self.fd, frame.as_ptr() as *const _, frame.len());
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(bytes as usize)
            }
        }
    }
}

impl AsRawFd for FdTransport {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for FdTransport {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

/// Opens an `FdTransport` on a fixed path, by default the tunnel driver's character device.
#[derive(Clone, Debug)]
pub struct PathOpener {
    path: PathBuf,
}

impl PathOpener {
    /// Creates an opener for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path that will be opened.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for PathOpener {
    fn default() -> Self {
        Self::new(DEFAULT_TUN_PATH)
    }
}

impl Opener for PathOpener {
    fn open(&self) -> io::Result<Box<dyn Transport>> {
        Ok(Box::new(FdTransport::open(&self.path)?))
    }
}
