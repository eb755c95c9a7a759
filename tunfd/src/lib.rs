//! Byte-stream transports that back a tunnel device: the file descriptor of a tunnel driver,
//! one end of a socket pair, or an in-memory pipe.
mod transport;

#[cfg(unix)]
mod fd;

pub mod memory;

pub use transport::{Opener, Transport};
#[cfg(unix)]
pub use fd::{FdTransport, PathOpener, DEFAULT_TUN_PATH};
