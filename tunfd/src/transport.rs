#![deny(missing_docs)]

use std::io;

/// An open duplex endpoint that moves whole raw frames with blocking reads and writes.
///
/// Implementations must tolerate one reader and one writer running concurrently. Closing the
/// endpoint is done by dropping it.
pub trait Transport: Send + Sync {
    /// Reads one frame into `frame`, returning how many bytes were delivered.
    fn read(&self, frame: &mut [u8]) -> io::Result<usize>;

    /// Writes `frame`, returning how many bytes the endpoint accepted.
    fn write(&self, frame: &[u8]) -> io::Result<usize>;
}

/// Knows how to open a fresh `Transport`. A device holds one of these and calls it every time it
/// is brought up.
pub trait Opener: Send + Sync {
    /// Opens the endpoint.
    fn open(&self) -> io::Result<Box<dyn Transport>>;
}

impl<F> Opener for F
where
    F: Fn() -> io::Result<Box<dyn Transport>> + Send + Sync,
{
    fn open(&self) -> io::Result<Box<dyn Transport>> {
        self()
    }
}
