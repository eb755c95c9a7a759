//! A frame-preserving transport that never leaves the process. Handy for wiring two devices
//! back to back, or a device to a test harness.

use crate::Transport;
use crossbeam::channel::{self, Receiver, Sender};
use std::{cmp, io};

/// One end of an in-memory pipe. Every `write` on one end becomes exactly one `read` on the other.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

/// Creates a connected pair of in-memory transports.
pub fn pipe() -> (MemoryTransport, MemoryTransport) {
    let (a_tx, b_rx) = channel::unbounded();
    let (b_tx, a_rx) = channel::unbounded();
    (
        MemoryTransport { tx: a_tx, rx: a_rx },
        MemoryTransport { tx: b_tx, rx: b_rx },
    )
}

impl Transport for MemoryTransport {
    /// Blocks until the peer writes a frame. Frames longer than `frame` are truncated, like a
    /// datagram socket would. Returns 0 once the peer has been dropped.
    fn read(&self, frame: &mut [u8]) -> io::Result<usize> {
        match self.rx.recv() {
            Ok(data) => {
                let len = cmp::min(data.len(), frame.len());
                frame[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            Err(_) => Ok(0),
        }
    }

    fn write(&self, frame: &[u8]) -> io::Result<usize> {
        self.tx
            .send(frame.to_vec())
            .map(|_| frame.len())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer transport was dropped"))
    }
}
