//! This crate defines the packet buffers exchanged between a network stack and the devices that
//! carry its traffic. Buffers may be split across several segments; devices that need a flat
//! region for a single system call either get one directly or consolidate the segments first.

mod buffer;
mod error;
mod service;

pub use buffer::{IoVec, NetBuffer};
pub use error::BufferError;
pub use service::{BufferService, HeapBufferService};
