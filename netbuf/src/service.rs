use crate::{BufferError, NetBuffer};

/// The allocation side of the buffer abstraction.
///
/// Devices receive a shared handle to a service when they are created instead of looking one up
/// globally, so a stack can decide how its buffers are laid out.
pub trait BufferService: Send + Sync {
    /// Allocates an empty buffer with `header_reserve` bytes of headroom.
    fn create(&self, header_reserve: usize) -> Result<NetBuffer, BufferError>;

    /// Copies `buffer` into a newly allocated one. The copy is not guaranteed to be contiguous.
    fn duplicate(&self, buffer: &NetBuffer) -> Option<NetBuffer>;
}

/// Allocates buffers from the heap.
#[derive(Clone, Copy, Debug)]
pub struct HeapBufferService {
    max_segment: usize,
    max_length: usize,
}

impl HeapBufferService {
    pub fn new() -> Self {
        Self::with_max_segment(usize::MAX)
    }

    /// Limits every segment the service hands out to `max_segment` bytes.
    pub fn with_max_segment(max_segment: usize) -> Self {
        Self {
            max_segment,
            max_length: usize::MAX,
        }
    }

    /// Limits the total length buffers from this service may be grown to.
    pub fn limit_length(self, max_length: usize) -> Self {
        Self { max_length, ..self }
    }

    fn allocate(&self, header_reserve: usize) -> NetBuffer {
        let mut buffer = NetBuffer::with_max_segment(header_reserve, self.max_segment);
        buffer.set_limit(self.max_length);
        buffer
    }
}

impl Default for HeapBufferService {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferService for HeapBufferService {
    fn create(&self, header_reserve: usize) -> Result<NetBuffer, BufferError> {
        Ok(self.allocate(header_reserve))
    }

    fn duplicate(&self, buffer: &NetBuffer) -> Option<NetBuffer> {
        let mut copy = self.allocate(buffer.headroom());
        for data in buffer.segments() {
            copy.append(data).ok()?;
        }
        copy.set_protocol(buffer.protocol());
        copy.set_flags(buffer.flags());
        Some(copy)
    }
}
