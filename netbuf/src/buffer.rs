use crate::BufferError;
use bytes::{Buf, BytesMut};
use std::{cmp, collections::VecDeque, io::IoSlice, iter};

/// A view over exactly one contiguous region of a buffer. Only ever lives for the duration of a
/// single read or write call.
pub type IoVec<'a> = IoSlice<'a>;

/// One contiguous run of bytes. `storage[..start]` is headroom that headers can be written into
/// without moving the payload.
#[derive(Clone, Debug)]
struct Segment {
    storage: BytesMut,
    start: usize,
}

impl Segment {
    fn with_headroom(headroom: usize) -> Segment {
        Segment {
            storage: BytesMut::zeroed(headroom),
            start: headroom,
        }
    }

    fn len(&self) -> usize {
        self.storage.len() - self.start
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data(&self) -> &[u8] {
        &self.storage[self.start..]
    }
}

/// Represents a packet owned by the network stack.
///
/// The bytes may be spread over several segments. The first segment carries the headroom
/// reserved at creation so that link headers can be prepended in place. No segment grows past
/// `max_segment` bytes, which models stacks that cannot always hand out a contiguous region.
/// Growing at the tail past `limit` bytes in total fails with `NoMemory`.
#[derive(Clone, Debug)]
pub struct NetBuffer {
    segments: VecDeque<Segment>,
    len: usize,
    max_segment: usize,
    limit: usize,
    protocol: u16,
    flags: u32,
}

impl NetBuffer {
    /// Creates an empty buffer with `header_reserve` bytes of room at the front.
    pub fn new(header_reserve: usize) -> NetBuffer {
        NetBuffer::with_max_segment(header_reserve, usize::MAX)
    }

    /// Creates an empty buffer whose segments never exceed `max_segment` bytes.
    pub fn with_max_segment(header_reserve: usize, max_segment: usize) -> NetBuffer {
        let mut segments = VecDeque::with_capacity(1);
        segments.push_back(Segment::with_headroom(header_reserve));
        NetBuffer {
            segments,
            len: 0,
            max_segment: cmp::max(max_segment, 1),
            limit: usize::MAX,
            protocol: 0,
            flags: 0,
        }
    }

    /// Creates a single segment buffer holding a copy of `data`.
    pub fn from_slice(data: &[u8]) -> NetBuffer {
        NetBuffer::from_segments(iter::once(data))
    }

    /// Creates a buffer with one segment per non-empty input slice.
    pub fn from_segments<'a, I>(segments: I) -> NetBuffer
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut buffer = NetBuffer::new(0);
        for segment in segments {
            buffer.push_segment(segment);
        }
        buffer
    }

    /// Caps the total length `append` and `append_size` may grow the buffer to.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Appends a copy of `data` as a segment of its own. Unlike `append`, this ignores both
    /// limits and never merges with the current tail.
    pub fn push_segment(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        match self.segments.back_mut() {
            // an empty tail without headroom is just a placeholder
            Some(tail) if tail.is_empty() && tail.start == 0 => {
                tail.storage.extend_from_slice(data)
            }
            _ => self.segments.push_back(Segment {
                storage: BytesMut::from(data),
                start: 0,
            }),
        }
        self.len += data.len();
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn protocol(&self) -> u16 {
        self.protocol
    }

    pub fn set_protocol(&mut self, protocol: u16) {
        self.protocol = protocol;
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.flags = flags;
    }

    /// Bytes that can currently be prepended without adding a segment.
    pub fn headroom(&self) -> usize {
        self.segments.front().map_or(0, |head| head.start)
    }

    /// Number of non-empty segments; what a scatter/gather call would need.
    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// Iterates over the non-empty segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &[u8]> {
        self.segments
            .iter()
            .filter(|segment| !segment.is_empty())
            .map(Segment::data)
    }

    /// Fills `iovecs` with views over the buffer's segments and returns how many were written.
    /// At most `iovecs.len()` segments are materialized.
    pub fn iovecs<'a>(&'a self, iovecs: &mut [IoVec<'a>]) -> usize {
        let mut count = 0;
        for (slot, data) in iovecs.iter_mut().zip(self.segments()) {
            *slot = IoVec::new(data);
            count += 1;
        }
        count
    }

    /// Appends a copy of `data`, filling the tail segment before starting new ones.
    pub fn append(&mut self, data: &[u8]) -> Result<(), BufferError> {
        self.check_growth(data.len())?;
        let mut rest = data;
        while !rest.is_empty() {
            let room = self.tail_room();
            if room == 0 {
                self.segments.push_back(Segment::with_headroom(0));
                continue;
            }
            let take = cmp::min(room, rest.len());
            self.tail().storage.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
        }
        self.len += data.len();
        Ok(())
    }

    /// Grows the buffer by `size` zeroed bytes.
    ///
    /// Returns the new region when it fits in the tail segment. When the growth has to be spread
    /// over several segments the bytes are still appended, but `None` is returned because no
    /// single region covers them.
    pub fn append_size(&mut self, size: usize) -> Result<Option<&mut [u8]>, BufferError> {
        self.check_growth(size)?;
        if size <= self.tail_room() {
            self.len += size;
            let tail = self.tail();
            let end = tail.storage.len();
            tail.storage.resize(end + size, 0);
            return Ok(Some(&mut tail.storage[end..]));
        }

        let mut rest = size;
        while rest > 0 {
            let room = self.tail_room();
            if room == 0 {
                self.segments.push_back(Segment::with_headroom(0));
                continue;
            }
            let take = cmp::min(room, rest);
            let tail = self.tail();
            let end = tail.storage.len();
            tail.storage.resize(end + take, 0);
            rest -= take;
        }
        self.len += size;
        Ok(None)
    }

    /// Makes room for `size` bytes at the front of the buffer and returns that region, zeroed.
    /// The head segment's headroom is used when large enough, otherwise a new head is inserted.
    pub fn prepend_size(&mut self, size: usize) -> &mut [u8] {
        let fits = self.segments.front().map_or(false, |head| head.start >= size);
        if !fits {
            self.segments.push_front(Segment::with_headroom(size));
        }
        self.len += size;

        let head = &mut self.segments[0];
        head.start -= size;
        let region = &mut head.storage[head.start..head.start + size];
        region.fill(0);
        region
    }

    /// Prepends a copy of `data`.
    pub fn prepend(&mut self, data: &[u8]) {
        self.prepend_size(data.len()).copy_from_slice(data);
    }

    /// Removes `size` bytes from the front. The space becomes headroom.
    pub fn remove_header(&mut self, size: usize) -> Result<(), BufferError> {
        if size > self.len {
            return Err(BufferError::TooShort {
                requested: size,
                available: self.len,
            });
        }

        let mut rest = size;
        for segment in self.segments.iter_mut() {
            if rest == 0 {
                break;
            }
            let take = cmp::min(rest, segment.len());
            segment.start += take;
            rest -= take;
        }
        self.len -= size;
        Ok(())
    }

    /// Cuts the buffer down to its first `new_len` bytes.
    pub fn trim(&mut self, new_len: usize) -> Result<(), BufferError> {
        if new_len > self.len {
            return Err(BufferError::TooShort {
                requested: new_len,
                available: self.len,
            });
        }

        let mut keep = new_len;
        for segment in self.segments.iter_mut() {
            let take = cmp::min(keep, segment.len());
            let end = segment.start + take;
            segment.storage.truncate(end);
            keep -= take;
        }
        // the head owns the headroom, so it stays even when empty
        while self.segments.len() > 1 && self.segments.back().map_or(false, Segment::is_empty) {
            self.segments.pop_back();
        }
        self.len = new_len;
        Ok(())
    }

    /// Copies `dst.len()` bytes starting at `offset` out of the buffer.
    pub fn read(&self, offset: usize, dst: &mut [u8]) -> Result<(), BufferError> {
        let wanted = offset.saturating_add(dst.len());
        if wanted > self.len {
            return Err(BufferError::TooShort {
                requested: wanted,
                available: self.len,
            });
        }

        let mut skip = offset;
        let mut copied = 0;
        for data in self.segments() {
            if copied == dst.len() {
                break;
            }
            if skip >= data.len() {
                skip -= data.len();
                continue;
            }
            let chunk = &data[skip..];
            skip = 0;
            let take = cmp::min(chunk.len(), dst.len() - copied);
            dst[copied..copied + take].copy_from_slice(&chunk[..take]);
            copied += take;
        }
        Ok(())
    }

    /// Returns the buffer's content as one flat vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for data in self.segments() {
            out.extend_from_slice(data);
        }
        out
    }

    fn check_growth(&self, size: usize) -> Result<(), BufferError> {
        match self.len.checked_add(size) {
            Some(len) if len <= self.limit => Ok(()),
            _ => Err(BufferError::NoMemory),
        }
    }

    fn tail_room(&self) -> usize {
        self.segments
            .back()
            .map_or(0, |tail| self.max_segment.saturating_sub(tail.len()))
    }

    fn tail(&mut self) -> &mut Segment {
        if self.segments.is_empty() {
            self.segments.push_back(Segment::with_headroom(0));
        }
        let last = self.segments.len() - 1;
        &mut self.segments[last]
    }
}

impl Buf for NetBuffer {
    #[inline]
    fn remaining(&self) -> usize {
        self.len
    }

    fn chunk(&self) -> &[u8] {
        self.segments().next().unwrap_or(&[])
    }

    fn chunks_vectored<'a>(&'a self, dst: &mut [IoSlice<'a>]) -> usize {
        self.iovecs(dst)
    }

    fn advance(&mut self, cnt: usize) {
        if let Err(err) = self.remove_header(cnt) {
            panic!("cannot advance past the end of a NetBuffer: {}", err);
        }
    }
}
