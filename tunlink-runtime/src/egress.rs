use crate::{framing, Error, ErrorKind, SendError, TunDevice};
use log::{trace, warn};
use netbuf::{IoVec, NetBuffer};
use tunfd::Transport;

impl TunDevice {
    /// Hands an outbound packet to the transport.
    ///
    /// The link header is stripped and the remaining bytes go out in exactly one write. Scattered
    /// buffers are flattened into the write scratch region when the device has one, otherwise
    /// into a copy from the buffer service.
    ///
    /// The buffer is consumed only on success. Every error hands it back unchanged, link header
    /// included, inside the [`SendError`]().
    ///
    /// Returns the number of bytes the transport accepted, which may be short of the packet
    /// length.
    pub fn send(&self, mut buffer: NetBuffer) -> Result<usize, SendError> {
        let transport = match self.transport.as_deref() {
            Some(transport) => transport,
            None => return Err(SendError::new(ErrorKind::NotReady.into(), buffer)),
        };

        let header = match framing::deframe(&mut buffer) {
            Ok(header) => header,
            Err(err) => return Err(SendError::new(err, buffer)),
        };
        trace!(
            "{}: send {} bytes in {} segment(s), ether type {:#06x}",
            self.name,
            buffer.len(),
            buffer.segment_count(),
            header.ether_type
        );

        match self.write_packet(transport, &buffer) {
            Ok(written) => {
                self.stats.send.record_packet(written);
                Ok(written)
            }
            Err(err) => {
                buffer.prepend(&header.to_bytes());
                Err(SendError::new(err, buffer))
            }
        }
    }

    fn write_packet(&self, transport: &dyn Transport, buffer: &NetBuffer) -> Result<usize, Error> {
        if buffer.len() > self.mtu {
            Err(ErrorKind::InvalidArgument)?
        }

        if buffer.segment_count() <= 1 {
            return self.write_contiguous(transport, buffer);
        }

        if let Some(scratch) = &self.write_scratch {
            let mut lease = scratch.lease();
            let frame = lease.region(buffer.len())?;
            buffer.read(0, frame)?;
            return self.write_frame(transport, frame);
        }

        let copy = self
            .buffers
            .duplicate(buffer)
            .ok_or(ErrorKind::OutOfMemory)?;
        if copy.segment_count() > 1 {
            warn!(
                "{}: cannot send {} bytes spread over {} segments",
                self.name,
                copy.len(),
                copy.segment_count()
            );
            self.stats.send.record_error();
            Err(ErrorKind::Unsupported)?
        }
        self.write_contiguous(transport, &copy)
    }

    fn write_contiguous(
        &self,
        transport: &dyn Transport,
        buffer: &NetBuffer,
    ) -> Result<usize, Error> {
        let mut iovecs = [IoVec::new(&[])];
        buffer.iovecs(&mut iovecs);
        self.write_frame(transport, &iovecs[0])
    }

    fn write_frame(&self, transport: &dyn Transport, frame: &[u8]) -> Result<usize, Error> {
        transport.write(frame).map_err(|err| {
            self.stats.send.record_error();
            warn!("{}: transport write failed: {}", self.name, err);
            Error::from(err)
        })
    }
}
