use crate::{framing, Error, ErrorKind, TunDevice};
use failure::ResultExt;
use log::{trace, warn};
use netbuf::{BufferError, NetBuffer};
use std::fmt;
use tunfd::Transport;

/// Headroom requested for every inbound buffer, enough for the link header and whatever the
/// stack wants to put in front of it.
pub const RECEIVE_HEADER_RESERVE: usize = 256;

impl TunDevice {
    /// Blocks until the transport delivers a frame and returns it as a packet buffer carrying a
    /// synthetic IPv4 link header.
    pub fn receive(&self) -> Result<NetBuffer, Error> {
        let transport = self.transport.as_deref().ok_or(ErrorKind::NotReady)?;

        let mut buffer = self
            .buffers
            .create(RECEIVE_HEADER_RESERVE)
            .context(ErrorKind::OutOfMemory)?;

        match &self.read_scratch {
            Some(scratch) => {
                let mut lease = scratch.lease();
                let frame = lease.region(self.frame_size)?;
                let read = self.read_frame(transport, frame)?;
                framing::frame(&mut buffer);
                buffer
                    .append(&frame[..read])
                    .map_err(|err| self.drop_frame(err))?;
            }
            None => {
                let frame = match buffer.append_size(self.mtu)? {
                    Some(frame) => frame,
                    None => {
                        warn!(
                            "{}: no contiguous region of {} bytes to receive into",
                            self.name, self.mtu
                        );
                        return Err(ErrorKind::Unsupported.into());
                    }
                };
                let read = self.read_frame(transport, frame)?;
                framing::frame(&mut buffer);
                buffer
                    .trim(self.header_length + read)
                    .map_err(|err| self.drop_frame(err))?;
            }
        }

        trace!("{}: received {}", self.name, HexDump(&buffer));
        self.stats.receive.record_packet(buffer.len());
        Ok(buffer)
    }

    fn read_frame(&self, transport: &dyn Transport, frame: &mut [u8]) -> Result<usize, Error> {
        transport.read(frame).map_err(|err| {
            self.stats.receive.record_error();
            warn!("{}: transport read failed: {}", self.name, err);
            Error::from(err)
        })
    }

    fn drop_frame(&self, err: BufferError) -> Error {
        self.stats.receive.record_dropped();
        warn!("{}: dropped inbound frame: {}", self.name, err);
        Error::from(err)
    }
}

/// Formats a buffer as its length followed by sixteen hex bytes per line.
struct HexDump<'a>(&'a NetBuffer);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} bytes", self.0.len())?;
        let bytes = self.0.segments().flat_map(|segment| segment.iter());
        for (i, byte) in bytes.enumerate() {
            if i % 16 == 0 {
                write!(f, "\n  {:04x}:", i)?;
            }
            write!(f, " {:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test::{failing_buffers, heap_buffers, ScriptedTransport};
    use crate::DeviceConfig;
    use netbuf::HeapBufferService;
    use std::{io, sync::Arc};
    use tunlink_packets::{EthernetHeader, ETHER_HEADER_LENGTH, IPV4_ETHER_TYPE};

    fn up_device(config: DeviceConfig, transport: &ScriptedTransport) -> TunDevice {
        let mut device = TunDevice::initialize(config, heap_buffers(), transport.opener()).unwrap();
        device.activate().unwrap();
        device
    }

    fn assert_synthetic_header(buffer: &NetBuffer) {
        let mut raw = [0; ETHER_HEADER_LENGTH];
        buffer.read(0, &mut raw).unwrap();
        let header = EthernetHeader::from_bytes(&raw).unwrap();
        assert!(header.destination.is_zero());
        assert!(header.source.is_zero());
        assert_eq!(header.ether_type, IPV4_ETHER_TYPE);
        assert_eq!(&raw[12..], &[0x08, 0x00]);
        assert_eq!(buffer.protocol(), IPV4_ETHER_TYPE);
    }

    #[test]
    fn receive_without_scratch() {
        let transport = ScriptedTransport::new();
        let device = up_device(DeviceConfig::new("tun0"), &transport);

        let payload: Vec<u8> = (0..64).collect();
        transport.push_read(&payload);

        let buffer = device.receive().unwrap();
        assert_eq!(buffer.len(), 64 + 14);
        assert_eq!(buffer.segment_count(), 1);
        assert_synthetic_header(&buffer);
        assert_eq!(&buffer.to_vec()[14..], &payload[..]);

        let receive = device.stats().snapshot().receive;
        assert_eq!(receive.packets, 1);
        assert_eq!(receive.bytes, 78);
    }

    #[test]
    fn receive_with_scratch() {
        let transport = ScriptedTransport::new();
        let device = up_device(DeviceConfig::new("tap0").read_scratch(true), &transport);

        let payload = vec![0x5a; 1200];
        transport.push_read(&payload);
        transport.push_read(&[1, 2, 3]);

        let buffer = device.receive().unwrap();
        assert_eq!(buffer.len(), 1214);
        assert_synthetic_header(&buffer);
        assert_eq!(&buffer.to_vec()[14..], &payload[..]);

        // only the bytes of the second frame are copied out of the region
        let buffer = device.receive().unwrap();
        assert_eq!(buffer.to_vec()[14..], [1, 2, 3]);

        let receive = device.stats().snapshot().receive;
        assert_eq!(receive.packets, 2);
        assert_eq!(receive.bytes, 1214 + 17);
    }

    #[test]
    fn receive_reads_up_to_frame_size_with_scratch() {
        let transport = ScriptedTransport::new();
        let device = up_device(DeviceConfig::new("tap0").read_scratch(true), &transport);

        transport.push_read(&vec![0xff; 1600]);
        let buffer = device.receive().unwrap();
        assert_eq!(buffer.len(), 1518 + 14);
    }

    #[test]
    fn receive_reads_up_to_mtu_without_scratch() {
        let transport = ScriptedTransport::new();
        let mut device = up_device(DeviceConfig::new("tun0"), &transport);
        device.set_mtu(576).unwrap();

        transport.push_read(&vec![0xff; 1000]);
        let buffer = device.receive().unwrap();
        assert_eq!(buffer.len(), 576 + 14);
    }

    #[test]
    fn receive_scattered_growth_unsupported() {
        let transport = ScriptedTransport::new();
        let mut device = TunDevice::initialize(
            DeviceConfig::new("tun0"),
            Arc::new(HeapBufferService::with_max_segment(512)),
            transport.opener(),
        )
        .unwrap();
        device.activate().unwrap();
        transport.push_read(&[1; 64]);

        let err = device.receive().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        // nothing was read
        assert_eq!(transport.pending_reads(), 1);
        assert_eq!(device.stats().snapshot().receive.packets, 0);
    }

    #[test]
    fn receive_scattered_service_with_scratch() {
        let transport = ScriptedTransport::new();
        let mut device = TunDevice::initialize(
            DeviceConfig::new("tun0").read_scratch(true),
            Arc::new(HeapBufferService::with_max_segment(512)),
            transport.opener(),
        )
        .unwrap();
        device.activate().unwrap();
        transport.push_read(&[9; 1000]);

        let buffer = device.receive().unwrap();
        assert_eq!(buffer.len(), 1014);
        assert!(buffer.segment_count() > 1);
        assert_synthetic_header(&buffer);
    }

    #[test]
    fn receive_drops_frame_past_buffer_limit() {
        let transport = ScriptedTransport::new();
        let mut device = TunDevice::initialize(
            DeviceConfig::new("tap0").read_scratch(true),
            Arc::new(HeapBufferService::new().limit_length(100)),
            transport.opener(),
        )
        .unwrap();
        device.activate().unwrap();
        transport.push_read(&[0x45; 200]);
        transport.push_read(&[0x45; 80]);

        let err = device.receive().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        let receive = device.stats().snapshot().receive;
        assert_eq!(receive.dropped, 1);
        assert_eq!(receive.packets, 0);
        assert_eq!(receive.errors, 0);

        // the oversized frame was consumed, the next one fits
        let buffer = device.receive().unwrap();
        assert_eq!(buffer.len(), 94);
        let receive = device.stats().snapshot().receive;
        assert_eq!(receive.dropped, 1);
        assert_eq!(receive.packets, 1);
    }

    #[test]
    fn receive_limit_below_mtu_without_scratch() {
        let transport = ScriptedTransport::new();
        let mut device = TunDevice::initialize(
            DeviceConfig::new("tun0"),
            Arc::new(HeapBufferService::new().limit_length(100)),
            transport.opener(),
        )
        .unwrap();
        device.activate().unwrap();
        transport.push_read(&[0x45; 20]);

        // the receive region cannot be reserved, so nothing is read or dropped
        let err = device.receive().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert_eq!(transport.pending_reads(), 1);
        assert_eq!(device.stats().snapshot().receive.dropped, 0);
    }

    #[test]
    fn receive_allocation_failure() {
        let transport = ScriptedTransport::new();
        let mut device =
            TunDevice::initialize(DeviceConfig::new("tun0"), failing_buffers(), transport.opener())
                .unwrap();
        device.activate().unwrap();
        transport.push_read(&[1; 8]);

        let err = device.receive().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert_eq!(transport.pending_reads(), 1);
    }

    #[test]
    fn receive_transport_error() {
        let transport = ScriptedTransport::new();
        let device = up_device(DeviceConfig::new("tap0"), &transport);

        // EBADF
        transport.fail_next_read(io::Error::from_raw_os_error(9));
        let err = device.receive().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.raw_os_error(), Some(9));

        let receive = device.stats().snapshot().receive;
        assert_eq!(receive.errors, 1);
        assert_eq!(receive.packets, 0);
    }

    #[test]
    fn receive_when_not_up() {
        let transport = ScriptedTransport::new();
        let device =
            TunDevice::initialize(DeviceConfig::new("tun0"), heap_buffers(), transport.opener())
                .unwrap();
        assert_eq!(device.receive().unwrap_err().kind(), ErrorKind::NotReady);
    }

    #[test]
    fn hex_dump_layout() {
        let buffer = NetBuffer::from_segments(vec![&[0u8; 10][..], &[0xab; 8][..]]);
        let dump = HexDump(&buffer).to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "18 bytes");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("  0000: 00"));
        assert_eq!(lines[2], "  0010: ab ab");
    }
}
