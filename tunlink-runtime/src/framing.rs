//! Applies the Ethernet-shaped link header to packet buffers at the tunnel boundary.

use crate::{Error, ErrorKind};
use failure::ResultExt;
use netbuf::NetBuffer;
use tunlink_packets::{EthernetHeader, ETHER_HEADER_LENGTH, IPV4_ETHER_TYPE};

/// Removes the link header from the front of `buffer` and returns it.
pub fn deframe(buffer: &mut NetBuffer) -> Result<EthernetHeader, Error> {
    let mut raw = [0; ETHER_HEADER_LENGTH];
    buffer.read(0, &mut raw).context(ErrorKind::FramingError)?;
    let header =
        EthernetHeader::from_bytes(&raw).map_err(|_| Error::from(ErrorKind::FramingError))?;
    buffer
        .remove_header(ETHER_HEADER_LENGTH)
        .context(ErrorKind::FramingError)?;
    Ok(header)
}

/// Prepends a placeholder header: zero addresses, IPv4 ether type.
pub fn frame(buffer: &mut NetBuffer) {
    let header = EthernetHeader::placeholder(IPV4_ETHER_TYPE);
    buffer.prepend(&header.to_bytes());
    buffer.set_protocol(IPV4_ETHER_TYPE);
}
