use crate::*;

pub const ETHER_HEADER_LENGTH: usize = 14;
pub const ETHER_CRC_LENGTH: usize = 4;
pub const ETHER_MAX_MTU: usize = 1500;
/// Largest frame a tunnel endpoint hands us: header, a full MTU, and the trailing CRC.
pub const ETHER_MAX_FRAME_SIZE: usize = ETHER_HEADER_LENGTH + ETHER_MAX_MTU + ETHER_CRC_LENGTH;

const DEST_MAC_RANGE: (usize, usize) = (0, 6);
const SRC_MAC_RANGE: (usize, usize) = (6, 12);
const ETHER_TYPE_RANGE: (usize, usize) = (12, 14);

/// The fixed 14 byte Ethernet II header.
///
/// ```text
/// 0                    6                    12                      14
/// |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType---|
/// ```
///
/// Raw tunnel streams carry no link layer at all, so this header only exists at the boundary
/// between the tunnel and the stack above it: it is stripped from outbound frames and a
/// placeholder is synthesized for inbound ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub ether_type: u16,
}

impl EthernetHeader {
    pub fn new(destination: MacAddr, source: MacAddr, ether_type: u16) -> EthernetHeader {
        EthernetHeader {
            destination,
            source,
            ether_type,
        }
    }

    /// Returns a header with zeroed source and destination addresses.
    pub fn placeholder(ether_type: u16) -> EthernetHeader {
        EthernetHeader::new(MacAddr::ZERO, MacAddr::ZERO, ether_type)
    }

    /// Parses the header found at the start of `frame`. Any bytes past the header are ignored.
    pub fn from_bytes(frame: &[u8]) -> Result<EthernetHeader, &'static str> {
        if frame.len() < ETHER_HEADER_LENGTH {
            return Err("Frame is less than the minimum of 14 bytes");
        }

        Ok(EthernetHeader {
            destination: MacAddr::new(mac_at(frame, DEST_MAC_RANGE)),
            source: MacAddr::new(mac_at(frame, SRC_MAC_RANGE)),
            ether_type: u16::from_be_bytes([
                frame[ETHER_TYPE_RANGE.0],
                frame[ETHER_TYPE_RANGE.0 + 1],
            ]),
        })
    }

    /// Serializes the header in network byte order.
    pub fn to_bytes(&self) -> [u8; ETHER_HEADER_LENGTH] {
        let mut out = [0; ETHER_HEADER_LENGTH];
        out[DEST_MAC_RANGE.0..DEST_MAC_RANGE.1].copy_from_slice(&self.destination.bytes);
        out[SRC_MAC_RANGE.0..SRC_MAC_RANGE.1].copy_from_slice(&self.source.bytes);
        out[ETHER_TYPE_RANGE.0..ETHER_TYPE_RANGE.1].copy_from_slice(&self.ether_type.to_be_bytes());
        out
    }

    pub fn is_ipv4(&self) -> bool {
        self.ether_type == IPV4_ETHER_TYPE
    }
}

fn mac_at(frame: &[u8], range: (usize, usize)) -> [u8; ETHER_ADDRESS_LENGTH] {
    let (start, end) = range;
    let mut mac = [0; ETHER_ADDRESS_LENGTH];
    mac.copy_from_slice(&frame[start..end]);
    mac
}
