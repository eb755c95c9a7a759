//Let's use this area for now to declare common structs, constants, and common helper functions.

pub const ETHER_ADDRESS_LENGTH: usize = 6;

pub const IPV4_ETHER_TYPE: u16 = 0x0800;
pub const ARP_ETHER_TYPE: u16 = 0x0806;
pub const IPV6_ETHER_TYPE: u16 = 0x86DD;

//Most significant byte is 0th
#[derive(Eq, Clone, Copy, Hash, PartialEq, Debug, Default)]
pub struct MacAddr {
    pub bytes: [u8; ETHER_ADDRESS_LENGTH],
}

impl MacAddr {
    /// The all-zero address used by synthesized tunnel headers.
    pub const ZERO: MacAddr = MacAddr {
        bytes: [0; ETHER_ADDRESS_LENGTH],
    };

    pub const BROADCAST: MacAddr = MacAddr {
        bytes: [0xff; ETHER_ADDRESS_LENGTH],
    };

    pub fn new(bytes: [u8; ETHER_ADDRESS_LENGTH]) -> MacAddr {
        MacAddr { bytes }
    }

    pub fn is_zero(&self) -> bool {
        *self == MacAddr::ZERO
    }
}
