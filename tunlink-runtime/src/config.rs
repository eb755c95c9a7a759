use bitflags::bitflags;

pub const DEFAULT_MTU: usize = 1500;
pub const MIN_MTU: usize = 16;
pub const MAX_MTU: usize = 65536;

/// Name prefixes a tunnel device may be created under. `dns` is kept for DNS tunnelling tools
/// that name their interfaces that way.
pub const NAME_PREFIXES: [&str; 3] = ["tun", "tap", "dns"];

bitflags! {
    /// Interface flags advertised to the stack.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct InterfaceFlags: u32 {
        const UP = 0x0001;
        const BROADCAST = 0x0002;
        const LOOPBACK = 0x0008;
        const POINTOPOINT = 0x0010;
        const NOARP = 0x0040;
        const PROMISC = 0x0100;
        const ALLMULTI = 0x0200;
        const LINK = 0x1000;
        const MULTICAST = 0x8000;
    }
}

bitflags! {
    /// Media word reported for the interface.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Media: u32 {
        const ACTIVE = 0x0002;
        const ETHER = 0x0020;
    }
}

/// Interface type reported to the stack. Both classes look like Ethernet from above.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    Ether = 0x06,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// `tun` style: a link to exactly one peer.
    PointToPoint,
    /// `tap` style: behaves like a segment of a broadcast network.
    Broadcast,
}

impl DeviceClass {
    /// Derives the class from an interface name, or `None` if the prefix is not recognized.
    pub fn from_name(name: &str) -> Option<DeviceClass> {
        if name.starts_with("tap") {
            Some(DeviceClass::Broadcast)
        } else if name.starts_with("tun") || name.starts_with("dns") {
            Some(DeviceClass::PointToPoint)
        } else {
            None
        }
    }

    pub fn default_flags(self) -> InterfaceFlags {
        match self {
            DeviceClass::PointToPoint => InterfaceFlags::POINTOPOINT | InterfaceFlags::LINK,
            DeviceClass::Broadcast => {
                InterfaceFlags::BROADCAST | InterfaceFlags::ALLMULTI | InterfaceFlags::LINK
            }
        }
    }
}

pub fn mtu_in_range(mtu: usize) -> bool {
    (MIN_MTU..=MAX_MTU).contains(&mtu)
}

/// Settings a device is created with.
///
/// ```
/// use tunlink_runtime::DeviceConfig;
///
/// let config = DeviceConfig::new("tap0").mtu(9000).write_scratch(true);
/// assert_eq!(config.name(), "tap0");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    name: String,
    mtu: usize,
    read_scratch: bool,
    write_scratch: bool,
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mtu: DEFAULT_MTU,
            read_scratch: false,
            write_scratch: false,
        }
    }

    /// Initial MTU. Checked against the allowed range when the device is created.
    pub fn mtu(self, mtu: usize) -> Self {
        Self { mtu, ..self }
    }

    /// Reads from the transport land in a reusable region instead of the packet buffer.
    pub fn read_scratch(self, enabled: bool) -> Self {
        Self {
            read_scratch: enabled,
            ..self
        }
    }

    /// Scattered outbound buffers are flattened into a reusable region instead of a fresh copy.
    pub fn write_scratch(self, enabled: bool) -> Self {
        Self {
            write_scratch: enabled,
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_mtu(&self) -> usize {
        self.mtu
    }

    pub fn has_read_scratch(&self) -> bool {
        self.read_scratch
    }

    pub fn has_write_scratch(&self) -> bool {
        self.write_scratch
    }
}
