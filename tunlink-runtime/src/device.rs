use crate::{
    config::{mtu_in_range, DeviceClass, DeviceConfig, InterfaceFlags, InterfaceType, Media},
    scratch::ScratchBuffer,
    stats::DeviceStats,
    Error, ErrorKind,
};
use log::{debug, warn};
use netbuf::BufferService;
use std::{fmt, net::IpAddr, sync::Arc};
use tunfd::{Opener, Transport};
use tunlink_packets::{ETHER_HEADER_LENGTH, ETHER_MAX_FRAME_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    /// Created, transport never opened.
    Initialized,
    /// Transport open; the pipelines may run.
    Up,
    /// Transport closed, or never opened and explicitly brought down.
    Down,
}

/// A virtual tunnel interface bridging a raw frame transport to the stack's packet buffers.
///
/// `send` and `receive` take `&self` and may run concurrently from different threads, typically
/// through an `Arc<TunDevice>`. Everything that changes the transport or the MTU takes
/// `&mut self`, so it cannot overlap with an in-flight pipeline call.
pub struct TunDevice {
    pub(crate) name: String,
    class: DeviceClass,
    flags: InterfaceFlags,
    pub(crate) mtu: usize,
    pub(crate) header_length: usize,
    pub(crate) frame_size: usize,
    state: DeviceState,
    pub(crate) transport: Option<Box<dyn Transport>>,
    pub(crate) read_scratch: Option<ScratchBuffer>,
    pub(crate) write_scratch: Option<ScratchBuffer>,
    pub(crate) stats: DeviceStats,
    pub(crate) buffers: Arc<dyn BufferService>,
    opener: Arc<dyn Opener>,
}

impl TunDevice {
    /// Creates a device from `config`. The name must start with one of the recognized prefixes
    /// and the MTU must lie in the allowed range.
    ///
    /// `buffers` allocates every packet the device produces and `opener` is used each time the
    /// device is brought up.
    pub fn initialize(
        config: DeviceConfig,
        buffers: Arc<dyn BufferService>,
        opener: Arc<dyn Opener>,
    ) -> Result<TunDevice, Error> {
        let class = DeviceClass::from_name(config.name()).ok_or(ErrorKind::InvalidArgument)?;
        if !mtu_in_range(config.initial_mtu()) {
            Err(ErrorKind::InvalidArgument)?
        }

        let read_scratch = if config.has_read_scratch() {
            Some(ScratchBuffer::new(ETHER_MAX_FRAME_SIZE)?)
        } else {
            None
        };
        let write_scratch = if config.has_write_scratch() {
            Some(ScratchBuffer::new(config.initial_mtu())?)
        } else {
            None
        };

        debug!("{}: tunnel device created ({:?})", config.name(), class);
        Ok(TunDevice {
            class,
            flags: class.default_flags(),
            mtu: config.initial_mtu(),
            header_length: ETHER_HEADER_LENGTH,
            frame_size: 0,
            state: DeviceState::Initialized,
            transport: None,
            read_scratch,
            write_scratch,
            stats: DeviceStats::default(),
            buffers,
            opener,
            name: config.name().to_owned(),
        })
    }

    /// Opens the transport and brings the device up. On failure the device keeps its state and
    /// the error carries the system error code.
    pub fn activate(&mut self) -> Result<(), Error> {
        if self.transport.is_some() {
            return Ok(());
        }

        debug!("{}: opening transport", self.name);
        let transport = match self.opener.open() {
            Ok(transport) => transport,
            Err(err) => {
                warn!("{}: failed to open transport: {}", self.name, err);
                return Err(err.into());
            }
        };

        self.transport = Some(transport);
        self.frame_size = ETHER_MAX_FRAME_SIZE;
        self.state = DeviceState::Up;
        Ok(())
    }

    /// Closes the transport and marks the device down. Calling this on a device that is not up
    /// only records the state.
    pub fn deactivate(&mut self) {
        if self.transport.take().is_some() {
            debug!("{}: transport closed", self.name);
        }
        self.state = DeviceState::Down;
    }

    /// Brings the device down and releases everything it holds.
    pub fn teardown(mut self) {
        self.deactivate();
        debug!("{}: tunnel device removed", self.name);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn flags(&self) -> InterfaceFlags {
        self.flags
    }

    pub fn interface_type(&self) -> InterfaceType {
        InterfaceType::Ether
    }

    pub fn media(&self) -> Media {
        Media::ACTIVE | Media::ETHER
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_up(&self) -> bool {
        self.transport.is_some()
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn header_length(&self) -> usize {
        self.header_length
    }

    /// Largest raw frame the transport delivers. Zero until the device has been up.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }

    pub fn has_read_scratch(&self) -> bool {
        self.read_scratch.is_some()
    }

    pub fn has_write_scratch(&self) -> bool {
        self.write_scratch.is_some()
    }

    pub fn set_mtu(&mut self, mtu: usize) -> Result<(), Error> {
        if !mtu_in_range(mtu) {
            Err(ErrorKind::InvalidArgument)?
        }
        self.mtu = mtu;
        Ok(())
    }

    pub fn set_promiscuous(&mut self, _promiscuous: bool) -> Result<(), Error> {
        Err(ErrorKind::Unsupported)?
    }

    pub fn set_media(&mut self, _media: Media) -> Result<(), Error> {
        Err(ErrorKind::Unsupported)?
    }

    /// Accepted and ignored: every frame on the tunnel reaches the stack anyway.
    pub fn add_multicast(&mut self, _group: IpAddr) -> Result<(), Error> {
        Ok(())
    }

    pub fn remove_multicast(&mut self, _group: IpAddr) -> Result<(), Error> {
        Ok(())
    }

    /// Device specific control requests. None are defined for tunnels.
    pub fn control(&mut self, _op: u32, _argument: &mut [u8]) -> Result<(), Error> {
        Err(ErrorKind::InvalidArgument)?
    }
}

impl fmt::Debug for TunDevice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TunDevice")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("flags", &self.flags)
            .field("mtu", &self.mtu)
            .field("frame_size", &self.frame_size)
            .field("state", &self.state)
            .field("read_scratch", &self.read_scratch.is_some())
            .field("write_scratch", &self.write_scratch.is_some())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
