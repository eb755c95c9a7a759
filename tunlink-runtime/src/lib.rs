/// Errors returned by device operations. Each error carries an `ErrorKind`, and transport failures
/// keep the system error code the transport reported.
mod error;
pub use self::error::{Error, ErrorKind, SendError};

/// Device configuration, the interface flags and media words advertised to the stack, and the
/// rules that derive them from an interface name.
pub mod config;
pub use self::config::{DeviceClass, DeviceConfig, InterfaceFlags, InterfaceType, Media};

/// A tunnel device is created from a `DeviceConfig`, a buffer service and a transport opener. It
/// opens its transport when brought up and closes it when brought down. While up, the host hands
/// outbound packets to `send` and pulls inbound packets from `receive`; both may run at the same
/// time from different threads.
mod device;
pub use self::device::{DeviceState, TunDevice};

/// Outbound pipeline: strips the link header and writes the packet to the transport in a single
/// call, flattening scattered buffers first.
mod egress;

/// Inbound pipeline: reads one frame from the transport into a fresh buffer and puts a synthetic
/// link header in front of it.
mod ingress;
pub use self::ingress::RECEIVE_HEADER_RESERVE;

/// Strips and synthesizes the Ethernet-shaped header the stack expects on every packet.
pub mod framing;

/// Reusable flat regions that spare the pipelines an allocation per scattered packet.
pub mod scratch;

/// Per-direction traffic counters.
pub mod stats;
pub use self::stats::{Counters, DeviceStats, StatsSnapshot};

/// Name-keyed ownership of all devices on a host.
mod registry;
pub use self::registry::DeviceRegistry;

#[cfg(feature = "tokio-support")]
mod async_device;
#[cfg(feature = "tokio-support")]
pub use self::async_device::AsyncTunDevice;

#[cfg(test)]
mod utils;
