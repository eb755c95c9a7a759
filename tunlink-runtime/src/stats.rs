use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one direction of traffic. Only the pipeline owning the direction updates them.
#[derive(Debug, Default)]
pub struct DirectionStats {
    packets: AtomicU64,
    bytes: AtomicU64,
    errors: AtomicU64,
    dropped: AtomicU64,
}

impl DirectionStats {
    pub(crate) fn record_packet(&self, bytes: usize) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Counters {
        Counters {
            packets: self.packets.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a direction's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub packets: u64,
    pub bytes: u64,
    pub errors: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub struct DeviceStats {
    pub send: DirectionStats,
    pub receive: DirectionStats,
}

impl DeviceStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            send: self.send.snapshot(),
            receive: self.receive.snapshot(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub send: Counters,
    pub receive: Counters,
}
