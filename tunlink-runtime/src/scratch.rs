use crate::{Error, ErrorKind};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A preallocated flat region reused across calls, guarded by its own lock.
///
/// The region is only reachable through a [`ScratchLease`](), whose borrow ends when the lease is
/// dropped, so a view into the region can never outlive the locked window.
#[derive(Debug)]
pub struct ScratchBuffer {
    region: Mutex<Vec<u8>>,
}

impl ScratchBuffer {
    /// Allocates a zeroed region of `len` bytes. Reports `OutOfMemory` instead of aborting when the
    /// allocation cannot be satisfied.
    pub fn new(len: usize) -> Result<Self, Error> {
        let mut region = Vec::new();
        region
            .try_reserve_exact(len)
            .map_err(|_| Error::from(ErrorKind::OutOfMemory))?;
        region.resize(len, 0);
        Ok(Self {
            region: Mutex::new(region),
        })
    }

    /// Takes the lock, blocking while another call in the same direction holds it.
    pub fn lease(&self) -> ScratchLease<'_> {
        // The region is plain bytes; a panic while it was leased cannot leave it inconsistent.
        let guard = self.region.lock().unwrap_or_else(PoisonError::into_inner);
        ScratchLease { guard }
    }
}

/// Exclusive access to a scratch region for the duration of one pipeline call.
pub struct ScratchLease<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl ScratchLease<'_> {
    /// Returns the first `len` bytes of the region, growing it first if it is too small. A grow
    /// that cannot be satisfied reports `OutOfMemory` and leaves the region as it was.
    pub fn region(&mut self, len: usize) -> Result<&mut [u8], Error> {
        let current = self.guard.len();
        if current < len {
            self.guard
                .try_reserve(len - current)
                .map_err(|_| Error::from(ErrorKind::OutOfMemory))?;
            self.guard.resize(len, 0);
        }
        Ok(&mut self.guard[..len])
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::mpsc, thread, time::Duration};

    #[test]
    fn lease_is_exclusive() {
        let scratch = ScratchBuffer::new(64).unwrap();
        let (tx, rx) = mpsc::channel();

        crossbeam::scope(|s| {
            let mut lease = scratch.lease();
            lease.region(4).unwrap().copy_from_slice(&[1, 2, 3, 4]);

            let scratch = &scratch;
            s.spawn(move |_| {
                let mut lease = scratch.lease();
                tx.send(lease.region(4).unwrap().to_vec()).unwrap();
            });

            // the second lease waits for the first one
            assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
            drop(lease);
            assert_eq!(
                rx.recv_timeout(Duration::from_secs(1)).unwrap(),
                vec![1, 2, 3, 4]
            );
        })
        .unwrap();
    }

    #[test]
    fn region_grows_on_demand() {
        let scratch = ScratchBuffer::new(8).unwrap();
        let mut lease = scratch.lease();
        assert_eq!(lease.capacity(), 8);
        assert_eq!(lease.region(100).unwrap().len(), 100);
        assert_eq!(lease.capacity(), 100);
        assert_eq!(lease.region(10).unwrap().len(), 10);
        assert_eq!(lease.capacity(), 100);
    }

    #[test]
    fn impossible_grow() {
        let scratch = ScratchBuffer::new(16).unwrap();
        let mut lease = scratch.lease();
        lease.region(16).unwrap().copy_from_slice(&[0xab; 16]);

        let err = lease.region(usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert_eq!(lease.capacity(), 16);
        assert_eq!(lease.region(16).unwrap(), &[0xab; 16][..]);
    }

    #[test]
    fn impossible_allocation() {
        let err = ScratchBuffer::new(usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    }

    #[test]
    fn poisoned_lock_still_leases() {
        let scratch = std::sync::Arc::new(ScratchBuffer::new(4).unwrap());
        let poisoner = scratch.clone();
        let _ = thread::spawn(move || {
            let _lease = poisoner.lease();
            panic!("poison the scratch lock");
        })
        .join();

        assert_eq!(scratch.lease().region(4).unwrap().len(), 4);
    }
}
