use crate::{Error, ErrorKind, SendError, TunDevice};
use netbuf::NetBuffer;
use std::{
    panic,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::task::{self, JoinError};

/// Runs a device's pipelines on tokio's blocking pool so they can be awaited.
///
/// Clones share the device, so one task can sit in `receive` while another sends.
#[derive(Clone, Debug)]
pub struct AsyncTunDevice {
    device: Arc<TunDevice>,
}

impl AsyncTunDevice {
    /// Wraps a device. It should already be up; lifecycle changes need the device back through
    /// [`into_inner`]().
    pub fn new(device: TunDevice) -> Self {
        Self {
            device: Arc::new(device),
        }
    }

    pub fn device(&self) -> &TunDevice {
        &self.device
    }

    /// Returns the device if this is the last handle to it.
    pub fn into_inner(self) -> Result<TunDevice, Self> {
        Arc::try_unwrap(self.device).map_err(|device| Self { device })
    }

    /// Awaitable [`TunDevice::send`](). The packet comes back on every error, including a
    /// runtime that shuts down before the send could start.
    pub async fn send(&self, buffer: NetBuffer) -> Result<usize, SendError> {
        let device = self.device.clone();
        let slot = Arc::new(Mutex::new(Some(buffer)));
        let pending = slot.clone();
        let result = task::spawn_blocking(move || {
            let buffer = pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            buffer.map(|buffer| device.send(buffer))
        })
        .await;

        match result {
            Ok(Some(result)) => result,
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            // the task never ran, so the packet is still in the slot
            _ => match slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                Some(buffer) => Err(SendError::new(ErrorKind::NotReady.into(), buffer)),
                None => unreachable!(), // only the task takes the packet out
            },
        }
    }

    /// Awaitable [`TunDevice::receive`]().
    pub async fn receive(&self) -> Result<NetBuffer, Error> {
        let device = self.device.clone();
        joined(task::spawn_blocking(move || device.receive()).await)
    }
}

fn joined<T>(result: Result<Result<T, Error>, JoinError>) -> Result<T, Error> {
    match result {
        Ok(result) => result,
        Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
        // the runtime is shutting down
        Err(_) => Err(ErrorKind::NotReady.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test::{heap_buffers, once_opener};
    use crate::DeviceConfig;
    use tunfd::{memory, Transport};

    fn async_device(name: &str) -> (AsyncTunDevice, memory::MemoryTransport) {
        let (local, peer) = memory::pipe();
        let mut device =
            TunDevice::initialize(DeviceConfig::new(name), heap_buffers(), once_opener(local))
                .unwrap();
        device.activate().unwrap();
        (AsyncTunDevice::new(device), peer)
    }

    #[tokio::test]
    async fn receive_then_send() {
        let (device, peer) = async_device("tun0");
        peer.write(&[0x45; 40]).unwrap();

        let buffer = device.receive().await.unwrap();
        assert_eq!(buffer.len(), 54);
        assert_eq!(device.send(buffer).await.unwrap(), 40);

        let mut frame = [0; 64];
        assert_eq!(peer.read(&mut frame).unwrap(), 40);
        assert_eq!(&frame[..40], &[0x45; 40][..]);

        let stats = device.device().stats().snapshot();
        assert_eq!(stats.receive.packets, 1);
        assert_eq!(stats.send.packets, 1);
    }

    #[tokio::test]
    async fn pending_receive_alongside_send() {
        let (device, peer) = async_device("tap0");
        let receiver = device.clone();
        let pending = tokio::spawn(async move { receiver.receive().await });

        let frame = [0u8; 14 + 20];
        assert_eq!(device.send(NetBuffer::from_slice(&frame)).await.unwrap(), 20);
        let mut echoed = [0; 64];
        let len = peer.read(&mut echoed).unwrap();
        peer.write(&echoed[..len]).unwrap();

        let buffer = pending.await.unwrap().unwrap();
        assert_eq!(buffer.len(), 34);
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let (device, _peer) = async_device("tun0");
        let err = device.send(NetBuffer::from_slice(&[1, 2])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FramingError);
        assert_eq!(err.into_buffer().to_vec(), vec![1, 2]);
    }

    #[tokio::test]
    async fn oversized_packet_comes_back() {
        let (device, peer) = async_device("tun0");
        let frame = vec![0x45; 14 + 1501];
        let err = device.send(NetBuffer::from_slice(&frame)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut buffer = err.into_buffer();
        assert_eq!(buffer.len(), frame.len());
        buffer.trim(14 + 1500).unwrap();
        assert_eq!(device.send(buffer).await.unwrap(), 1500);

        let mut sent = [0; 2048];
        assert_eq!(peer.read(&mut sent).unwrap(), 1500);
    }

    #[test]
    fn into_inner_needs_last_handle() {
        let (device, _peer) = async_device("tun0");
        let other = device.clone();
        let device = device.into_inner().unwrap_err();
        drop(other);

        let mut device = device.into_inner().unwrap();
        device.deactivate();
        assert!(!device.is_up());
    }
}
