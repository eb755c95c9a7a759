use failure::{Backtrace, Context, Fail};
use netbuf::{BufferError, NetBuffer};
use std::{fmt, io};

/// What went wrong, independent of the underlying cause.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Fail)]
pub enum ErrorKind {
    #[fail(display = "invalid argument")]
    InvalidArgument,
    #[fail(display = "out of memory")]
    OutOfMemory,
    #[fail(display = "link-layer header could not be removed")]
    FramingError,
    #[fail(display = "operation not supported")]
    Unsupported,
    #[fail(display = "device is not up")]
    NotReady,
    #[fail(display = "transport failure")]
    Transport,
}

/// Error returned by device operations. Transport failures keep the original `io::Error` as
/// their cause, so the system error code survives.
#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        *self.inner.get_context()
    }

    /// The underlying I/O error, if this error came from the transport.
    pub fn io_error(&self) -> Option<&io::Error> {
        self.inner
            .cause()
            .and_then(|cause| cause.downcast_ref::<io::Error>())
    }

    /// The system error code reported by the transport, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_error().and_then(io::Error::raw_os_error)
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.cause() {
            Some(cause) => write!(f, "{}: {}", self.inner, cause),
            None => fmt::Display::fmt(&self.inner, f),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(inner: Context<ErrorKind>) -> Error {
        Error { inner }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error {
            inner: err.context(ErrorKind::Transport),
        }
    }
}

impl From<BufferError> for Error {
    fn from(err: BufferError) -> Error {
        let kind = match err {
            BufferError::NoMemory => ErrorKind::OutOfMemory,
            BufferError::TooShort { .. } => ErrorKind::InvalidArgument,
        };
        Error {
            inner: err.context(kind),
        }
    }
}

/// A failed `send`. The packet comes back exactly as it was handed in, link header included, so
/// the caller can retry it or drop it.
#[derive(Debug)]
pub struct SendError {
    error: Error,
    buffer: NetBuffer,
}

impl SendError {
    pub(crate) fn new(error: Error, buffer: NetBuffer) -> SendError {
        SendError { error, buffer }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    /// The packet that could not be sent.
    pub fn buffer(&self) -> &NetBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> NetBuffer {
        self.buffer
    }

    pub fn into_parts(self) -> (Error, NetBuffer) {
        (self.error, self.buffer)
    }
}

impl Fail for SendError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.error.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.error.backtrace()
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// Drops the packet and keeps the error.
impl From<SendError> for Error {
    fn from(err: SendError) -> Error {
        err.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip() {
        let err: Error = ErrorKind::NotReady.into();
        assert_eq!(err.kind(), ErrorKind::NotReady);
        assert!(err.io_error().is_none());
        assert_eq!(err.to_string(), "device is not up");
    }

    #[test]
    fn transport_error_keeps_code() {
        let err = Error::from(io::Error::from_raw_os_error(19));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.raw_os_error(), Some(19));
        assert!(err.to_string().starts_with("transport failure: "));
    }

    #[test]
    fn buffer_errors_map_to_kinds() {
        let err = Error::from(BufferError::NoMemory);
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert!(err.raw_os_error().is_none());

        let err = Error::from(BufferError::TooShort {
            requested: 14,
            available: 3,
        });
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn send_error_returns_packet() {
        let err = SendError::new(
            Error::from(io::Error::from_raw_os_error(5)),
            NetBuffer::from_slice(&[1, 2, 3]),
        );
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.error().raw_os_error(), Some(5));
        assert_eq!(err.buffer().len(), 3);
        assert!(err.to_string().starts_with("transport failure: "));

        let (error, buffer) = err.into_parts();
        assert_eq!(error.kind(), ErrorKind::Transport);
        assert_eq!(buffer.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn question_mark_on_kind() {
        fn fails() -> Result<(), Error> {
            Err(ErrorKind::Unsupported)?
        }
        assert_eq!(fails().unwrap_err().kind(), ErrorKind::Unsupported);
    }
}
