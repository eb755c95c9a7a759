use failure::Fail;

/// Failures reported by `NetBuffer` operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Fail)]
pub enum BufferError {
    #[fail(
        display = "buffer holds {} bytes but {} were requested",
        available, requested
    )]
    TooShort { requested: usize, available: usize },

    #[fail(display = "no memory for buffer")]
    NoMemory,
}
