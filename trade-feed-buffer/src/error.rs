use thiserror::Error;

/// All errors generated in `trade-feed-buffer`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Error)]
pub enum BufferError {
    #[error("buffer is empty")]
    Empty,

    #[error("index {index} is out of range for buffer of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("mirrored buffer capacity {observer} does not match observed capacity {observed}")]
    CapacityMismatch { observed: usize, observer: usize },

    #[error("buffer capacity must be greater than zero")]
    ZeroCapacity,
}
