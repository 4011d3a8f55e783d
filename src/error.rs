//! Error types for pool metadata decoding and volume reconstruction.

use std::io;
use thiserror::Error;

/// Result type alias for pool reader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding records or reading a volume.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error on the physical source or a destination sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source could not be opened with the current privileges.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A record ran out of bytes while decoding a field.
    #[error("Truncated record: {field} needs {needed} bytes, {available} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// A length-prefixed integer is wider than 64 bits.
    #[error("Integer field {field} is {width} bytes wide (max 8)")]
    IntegerTooWide { field: &'static str, width: usize },

    /// A volume record decodes under neither known layout.
    #[error("Unable to decode volume record under either layout")]
    UnrecognizedVolumeLayout,

    /// Two slab allocations claim the same virtual block of a volume.
    #[error("Virtual block {volume_block} is allocated more than once")]
    DuplicateVolumeBlock { volume_block: u64 },

    /// A slab's block index lands outside the 64-bit byte address space.
    #[error("Block {block} is outside the addressable range")]
    BlockOutOfRange { block: u64 },

    /// Invalid argument passed to a stream operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not supported by a read-only volume.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl Error {
    /// Whether this error came from malformed or truncated record bytes.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::Truncated { .. }
                | Error::IntegerTooWide { .. }
                | Error::UnrecognizedVolumeLayout
                | Error::BlockOutOfRange { .. }
        )
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(inner) => inner,
            Error::PermissionDenied(_) => io::Error::new(io::ErrorKind::PermissionDenied, e),
            Error::InvalidArgument(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            Error::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, e),
            _ => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}
