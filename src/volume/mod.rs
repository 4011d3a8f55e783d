//! Volume reconstruction.
//!
//! This module handles:
//! - Translating virtual volume blocks to physical disk blocks
//! - Presenting a volume as a seekable, read-only byte stream
//! - Bulk extraction of allocated blocks

mod map;
mod stream;

pub use map::{BlockTable, VolumeMap};
pub use stream::{VolumeStream, COPY_CHUNK};
