//! Pool metadata record decoding.
//!
//! This module handles:
//! - Primitive field decoding over a metadata region
//! - Physical disk, volume and slab allocation records
//! - Volume layout detection

mod cursor;
mod disk;
mod schema;
mod slab;
mod volume;

#[cfg(test)]
pub(crate) mod testutil;

pub use cursor::RecordCursor;
pub use disk::PhysicalDiskRecord;
pub use schema::SchemaDetector;
pub use slab::SlabAllocationRecord;
pub use volume::{VolumeLayout, VolumeRecord};

use crate::error::Result;

/// Decode back-to-back records until the region is exhausted.
///
/// Any failure fails the whole region.
pub fn decode_records<T, F>(region: &[u8], mut decode: F) -> Result<Vec<T>>
where
    F: FnMut(&mut RecordCursor<'_>) -> Result<T>,
{
    let mut cursor = RecordCursor::new(region);
    let mut records = Vec::new();
    while !cursor.is_empty() {
        records.push(decode(&mut cursor)?);
    }
    tracing::debug!(count = records.len(), bytes = region.len(), "decoded record region");
    Ok(records)
}
