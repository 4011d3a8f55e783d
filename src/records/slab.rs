//! Slab allocation records: one virtual block of a volume placed on one
//! physical block of a disk.

use super::cursor::RecordCursor;
use crate::error::Result;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SlabAllocationRecord {
    /// Ordinal of the owning volume.
    pub volume_id: u64,
    /// Virtual block index within the volume.
    pub volume_block: u64,
    pub parity_sequence: u64,
    pub mirror_sequence: u64,
    /// Ordinal of the physical disk holding the data.
    pub physical_disk_id: u64,
    /// Block index on that disk.
    pub physical_disk_block: u64,
}

impl SlabAllocationRecord {
    /// Decode one slab allocation, advancing the cursor past it.
    pub fn decode(cursor: &mut RecordCursor<'_>) -> Result<Self> {
        for _ in 0..5 {
            cursor.read_length_prefixed("slab header")?;
        }
        let volume_id = cursor.read_be_int("slab volume id")?;
        let volume_block = cursor.read_be_int("slab volume block")?;
        let parity_sequence = cursor.read_be_int("slab parity sequence")?;
        let mirror_sequence = cursor.read_be_int("slab mirror sequence")?;
        cursor.read_length_prefixed("slab opaque")?;
        let physical_disk_id = cursor.read_be_int("slab physical disk id")?;
        let physical_disk_block = cursor.read_be_int("slab physical disk block")?;

        Ok(Self {
            volume_id,
            volume_block,
            parity_sequence,
            mirror_sequence,
            physical_disk_id,
            physical_disk_block,
        })
    }
}

impl fmt::Display for SlabAllocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slab volume {} block {} -> disk {} block {}",
            self.volume_id, self.volume_block, self.physical_disk_id, self.physical_disk_block
        )
    }
}
