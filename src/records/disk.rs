//! Physical disk descriptor records.

use super::cursor::RecordCursor;
use crate::error::Result;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A physical disk belonging to the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalDiskRecord {
    /// Disk ordinal within the pool.
    pub number: u64,
    /// Opaque command serial number.
    #[serde(with = "hex::serde")]
    pub command_serial: Vec<u8>,
    /// Pool-scoped disk identifier.
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: u8,
    pub usage: u8,
    pub media_type: u8,
    /// Capacity in pool blocks.
    pub block_count: u64,
}

impl PhysicalDiskRecord {
    /// Decode one disk record, advancing the cursor past it.
    pub fn decode(cursor: &mut RecordCursor<'_>) -> Result<Self> {
        let number = cursor.read_be_int("disk number")?;
        let command_serial = cursor.read_length_prefixed("disk command serial")?.to_vec();
        let id = cursor.read_guid("disk id")?;
        let name = cursor.read_utf16("disk name")?;
        let description = cursor.read_utf16("disk description")?;
        cursor.skip(1, "disk reserved")?;
        let status = cursor.read_u8("disk status")?;
        let usage = cursor.read_u8("disk usage")?;
        let media_type = cursor.read_u8("disk media type")?;
        let block_count = cursor.read_be_int("disk block count")?;
        cursor.read_length_prefixed("disk trailer")?;

        Ok(Self {
            number,
            command_serial,
            id,
            name,
            description,
            status,
            usage,
            media_type,
            block_count,
        })
    }
}

impl fmt::Display for PhysicalDiskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "disk {} {} \"{}\" ({} blocks)",
            self.number, self.id, self.name, self.block_count
        )
    }
}
