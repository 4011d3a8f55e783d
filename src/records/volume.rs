//! Volume descriptor records.
//!
//! Two layouts exist on disk. The legacy layout lacks the command serial
//! number that follows the ordinal in the current layout; every other field
//! is shared. Use [`SchemaDetector`](super::SchemaDetector) when the layout
//! of a pool is not known up front.

use super::cursor::RecordCursor;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wire layout of a volume record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeLayout {
    /// No command serial number.
    Legacy,
    /// Command serial number after the ordinal.
    Current,
}

impl fmt::Display for VolumeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeLayout::Legacy => f.write_str("legacy"),
            VolumeLayout::Current => f.write_str("current"),
        }
    }
}

/// A logical volume carved out of the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeRecord {
    /// Volume ordinal; slab allocations refer to it as their volume id.
    pub number: u64,
    /// Absent in the legacy layout.
    pub command_serial: Option<u64>,
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Declared size: blocks on legacy pools, bytes on current pools.
    pub block_count: u64,
    pub provisioning_type: u8,
    pub resiliency: u8,
    pub copies: u8,
    pub clusters: u8,
}

impl VolumeRecord {
    /// Decode one volume record using the given layout.
    pub fn decode(cursor: &mut RecordCursor<'_>, layout: VolumeLayout) -> Result<Self> {
        let number = cursor.read_be_int("volume number")?;
        let command_serial = match layout {
            VolumeLayout::Legacy => None,
            VolumeLayout::Current => Some(cursor.read_be_int("volume command serial")?),
        };
        let id = cursor.read_guid("volume id")?;
        let name = cursor.read_utf16("volume name")?;
        let description = cursor.read_utf16("volume description")?;
        cursor.skip(3, "volume reserved")?;
        let block_count = cursor.read_be_int("volume block count")?;
        cursor.read_length_prefixed("volume opaque")?;
        let provisioning_type = cursor.read_u8("volume provisioning type")?;
        cursor.skip(9, "volume reserved")?;
        let resiliency = cursor.read_u8("volume resiliency")?;
        cursor.read_length_prefixed("volume opaque")?;
        cursor.skip(1, "volume reserved")?;
        let copies = cursor.read_u8("volume copies")?;
        cursor.skip(3, "volume reserved")?;
        let clusters = cursor.read_u8("volume clusters")?;

        Ok(Self {
            number,
            command_serial,
            id,
            name,
            description,
            block_count,
            provisioning_type,
            resiliency,
            copies,
            clusters,
        })
    }

    pub fn decode_legacy(cursor: &mut RecordCursor<'_>) -> Result<Self> {
        Self::decode(cursor, VolumeLayout::Legacy)
    }

    pub fn decode_current(cursor: &mut RecordCursor<'_>) -> Result<Self> {
        Self::decode(cursor, VolumeLayout::Current)
    }
}

impl fmt::Display for VolumeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "volume {} {} \"{}\" (size {}, {} copies)",
            self.number, self.id, self.name, self.block_count, self.copies
        )
    }
}
