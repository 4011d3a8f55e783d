//! On-disk constants and per-generation addressing configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Block size of legacy pools (256 MiB).
pub const LEGACY_BLOCK_SIZE: u64 = 0x1000_0000;

/// Block size used for address arithmetic on current pools (1 MiB).
pub const CURRENT_BLOCK_SIZE: u64 = 0x10_0000;

/// Leading physical blocks reserved for pool metadata on legacy pools.
pub const LEGACY_RESERVED_BLOCKS: u64 = 2;

/// Byte offset of the data area on current pools (64 MiB + 8 KiB).
pub const CURRENT_DATA_AREA_OFFSET: u64 = 0x2000 + 0x400_0000;

/// Widest length-prefixed integer the decoder accepts, in bytes.
pub const MAX_INTEGER_WIDTH: usize = 8;

/// Size of a pool-scoped identifier on disk.
pub const GUID_SIZE: usize = 16;

/// On-disk pool generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolGeneration {
    /// Early pools: 256 MiB blocks, two reserved leading blocks.
    Legacy,
    /// Later pools: 1 MiB addressing behind a fixed metadata region.
    Current,
}

impl PoolGeneration {
    /// Resolve the addressing constants for this generation.
    pub fn geometry(self) -> Geometry {
        Geometry::new(self)
    }
}

impl fmt::Display for PoolGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolGeneration::Legacy => f.write_str("legacy"),
            PoolGeneration::Current => f.write_str("current"),
        }
    }
}

impl FromStr for PoolGeneration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "v1" => Ok(PoolGeneration::Legacy),
            "current" | "v2" => Ok(PoolGeneration::Current),
            other => Err(Error::InvalidArgument(format!(
                "unknown pool generation '{}'",
                other
            ))),
        }
    }
}

/// Addressing constants of one generation, resolved once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    generation: PoolGeneration,
    block_size: u64,
    /// Bytes in front of physical block 0.
    data_offset: u64,
}

impl Geometry {
    pub fn new(generation: PoolGeneration) -> Self {
        match generation {
            PoolGeneration::Legacy => Self {
                generation,
                block_size: LEGACY_BLOCK_SIZE,
                data_offset: LEGACY_RESERVED_BLOCKS * LEGACY_BLOCK_SIZE,
            },
            PoolGeneration::Current => Self {
                generation,
                block_size: CURRENT_BLOCK_SIZE,
                data_offset: CURRENT_DATA_AREA_OFFSET,
            },
        }
    }

    pub fn generation(&self) -> PoolGeneration {
        self.generation
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Byte offset of a physical block, relative to the pool origin, or
    /// `None` if it does not fit in 64 bits.
    ///
    /// Legacy: `(p + 2) * block_size`. Current: `p * block_size + 0x2000 + 0x4000000`.
    pub fn physical_offset(&self, physical_block: u64) -> Option<u64> {
        physical_block
            .checked_mul(self.block_size)?
            .checked_add(self.data_offset)
    }

    /// Byte offset one past the end of a virtual block, or `None` on overflow.
    pub fn virtual_end(&self, virtual_block: u64) -> Option<u64> {
        virtual_block.checked_add(1)?.checked_mul(self.block_size)
    }

    /// Volume length in bytes implied by a declared block count.
    ///
    /// Legacy volumes declare blocks; current volumes already declare bytes.
    pub fn declared_length(&self, declared: u64) -> u64 {
        match self.generation {
            PoolGeneration::Legacy => declared.saturating_mul(self.block_size),
            PoolGeneration::Current => declared,
        }
    }
}

/// How a volume stream addresses its physical source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Pool generation of the source disk.
    pub generation: PoolGeneration,

    /// Byte offset in the source where the pool's data area begins.
    pub origin: u64,
}

impl StreamConfig {
    pub fn new(generation: PoolGeneration, origin: u64) -> Self {
        Self { generation, origin }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let geometry = self.generation.geometry();
        let first = geometry
            .physical_offset(0)
            .and_then(|offset| self.origin.checked_add(offset));
        if first.is_none() {
            return Err(Error::InvalidArgument(format!(
                "origin {:#x} overflows {} pool addressing",
                self.origin, self.generation
            )));
        }
        Ok(())
    }
}
