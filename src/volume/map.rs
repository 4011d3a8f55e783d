//! Virtual-to-physical block translation for one volume.

use crate::config::{Geometry, PoolGeneration};
use crate::error::{Error, Result};
use crate::records::{SlabAllocationRecord, VolumeRecord};
use std::collections::btree_map::{self, BTreeMap, Entry};

/// Virtual block index to physical block index, ascending by virtual block.
///
/// A missing key is a sparse hole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTable {
    blocks: BTreeMap<u64, u64>,
}

impl BlockTable {
    /// Build a table with one entry per slab allocation.
    ///
    /// Fails if two allocations claim the same virtual block.
    pub fn from_slabs<'a, I>(slabs: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a SlabAllocationRecord>,
    {
        let mut blocks = BTreeMap::new();
        for slab in slabs {
            match blocks.entry(slab.volume_block) {
                Entry::Vacant(entry) => {
                    entry.insert(slab.physical_disk_block);
                }
                Entry::Occupied(_) => {
                    return Err(Error::DuplicateVolumeBlock {
                        volume_block: slab.volume_block,
                    });
                }
            }
        }
        Ok(Self { blocks })
    }

    /// Physical block backing a virtual block, or `None` for a hole.
    pub fn lookup(&self, virtual_block: u64) -> Option<u64> {
        self.blocks.get(&virtual_block).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Highest mapped virtual block.
    pub fn last_virtual_block(&self) -> Option<u64> {
        self.blocks.keys().next_back().copied()
    }

    /// `(virtual, physical)` pairs in ascending virtual order.
    pub fn iter(&self) -> btree_map::Iter<'_, u64, u64> {
        self.blocks.iter()
    }
}

/// Everything a stream needs to address one volume: its block table, its
/// length and the generation's geometry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMap {
    table: BlockTable,
    length: u64,
    geometry: Geometry,
}

impl VolumeMap {
    /// Build a map from a declared size and the volume's slab allocations.
    ///
    /// The length is the larger of the declared length and the end of the
    /// highest mapped block.
    pub fn build<'a, I>(generation: PoolGeneration, declared: u64, slabs: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a SlabAllocationRecord>,
    {
        let geometry = generation.geometry();
        let table = BlockTable::from_slabs(slabs)?;

        // Every mapped block, virtual and physical, must be addressable end to end.
        for (&virtual_block, &physical_block) in table.iter() {
            geometry
                .virtual_end(virtual_block)
                .ok_or(Error::BlockOutOfRange {
                    block: virtual_block,
                })?;
            geometry
                .physical_offset(physical_block)
                .and_then(|offset| offset.checked_add(geometry.block_size()))
                .ok_or(Error::BlockOutOfRange {
                    block: physical_block,
                })?;
        }

        let mapped_end = match table.last_virtual_block() {
            Some(block) => geometry
                .virtual_end(block)
                .ok_or(Error::BlockOutOfRange { block })?,
            None => 0,
        };
        let length = geometry.declared_length(declared).max(mapped_end);

        tracing::debug!(
            %generation,
            slabs = table.len(),
            declared,
            length,
            "built volume block table"
        );

        Ok(Self {
            table,
            length,
            geometry,
        })
    }

    /// Build the map of `volume` from the pool's full slab allocation list.
    pub fn for_volume(
        generation: PoolGeneration,
        volume: &VolumeRecord,
        slabs: &[SlabAllocationRecord],
    ) -> Result<Self> {
        let owned = slabs.iter().filter(|slab| slab.volume_id == volume.number);
        Self::build(generation, volume.block_count, owned)
    }

    pub fn table(&self) -> &BlockTable {
        &self.table
    }

    /// Addressable length of the volume in bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn block_size(&self) -> u64 {
        self.geometry.block_size()
    }

    /// Source byte offset (relative to the pool origin) of a virtual block,
    /// or `None` for a hole.
    pub fn physical_offset(&self, virtual_block: u64) -> Option<u64> {
        self.table
            .lookup(virtual_block)
            .and_then(|physical| self.geometry.physical_offset(physical))
    }
}
