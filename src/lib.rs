//! Storage Pool Reader
//!
//! Reconstructs readable logical volumes from a software-defined storage
//! pool's on-disk metadata, without the volume manager driver.
//!
//! # Features
//!
//! - **Record decoding**: physical disk, volume and slab allocation records
//! - **Layout detection**: picks between the legacy and current volume layouts
//! - **Block translation**: maps virtual volume blocks onto physical disk blocks
//! - **Volume streams**: `Read + Seek` over the reconstructed volume, holes read as zeros
//!
//! # Architecture
//!
//! ```text
//! Metadata regions → Records → VolumeMap → VolumeStream (Read + Seek) → partition/fs parser
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use pool_reader::config::{PoolGeneration, StreamConfig};
//! use pool_reader::records::{decode_records, SchemaDetector, SlabAllocationRecord};
//! use pool_reader::storage::DiskSource;
//! use pool_reader::volume::VolumeStream;
//! use std::io::Read;
//! use std::path::Path;
//!
//! # fn main() -> pool_reader::Result<()> {
//! let volume_region = std::fs::read("volumes.bin")?;
//! let slab_region = std::fs::read("slabs.bin")?;
//!
//! let mut detector = SchemaDetector::new();
//! let volumes = decode_records(&volume_region, |c| detector.decode_volume(c))?;
//! let slabs = decode_records(&slab_region, SlabAllocationRecord::decode)?;
//!
//! let disk = DiskSource::open(Path::new("disk.img"))?;
//! let config = StreamConfig::new(PoolGeneration::Current, 0x10_0000);
//! let mut stream = VolumeStream::open(disk, &config, &volumes[0], &slabs)?;
//!
//! let mut boot_sector = [0u8; 512];
//! stream.read_exact(&mut boot_sector)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod records;
pub mod storage;
pub mod volume;

pub use config::{PoolGeneration, StreamConfig};
pub use error::{Error, Result};
pub use volume::{VolumeMap, VolumeStream};
