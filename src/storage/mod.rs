//! Physical byte sources backing reconstructed volumes.

mod disk_source;

pub use disk_source::DiskSource;
