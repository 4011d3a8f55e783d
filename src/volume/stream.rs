//! Read-only, seekable view of a reconstructed volume.

use super::map::VolumeMap;
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::records::{SlabAllocationRecord, VolumeRecord};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

/// Largest span `copy_to` moves between source and destination at once.
pub const COPY_CHUNK: u64 = 1024 * 1024;

/// A logical volume presented as one linear byte stream.
///
/// Reads are translated block by block through the volume's [`VolumeMap`]
/// onto the physical source; unallocated blocks read as zeros. The map is
/// shared, so several streams can be opened over the same volume, each with
/// its own source handle. A single stream is not meant for concurrent use.
pub struct VolumeStream<R> {
    source: R,
    /// Offset of the pool's data area in `source`.
    origin: u64,
    map: Arc<VolumeMap>,
    position: u64,
}

impl<R: Read + Seek> VolumeStream<R> {
    /// Open `volume` from the pool's full slab allocation list.
    pub fn open(
        source: R,
        config: &StreamConfig,
        volume: &VolumeRecord,
        slabs: &[SlabAllocationRecord],
    ) -> Result<Self> {
        config.validate()?;
        let map = VolumeMap::for_volume(config.generation, volume, slabs)?;
        Ok(Self::with_map(source, config.origin, Arc::new(map)))
    }

    /// Open a stream over an already built map.
    pub fn with_map(source: R, origin: u64, map: Arc<VolumeMap>) -> Self {
        Self {
            source,
            origin,
            map,
            position: 0,
        }
    }

    /// Another stream over the same volume, reading from `source`.
    pub fn with_source<S: Read + Seek>(&self, source: S) -> VolumeStream<S> {
        VolumeStream::with_map(source, self.origin, Arc::clone(&self.map))
    }

    /// Read up to `count` bytes into `buf[offset..]` from the current position.
    ///
    /// At or past the end of the volume this returns `count` without
    /// touching `buf`, so parsers probing just beyond a tiny volume (as
    /// malformed partition tables make them do) keep going. Otherwise the
    /// span is clamped to the volume length and the position advances by
    /// the number of bytes returned.
    pub fn read_span(&mut self, buf: &mut [u8], offset: usize, count: usize) -> Result<usize> {
        let end = offset
            .checked_add(count)
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "offset {} + count {} exceeds buffer length {}",
                    offset,
                    count,
                    buf.len()
                ))
            })?;

        let length = self.map.len();
        if self.position >= length {
            return Ok(count);
        }

        let readable = (count as u64).min(length - self.position) as usize;
        let dest = &mut buf[offset..end][..readable];
        let block_size = self.map.block_size();

        let mut done = 0;
        while done < readable {
            let pos = self.position + done as u64;
            let block = pos / block_size;
            let within = pos % block_size;
            let chunk = (block_size - within).min((readable - done) as u64) as usize;
            let target = &mut dest[done..done + chunk];

            match self.map.physical_offset(block) {
                Some(physical) => {
                    let at = self
                        .origin
                        .checked_add(physical)
                        .and_then(|at| at.checked_add(within))
                        .ok_or(Error::BlockOutOfRange { block })?;
                    tracing::trace!(block, at, len = chunk, "reading mapped block");
                    self.source.seek(SeekFrom::Start(at))?;
                    self.source.read_exact(target)?;
                }
                None => {
                    tracing::trace!(block, len = chunk, "zero-filling hole");
                    target.fill(0);
                }
            }
            done += chunk;
        }

        self.position += readable as u64;
        Ok(readable)
    }

    /// Copy every allocated block into `dest` at its volume offset.
    ///
    /// Holes are skipped, not written; pre-size or pre-zero `dest` if it
    /// must read as the full volume. Blocks move in chunks of at most
    /// [`COPY_CHUNK`] bytes. `progress(done, total)` is called before and
    /// after reading and before and after writing each chunk, with
    /// `total = slabs * block_size * 2`. An error from `progress` aborts the
    /// copy. Returns the number of bytes written.
    pub fn copy_to<W, F>(&mut self, dest: &mut W, mut progress: F) -> Result<u64>
    where
        W: Write + Seek,
        F: FnMut(u64, u64) -> Result<()>,
    {
        let map = Arc::clone(&self.map);
        let block_size = map.block_size();
        let total = (map.table().len() as u64)
            .checked_mul(block_size)
            .and_then(|bytes| bytes.checked_mul(2))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{} slabs of {} bytes overflow the progress total",
                    map.table().len(),
                    block_size
                ))
            })?;
        let mut done = 0;

        if map.table().is_empty() {
            return Ok(0);
        }

        let mut buffer = vec![0u8; block_size.min(COPY_CHUNK) as usize];
        for (&virtual_block, &physical_block) in map.table().iter() {
            let source_at = map
                .geometry()
                .physical_offset(physical_block)
                .and_then(|offset| self.origin.checked_add(offset))
                .ok_or(Error::BlockOutOfRange {
                    block: physical_block,
                })?;
            let dest_at = virtual_block
                .checked_mul(block_size)
                .ok_or(Error::BlockOutOfRange {
                    block: virtual_block,
                })?;

            self.source.seek(SeekFrom::Start(source_at))?;
            dest.seek(SeekFrom::Start(dest_at))?;

            let mut copied = 0;
            while copied < block_size {
                let chunk = &mut buffer[..(block_size - copied).min(COPY_CHUNK) as usize];
                let len = chunk.len() as u64;

                progress(done, total)?;
                self.source.read_exact(chunk)?;
                done += len;
                progress(done, total)?;

                progress(done, total)?;
                dest.write_all(chunk)?;
                done += len;
                progress(done, total)?;

                copied += len;
            }

            tracing::debug!(virtual_block, physical_block, "copied block");
        }
        dest.flush()?;

        Ok(total / 2)
    }
}

impl<R> VolumeStream<R> {
    /// Resizing is not supported.
    pub fn set_len(&mut self, _len: u64) -> Result<()> {
        Err(Error::Unsupported("volume streams cannot be resized".to_string()))
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Length of the volume in bytes.
    pub fn len(&self) -> u64 {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn block_size(&self) -> u64 {
        self.map.block_size()
    }

    pub fn origin(&self) -> u64 {
        self.origin
    }

    pub fn map(&self) -> &Arc<VolumeMap> {
        &self.map
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: Read + Seek> Read for VolumeStream<R> {
    /// Reports end of file at or past the volume length; use
    /// [`VolumeStream::read_span`] for the tolerant past-end behaviour.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.map.len() {
            return Ok(0);
        }
        let len = buf.len();
        Ok(self.read_span(buf, 0, len)?)
    }
}

impl<R> Seek for VolumeStream<R> {
    /// Positions past the end are accepted; positions before zero are not.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.map.len().checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            Error::InvalidArgument(format!("seek {:?} from {} is out of range", pos, self.position))
        })?;
        self.position = target;
        Ok(target)
    }
}

impl<R> Write for VolumeStream<R> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(Error::Unsupported("volume streams are read-only".to_string()).into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
