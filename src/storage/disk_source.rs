//! Read-only access to disk images and raw disk devices.
//!
//! Raw character devices (e.g. /dev/rdiskN) reject reads that are not
//! sector aligned, so every read issued to the file starts and ends on a
//! 4096-byte boundary. Small unaligned reads go through a bounded window;
//! aligned runs are read straight into the caller's buffer.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Alignment of every read issued to the underlying file.
const SECTOR_ALIGNMENT: u64 = 4096;

/// Largest request served through the window.
const WINDOW_LIMIT: usize = 1024 * 1024;

/// Physical disk byte source.
pub struct DiskSource {
    file: File,
    /// Logical read position.
    position: u64,
    len: u64,
    /// Aligned window from the last read, reused for small sequential reads.
    window: Vec<u8>,
    window_start: u64,
}

impl DiskSource {
    /// Open a disk image or device for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                Error::PermissionDenied(format!(
                    "Cannot open disk {}. Try running with sudo.",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        // Devices report a zero metadata length; seeking to the end works for both.
        let len = file.seek(SeekFrom::End(0))?;
        tracing::debug!(path = %path.display(), len, "opened disk source");

        Ok(Self {
            file,
            position: 0,
            len,
            window: Vec::new(),
            window_start: 0,
        })
    }

    /// Size of the source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fill `buf` from `offset`, reading whole aligned sectors.
    ///
    /// Returns fewer bytes than requested only at the end of the source.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.len || buf.is_empty() {
            return Ok(0);
        }
        let wanted = (self.len - offset).min(buf.len() as u64) as usize;

        let mut filled = 0;
        while filled < wanted {
            let at = offset + filled as u64;
            let rest = &mut buf[filled..wanted];
            let misalignment = (at % SECTOR_ALIGNMENT) as usize;

            let n = if misalignment == 0 && rest.len() as u64 >= SECTOR_ALIGNMENT {
                let direct = rest.len() - rest.len() % SECTOR_ALIGNMENT as usize;
                self.read_direct(at, &mut rest[..direct])?
            } else if rest.len() <= WINDOW_LIMIT {
                self.read_windowed(at, rest)?
            } else {
                // Up to the next boundary, then the aligned run goes direct.
                let head = SECTOR_ALIGNMENT as usize - misalignment;
                self.read_windowed(at, &mut rest[..head])?
            };
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    /// Read an aligned run straight into `buf`.
    fn read_direct(&mut self, at: u64, buf: &mut [u8]) -> Result<usize> {
        self.file.seek(SeekFrom::Start(at))?;
        fill_from(&mut self.file, buf)
    }

    /// Serve `buf` from the aligned window, refilling it if needed.
    fn read_windowed(&mut self, at: u64, buf: &mut [u8]) -> Result<usize> {
        let end = at + buf.len() as u64;
        let window_end = self.window_start + self.window.len() as u64;
        if at < self.window_start || end > window_end {
            let aligned_start = (at / SECTOR_ALIGNMENT) * SECTOR_ALIGNMENT;
            let aligned_end = end.div_ceil(SECTOR_ALIGNMENT) * SECTOR_ALIGNMENT;
            let aligned_len = (aligned_end - aligned_start) as usize;

            self.window.resize(aligned_len, 0);
            self.file.seek(SeekFrom::Start(aligned_start))?;
            let filled = fill_from(&mut self.file, &mut self.window)?;
            self.window.truncate(filled);
            self.window_start = aligned_start;
        }

        let start = (at - self.window_start) as usize;
        let available = self.window.len().saturating_sub(start).min(buf.len());
        buf[..available].copy_from_slice(&self.window[start..start + available]);
        Ok(available)
    }
}

/// Read until `buf` is full or the file ends.
fn fill_from(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(filled)
}

impl Read for DiskSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for DiskSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
        };
        self.position = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of disk")
        })?;
        Ok(self.position)
    }
}
