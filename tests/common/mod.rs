//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::{self, Read, Seek, SeekFrom};
use uuid::Uuid;

/// Builds raw metadata records field by field.
#[derive(Default)]
pub struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn opaque(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.push(bytes.len() as u8);
        self.raw(bytes)
    }

    pub fn int(&mut self, value: u64) -> &mut Self {
        let width = (8 - value.leading_zeros() as usize / 8).max(1);
        self.int_width(value, width)
    }

    pub fn int_width(&mut self, value: u64, width: usize) -> &mut Self {
        self.opaque(&value.to_be_bytes()[8 - width..])
    }

    pub fn guid(&mut self, id: Uuid) -> &mut Self {
        self.raw(&id.to_bytes_le())
    }

    /// Byte-swapped UTF-16 with a big-endian unit count.
    pub fn text(&mut self, text: &str) -> &mut Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        self.raw(&(units.len() as u16).to_be_bytes());
        for unit in units {
            self.raw(&unit.to_be_bytes());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Volume record with the fields after the name filled in.
pub fn volume_tail(w: &mut RecordWriter, description: &str, block_count: u64) {
    w.text(description)
        .raw(&[0; 3])
        .int(block_count)
        .opaque(&[0x10])
        .raw(&[2])
        .raw(&[0; 9])
        .raw(&[3])
        .opaque(&[0x20, 0x21])
        .raw(&[0])
        .raw(&[2])
        .raw(&[0; 3])
        .raw(&[1]);
}

pub fn slab_record(volume_id: u64, volume_block: u64, disk: u64, disk_block: u64) -> Vec<u8> {
    let mut w = RecordWriter::new();
    w.opaque(&[0x01])
        .opaque(&[0x02, 0x03])
        .opaque(&[])
        .opaque(&[0x04])
        .opaque(&[0x05, 0x06, 0x07]);
    w.int(volume_id)
        .int(volume_block)
        .int(0)
        .int(1)
        .opaque(&[0xFF])
        .int(disk)
        .int(disk_block);
    w.into_bytes()
}

pub fn byte_at(offset: u64) -> u8 {
    (offset % 251) as u8 ^ (offset >> 28) as u8
}

/// Synthesised physical disk: bytes are a function of their offset, so
/// multi-gigabyte layouts need no backing storage. Counts seeks and reads.
pub struct PatternSource {
    pub len: u64,
    pub pos: u64,
    pub seeks: Vec<u64>,
    pub reads: usize,
}

impl PatternSource {
    pub fn new(len: u64) -> Self {
        Self {
            len,
            pos: 0,
            seeks: Vec::new(),
            reads: 0,
        }
    }
}

impl Read for PatternSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        let n = (buf.len() as u64).min(self.len.saturating_sub(self.pos)) as usize;
        for (i, b) in buf[..n].iter_mut().enumerate() {
            *b = byte_at(self.pos + i as u64);
        }
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for PatternSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(d) => self.pos.checked_add_signed(d).unwrap(),
            SeekFrom::End(d) => self.len.checked_add_signed(d).unwrap(),
        };
        self.seeks.push(self.pos);
        Ok(self.pos)
    }
}
