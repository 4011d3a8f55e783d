//! Forward-only cursor over a metadata region and the primitive field decoders
//! shared by every record kind.

use crate::config::{GUID_SIZE, MAX_INTEGER_WIDTH};
use crate::error::{Error, Result};
use uuid::Uuid;

/// Byte cursor over a metadata region.
///
/// The cursor is `Copy`, so a decode attempt can run on a copy and the
/// caller decides whether to commit its advancement.
#[derive(Debug, Clone, Copy)]
pub struct RecordCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the region.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left in the region.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes.
    pub fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(Error::Truncated {
                field,
                needed: len,
                available,
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Skip a fixed-width reserved span.
    pub fn skip(&mut self, len: usize, field: &'static str) -> Result<()> {
        self.take(len, field).map(|_| ())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    pub fn read_be_u16(&mut self, field: &'static str) -> Result<u16> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// One length byte followed by that many opaque bytes.
    pub fn read_length_prefixed(&mut self, field: &'static str) -> Result<&'a [u8]> {
        let len = self.read_u8(field)? as usize;
        self.take(len, field)
    }

    /// Length-prefixed unsigned big-endian integer, up to 8 bytes wide.
    pub fn read_be_int(&mut self, field: &'static str) -> Result<u64> {
        let bytes = self.read_length_prefixed(field)?;
        if bytes.len() > MAX_INTEGER_WIDTH {
            return Err(Error::IntegerTooWide {
                field,
                width: bytes.len(),
            });
        }
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// 16-byte identifier in mixed-endian GUID layout.
    pub fn read_guid(&mut self, field: &'static str) -> Result<Uuid> {
        let bytes = self.take(GUID_SIZE, field)?;
        let mut raw = [0u8; GUID_SIZE];
        raw.copy_from_slice(bytes);
        Ok(Uuid::from_bytes_le(raw))
    }

    /// Big-endian code-unit count followed by byte-swapped UTF-16 units.
    ///
    /// Each stored pair is the big-endian form of its code unit. Unpaired
    /// surrogates become U+FFFD; NUL characters are dropped.
    pub fn read_utf16(&mut self, field: &'static str) -> Result<String> {
        let units = self.read_be_u16(field)? as usize;
        let bytes = self.take(units * 2, field)?;
        let decoded: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        let mut text = String::from_utf16_lossy(&decoded);
        text.retain(|c| c != '\0');
        Ok(text)
    }
}
