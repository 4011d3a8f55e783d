//! Encoders for building synthetic records in unit tests.

use uuid::Uuid;

#[derive(Default)]
pub(crate) struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub(crate) fn opaque(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.push(bytes.len() as u8);
        self.raw(bytes)
    }

    /// Minimal-width length-prefixed big-endian integer.
    pub(crate) fn int(&mut self, value: u64) -> &mut Self {
        let width = (8 - value.leading_zeros() as usize / 8).max(1);
        self.opaque(&value.to_be_bytes()[8 - width..])
    }

    pub(crate) fn guid(&mut self, id: &str) -> &mut Self {
        let id = Uuid::parse_str(id).unwrap();
        self.raw(&id.to_bytes_le())
    }

    pub(crate) fn text(&mut self, text: &str) -> &mut Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        self.raw(&(units.len() as u16).to_be_bytes());
        for unit in units {
            self.raw(&unit.to_be_bytes());
        }
        self
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
