use std::collections::HashMap;

use super::{invalid_format, read_exact, read_u16, read_u32, CodecError};

/// Most distinct strings one file can address with a u16 index.
pub const MAX_STRINGS: usize = 1 << 16;

/// Write-side interning table. Indices are assigned in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct StringDict {
    indices: HashMap<String, u16>,
    strings: Vec<String>,
}

impl StringDict {
    pub fn index(&mut self, value: &str) -> Result<u16, CodecError> {
        if let Some(&index) = self.indices.get(value) {
            return Ok(index);
        }
        let index = u16::try_from(self.strings.len())
            .map_err(|_| CodecError::DictionaryOverflow { max: MAX_STRINGS })?;
        if value.len() > u16::MAX as usize {
            return Err(invalid_format(format!(
                "string of {} bytes is too long for a u16 length",
                value.len()
            )));
        }
        self.indices.insert(value.to_string(), index);
        self.strings.push(value.to_string());
        Ok(index)
    }

    /// Appends the 2-byte reference for `value`, registering it if new.
    pub fn write_ref(&mut self, out: &mut Vec<u8>, value: &str) -> Result<(), CodecError> {
        let index = self.index(value)?;
        out.extend_from_slice(&index.to_be_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Count, then each string as a u16 length and UTF-8 bytes.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.strings.len() as u32).to_be_bytes());
        for value in &self.strings {
            out.extend_from_slice(&(value.len() as u16).to_be_bytes());
            out.extend_from_slice(value.as_bytes());
        }
    }
}

/// Read-side table, rebuilt once from the dictionary block.
#[derive(Debug)]
pub(crate) struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub fn decode(bytes: &[u8], cursor: &mut usize) -> Result<Self, CodecError> {
        let count = read_u32(bytes, cursor)? as usize;
        if count > MAX_STRINGS {
            return Err(invalid_format(format!(
                "dictionary declares {count} strings"
            )));
        }
        let mut strings = Vec::with_capacity(count);
        for _ in 0..count {
            let len = read_u16(bytes, cursor)? as usize;
            let raw = read_exact(bytes, cursor, len)?;
            let value = std::str::from_utf8(raw)
                .map_err(|_| invalid_format("invalid UTF-8 string in dictionary"))?;
            strings.push(value.to_string());
        }
        Ok(Self { strings })
    }

    pub fn read_ref(&self, bytes: &[u8], cursor: &mut usize) -> Result<String, CodecError> {
        let index = read_u16(bytes, cursor)? as usize;
        self.strings
            .get(index)
            .cloned()
            .ok_or_else(|| invalid_format(format!("string index {index} out of range")))
    }
}
