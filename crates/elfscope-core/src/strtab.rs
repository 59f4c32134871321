//! String-table sections.
//!
//! A string table is a blob of NUL-terminated strings addressed by byte
//! offset. Linkers tail-merge entries, so a valid offset may point into
//! the middle of a stored string; lookups scan to the next NUL from
//! wherever the offset lands.

use crate::{ElfError, ElfResult};

/// Decoded string-table payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringTable {
    raw: Vec<u8>,
}

impl StringTable {
    /// Wrap a raw string-table payload.
    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Size of the table in bytes.
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// String starting at byte offset `index`.
    ///
    /// # Errors
    ///
    /// [`ElfError::InvalidStringIndex`] when `index` is past the end of
    /// the table.
    pub fn get(&self, index: u64) -> ElfResult<String> {
        let start = usize::try_from(index).map_err(|_| ElfError::InvalidStringIndex {
            index,
            max: self.raw.len().saturating_sub(1) as u64,
        })?;
        if start >= self.raw.len() {
            return Err(ElfError::InvalidStringIndex {
                index,
                max: self.raw.len().saturating_sub(1) as u64,
            });
        }

        let end = self.raw[start..]
            .iter()
            .position(|&b| b == 0)
            .map_or(self.raw.len(), |p| start + p);

        Ok(String::from_utf8_lossy(&self.raw[start..end]).into_owned())
    }
}
