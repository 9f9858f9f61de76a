use std::convert::TryFrom;

use crate::error::DecodeError;
use crate::heap::HeapReader;

/// The shared strings a section's attributes refer to by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub fn new(strings: Vec<String>) -> StringTable {
        StringTable { strings }
    }

    /// Parses `count` NUL-terminated strings followed by a final NUL.
    ///
    /// An empty buffer is an empty table regardless of `count`.
    pub fn parse(bytes: &[u8], count: u64) -> Result<StringTable, DecodeError> {
        if bytes.is_empty() {
            return Ok(StringTable::default());
        }

        let capacity = usize::try_from(count).map_err(|_| DecodeError::TooLarge(count))?;
        let mut strings = Vec::with_capacity(std::cmp::min(capacity, bytes.len()));
        let mut rest = bytes;

        loop {
            let end = rest
                .iter()
                .position(|b| *b == 0)
                .ok_or(DecodeError::InvalidStringTable("missing terminator"))?;

            if end == 0 {
                break;
            }
            if strings.len() == capacity {
                return Err(DecodeError::InvalidStringTable("more strings than declared"));
            }

            strings.push(String::from_utf8_lossy(&rest[..end]).into_owned());
            rest = &rest[end + 1..];
        }

        if strings.len() != capacity {
            return Err(DecodeError::InvalidStringTable("fewer strings than declared"));
        }

        tracing::debug!(count = strings.len(), bytes = bytes.len(), "parsed string table");
        Ok(StringTable { strings })
    }

    pub fn read(
        heap: &dyn HeapReader,
        offset: u64,
        length: u64,
        count: u64,
    ) -> Result<StringTable, DecodeError> {
        let bytes = heap.read(offset, length)?;
        StringTable::parse(&bytes, count)
    }

    pub fn get(&self, index: u64) -> Result<&str, DecodeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
            .ok_or(DecodeError::StringIndex {
                index,
                len: self.strings.len(),
            })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}
