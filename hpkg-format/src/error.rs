use std::path::PathBuf;
use std::sync::Arc;

use crate::id::{AttributeId, AttributeType};

/// The encoded stream or the heap behind it is malformed, truncated or
/// inconsistent.
///
/// Cloneable so a failed iterator can hand the same failure out again.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
    #[error("Read of {length} bytes at offset {offset} is outside the heap ({heap_len} bytes)")]
    OutOfBounds {
        offset: u64,
        length: u64,
        heap_len: u64,
    },

    #[error("Unsigned LEB128 value at offset {0} does not fit in 64 bits")]
    Leb128Overflow(u64),

    #[error("Unknown attribute id {id} at offset {offset}")]
    UnknownAttributeId { id: u64, offset: u64 },

    #[error("Invalid attribute type {ty} at offset {offset}")]
    InvalidAttributeType { ty: u64, offset: u64 },

    #[error("Unknown {ty} encoding {encoding} at offset {offset}")]
    UnknownEncoding {
        ty: AttributeType,
        encoding: u64,
        offset: u64,
    },

    #[error("Attribute '{id}' must be {expected}, found {found}")]
    TypeMismatch {
        id: AttributeId,
        expected: AttributeType,
        found: AttributeType,
    },

    #[error("Attribute nesting exceeds {0} levels")]
    NestingTooDeep(usize),

    #[error("More than {0} sibling attributes in one list")]
    TooManySiblings(usize),

    #[error("String table index {index} out of range (table has {len} entries)")]
    StringIndex { index: u64, len: usize },

    #[error("Invalid string table: {0}")]
    InvalidStringTable(&'static str),

    #[error("Invalid heap chunk table: {0}")]
    InvalidChunkTable(&'static str),

    #[error("Heap chunk {index} inflated to {actual} bytes, expected {expected}")]
    ChunkSize {
        index: u64,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to inflate heap chunk {index}")]
    Inflate {
        index: u64,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Heap compression {0} is not supported")]
    UnsupportedCompression(String),

    #[error("Bad magic bytes {0:?}")]
    BadMagic([u8; 4]),

    #[error("Truncated {what}: need {needed} bytes, have {available}")]
    Truncated {
        what: &'static str,
        needed: u64,
        available: u64,
    },

    #[error("Header field {0} is inconsistent with the file")]
    Inconsistent(&'static str),

    #[error("{0} bytes cannot be addressed on this platform")]
    TooLarge(u64),

    #[error("I/O error")]
    Io(#[source] Arc<std::io::Error>),
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Io(Arc::new(err))
    }
}

impl From<DecodeError> for std::io::Error {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Io(inner) => match Arc::try_unwrap(inner) {
                Ok(inner) => inner,
                Err(inner) => std::io::Error::new(inner.kind(), inner.to_string()),
            },
            DecodeError::OutOfBounds { .. } | DecodeError::Truncated { .. } => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, err)
            }
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

/// A well-formed attribute tree does not have the shape of a package.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("Attribute '{id}' must be {expected}, found {found}")]
    KindMismatch {
        id: AttributeId,
        expected: AttributeType,
        found: AttributeType,
    },

    #[error("Value of attribute '{id}' could not be resolved")]
    Value {
        id: AttributeId,
        #[source]
        source: DecodeError,
    },

    #[error("Value {value} of attribute '{id}' is out of range")]
    OutOfRange { id: AttributeId, value: i128 },

    #[error("Invalid directory entry name '{0}'")]
    InvalidEntryName(String),

    #[error("Entry '{0}' is not a directory but has child entries")]
    NotADirectory(String),

    #[error("Entry '{0}' appears more than once")]
    DuplicateEntry(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PkgError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Invalid path to package file. Path: '{}'", .1.display())]
    InvalidPath(#[source] std::io::Error, PathBuf),

    #[error("Failed to read package file. Path: '{}'", .1.display())]
    ReadFailed(#[source] std::io::Error, PathBuf),

    #[error("Invalid header in package file. Path: '{}'", .1.display())]
    InvalidHeader(#[source] DecodeError, PathBuf),

    #[error("Invalid heap in package file. Path: '{}'", .1.display())]
    InvalidHeap(#[source] DecodeError, PathBuf),

    #[error("Invalid string table in package file. Path: '{}'", .1.display())]
    InvalidStringTable(#[source] DecodeError, PathBuf),
}
