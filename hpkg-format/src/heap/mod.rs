use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use crate::error::DecodeError;

mod chunked;

pub use chunked::{ChunkedHeap, HeapData};

/// Where a value's bytes live inside the uncompressed heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapCoordinates {
    pub offset: u64,
    pub length: u64,
}

impl HeapCoordinates {
    pub const fn new(offset: u64, length: u64) -> HeapCoordinates {
        HeapCoordinates { offset, length }
    }
}

impl fmt::Display for HeapCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{offset: {:#x}, length: {}}}", self.offset, self.length)
    }
}

/// Random access to the uncompressed heap.
///
/// Implementations must be safe for concurrent reads.
pub trait HeapReader: fmt::Debug + Send + Sync {
    /// Total uncompressed length of the heap.
    fn heap_len(&self) -> u64;

    /// Fills `buf` with the bytes starting at `offset`, or fails without
    /// touching the caller's view of the data if the span is not available.
    fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<(), DecodeError>;

    fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>, DecodeError> {
        check_bounds(self.heap_len(), offset, length)?;
        let len = usize::try_from(length).map_err(|_| DecodeError::TooLarge(length))?;
        let mut buf = vec![0u8; len];
        self.read_into(offset, &mut buf)?;
        Ok(buf)
    }
}

pub(crate) fn check_bounds(heap_len: u64, offset: u64, length: u64) -> Result<(), DecodeError> {
    match offset.checked_add(length) {
        Some(end) if end <= heap_len => Ok(()),
        _ => Err(DecodeError::OutOfBounds {
            offset,
            length,
            heap_len,
        }),
    }
}

/// A heap that is already fully decompressed in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryHeap(Vec<u8>);

impl MemoryHeap {
    pub fn new<B: Into<Vec<u8>>>(bytes: B) -> MemoryHeap {
        MemoryHeap(bytes.into())
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl HeapReader for MemoryHeap {
    fn heap_len(&self) -> u64 {
        self.0.len() as u64
    }

    fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<(), DecodeError> {
        check_bounds(self.heap_len(), offset, buf.len() as u64)?;
        let start = offset as usize;
        buf.copy_from_slice(&self.0[start..start + buf.len()]);
        Ok(())
    }
}

/// A byte value whose contents are only read when asked for.
#[derive(Debug, Clone)]
pub enum ByteSource<'a> {
    Inline(&'a [u8]),
    Heap(HeapByteSource),
}

impl<'a> ByteSource<'a> {
    /// Length in bytes, known without reading anything.
    pub fn len(&self) -> u64 {
        match self {
            ByteSource::Inline(bytes) => bytes.len() as u64,
            ByteSource::Heap(source) => source.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the whole value. Every call reads afresh.
    pub fn read(&self) -> Result<Cow<'a, [u8]>, DecodeError> {
        match self {
            ByteSource::Inline(bytes) => Ok(Cow::Borrowed(*bytes)),
            ByteSource::Heap(source) => source.read().map(Cow::Owned),
        }
    }

    /// Streams the value. Fails up front if the span is outside the heap.
    pub fn reader(&self) -> Result<ByteReader<'a>, DecodeError> {
        match self {
            ByteSource::Inline(bytes) => Ok(ByteReader::Inline(*bytes)),
            ByteSource::Heap(source) => source.reader().map(ByteReader::Heap),
        }
    }
}

/// A span of a shared heap.
#[derive(Debug, Clone)]
pub struct HeapByteSource {
    heap: Arc<dyn HeapReader>,
    coordinates: HeapCoordinates,
}

impl HeapByteSource {
    pub fn new(heap: Arc<dyn HeapReader>, coordinates: HeapCoordinates) -> HeapByteSource {
        HeapByteSource { heap, coordinates }
    }

    #[inline(always)]
    pub fn coordinates(&self) -> HeapCoordinates {
        self.coordinates
    }

    #[inline(always)]
    pub fn len(&self) -> u64 {
        self.coordinates.length
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(&self) -> Result<Vec<u8>, DecodeError> {
        self.heap
            .read(self.coordinates.offset, self.coordinates.length)
    }

    pub fn reader(&self) -> Result<HeapByteReader, DecodeError> {
        check_bounds(
            self.heap.heap_len(),
            self.coordinates.offset,
            self.coordinates.length,
        )?;

        Ok(HeapByteReader {
            heap: Arc::clone(&self.heap),
            position: self.coordinates.offset,
            remaining: self.coordinates.length,
        })
    }
}

#[derive(Debug)]
pub enum ByteReader<'a> {
    Inline(&'a [u8]),
    Heap(HeapByteReader),
}

impl Read for ByteReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            ByteReader::Inline(bytes) => bytes.read(buf),
            ByteReader::Heap(reader) => reader.read(buf),
        }
    }
}

#[derive(Debug)]
pub struct HeapByteReader {
    heap: Arc<dyn HeapReader>,
    position: u64,
    remaining: u64,
}

impl Read for HeapByteReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = std::cmp::min(buf.len() as u64, self.remaining) as usize;
        if n == 0 {
            return Ok(0);
        }

        self.heap.read_into(self.position, &mut buf[..n])?;
        self.position += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}
