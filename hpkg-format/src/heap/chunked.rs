use std::collections::VecDeque;
use std::convert::TryFrom;
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Mutex};

use byteorder::{BigEndian, ByteOrder};
use memmap2::Mmap;

use super::{check_bounds, HeapReader};
use crate::compression::{inflate_zlib, HeapCompression};
use crate::error::DecodeError;

const CACHE_CHUNKS: usize = 3;

/// Backing bytes of a whole package file.
pub enum HeapData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl HeapData {
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            HeapData::Mapped(mmap) => mmap,
            HeapData::Owned(bytes) => bytes,
        }
    }
}

impl fmt::Debug for HeapData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapData::Mapped(mmap) => write!(f, "Mapped({} bytes)", mmap.len()),
            HeapData::Owned(bytes) => write!(f, "Owned({} bytes)", bytes.len()),
        }
    }
}

#[derive(Debug, Default)]
struct ChunkCache {
    // Most recently used first.
    entries: VecDeque<(u64, Arc<[u8]>)>,
}

impl ChunkCache {
    fn get(&mut self, index: u64) -> Option<Arc<[u8]>> {
        let pos = self.entries.iter().position(|(i, _)| *i == index)?;
        let entry = self.entries.remove(pos)?;
        let chunk = Arc::clone(&entry.1);
        self.entries.push_front(entry);
        Some(chunk)
    }

    fn insert(&mut self, index: u64, chunk: Arc<[u8]>) {
        if self.entries.iter().any(|(i, _)| *i == index) {
            return;
        }
        self.entries.push_front((index, chunk));
        self.entries.truncate(CACHE_CHUNKS);
    }
}

/// The heap of a package file, compressed in independent chunks.
///
/// Every chunk but the last holds `chunk_size` uncompressed bytes. For zlib
/// heaps the compressed region ends with a table of big-endian `u16` values,
/// one per chunk except the last, holding each chunk's compressed length
/// minus one.
#[derive(Debug)]
pub struct ChunkedHeap {
    data: HeapData,
    region: Range<usize>,
    compression: HeapCompression,
    chunk_size: u64,
    uncompressed_len: u64,
    chunks: Vec<Range<usize>>,
    cache: Mutex<ChunkCache>,
}

impl ChunkedHeap {
    pub fn new(
        data: HeapData,
        offset: u64,
        compressed_len: u64,
        uncompressed_len: u64,
        chunk_size: u64,
        compression: HeapCompression,
    ) -> Result<ChunkedHeap, DecodeError> {
        let available = data.as_slice().len() as u64;
        let end = offset
            .checked_add(compressed_len)
            .filter(|end| *end <= available)
            .ok_or(DecodeError::Truncated {
                what: "heap",
                needed: offset.saturating_add(compressed_len),
                available,
            })?;
        let region = offset as usize..end as usize;

        let chunks = match compression {
            HeapCompression::None => {
                if compressed_len != uncompressed_len {
                    return Err(DecodeError::Inconsistent("heap_size_compressed"));
                }
                vec![]
            }
            HeapCompression::Zlib => chunk_table(
                &data.as_slice()[region.clone()],
                uncompressed_len,
                chunk_size,
            )?,
            other => return Err(DecodeError::UnsupportedCompression(other.to_string())),
        };

        tracing::debug!(
            offset = format_args!("{:#x}", offset),
            compressed = compressed_len,
            uncompressed = uncompressed_len,
            chunks = chunks.len(),
            compression = %compression,
            "opened heap"
        );

        Ok(ChunkedHeap {
            data,
            region,
            compression,
            chunk_size,
            uncompressed_len,
            chunks,
            cache: Mutex::new(ChunkCache::default()),
        })
    }

    #[inline(always)]
    pub fn compression(&self) -> HeapCompression {
        self.compression
    }

    #[inline(always)]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn chunk(&self, index: u64) -> Result<Arc<[u8]>, DecodeError> {
        if let Some(chunk) = self.lock_cache().get(index) {
            return Ok(chunk);
        }

        let span = usize::try_from(index)
            .ok()
            .and_then(|i| self.chunks.get(i))
            .ok_or(DecodeError::InvalidChunkTable("chunk index out of range"))?;
        let compressed = &self.data.as_slice()[self.region.start..][span.clone()];

        let expected = std::cmp::min(
            self.chunk_size,
            self.uncompressed_len - index * self.chunk_size,
        );

        let chunk: Arc<[u8]> = if compressed.len() as u64 == expected {
            compressed.into()
        } else {
            let inflated = inflate_zlib(compressed, expected as usize).map_err(|e| {
                DecodeError::Inflate {
                    index,
                    source: Arc::new(e),
                }
            })?;

            if inflated.len() as u64 != expected {
                return Err(DecodeError::ChunkSize {
                    index,
                    expected,
                    actual: inflated.len() as u64,
                });
            }
            inflated.into()
        };

        tracing::trace!(index, compressed = compressed.len(), "inflated heap chunk");

        self.lock_cache().insert(index, Arc::clone(&chunk));
        Ok(chunk)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ChunkCache> {
        // The cache holds no invariant a panicking reader could break.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn chunk_table(
    region: &[u8],
    uncompressed_len: u64,
    chunk_size: u64,
) -> Result<Vec<Range<usize>>, DecodeError> {
    if uncompressed_len == 0 {
        return Ok(vec![]);
    }
    if chunk_size == 0 {
        return Err(DecodeError::InvalidChunkTable("chunk size is zero"));
    }

    let count = (uncompressed_len - 1) / chunk_size + 1;
    let table_len = (count - 1)
        .checked_mul(2)
        .filter(|len| *len <= region.len() as u64)
        .ok_or(DecodeError::InvalidChunkTable("table larger than heap"))?
        as usize;

    let data_len = region.len() - table_len;
    let table = &region[data_len..];

    let mut chunks = Vec::with_capacity(count as usize);
    let mut start = 0usize;
    for entry in table.chunks_exact(2) {
        let len = BigEndian::read_u16(entry) as usize + 1;
        if start + len > data_len {
            return Err(DecodeError::InvalidChunkTable("chunk extends past heap"));
        }
        chunks.push(start..start + len);
        start += len;
    }

    if start >= data_len {
        return Err(DecodeError::InvalidChunkTable("no data left for last chunk"));
    }
    chunks.push(start..data_len);

    Ok(chunks)
}

impl HeapReader for ChunkedHeap {
    fn heap_len(&self) -> u64 {
        self.uncompressed_len
    }

    fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<(), DecodeError> {
        check_bounds(self.uncompressed_len, offset, buf.len() as u64)?;

        if let HeapCompression::None = self.compression {
            let start = self.region.start + offset as usize;
            buf.copy_from_slice(&self.data.as_slice()[start..start + buf.len()]);
            return Ok(());
        }

        let mut position = offset;
        let mut filled = 0;
        while filled < buf.len() {
            let index = position / self.chunk_size;
            let within = (position % self.chunk_size) as usize;
            let chunk = self.chunk(index)?;

            let n = std::cmp::min(buf.len() - filled, chunk.len() - within);
            buf[filled..filled + n].copy_from_slice(&chunk[within..within + n]);
            filled += n;
            position += n as u64;
        }

        Ok(())
    }
}
