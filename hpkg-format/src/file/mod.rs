use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;

use crate::context::AttributeContext;
use crate::error::{DecodeError, OpenError};
use crate::header::{HeapHeader, Section};
use crate::heap::{ChunkedHeap, HeapData, HeapReader};
use crate::strings::StringTable;

mod package;
mod repository;

pub use self::package::HpkgFile;
pub use self::repository::HpkrFile;

/// Failure while loading a container, tagged with the stage that failed.
#[derive(Debug)]
pub(crate) enum LoadError {
    Header(DecodeError),
    Heap(DecodeError),
    Strings(DecodeError),
}

impl LoadError {
    pub(crate) fn with_path(self, path: PathBuf) -> OpenError {
        match self {
            LoadError::Header(e) => OpenError::InvalidHeader(e, path),
            LoadError::Heap(e) => OpenError::InvalidHeap(e, path),
            LoadError::Strings(e) => OpenError::InvalidStringTable(e, path),
        }
    }
}

impl From<LoadError> for DecodeError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Header(e) | LoadError::Heap(e) | LoadError::Strings(e) => e,
        }
    }
}

/// Maps the whole file read-only.
pub(crate) fn map_file(path: &Path) -> Result<(HeapData, PathBuf), OpenError> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| OpenError::InvalidPath(e, path.to_path_buf()))?;

    let path = path
        .canonicalize()
        .map_err(|e| OpenError::InvalidPath(e, path.to_path_buf()))?;

    let len = file
        .metadata()
        .map_err(|e| OpenError::ReadFailed(e, path.clone()))?
        .len();

    // Zero-length mappings are rejected on some platforms.
    if len == 0 {
        return Ok((HeapData::Owned(Vec::new()), path));
    }

    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| OpenError::ReadFailed(e, path.clone()))?;
    Ok((HeapData::Mapped(mmap), path))
}

pub(crate) fn open_heap(data: HeapData, header: &HeapHeader) -> Result<Arc<ChunkedHeap>, LoadError> {
    ChunkedHeap::new(
        data,
        header.heap_offset(),
        header.compressed_size,
        header.uncompressed_size,
        u64::from(header.chunk_size),
        header.compression,
    )
    .map(Arc::new)
    .map_err(LoadError::Heap)
}

pub(crate) fn section_context(
    heap: Arc<dyn HeapReader>,
    section: &Section,
) -> Result<AttributeContext, LoadError> {
    let strings = StringTable::read(
        &*heap,
        section.offset,
        section.strings_length,
        section.strings_count,
    )
    .map_err(LoadError::Strings)?;

    Ok(AttributeContext::new(heap, Arc::new(strings)))
}
