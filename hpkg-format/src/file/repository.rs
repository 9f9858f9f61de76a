use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{map_file, open_heap, section_context, LoadError};
use crate::context::AttributeContext;
use crate::error::{DecodeError, OpenError};
use crate::header::{HpkrHeader, Section};
use crate::heap::{ChunkedHeap, HeapData};
use crate::iter::{AttributeIterator, DecodeLimits};
use crate::pkg::PkgIterator;

/// A repository index, `.hpkr`. Only the package list is decoded; the
/// repository info that precedes it is skipped.
#[derive(Debug)]
pub struct HpkrFile {
    path: Option<PathBuf>,
    header: HpkrHeader,
    heap: Arc<ChunkedHeap>,
    section: Section,
    context: AttributeContext,
    limits: DecodeLimits,
}

impl HpkrFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<HpkrFile, OpenError> {
        let (data, path) = map_file(path.as_ref())?;
        let mut file = HpkrFile::load(data).map_err(|e| e.with_path(path.clone()))?;
        file.path = Some(path);
        Ok(file)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<HpkrFile, DecodeError> {
        Ok(HpkrFile::load(HeapData::Owned(bytes))?)
    }

    fn load(data: HeapData) -> Result<HpkrFile, LoadError> {
        let header = HpkrHeader::parse(data.as_slice()).map_err(LoadError::Header)?;
        let section = header.packages_section().map_err(LoadError::Header)?;
        let heap = open_heap(data, &header.heap)?;
        let context = section_context(heap.clone(), &section)?;

        Ok(HpkrFile {
            path: None,
            header,
            heap,
            section,
            context,
            limits: DecodeLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> HpkrFile {
        self.limits = limits;
        self
    }

    #[inline(always)]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline(always)]
    pub fn header(&self) -> &HpkrHeader {
        &self.header
    }

    #[inline(always)]
    pub fn heap(&self) -> &ChunkedHeap {
        &self.heap
    }

    #[inline(always)]
    pub fn packages_context(&self) -> &AttributeContext {
        &self.context
    }

    /// The raw package list, one root attribute per package.
    pub fn package_attributes(&self) -> AttributeIterator {
        AttributeIterator::with_limits(
            self.context.clone(),
            self.section.attributes_offset(),
            self.limits,
        )
    }

    pub fn packages(&self) -> PkgIterator {
        PkgIterator::new(self.package_attributes())
    }
}
