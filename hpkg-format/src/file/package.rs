use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{map_file, open_heap, section_context, LoadError};
use crate::attr::Attribute;
use crate::context::AttributeContext;
use crate::error::{DecodeError, OpenError, PkgError};
use crate::header::{HpkgHeader, Section};
use crate::heap::{ChunkedHeap, HeapData};
use crate::iter::{AttributeIterator, DecodeLimits};
use crate::pkg::{Pkg, PkgFactory};

/// A single package, `.hpkg`.
#[derive(Debug)]
pub struct HpkgFile {
    path: Option<PathBuf>,
    header: HpkgHeader,
    heap: Arc<ChunkedHeap>,
    attributes: (Section, AttributeContext),
    toc: (Section, AttributeContext),
    limits: DecodeLimits,
}

impl HpkgFile {
    /// Opens and memory maps an existing `.hpkg`, validating its header and
    /// loading both string tables.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<HpkgFile, OpenError> {
        let (data, path) = map_file(path.as_ref())?;
        let mut file = HpkgFile::load(data).map_err(|e| e.with_path(path.clone()))?;
        file.path = Some(path);
        Ok(file)
    }

    /// Reads a package that is already in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<HpkgFile, DecodeError> {
        Ok(HpkgFile::load(HeapData::Owned(bytes))?)
    }

    fn load(data: HeapData) -> Result<HpkgFile, LoadError> {
        let header = HpkgHeader::parse(data.as_slice()).map_err(LoadError::Header)?;
        let attributes = header
            .package_attributes_section()
            .map_err(LoadError::Header)?;
        let toc = header.toc_section().map_err(LoadError::Header)?;

        let heap = open_heap(data, &header.heap)?;
        let attributes_context = section_context(heap.clone(), &attributes)?;
        let toc_context = section_context(heap.clone(), &toc)?;

        Ok(HpkgFile {
            path: None,
            header,
            heap,
            attributes: (attributes, attributes_context),
            toc: (toc, toc_context),
            limits: DecodeLimits::default(),
        })
    }

    /// Replaces the limits used by every iterator handed out afterwards.
    pub fn with_limits(mut self, limits: DecodeLimits) -> HpkgFile {
        self.limits = limits;
        self
    }

    /// The canonical path, if this was opened from disk.
    #[inline(always)]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline(always)]
    pub fn header(&self) -> &HpkgHeader {
        &self.header
    }

    #[inline(always)]
    pub fn heap(&self) -> &ChunkedHeap {
        &self.heap
    }

    #[inline(always)]
    pub fn package_attributes_context(&self) -> &AttributeContext {
        &self.attributes.1
    }

    #[inline(always)]
    pub fn toc_context(&self) -> &AttributeContext {
        &self.toc.1
    }

    pub fn package_attributes(&self) -> AttributeIterator {
        let (section, context) = &self.attributes;
        AttributeIterator::with_limits(context.clone(), section.attributes_offset(), self.limits)
    }

    pub fn toc(&self) -> AttributeIterator {
        let (section, context) = &self.toc;
        AttributeIterator::with_limits(context.clone(), section.attributes_offset(), self.limits)
    }

    pub fn package_attribute_list(&self) -> Result<Vec<Attribute>, DecodeError> {
        self.package_attributes().collect()
    }

    pub fn toc_attribute_list(&self) -> Result<Vec<Attribute>, DecodeError> {
        self.toc().collect()
    }

    /// Decodes the package attributes and assembles them into a [`Pkg`].
    pub fn package(&self) -> Result<Pkg, PkgError> {
        let attributes = self.package_attribute_list()?;
        let pkg = PkgFactory::new()
            .create_package_from_attributes(self.package_attributes_context(), &attributes)?;
        tracing::debug!(package = %pkg, "assembled package");
        Ok(pkg)
    }
}
