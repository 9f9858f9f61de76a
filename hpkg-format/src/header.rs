use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};

use crate::compression::HeapCompression;
use crate::error::{DecodeError, OpenError};

pub(crate) const HPKG_MAGIC: &[u8; 4] = b"hpkg";
pub(crate) const HPKR_MAGIC: &[u8; 4] = b"hpkr";

/// Which of the two container formats a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A single package, `.hpkg`.
    Package,
    /// A repository index, `.hpkr`.
    Repository,
}

impl FileKind {
    pub fn from_magic(magic: [u8; 4]) -> Result<FileKind, DecodeError> {
        match &magic {
            HPKG_MAGIC => Ok(FileKind::Package),
            HPKR_MAGIC => Ok(FileKind::Repository),
            _ => Err(DecodeError::BadMagic(magic)),
        }
    }

    /// Sniffs the magic bytes at the start of the file.
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<FileKind, OpenError> {
        let path = path.as_ref();
        let mut file =
            File::open(path).map_err(|e| OpenError::InvalidPath(e, path.to_path_buf()))?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)
            .map_err(|e| OpenError::ReadFailed(e, path.to_path_buf()))?;

        FileKind::from_magic(magic).map_err(|e| OpenError::InvalidHeader(e, path.to_path_buf()))
    }
}

/// The leading fields both formats share, describing the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapHeader {
    pub header_size: u16,
    pub version: u16,
    pub total_size: u64,
    pub minor_version: u16,
    pub compression: HeapCompression,
    pub chunk_size: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

impl HeapHeader {
    fn read(cursor: &mut Cursor<&[u8]>) -> std::io::Result<HeapHeader> {
        Ok(HeapHeader {
            header_size: cursor.read_u16::<BigEndian>()?,
            version: cursor.read_u16::<BigEndian>()?,
            total_size: cursor.read_u64::<BigEndian>()?,
            minor_version: cursor.read_u16::<BigEndian>()?,
            compression: HeapCompression::from_id(cursor.read_u16::<BigEndian>()?),
            chunk_size: cursor.read_u32::<BigEndian>()?,
            compressed_size: cursor.read_u64::<BigEndian>()?,
            uncompressed_size: cursor.read_u64::<BigEndian>()?,
        })
    }

    fn validate(&self, min_size: usize) -> Result<(), DecodeError> {
        if (self.header_size as usize) < min_size {
            return Err(DecodeError::Inconsistent("header_size"));
        }
        if u64::from(self.header_size)
            .checked_add(self.compressed_size)
            .map_or(true, |end| end > self.total_size)
        {
            return Err(DecodeError::Inconsistent("heap_size_compressed"));
        }
        if !self.compression.is_supported() {
            return Err(DecodeError::UnsupportedCompression(
                self.compression.to_string(),
            ));
        }
        if self.version != 2 {
            tracing::warn!(version = self.version, "unexpected format version");
        }
        Ok(())
    }

    /// File offset of the first heap byte.
    #[inline(always)]
    pub fn heap_offset(&self) -> u64 {
        u64::from(self.header_size)
    }
}

/// Where one section's string table and attribute stream sit in the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub offset: u64,
    pub length: u64,
    pub strings_length: u64,
    pub strings_count: u64,
}

impl Section {
    fn new(
        name: &'static str,
        offset: u64,
        length: u64,
        strings_length: u64,
        strings_count: u64,
    ) -> Result<Section, DecodeError> {
        if strings_length > length {
            return Err(DecodeError::Inconsistent(name));
        }
        Ok(Section {
            offset,
            length,
            strings_length,
            strings_count,
        })
    }

    /// Heap offset of the attribute stream, just past the strings.
    #[inline(always)]
    pub fn attributes_offset(&self) -> u64 {
        self.offset + self.strings_length
    }
}

fn truncated(what: &'static str, needed: usize, available: usize) -> DecodeError {
    DecodeError::Truncated {
        what,
        needed: needed as u64,
        available: available as u64,
    }
}

fn check_magic(bytes: &[u8], expected: &[u8; 4]) -> Result<(), DecodeError> {
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[..4]);
    if &magic != expected {
        return Err(DecodeError::BadMagic(magic));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpkgHeader {
    pub heap: HeapHeader,
    pub package_attributes_length: u32,
    pub package_attributes_strings_length: u32,
    pub package_attributes_strings_count: u32,
    pub toc_length: u64,
    pub toc_strings_length: u64,
    pub toc_strings_count: u64,
}

impl HpkgHeader {
    pub const SIZE: usize = 80;

    pub fn parse(bytes: &[u8]) -> Result<HpkgHeader, DecodeError> {
        if bytes.len() < Self::SIZE {
            return Err(truncated("hpkg header", Self::SIZE, bytes.len()));
        }
        check_magic(bytes, HPKG_MAGIC)?;

        let mut cursor = Cursor::new(&bytes[4..Self::SIZE]);
        let heap = HeapHeader::read(&mut cursor)?;
        let package_attributes_length = cursor.read_u32::<BigEndian>()?;
        let package_attributes_strings_length = cursor.read_u32::<BigEndian>()?;
        let package_attributes_strings_count = cursor.read_u32::<BigEndian>()?;
        let _reserved = cursor.read_u32::<BigEndian>()?;

        let header = HpkgHeader {
            heap,
            package_attributes_length,
            package_attributes_strings_length,
            package_attributes_strings_count,
            toc_length: cursor.read_u64::<BigEndian>()?,
            toc_strings_length: cursor.read_u64::<BigEndian>()?,
            toc_strings_count: cursor.read_u64::<BigEndian>()?,
        };

        header.heap.validate(Self::SIZE)?;
        tracing::debug!(
            version = header.heap.version,
            compression = %header.heap.compression,
            heap = header.heap.uncompressed_size,
            toc = header.toc_length,
            attributes = header.package_attributes_length,
            "parsed hpkg header"
        );
        Ok(header)
    }

    /// The package attributes: the last bytes of the heap.
    pub fn package_attributes_section(&self) -> Result<Section, DecodeError> {
        let length = u64::from(self.package_attributes_length);
        let offset = self
            .heap
            .uncompressed_size
            .checked_sub(length)
            .ok_or(DecodeError::Inconsistent("package_attributes_length"))?;

        Section::new(
            "package_attributes_strings_length",
            offset,
            length,
            u64::from(self.package_attributes_strings_length),
            u64::from(self.package_attributes_strings_count),
        )
    }

    /// The table of contents, directly before the package attributes.
    pub fn toc_section(&self) -> Result<Section, DecodeError> {
        let offset = u64::from(self.package_attributes_length)
            .checked_add(self.toc_length)
            .and_then(|tail| self.heap.uncompressed_size.checked_sub(tail))
            .ok_or(DecodeError::Inconsistent("toc_length"))?;

        Section::new(
            "toc_strings_length",
            offset,
            self.toc_length,
            self.toc_strings_length,
            self.toc_strings_count,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpkrHeader {
    pub heap: HeapHeader,
    pub info_length: u32,
    pub packages_length: u64,
    pub packages_strings_length: u64,
    pub packages_strings_count: u64,
}

impl HpkrHeader {
    pub const SIZE: usize = 72;

    pub fn parse(bytes: &[u8]) -> Result<HpkrHeader, DecodeError> {
        if bytes.len() < Self::SIZE {
            return Err(truncated("hpkr header", Self::SIZE, bytes.len()));
        }
        check_magic(bytes, HPKR_MAGIC)?;

        let mut cursor = Cursor::new(&bytes[4..Self::SIZE]);
        let heap = HeapHeader::read(&mut cursor)?;
        let info_length = cursor.read_u32::<BigEndian>()?;
        let _reserved = cursor.read_u32::<BigEndian>()?;

        let header = HpkrHeader {
            heap,
            info_length,
            packages_length: cursor.read_u64::<BigEndian>()?,
            packages_strings_length: cursor.read_u64::<BigEndian>()?,
            packages_strings_count: cursor.read_u64::<BigEndian>()?,
        };

        header.heap.validate(Self::SIZE)?;
        tracing::debug!(
            version = header.heap.version,
            compression = %header.heap.compression,
            heap = header.heap.uncompressed_size,
            packages = header.packages_length,
            "parsed hpkr header"
        );
        Ok(header)
    }

    /// The package list, following the repository info.
    pub fn packages_section(&self) -> Result<Section, DecodeError> {
        let offset = u64::from(self.info_length);
        if offset
            .checked_add(self.packages_length)
            .map_or(true, |end| end > self.heap.uncompressed_size)
        {
            return Err(DecodeError::Inconsistent("packages_length"));
        }

        Section::new(
            "packages_strings_length",
            offset,
            self.packages_length,
            self.packages_strings_length,
            self.packages_strings_count,
        )
    }
}
