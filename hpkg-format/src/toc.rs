use std::collections::HashSet;
use std::convert::TryFrom;

use relative_path::{RelativePath, RelativePathBuf};

use crate::attr::{Attribute, AttributeValue, RawValue};
use crate::context::AttributeContext;
use crate::error::{AssemblyError, DecodeError};
use crate::heap::ByteSource;
use crate::id::{AttributeId, AttributeType};

pub mod constants {
    pub const FILE_TYPE_FILE: i128 = 0;
    pub const FILE_TYPE_DIRECTORY: i128 = 1;
    pub const FILE_TYPE_SYMLINK: i128 = 2;

    pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;
    pub const DEFAULT_DIRECTORY_PERMISSIONS: u32 = 0o755;
    pub const DEFAULT_SYMLINK_PERMISSIONS: u32 = 0o777;
}

use self::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    fn default_permissions(self) -> u32 {
        match self {
            EntryKind::File => DEFAULT_FILE_PERMISSIONS,
            EntryKind::Directory => DEFAULT_DIRECTORY_PERMISSIONS,
            EntryKind::Symlink => DEFAULT_SYMLINK_PERMISSIONS,
        }
    }
}

/// One file, directory or symlink from a package's table of contents.
#[derive(Debug, Clone)]
pub struct TocEntry<'a> {
    pub path: RelativePathBuf,
    pub kind: EntryKind,
    pub permissions: u32,
    pub user: Option<String>,
    pub group: Option<String>,
    pub mtime: Option<i64>,
    pub mtime_nanos: Option<u32>,
    pub symlink_target: Option<String>,
    data: Option<&'a Attribute>,
}

impl<'a> TocEntry<'a> {
    /// Size of the file contents, zero for anything without data.
    pub fn size(&self) -> u64 {
        match self.data.map(Attribute::encoded_value) {
            Some(AttributeValue::Raw(RawValue::Inline(bytes))) => bytes.len() as u64,
            Some(AttributeValue::Raw(RawValue::Heap(coords))) => coords.length,
            _ => 0,
        }
    }

    /// The file contents, read lazily through the TOC's context.
    pub fn contents(
        &self,
        context: &'a AttributeContext,
    ) -> Result<Option<ByteSource<'a>>, DecodeError> {
        self.data.map(|data| data.bytes(context)).transpose()
    }
}

/// Flattens the `dir:entry` trees of a table of contents, parents before
/// their children. Other roots are skipped.
///
/// Only directories may have child entries, and every path appears once.
pub fn entries<'a>(
    context: &AttributeContext,
    roots: &'a [Attribute],
) -> Result<Vec<TocEntry<'a>>, AssemblyError> {
    let mut out = Vec::new();
    let base = RelativePathBuf::new();

    for root in roots {
        if root.id() == AttributeId::DirectoryEntry {
            collect(context, &base, root, &mut out)?;
        }
    }

    let mut seen = HashSet::with_capacity(out.len());
    for entry in &out {
        if !seen.insert(entry.path.as_str()) {
            return Err(AssemblyError::DuplicateEntry(entry.path.to_string()));
        }
    }

    tracing::debug!(entries = out.len(), "flattened table of contents");
    Ok(out)
}

fn collect<'a>(
    context: &AttributeContext,
    parent: &RelativePath,
    attr: &'a Attribute,
    out: &mut Vec<TocEntry<'a>>,
) -> Result<(), AssemblyError> {
    let name = string(context, attr)?;
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(AssemblyError::InvalidEntryName(name));
    }
    let path = parent.join(&name);

    let kind = match attr.child(AttributeId::FileType) {
        Some(child) => match int(child)? {
            FILE_TYPE_FILE => EntryKind::File,
            FILE_TYPE_DIRECTORY => EntryKind::Directory,
            FILE_TYPE_SYMLINK => EntryKind::Symlink,
            value => {
                return Err(AssemblyError::OutOfRange {
                    id: AttributeId::FileType,
                    value,
                })
            }
        },
        None => EntryKind::File,
    };

    let mut entry = TocEntry {
        path: path.clone(),
        kind,
        permissions: kind.default_permissions(),
        user: None,
        group: None,
        mtime: None,
        mtime_nanos: None,
        symlink_target: None,
        data: None,
    };

    for child in attr.children() {
        match child.id() {
            AttributeId::FilePermissions => entry.permissions = narrow(child)?,
            AttributeId::FileUser => entry.user = Some(string(context, child)?),
            AttributeId::FileGroup => entry.group = Some(string(context, child)?),
            AttributeId::FileMtime => entry.mtime = Some(narrow(child)?),
            AttributeId::FileMtimeNanos => entry.mtime_nanos = Some(narrow(child)?),
            AttributeId::SymlinkPath => entry.symlink_target = Some(string(context, child)?),
            AttributeId::Data => {
                expect(child, AttributeType::Raw)?;
                entry.data = Some(child);
            }
            _ => {}
        }
    }

    out.push(entry);

    let mut nested = attr.children_with(AttributeId::DirectoryEntry).peekable();
    if kind != EntryKind::Directory && nested.peek().is_some() {
        return Err(AssemblyError::NotADirectory(path.into_string()));
    }

    for child in nested {
        collect(context, &path, child, out)?;
    }

    Ok(())
}

fn expect(attr: &Attribute, expected: AttributeType) -> Result<(), AssemblyError> {
    let found = attr.attribute_type();
    if found != expected {
        return Err(AssemblyError::KindMismatch {
            id: attr.id(),
            expected,
            found,
        });
    }
    Ok(())
}

fn string(context: &AttributeContext, attr: &Attribute) -> Result<String, AssemblyError> {
    expect(attr, AttributeType::String)?;
    attr.str_value(context)
        .map(str::to_string)
        .map_err(|source| AssemblyError::Value {
            id: attr.id(),
            source,
        })
}

fn int(attr: &Attribute) -> Result<i128, AssemblyError> {
    expect(attr, AttributeType::Int)?;
    Ok(attr.int_value())
}

fn narrow<T: TryFrom<i128>>(attr: &Attribute) -> Result<T, AssemblyError> {
    let value = int(attr)?;
    T::try_from(value).map_err(|_| AssemblyError::OutOfRange {
        id: attr.id(),
        value,
    })
}
