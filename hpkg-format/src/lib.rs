//! Reader for Haiku's package containers: `.hpkg` packages and `.hpkr`
//! repository indexes.
//!
//! Both formats store a heap, optionally compressed in zlib chunks, holding
//! string tables and trees of typed attributes. [`AttributeIterator`] decodes
//! those trees lazily; [`PkgFactory`] assembles them into [`Pkg`] values.

mod attr;
mod compression;
mod context;
mod error;
mod file;
mod header;
mod heap;
mod id;
mod iter;
pub mod parse;
mod pkg;
mod strings;
pub mod toc;

#[cfg(test)]
mod test_support;

pub use attr::{Attribute, AttributeValue, RawValue, StringValue, Value};
pub use compression::HeapCompression;
pub use context::AttributeContext;
pub use error::{AssemblyError, DecodeError, OpenError, PkgError};
pub use file::{HpkgFile, HpkrFile};
pub use header::{FileKind, HeapHeader, HpkgHeader, HpkrHeader, Section};
pub use heap::{
    ByteReader, ByteSource, ChunkedHeap, HeapByteReader, HeapByteSource, HeapCoordinates,
    HeapData, HeapReader, MemoryHeap,
};
pub use id::{AttributeId, AttributeType};
pub use iter::{AttributeIterator, DecodeLimits};
pub use pkg::{
    Pkg, PkgArchitecture, PkgFactory, PkgFlags, PkgIterator, PkgUrl, PkgUrlKind, PkgUser,
    PkgVersion, Provide, Resolvable, ResolvableOperator,
};
pub use strings::StringTable;
pub use toc::{EntryKind, TocEntry};

#[doc(hidden)]
pub use comde;
