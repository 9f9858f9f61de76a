pub mod dump;
pub mod extract;
pub mod info;
pub mod list;
pub mod pkg;

pub use dump::run as dump;
pub use extract::run as extract;
pub use info::run as info;
pub use list::run as list;
pub use pkg::run as pkg;

use std::path::Path;

use hpkg_format::{FileKind, HpkgFile, HpkrFile, TocEntry};

use crate::error::{Error, Result};

pub(crate) enum Container {
    Package(HpkgFile),
    Repository(HpkrFile),
}

pub(crate) fn open(path: &Path) -> Result<Container> {
    let open_error = |source| Error::Open {
        path: path.to_path_buf(),
        source,
    };

    match FileKind::detect(path).map_err(open_error)? {
        FileKind::Package => HpkgFile::open(path)
            .map(Container::Package)
            .map_err(open_error),
        FileKind::Repository => HpkrFile::open(path)
            .map(Container::Repository)
            .map_err(open_error),
    }
}

pub(crate) fn open_package(path: &Path) -> Result<HpkgFile> {
    match open(path)? {
        Container::Package(file) => Ok(file),
        Container::Repository(_) => Err(Error::NotAPackage {
            path: path.to_path_buf(),
        }),
    }
}

/// Runs `f` over the flattened table of contents of a package.
pub(crate) fn with_toc<F>(path: &Path, file: &HpkgFile, f: F) -> Result<()>
where
    F: FnOnce(&[TocEntry<'_>]) -> Result<()>,
{
    let roots = file.toc_attribute_list().map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let entries =
        hpkg_format::toc::entries(file.toc_context(), &roots).map_err(|source| Error::Toc {
            path: path.to_path_buf(),
            source,
        })?;
    f(&entries)
}
