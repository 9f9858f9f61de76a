use std::path::PathBuf;

use hpkg_format::{AssemblyError, DecodeError, OpenError, PkgError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open `{}`", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: OpenError,
    },

    #[error("`{}` is a repository; this command needs a .hpkg package", .path.display())]
    NotAPackage { path: PathBuf },

    #[error("Cannot decode attributes of `{}`", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("Cannot assemble package metadata from `{}`", .path.display())]
    Package {
        path: PathBuf,
        #[source]
        source: PkgError,
    },

    #[error("Invalid table of contents in `{}`", .path.display())]
    Toc {
        path: PathBuf,
        #[source]
        source: AssemblyError,
    },

    #[error("Cannot read contents of `{path}`")]
    ReadContents {
        path: String,
        #[source]
        source: DecodeError,
    },

    #[error("Cannot create directory `{}`", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write file `{}`", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create link `{}`", .path.display())]
    CreateLink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to write through symlink `{}`", .path.display())]
    UnsafePath { path: PathBuf },

    #[error("Cannot render JSON")]
    Json {
        #[source]
        source: serde_json::Error,
    },
}
