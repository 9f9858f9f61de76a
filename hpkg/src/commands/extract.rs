use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hpkg_format::{AttributeContext, EntryKind, TocEntry};
use relative_path::RelativePath;

use super::{open_package, with_toc};
use crate::error::{Error, Result};

fn write_file(context: &AttributeContext, entry: &TocEntry<'_>, target: &Path) -> Result<()> {
    let write_error = |source| Error::WriteFile {
        path: target.to_path_buf(),
        source,
    };
    let read_error = |source| Error::ReadContents {
        path: entry.path.to_string(),
        source,
    };

    let mut out = BufWriter::new(File::create(target).map_err(write_error)?);
    if let Some(contents) = entry.contents(context).map_err(read_error)? {
        let mut reader = contents.reader().map_err(read_error)?;
        std::io::copy(&mut reader, &mut out).map_err(write_error)?;
    }
    drop(out);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(target, fs::Permissions::from_mode(entry.permissions))
            .map_err(write_error)?;
    }

    Ok(())
}

#[cfg(unix)]
fn write_link(entry: &TocEntry<'_>, target: &Path) -> Result<()> {
    let link = entry.symlink_target.as_deref().unwrap_or_default();
    std::os::unix::fs::symlink(link, target).map_err(|source| Error::CreateLink {
        path: target.to_path_buf(),
        source,
    })
}

#[cfg(not(unix))]
fn write_link(entry: &TocEntry<'_>, _target: &Path) -> Result<()> {
    tracing::warn!(path = %entry.path, "skipping symlink; not supported on this platform");
    Ok(())
}

/// Joins `path` onto `dest`, failing if any component already on disk is a
/// symlink.
fn target_path(dest: &Path, path: &RelativePath) -> Result<PathBuf> {
    let mut target = dest.to_path_buf();
    for component in path.iter() {
        target.push(component);
        if let Ok(meta) = fs::symlink_metadata(&target) {
            if meta.file_type().is_symlink() {
                return Err(Error::UnsafePath { path: target });
            }
        }
    }
    Ok(target)
}

pub fn run(path: &Path, dest: &Path) -> Result<()> {
    let file = open_package(path)?;
    let context = file.toc_context();

    fs::create_dir_all(dest).map_err(|source| Error::CreateDirectory {
        path: dest.to_path_buf(),
        source,
    })?;

    with_toc(path, &file, |entries| {
        for entry in entries {
            let target = target_path(dest, &entry.path)?;
            tracing::info!(path = %entry.path, "extracting");

            match entry.kind {
                EntryKind::Directory => {
                    fs::create_dir_all(&target).map_err(|source| Error::CreateDirectory {
                        path: target.clone(),
                        source,
                    })?;
                }
                EntryKind::File => write_file(context, entry, &target)?,
                EntryKind::Symlink => write_link(entry, &target)?,
            }
        }

        println!("Extracted {} entries to {}", entries.len(), dest.display());
        Ok(())
    })
}
