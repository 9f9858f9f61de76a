use std::path::Path;

use chrono::{TimeZone, Utc};
use humansize::{file_size_opts as options, FileSize};
use hpkg_format::{EntryKind, TocEntry};

use super::{open_package, with_toc};
use crate::error::Result;

macro_rules! add {
    ($mode:ident, $bit:expr, $c:expr => $s:ident) => {
        $s.push(if $mode & $bit != 0 { $c } else { '-' });
    };
}

fn format_mode(entry: &TocEntry<'_>) -> String {
    let mode = entry.permissions;
    let mut s = String::with_capacity(10);
    s.push(match entry.kind {
        EntryKind::Directory => 'd',
        EntryKind::Symlink => 'l',
        EntryKind::File => '-',
    });
    add!(mode, 0o400, 'r' => s);
    add!(mode, 0o200, 'w' => s);
    add!(mode, 0o100, 'x' => s);
    add!(mode, 0o040, 'r' => s);
    add!(mode, 0o020, 'w' => s);
    add!(mode, 0o010, 'x' => s);
    add!(mode, 0o004, 'r' => s);
    add!(mode, 0o002, 'w' => s);
    add!(mode, 0o001, 'x' => s);
    s
}

fn format_time(entry: &TocEntry<'_>) -> String {
    entry
        .mtime
        .and_then(|secs| {
            Utc.timestamp_opt(secs, entry.mtime_nanos.unwrap_or(0))
                .single()
        })
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".into())
}

fn format_size(entry: &TocEntry<'_>) -> String {
    match entry.kind {
        EntryKind::File => entry
            .size()
            .file_size(options::CONVENTIONAL)
            .unwrap_or_else(|_| entry.size().to_string()),
        _ => "-".into(),
    }
}

pub fn run(path: &Path) -> Result<()> {
    let file = open_package(path)?;

    with_toc(path, &file, |entries| {
        println!("Mode        Size           Modified              Path");
        println!("----------  -------------  --------------------  --------");
        for entry in entries {
            let mut name = entry.path.to_string();
            if entry.kind == EntryKind::Directory {
                name.push('/');
            }
            if let Some(target) = &entry.symlink_target {
                name = format!("{} -> {}", name, target);
            }

            println!(
                "{:10}  {:>13}  {:<20}  {}",
                format_mode(entry),
                format_size(entry),
                format_time(entry),
                name
            );
        }
        Ok(())
    })
}
