//! Shared filesystem helpers used across the pipeline stages.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

/// Marker entries whose presence makes a directory a protected path.
///
/// A directory containing one of these is either a repository root or a
/// project root, and must never be deleted by default.
const PROTECTION_MARKERS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "go.mod",
];

/// Returns true if `path` contains a version control marker or a recognized
/// package manifest.
pub fn is_protected_path(path: &Path) -> bool {
    PROTECTION_MARKERS
        .iter()
        .any(|marker| path.join(marker).exists())
}

/// Total size in bytes of all files under `path`, not following symlinks.
///
/// Uses an explicit stack instead of recursion so deep trees like
/// `node_modules/` cannot overflow the call stack. Unreadable entries are
/// skipped rather than propagated; an unreadable subtree reads as smaller,
/// which surfaces as drift rather than as a false "unchanged".
pub fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;
    let mut stack: Vec<PathBuf> = vec![path.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let entry_path = entry.path();
            let meta = match std::fs::symlink_metadata(&entry_path) {
                Ok(m) => m,
                Err(_) => continue,
            };

            if meta.is_file() {
                total = total.saturating_add(meta.len());
            } else if meta.is_dir() {
                stack.push(entry_path);
            }
            // Symlinks are counted as neither; following them could loop.
        }
    }

    total
}

/// Platform stable identity for rename detection.
///
/// On Unix this is the inode number. Windows file index numbers are not
/// reachable through std metadata, so no id is recorded there and id drift
/// checks are simply skipped.
#[cfg(unix)]
pub fn stable_file_id(meta: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino())
}

#[cfg(not(unix))]
pub fn stable_file_id(_meta: &Metadata) -> Option<u64> {
    None
}

/// Write `content` to `target` atomically.
///
/// The content lands in a sibling temp file first and is renamed over the
/// target after a sync, so a crash or a concurrent reader never observes a
/// half-written document.
pub fn write_atomic(target: &Path, content: &str) -> io::Result<()> {
    use std::io::Write;

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_sibling(target);
    {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&temp_path, target)?;
    Ok(())
}

fn temp_sibling(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}
