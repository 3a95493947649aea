//! Directory traversal and metadata collection.
//!
//! Enumeration is sequential (it is cheap and bound by directory read
//! latency); per-entry metadata and directory size computation run on a
//! rayon pool owned by the `Scanner` instance, so callers control pool
//! sizing and tests can run with small deterministic pools.

use crate::progress::ScanProgress;
use crate::utils;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors that can occur while scanning.
///
/// Per-entry failures are collected in [`ScanOutcome::errors`] and never
/// abort the scan; only a missing root or a pool construction failure is
/// fatal to the call.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("scan root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(err.to_string()),
            _ => ScanError::Io(err.to_string()),
        }
    }
}

impl From<walkdir::Error> for ScanError {
    fn from(err: walkdir::Error) -> Self {
        match err.io_error() {
            Some(io_err) if io_err.kind() == std::io::ErrorKind::PermissionDenied => {
                ScanError::PermissionDenied(err.to_string())
            }
            _ => ScanError::Io(err.to_string()),
        }
    }
}

/// Type of a scanned filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// One filesystem node observed during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    /// Absolute path.
    pub path: PathBuf,

    /// Size in bytes. For directories this is the recursive sum of all
    /// contained file bytes, computed once during the scan.
    pub size: u64,

    /// Last modification time.
    pub modified: SystemTime,

    pub entry_type: EntryType,

    /// Stable platform identity (inode on Unix) used for rename detection.
    pub file_id: Option<u64>,
}

impl FileEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum directory depth below the root (None = unlimited).
    pub max_depth: Option<usize>,

    /// Prune dot-prefixed entries. Never applies to the scan root itself,
    /// so scanning a directory that happens to be named `.config` works.
    pub skip_hidden: bool,

    /// Follow symbolic links while walking. Off by default to avoid cycles.
    pub follow_symlinks: bool,

    /// Worker threads for the metadata phase (0 = one per core).
    pub thread_count: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            skip_hidden: true,
            follow_symlinks: false,
            thread_count: 0,
        }
    }
}

/// Everything a scan produced.
#[derive(Debug)]
pub struct ScanOutcome {
    pub entries: Vec<FileEntry>,

    /// Per-entry failures that were skipped.
    pub errors: Vec<ScanError>,

    /// Number of regular files among `entries`.
    pub total_files: usize,

    /// Sum of file sizes in bytes (directories excluded to avoid double
    /// counting).
    pub total_size: u64,
}

/// Walks a directory tree and produces [`FileEntry`] records.
pub struct Scanner {
    options: ScanOptions,
    pool: rayon::ThreadPool,
    progress: Arc<ScanProgress>,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Result<Self, ScanError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.thread_count)
            .build()
            .map_err(|e| ScanError::Pool(e.to_string()))?;

        Ok(Self {
            options,
            pool,
            progress: Arc::new(ScanProgress::new()),
        })
    }

    /// Shared progress tracker, incremented from worker threads.
    pub fn progress(&self) -> Arc<ScanProgress> {
        Arc::clone(&self.progress)
    }

    /// Scan `root` and return all retained entries.
    ///
    /// Unreadable entries are recorded in the outcome and skipped. Entry
    /// order is not guaranteed when running on more than one thread;
    /// downstream consumers sort before presenting anything.
    pub fn scan(&self, root: &Path) -> Result<ScanOutcome, ScanError> {
        if !root.exists() {
            return Err(ScanError::RootNotFound(root.to_path_buf()));
        }

        let mut errors = Vec::new();

        // Phase 1: enumerate paths sequentially.
        let skip_hidden = self.options.skip_hidden;
        let walker = WalkDir::new(root)
            .follow_links(self.options.follow_symlinks)
            .max_depth(self.options.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(move |e| e.depth() == 0 || !skip_hidden || !is_hidden(e));

        let mut found = Vec::new();
        for dirent in walker {
            match dirent {
                Ok(entry) => found.push(entry),
                Err(err) => errors.push(ScanError::from(err)),
            }
        }

        self.progress.set_total(found.len() as u64);

        // Phase 2: metadata and directory sizes, in parallel. Failures go
        // over a channel drained below instead of a shared locked vec.
        let (tx, rx) = mpsc::channel::<ScanError>();
        let progress = Arc::clone(&self.progress);

        let entries: Vec<FileEntry> = self.pool.install(|| {
            found
                .par_iter()
                .map_with(tx, |tx, dirent| {
                    let result = process_entry(dirent);
                    progress.increment();
                    match result {
                        Ok(entry) => Some(entry),
                        Err(err) => {
                            let _ = tx.send(err);
                            None
                        }
                    }
                })
                .filter_map(|entry| entry)
                .collect()
        });

        // All senders are dropped once the pool is done, so this drains
        // without blocking.
        errors.extend(rx.iter());

        let total_files = entries.iter().filter(|e| e.is_file()).count();
        let total_size = entries.iter().filter(|e| e.is_file()).map(|e| e.size).sum();

        Ok(ScanOutcome {
            entries,
            errors,
            total_files,
            total_size,
        })
    }
}

fn process_entry(dirent: &walkdir::DirEntry) -> Result<FileEntry, ScanError> {
    let meta = dirent.metadata()?;

    let (entry_type, size) = if meta.is_dir() {
        (EntryType::Directory, utils::dir_size(dirent.path()))
    } else {
        (EntryType::File, meta.len())
    };

    Ok(FileEntry {
        path: dirent.path().to_path_buf(),
        size,
        modified: meta.modified()?,
        entry_type,
        file_id: utils::stable_file_id(&meta),
    })
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
