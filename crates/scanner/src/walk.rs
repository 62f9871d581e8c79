//! Directory traversal.
//!
//! The walker drives an explicit work stack instead of recursing, so
//! pathological directory depths cannot exhaust the call stack. Within one
//! directory, files are yielded before subdirectories are entered; no other
//! ordering is guaranteed. Reparse points (symlinks and junctions) are
//! never entered.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::classify::classify_on_disk;
use crate::signer::{sha256_file, SignatureResolver, SignerInfo};
use crate::types::{
    DirectoryHit, DiscoveredFile, Safety, SafetyMode, ScanReport, ScanTarget, SkipRecord,
    WalkItem, WritableDirectorySet,
};

/// Cooperative cancellation handle, checked at each directory boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Depth-first, single-threaded traversal yielding [`WalkItem`]s lazily.
///
/// Per-item failures (unreadable entries, signature-inspection errors) are
/// reported as skip records or degraded metadata; they never abort the
/// walk.
pub struct DirectoryWalker<'a> {
    resolver: &'a dyn SignatureResolver,
    safety_mode: SafetyMode,
    writable: Option<&'a WritableDirectorySet>,
    names_only: bool,
    cancel: CancelToken,
    pending_dirs: Vec<PathBuf>,
    current: VecDeque<WalkItem>,
}

impl<'a> DirectoryWalker<'a> {
    pub fn new(target: &ScanTarget, resolver: &'a dyn SignatureResolver) -> Self {
        Self {
            resolver,
            safety_mode: target.safety,
            writable: None,
            names_only: false,
            cancel: CancelToken::new(),
            pending_dirs: vec![target.root.clone()],
            current: VecDeque::new(),
        }
    }

    /// Writable-directory set resolving per-directory safety for
    /// `Unknown` roots. Without one, unknown directories default to safe.
    pub fn with_writable_set(mut self, set: &'a WritableDirectorySet) -> Self {
        self.writable = Some(set);
        self
    }

    /// Emit at most one synthetic record per directory instead of full
    /// per-file detail. Subdirectories are still entered.
    pub fn names_only(mut self, enabled: bool) -> Self {
        self.names_only = enabled;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Drain the walk into an aggregated report.
    pub fn collect_report(self) -> ScanReport {
        let mut report = ScanReport::default();
        for item in self {
            match item {
                WalkItem::File(file) => report.files.push(file),
                WalkItem::Directory(hit) => report.directory_hits.push(hit),
                WalkItem::Skipped(skip) => report.skipped.push(skip),
            }
        }
        report
    }

    fn resolve_safety(&self, dir: &Path) -> Safety {
        match self.safety_mode {
            SafetyMode::Safe => Safety::Safe,
            SafetyMode::Unsafe => Safety::Unsafe,
            SafetyMode::Unknown => match self.writable {
                Some(set) if set.contains(dir) => Safety::Unsafe,
                _ => Safety::Safe,
            },
        }
    }

    fn visit_directory(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "directory unreadable, skipping");
                self.current.push_back(WalkItem::Skipped(SkipRecord {
                    path: dir.to_path_buf(),
                    reason: format!("unreadable directory: {}", err),
                }));
                return;
            }
        };

        let mut files: Vec<(PathBuf, fs::Metadata)> = Vec::new();
        let mut subdirs: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(path = %dir.display(), error = %err, "entry unreadable, skipping");
                    self.current.push_back(WalkItem::Skipped(SkipRecord {
                        path: dir.to_path_buf(),
                        reason: format!("unreadable entry: {}", err),
                    }));
                    continue;
                }
            };
            let path = entry.path();
            // symlink_metadata never follows the link, so reparse points
            // are judged on the entry itself.
            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "metadata unavailable, skipping");
                    self.current.push_back(WalkItem::Skipped(SkipRecord {
                        path,
                        reason: format!("metadata unavailable: {}", err),
                    }));
                    continue;
                }
            };

            if is_reparse_point(&metadata) {
                continue;
            }
            if metadata.is_dir() {
                subdirs.push(path);
            } else if metadata.is_file() {
                files.push((path, metadata));
            }
        }

        // Stable order keeps scans reproducible across platforms.
        files.sort_by(|a, b| a.0.cmp(&b.0));
        subdirs.sort();

        let safety = self.resolve_safety(dir);
        if self.names_only {
            for (path, metadata) in &files {
                match classify_on_disk(path, metadata.len()) {
                    Ok(Some(_)) => {
                        self.current.push_back(WalkItem::Directory(DirectoryHit {
                            dir: dir.to_path_buf(),
                            safety,
                        }));
                        break;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "file unreadable, skipping");
                        self.current.push_back(WalkItem::Skipped(SkipRecord {
                            path: path.clone(),
                            reason: format!("unreadable file: {}", err),
                        }));
                    }
                }
            }
        } else {
            for (path, metadata) in &files {
                self.inspect_file(path, metadata, safety);
            }
        }

        // Depth-first: push in reverse so the lexically first subdirectory
        // is visited next.
        for subdir in subdirs.into_iter().rev() {
            self.pending_dirs.push(subdir);
        }
    }

    fn inspect_file(&mut self, path: &Path, metadata: &fs::Metadata, safety: Safety) {
        let kind = match classify_on_disk(path, metadata.len()) {
            Ok(Some(kind)) => kind,
            Ok(None) => return,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "file unreadable, skipping");
                self.current.push_back(WalkItem::Skipped(SkipRecord {
                    path: path.to_path_buf(),
                    reason: format!("unreadable file: {}", err),
                }));
                return;
            }
        };

        let info = match self.resolver.resolve(path) {
            Ok(info) => info,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "signature inspection failed, falling back to hash identity"
                );
                SignerInfo::default()
            }
        };

        let sha256 = match sha256_file(path) {
            Ok(hash) => Some(hash),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "content hash unavailable");
                None
            }
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let parent_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf());

        self.current.push_back(WalkItem::File(DiscoveredFile {
            path: path.to_path_buf(),
            parent_dir,
            kind,
            extension,
            publisher: info.publisher,
            product: info.product,
            binary_name: info.binary_name,
            version: info.version,
            sha256,
            size: metadata.len(),
            modified_unix: unix_time(metadata.modified()),
            created_unix: unix_time(metadata.created()),
            safety,
        }));
    }
}

impl Iterator for DirectoryWalker<'_> {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        loop {
            if let Some(item) = self.current.pop_front() {
                return Some(item);
            }
            if self.cancel.is_cancelled() {
                self.pending_dirs.clear();
                return None;
            }
            let dir = self.pending_dirs.pop()?;
            self.visit_directory(&dir);
        }
    }
}

fn unix_time(time: std::io::Result<SystemTime>) -> Option<i64> {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
}

#[cfg(windows)]
fn is_reparse_point(metadata: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0400;
    metadata.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0
}

#[cfg(not(windows))]
fn is_reparse_point(metadata: &fs::Metadata) -> bool {
    metadata.file_type().is_symlink()
}

#[cfg(test)]
mod tests;
