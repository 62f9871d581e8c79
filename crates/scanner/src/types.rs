use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::FileKind;

/// Safety classification of a scan root, fixed for the whole scan.
///
/// `Unknown` roots must be resolved per-directory against a
/// [`WritableDirectorySet`] computed before traversal begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyMode {
    Safe,
    Unsafe,
    Unknown,
}

/// Resolved per-file safety label: whether the enclosing directory is
/// writable by non-administrative principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Safety {
    Safe,
    Unsafe,
}

impl Safety {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Unsafe => "unsafe",
        }
    }
}

/// A root path plus its safety classification. Immutable during a scan.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub root: PathBuf,
    pub safety: SafetyMode,
}

impl ScanTarget {
    pub fn new(root: impl Into<PathBuf>, safety: SafetyMode) -> Self {
        Self {
            root: root.into(),
            safety,
        }
    }
}

/// Directories beneath one `Unknown` scan root known to grant write access
/// to non-administrative principals. Built once before traversal, read-only
/// afterwards.
///
/// Membership is judged on a normalized key (separators unified, trailing
/// separator trimmed, lowercased) matching Windows filesystem semantics;
/// the original spelling is retained for display.
#[derive(Debug, Clone, Default)]
pub struct WritableDirectorySet {
    members: BTreeMap<String, PathBuf>,
}

impl WritableDirectorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut set = Self::new();
        for path in paths {
            set.insert(&path);
        }
        set
    }

    pub fn insert(&mut self, path: &Path) {
        self.members
            .insert(normalize_path_key(path), path.to_path_buf());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.members.contains_key(&normalize_path_key(path))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in normalized-key order, original spelling preserved.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> + '_ {
        self.members.values()
    }

    /// Members whose path lies at or beneath `root`.
    pub fn members_under(&self, root: &Path) -> Vec<&PathBuf> {
        let prefix = normalize_path_key(root);
        self.members
            .iter()
            .filter(|(key, _)| {
                key.as_str() == prefix || key.starts_with(&format!("{}/", prefix))
            })
            .map(|(_, path)| path)
            .collect()
    }
}

pub(crate) fn normalize_path_key(path: &Path) -> String {
    let mut key = path.to_string_lossy().replace('\\', "/");
    while key.len() > 1 && key.ends_with('/') {
        key.pop();
    }
    key.to_lowercase()
}

/// One observed file of interest. Produced by traversal and consumed
/// immediately by rule reduction or report output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub parent_dir: PathBuf,
    pub kind: FileKind,
    /// Lowercased extension without the dot; empty when the file has none.
    pub extension: String,
    pub publisher: Option<String>,
    pub product: Option<String>,
    /// Binary name from the version resource (typically the original
    /// file name recorded at build time).
    pub binary_name: Option<String>,
    /// Dotted file version string as reported by the version resource.
    pub version: Option<String>,
    pub sha256: Option<String>,
    pub size: u64,
    pub modified_unix: Option<i64>,
    pub created_unix: Option<i64>,
    pub safety: Safety,
}

/// Synthetic names-only record: the directory contained at least one
/// qualifying file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryHit {
    pub dir: PathBuf,
    pub safety: Safety,
}

/// A per-item condition that did not stop the walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipRecord {
    pub path: PathBuf,
    pub reason: String,
}

/// One item yielded by the walker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalkItem {
    File(DiscoveredFile),
    Directory(DirectoryHit),
    Skipped(SkipRecord),
}

/// Aggregated outcome of a completed walk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub files: Vec<DiscoveredFile>,
    pub directory_hits: Vec<DirectoryHit>,
    pub skipped: Vec<SkipRecord>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directory_hits.is_empty()
    }
}
