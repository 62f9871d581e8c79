use std::path::Path;

use serde::{Deserialize, Serialize};

use scanner::WritableDirectorySet;

use crate::version::BinaryVersion;

/// The everyone principal, the default target of generated allow rules.
pub const EVERYONE_SID: &str = "S-1-1-0";

/// The built-in administrators group.
pub const ADMINISTRATORS_SID: &str = "S-1-5-32-544";

/// Enforcement-tool rule collection a rule is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleCollection {
    Exe,
    Dll,
    Script,
    Msi,
}

impl RuleCollection {
    pub const ALL: [RuleCollection; 4] = [Self::Exe, Self::Dll, Self::Script, Self::Msi];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exe => "Exe",
            Self::Dll => "Dll",
            Self::Script => "Script",
            Self::Msi => "Msi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleAction {
    Allow,
    Deny,
}

impl RuleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// Rule keyed by code-signing identity, optionally version-floored.
///
/// A floor is the only version bound that exists: observations merge
/// downward and nothing ever narrows the allowed set from above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherRule {
    pub binary_name: String,
    pub product_name: String,
    pub publisher_name: String,
    pub minimum_version: Option<BinaryVersion>,
    pub collection: RuleCollection,
    pub action: RuleAction,
    pub user_or_group_sid: String,
    pub label: String,
    pub description: String,
}

/// Rule keyed by exact content hash, for files without a usable signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashRule {
    pub file_name: String,
    pub sha256_hex: String,
    pub file_length: u64,
    pub collection: RuleCollection,
    pub action: RuleAction,
    pub user_or_group_sid: String,
    pub label: String,
    pub description: String,
}

/// Rule matching a path pattern, with optional carved-out exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRule {
    pub path: String,
    pub exceptions: Vec<String>,
    pub collection: RuleCollection,
    pub action: RuleAction,
    pub user_or_group_sid: String,
    pub label: String,
    pub description: String,
}

/// Rule granting a scanned source tree wholesale, with its user-writable
/// subdirectories carved out as exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePathRule {
    pub source_root: String,
    pub exceptions: Vec<String>,
    pub collection: RuleCollection,
    pub action: RuleAction,
    pub user_or_group_sid: String,
    pub label: String,
    pub description: String,
}

impl SourcePathRule {
    /// Path pattern covering everything beneath the source root.
    pub fn path_pattern(&self) -> String {
        path_pattern(Path::new(&self.source_root))
    }

    /// Carve exceptions for every writable directory at or beneath the
    /// source root.
    pub fn carve_writable(&mut self, writable: &WritableDirectorySet) {
        for dir in writable.members_under(Path::new(&self.source_root)) {
            let pattern = path_pattern(dir);
            if !self.exceptions.contains(&pattern) {
                self.exceptions.push(pattern);
            }
        }
        self.exceptions.sort();
    }
}

/// Pattern matching a directory and everything below it.
pub fn path_pattern(dir: &Path) -> String {
    let text = dir.to_string_lossy();
    let trimmed = text.trim_end_matches(['\\', '/']);
    if trimmed.contains('/') && !trimmed.contains('\\') {
        format!("{}/*", trimmed)
    } else {
        format!("{}\\*", trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    Publisher(PublisherRule),
    Hash(HashRule),
    Path(PathRule),
    SourcePath(SourcePathRule),
}

impl Rule {
    pub fn label(&self) -> &str {
        match self {
            Self::Publisher(r) => &r.label,
            Self::Hash(r) => &r.label,
            Self::Path(r) => &r.label,
            Self::SourcePath(r) => &r.label,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Publisher(r) => &r.description,
            Self::Hash(r) => &r.description,
            Self::Path(r) => &r.description,
            Self::SourcePath(r) => &r.description,
        }
    }

    pub fn collection(&self) -> RuleCollection {
        match self {
            Self::Publisher(r) => r.collection,
            Self::Hash(r) => r.collection,
            Self::Path(r) => r.collection,
            Self::SourcePath(r) => r.collection,
        }
    }

    pub fn action(&self) -> RuleAction {
        match self {
            Self::Publisher(r) => r.action,
            Self::Hash(r) => r.action,
            Self::Path(r) => r.action,
            Self::SourcePath(r) => r.action,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Publisher(_) => "publisher",
            Self::Hash(_) => "hash",
            Self::Path(_) => "path",
            Self::SourcePath(_) => "source-path",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn path_pattern_matches_separator_style() {
        assert_eq!(path_pattern(Path::new(r"C:\Apps\Tool")), r"C:\Apps\Tool\*");
        assert_eq!(path_pattern(Path::new("/opt/apps/")), "/opt/apps/*");
    }

    #[test]
    fn carve_writable_adds_patterns_under_root_only() {
        let writable = WritableDirectorySet::from_paths(vec![
            PathBuf::from("/apps/tool/logs"),
            PathBuf::from("/apps/tool/spool"),
            PathBuf::from("/apps/other/drop"),
        ]);
        let mut rule = SourcePathRule {
            source_root: "/apps/tool".to_string(),
            exceptions: Vec::new(),
            collection: RuleCollection::Exe,
            action: RuleAction::Allow,
            user_or_group_sid: EVERYONE_SID.to_string(),
            label: "tool tree".to_string(),
            description: String::new(),
        };

        rule.carve_writable(&writable);
        assert_eq!(
            rule.exceptions,
            vec!["/apps/tool/logs/*".to_string(), "/apps/tool/spool/*".to_string()]
        );

        // Carving twice does not duplicate.
        rule.carve_writable(&writable);
        assert_eq!(rule.exceptions.len(), 2);
    }
}
