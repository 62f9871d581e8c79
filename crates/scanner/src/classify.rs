//! Coarse file-type classification.
//!
//! Classification is deliberately cheap: extension tables for script and
//! installer formats, and a two-byte magic-number probe for PE binaries.
//! Full header parsing is avoided so classification stays viable at
//! whole-drive scan scale.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extensions treated as scripts: batch, Windows Script Host, and
/// PowerShell formats.
pub const SCRIPT_EXTENSIONS: &[&str] = &[
    "bat", "cmd", "js", "jse", "ps1", "vbe", "vbs", "wsf", "wsh",
];

/// Extensions treated as Windows Installer packages.
pub const INSTALLER_EXTENSIONS: &[&str] = &["msi", "msp", "mst"];

/// Smallest byte length at which a file can qualify as a PE binary.
pub const MIN_BINARY_LEN: u64 = 64;

const MZ_MAGIC: [u8; 2] = *b"MZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Binary,
    Script,
    Installer,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Script => "script",
            Self::Installer => "installer",
        }
    }
}

/// Classify a file from its extension, leading bytes, and byte length.
///
/// Pure function: the same `(extension, prefix, length)` always yields the
/// same result. Zero-length files are never classified; downstream
/// signature tooling cannot cope with empty input. Extension matching is
/// case-insensitive and checked before the binary probe, so an extension
/// that appears in a table wins over an `MZ` prefix.
pub fn classify(extension: Option<&str>, prefix: &[u8], length: u64) -> Option<FileKind> {
    if length == 0 {
        return None;
    }

    if let Some(ext) = extension {
        let ext = ext.to_ascii_lowercase();
        if SCRIPT_EXTENSIONS.contains(&ext.as_str()) {
            return Some(FileKind::Script);
        }
        if INSTALLER_EXTENSIONS.contains(&ext.as_str()) {
            return Some(FileKind::Installer);
        }
    }

    if length >= MIN_BINARY_LEN && prefix.len() >= 2 && prefix[..2] == MZ_MAGIC {
        return Some(FileKind::Binary);
    }

    None
}

/// Classify a file on disk, reading at most two bytes and only when the
/// extension tables did not already decide.
pub(crate) fn classify_on_disk(path: &Path, length: u64) -> std::io::Result<Option<FileKind>> {
    if length == 0 {
        return Ok(None);
    }

    let extension = path.extension().and_then(|e| e.to_str());
    if let Some(kind) = classify(extension, &[], length) {
        return Ok(Some(kind));
    }
    if length < MIN_BINARY_LEN {
        return Ok(None);
    }

    let mut prefix = [0u8; 2];
    let mut file = File::open(path)?;
    let n = file.read(&mut prefix)?;
    Ok(classify(extension, &prefix[..n], length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_extensions_classify_case_insensitively() {
        assert_eq!(classify(Some("bat"), &[], 10), Some(FileKind::Script));
        assert_eq!(classify(Some("PS1"), &[], 10), Some(FileKind::Script));
        assert_eq!(classify(Some("VbS"), &[], 1), Some(FileKind::Script));
    }

    #[test]
    fn installer_extensions_classify() {
        assert_eq!(classify(Some("msi"), &[], 10), Some(FileKind::Installer));
        assert_eq!(classify(Some("MSP"), &[], 10), Some(FileKind::Installer));
    }

    #[test]
    fn mz_prefix_with_sufficient_length_is_binary() {
        assert_eq!(classify(Some("exe"), b"MZ", 64), Some(FileKind::Binary));
        assert_eq!(classify(None, b"MZ\x90\x00", 4096), Some(FileKind::Binary));
    }

    #[test]
    fn short_mz_file_is_not_binary() {
        assert_eq!(classify(Some("dat"), b"MZ", 10), None);
        assert_eq!(classify(Some("dat"), b"MZ", 63), None);
    }

    #[test]
    fn zero_length_is_never_classified() {
        assert_eq!(classify(Some("bat"), b"MZ", 0), None);
        assert_eq!(classify(Some("msi"), &[], 0), None);
        assert_eq!(classify(Some("exe"), b"MZ", 0), None);
    }

    #[test]
    fn script_table_wins_over_binary_probe() {
        // An MZ-prefixed file with a script extension resolves to Script.
        assert_eq!(classify(Some("cmd"), b"MZ", 128), Some(FileKind::Script));
    }

    #[test]
    fn unknown_extension_without_magic_is_skipped() {
        assert_eq!(classify(Some("txt"), b"he", 128), None);
        assert_eq!(classify(None, &[], 128), None);
    }

    #[test]
    fn classification_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify(Some("exe"), b"MZ", 64), Some(FileKind::Binary));
            assert_eq!(classify(Some("exe"), b"ZM", 64), None);
        }
    }
}
