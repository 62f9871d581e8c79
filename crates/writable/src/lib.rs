//! Writable-directory enumeration.
//!
//! Wraps the external AccessChk utility to answer one question for a scan
//! root: which descendant directories grant write access to principals
//! other than the administrative set? The invocation is Windows-only; the
//! output parser is pure and runs everywhere.

mod parse;

use std::fmt;
use std::path::{Path, PathBuf};

use scanner::WritableDirectorySet;
use tracing::{debug, info};

pub use parse::{parse_accesschk_output, PrincipalFilter};

#[derive(Debug)]
pub enum WritableError {
    /// The AccessChk binary was not found at the configured path.
    ToolMissing(PathBuf),
    Launch {
        path: PathBuf,
        source: std::io::Error,
    },
    ToolFailed {
        status: String,
    },
    /// Enumeration requires a Windows host.
    Unsupported,
}

impl fmt::Display for WritableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolMissing(path) => write!(
                f,
                "AccessChk not found at {}; install Sysinternals AccessChk and point the \
                 accesschk_path setting (or --accesschk) at it",
                path.display()
            ),
            Self::Launch { path, source } => {
                write!(f, "failed launching {}: {}", path.display(), source)
            }
            Self::ToolFailed { status } => {
                write!(f, "AccessChk produced no usable output ({})", status)
            }
            Self::Unsupported => {
                write!(f, "writable-directory enumeration requires a Windows host")
            }
        }
    }
}

impl std::error::Error for WritableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Launch { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type WritableResult<T> = std::result::Result<T, WritableError>;

#[derive(Debug, Clone, Default)]
pub struct OracleOptions {
    /// Principals treated as administrative in addition to the built-in
    /// system accounts.
    pub known_admins: Vec<String>,
    /// Count `NT SERVICE` virtual accounts as non-administrative grantees.
    /// Off by default: service SIDs cannot be assumed user-reachable.
    pub include_nt_service: bool,
}

/// Enumerate every descendant directory of `root` that grants write access
/// to a non-administrative principal.
///
/// Directories whose grantees cannot be resolved (for example against a
/// disconnected domain) are reported writable rather than silently dropped.
pub fn find_writable_directories(
    accesschk: &Path,
    root: &Path,
    options: &OracleOptions,
) -> WritableResult<WritableDirectorySet> {
    if !accesschk.exists() {
        return Err(WritableError::ToolMissing(accesschk.to_path_buf()));
    }

    let output = run_accesschk(accesschk, root)?;
    let filter = PrincipalFilter::new(&options.known_admins, options.include_nt_service);
    let dirs = parse_accesschk_output(&output, &filter);
    info!(
        root = %root.display(),
        writable = dirs.len(),
        "writable-directory enumeration finished"
    );
    Ok(WritableDirectorySet::from_paths(dirs))
}

#[cfg(target_os = "windows")]
fn run_accesschk(accesschk: &Path, root: &Path) -> WritableResult<String> {
    use std::process::Command;

    debug!(tool = %accesschk.display(), root = %root.display(), "running AccessChk");
    let output = Command::new(accesschk)
        .args(["-nobanner", "-w", "-s", "-d"])
        .arg(root)
        .output()
        .map_err(|source| WritableError::Launch {
            path: accesschk.to_path_buf(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(WritableError::ToolFailed {
            status: output.status.to_string(),
        });
    }
    Ok(stdout)
}

#[cfg(not(target_os = "windows"))]
fn run_accesschk(accesschk: &Path, root: &Path) -> WritableResult<String> {
    debug!(tool = %accesschk.display(), root = %root.display(), "AccessChk invocation skipped");
    Err(WritableError::Unsupported)
}
