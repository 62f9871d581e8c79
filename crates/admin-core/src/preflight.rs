//! Environment checks that must pass before scan work begins.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::settings::Settings;

/// Resolve the AccessChk binary from an explicit flag or settings, failing
/// with remediation guidance when neither yields a usable path.
pub fn resolve_accesschk(flag: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    let candidate = flag
        .map(Path::to_path_buf)
        .or_else(|| settings.accesschk_path.clone());
    match candidate {
        Some(path) if path.exists() => Ok(path),
        Some(path) => bail!(
            "AccessChk not found at {}; install Sysinternals AccessChk and update the \
             accesschk_path setting",
            path.display()
        ),
        None => bail!(
            "no AccessChk configured; run 'applock-admin settings set accesschk_path <path>' \
             or pass --accesschk"
        ),
    }
}

/// ACL enumeration under-reports without an elevated token, which would
/// silently shrink the writable-directory set.
#[cfg(target_os = "windows")]
pub fn ensure_elevated() -> Result<()> {
    use std::process::Command;

    const WHOAMI_EXE: &str = r"C:\Windows\System32\whoami.exe";
    // High and System mandatory integrity levels.
    const ELEVATED_LEVELS: [&str; 2] = ["S-1-16-12288", "S-1-16-16384"];

    let output = match Command::new(WHOAMI_EXE).args(["/groups"]).output() {
        Ok(output) if output.status.success() => output,
        _ => {
            tracing::warn!("elevation probe unavailable; continuing unchecked");
            return Ok(());
        }
    };

    let groups = String::from_utf8_lossy(&output.stdout);
    if ELEVATED_LEVELS.iter().any(|level| groups.contains(level)) {
        Ok(())
    } else {
        bail!(
            "administrative rights are required for writable-directory enumeration; \
             rerun from an elevated prompt"
        )
    }
}

#[cfg(not(target_os = "windows"))]
pub fn ensure_elevated() -> Result<()> {
    tracing::debug!("elevation probe skipped off Windows");
    Ok(())
}
