//! Parser for AccessChk's directory/grantee text output.
//!
//! The protocol: an un-indented line names a directory; the two-space
//! indented lines that follow list its grantees, prefixed `RW` or ` W`
//! for write-capable grants. Blank lines and indented lines without a
//! write prefix are ignored.

use std::collections::HashSet;
use std::path::PathBuf;

/// Principals that never make a directory user-writable, regardless of
/// the caller-supplied administrative set.
const BUILTIN_ADMIN_PRINCIPALS: &[&str] = &[
    "nt authority\\system",
    "builtin\\administrators",
    "nt service\\trustedinstaller",
];

const NT_SERVICE_PREFIX: &str = "nt service\\";

/// Decides whether a grantee counts as a non-administrative principal.
#[derive(Debug, Clone)]
pub struct PrincipalFilter {
    admins_lower: HashSet<String>,
    include_nt_service: bool,
}

impl PrincipalFilter {
    pub fn new(known_admins: &[String], include_nt_service: bool) -> Self {
        let mut admins_lower: HashSet<String> = BUILTIN_ADMIN_PRINCIPALS
            .iter()
            .map(|p| (*p).to_string())
            .collect();
        admins_lower.extend(known_admins.iter().map(|p| p.trim().to_lowercase()));
        Self {
            admins_lower,
            include_nt_service,
        }
    }

    /// True when a write grant to `grantee` makes the directory
    /// user-writable. Unresolvable SIDs count: over-reporting a risky
    /// directory beats missing one.
    fn is_non_admin_grant(&self, grantee: &str) -> bool {
        let grantee = grantee.trim();
        if grantee.is_empty() {
            return false;
        }
        if is_unresolved_sid(grantee) {
            return true;
        }
        let lower = grantee.to_lowercase();
        if self.admins_lower.contains(&lower) {
            return false;
        }
        if !self.include_nt_service && lower.starts_with(NT_SERVICE_PREFIX) {
            return false;
        }
        true
    }
}

fn is_unresolved_sid(grantee: &str) -> bool {
    grantee
        .strip_prefix("S-")
        .map(|rest| {
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == '-')
        })
        .unwrap_or(false)
}

/// Extract the directories with at least one qualifying write grant.
pub fn parse_accesschk_output(output: &str, filter: &PrincipalFilter) -> Vec<PathBuf> {
    let mut writable = Vec::new();
    let mut current: Option<(String, bool)> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(' ') {
            if let Some((path, true)) = current.take() {
                writable.push(PathBuf::from(path));
            }
            current = Some((line.trim_end().to_string(), false));
            continue;
        }

        // Indented line: a grantee for the current path, if prefixed.
        let Some((_, hit)) = current.as_mut() else {
            continue;
        };
        let trimmed = line.trim_start();
        let grantee = if let Some(rest) = trimmed.strip_prefix("RW ") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("W ") {
            rest
        } else {
            continue;
        };
        if filter.is_non_admin_grant(grantee) {
            *hit = true;
        }
    }
    if let Some((path, true)) = current {
        writable.push(PathBuf::from(path));
    }

    writable
}
