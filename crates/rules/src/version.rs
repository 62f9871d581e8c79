use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Four-part dotted binary version (major.minor.build.revision).
///
/// Components compare numerically in order; components missing from the
/// parsed text are zero. Derived ordering on the field sequence is exactly
/// the ordinal comparison the enforcement tool applies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct BinaryVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl BinaryVersion {
    pub fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError {
    raw: String,
}

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid binary version '{}'", self.raw)
    }
}

impl std::error::Error for VersionParseError {}

impl FromStr for BinaryVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || VersionParseError {
            raw: s.to_string(),
        };
        if raw.is_empty() {
            return Err(invalid());
        }

        let mut components = [0u32; 4];
        let mut count = 0;
        for part in raw.split('.') {
            if count == components.len() {
                return Err(invalid());
            }
            components[count] = part.trim().parse::<u32>().map_err(|_| invalid())?;
            count += 1;
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            build: components[2],
            revision: components[3],
        })
    }
}

impl fmt::Display for BinaryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl TryFrom<String> for BinaryVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BinaryVersion> for String {
    fn from(value: BinaryVersion) -> Self {
        value.to_string()
    }
}
