//! Marketing version parsing and release arithmetic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Release granularity for a version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Release {
    /// Increment major, reset minor and patch.
    Major,
    /// Increment minor, reset patch.
    Minor,
    /// Increment patch.
    Patch,
    /// Reapply the current version unchanged.
    Clear,
}

/// A `major.minor.patch` version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses `major[.minor[.patch]]`, filling missing components with 0.
    ///
    /// Surrounding whitespace is ignored. Anything else that does not match
    /// the grammar, or a component above `u64::MAX`, is rejected with
    /// [`Error::MalformedVersion`].
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let malformed = || Error::MalformedVersion(trimmed.to_string());

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(malformed());
        }

        let mut components = [0u64; 3];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            *slot = part.parse().map_err(|_| malformed())?;
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }

    /// Returns the version that follows this one at the given granularity.
    ///
    /// Fails with [`Error::MalformedVersion`] when the bumped component is
    /// already `u64::MAX`.
    pub fn bump(self, release: Release) -> Result<Self> {
        let overflow = || {
            Error::MalformedVersion(format!("{} cannot be bumped at {:?}", self, release))
        };
        let next = match release {
            Release::Major => Self::new(
                self.major.checked_add(1).ok_or_else(overflow)?,
                0,
                0,
            ),
            Release::Minor => Self::new(
                self.major,
                self.minor.checked_add(1).ok_or_else(overflow)?,
                0,
            ),
            Release::Patch => Self::new(
                self.major,
                self.minor,
                self.patch.checked_add(1).ok_or_else(overflow)?,
            ),
            Release::Clear => self,
        };
        Ok(next)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Extracts the version from `agvtool what-marketing-version -terse` output.
///
/// Takes the first line and, when it has the `"<plist>"=<version>` shape,
/// the field after the first `=`.
pub fn parse_marketing_version(output: &str) -> Result<Version> {
    let first_line = output.lines().next().unwrap_or("");
    let field = match first_line.split('=').nth(1) {
        Some(field) => field,
        None => first_line,
    };
    Version::parse(field)
}
