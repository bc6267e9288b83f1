//! Structured version and build-number comparison.
//!
//! Catalog entries are ordered by OS version and build number, neither of
//! which sorts correctly as a plain string ("9.2" must precede "10.1", and
//! build "9A334" must precede "10A403"). `Version` and `BuildNumber` parse
//! the strings once and carry `Ord` implementations the sort relies on.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::OtaError;

/// Build strings look like `13A344` or `13A344a`: numeric major, one train
/// letter, numeric suffix, optional lowercase revision.
static BUILD_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})([A-Z])(\d{1,4})([a-z])?$").expect("valid regex"));

/// A dotted numeric version string, compared segment-wise.
///
/// A shorter version sorts before its extensions: `9.2 < 9.2.0 < 9.2.1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    segments: Vec<u32>,
}

impl Version {
    /// Parse a dotted numeric version such as `9.2.1`.
    pub fn parse(text: &str) -> Result<Self, OtaError> {
        let segments = text
            .split('.')
            .map(|seg| seg.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| OtaError::InvalidVersionBound(text.to_string()))?;

        if segments.is_empty() {
            return Err(OtaError::InvalidVersionBound(text.to_string()));
        }

        Ok(Version { segments })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&text)
    }
}

/// A build number, compared structurally when it matches the usual shape.
///
/// Shaped builds order by (major, train letter, suffix, revision); a build
/// that does not match the shape sorts after every shaped build, by raw
/// string among themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildNumber {
    raw: String,
    parts: Option<(u16, char, u32, Option<char>)>,
}

impl BuildNumber {
    pub fn new(raw: &str) -> Self {
        let parts = BUILD_SHAPE.captures(raw).map(|caps| {
            // The shape regex guarantees these groups parse.
            let major = caps[1].parse::<u16>().unwrap_or(0);
            let train = caps[2].chars().next().unwrap_or('A');
            let number = caps[3].parse::<u32>().unwrap_or(0);
            let revision = caps.get(4).and_then(|m| m.as_str().chars().next());
            (major, train, number, revision)
        });

        BuildNumber {
            raw: raw.to_string(),
            parts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for BuildNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parts, &other.parts) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for BuildNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
