//! Unity version parsing and ordering
//!
//! Unity versions look like `2022.3.10f1`: a numeric `major.minor.patch`, a kind letter
//! (`a` alpha, `b` beta, `f` final) and a build number. They are not semver, so
//! comparison is done on the numeric fields.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)([abf])(\d+)$").expect("version pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid Unity version: '{0}'")]
pub struct ParseError(pub String);

/// Kind of release encoded by the letter between patch and build
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReleaseKind {
    Alpha,
    Beta,
    Final,
}

impl ReleaseKind {
    pub fn is_official(self) -> bool {
        self == ReleaseKind::Final
    }

    fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "a" => Some(ReleaseKind::Alpha),
            "b" => Some(ReleaseKind::Beta),
            "f" => Some(ReleaseKind::Final),
            _ => None,
        }
    }
}

/// Comparable key derived from a Unity version string
///
/// Ordering is `(major, minor, patch, build)` compared numerically; `kind` is only
/// consulted when all four are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionOrdinal {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
    pub kind: ReleaseKind,
}

impl VersionOrdinal {
    pub fn parse(version: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError(version.to_string());
        let captures = VERSION_PATTERN.captures(version).ok_or_else(invalid)?;
        let number = |i: usize| captures[i].parse::<u32>().map_err(|_| invalid());

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            build: number(5)?,
            kind: ReleaseKind::from_letter(&captures[4]).ok_or_else(invalid)?,
        })
    }

    pub fn is_official(&self) -> bool {
        self.kind.is_official()
    }
}

impl FromStr for VersionOrdinal {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Find the highest version among `versions` within the official or pre-release partition
///
/// Unparseable versions are skipped rather than ranked.
pub fn find_latest<'a, I>(versions: I, official: bool) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .filter_map(|v| VersionOrdinal::parse(v).ok().map(|ordinal| (v, ordinal)))
        .filter(|(_, ordinal)| ordinal.is_official() == official)
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(v, _)| v)
}
