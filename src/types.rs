//! Shared types for update-packages

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between base and branch in an identity key.
pub const KEY_SEPARATOR: char = '#';

/// Error type for parsing failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("value cannot be empty")]
    Empty,
    #[error("invalid character in value: {0:?}")]
    InvalidCharacter(char),
    #[error("value cannot be {0:?}")]
    Reserved(String),
    #[error("missing separator '#' in package key")]
    MissingSeparator,
    #[error("invalid base: {0}")]
    InvalidBase(#[source] Box<ParseError>),
    #[error("invalid branch: {0}")]
    InvalidBranch(#[source] Box<ParseError>),
}

/// Validate one half of a package key.
///
/// Both halves end up in a single directory name and inside a URL path, so:
/// - Non-empty
/// - Not `.` or `..`
/// - No path separators, `#`, or control characters
fn validate_component(s: &str) -> Result<(), ParseError> {
    if s.is_empty() {
        return Err(ParseError::Empty);
    }

    if s == "." || s == ".." {
        return Err(ParseError::Reserved(s.to_string()));
    }

    for c in s.chars() {
        if c == '/' || c == '\\' || c == KEY_SEPARATOR || c.is_control() {
            return Err(ParseError::InvalidCharacter(c));
        }
    }

    Ok(())
}

/// Identifies a configured package: `base#branch`.
///
/// Doubles as the package's directory name under the packages root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    base: String,
    branch: String,
}

impl PackageKey {
    /// Creates a key after validating both halves.
    pub fn new(base: &str, branch: &str) -> Result<Self, ParseError> {
        validate_component(base).map_err(|e| ParseError::InvalidBase(Box::new(e)))?;
        validate_component(branch).map_err(|e| ParseError::InvalidBranch(Box::new(e)))?;

        Ok(Self {
            base: base.to_string(),
            branch: branch.to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Top-level directory every entry of the branch archive lives under: `base-branch/`
    pub fn archive_prefix(&self) -> String {
        format!("{}-{}/", self.base, self.branch)
    }
}

impl FromStr for PackageKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, branch) = s
            .split_once(KEY_SEPARATOR)
            .ok_or(ParseError::MissingSeparator)?;
        PackageKey::new(base, branch)
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base, KEY_SEPARATOR, self.branch)
    }
}
