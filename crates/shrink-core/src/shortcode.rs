use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Accepted length of a caller-supplied code, in bytes.
pub const CODE_LENGTH_RANGE: RangeInclusive<usize> = 3..=32;

/// Key of a stored URL, the last path segment of its short URL.
///
/// Codes read from the outside (CLI arguments, request paths) go through
/// [`ShortCode::new`], which only admits URL-safe `[A-Za-z0-9_-]` codes of
/// [`CODE_LENGTH_RANGE`]. Generated codes and rows read back from a backend
/// use [`ShortCode::new_unchecked`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

fn is_code_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_')
}

impl ShortCode {
    pub fn new(code: impl Into<String>) -> Result<Self, CoreError> {
        let code = code.into();

        if !CODE_LENGTH_RANGE.contains(&code.len()) {
            return Err(CoreError::InvalidShortCode(format!(
                "{code:?} is {} bytes long, expected {}..={}",
                code.len(),
                CODE_LENGTH_RANGE.start(),
                CODE_LENGTH_RANGE.end()
            )));
        }
        if let Some(bad) = code.chars().find(|&c| !is_code_char(c)) {
            return Err(CoreError::InvalidShortCode(format!(
                "{code:?} contains {bad:?}, only [A-Za-z0-9_-] is allowed"
            )));
        }

        Ok(Self(code))
    }

    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Joins the code onto `base_url`, tolerating a trailing slash.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for ShortCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
