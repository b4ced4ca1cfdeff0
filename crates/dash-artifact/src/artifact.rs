//! Artifact kinds and build identifiers

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Shape a caller expects a fetched artifact to have
///
/// Exactly one representation is produced per fetch, selected by the kind the
/// caller requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// A JSON object
    Json,
    /// A JSON array
    JsonArray,
    /// An HTML document
    Html,
    /// Raw bytes, unparsed
    Bytes,
}

impl ArtifactKind {
    /// Stable identifier of the kind
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "type:json",
            Self::JsonArray => "type:json-array",
            Self::Html => "type:html",
            Self::Bytes => "type:bytes",
        }
    }

    /// Check if the kind is parsed after fetching
    #[inline]
    #[must_use]
    pub const fn is_parsed(self) -> bool {
        !matches!(self, Self::Bytes)
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one CI build
///
/// Opaque to the rest of the system, but always a non-empty run of ASCII
/// digits. Ordering of builds comes from the directory listing, never from
/// this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildId(String);

impl BuildId {
    /// Validate and wrap a build identifier
    ///
    /// Surrounding whitespace (such as the newline of `latest-build.txt`) is
    /// trimmed first.
    ///
    /// # Errors
    /// Returns error if the identifier is empty or not all digits
    pub fn new(raw: &str) -> Result<Self, BuildIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BuildIdError::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BuildIdError::NotNumeric(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Identifier as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BuildId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BuildId {
    type Err = BuildIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BuildId {
    type Error = BuildIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<BuildId> for String {
    fn from(value: BuildId) -> Self {
        value.0
    }
}

impl AsRef<str> for BuildId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors related to build identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildIdError {
    /// Nothing but whitespace
    #[error("empty build id")]
    Empty,

    /// Contains something other than ASCII digits
    #[error("build id is not numeric: '{0}'")]
    NotNumeric(String),
}
