//! Typed artifact parsers
//!
//! One parser per [`ArtifactKind`]; [`parse`] dispatches on the kind the
//! caller asked for and produces exactly one [`ArtifactResult`] variant.

pub mod html;
pub mod json;

pub use html::{HtmlDocument, HtmlElement};
pub use json::{get_path, JsonArray, JsonObject};

use crate::error::ParseError;
use dash_artifact::ArtifactKind;

/// A fetched artifact in the representation its caller requested
#[derive(Debug)]
pub enum ArtifactResult {
    /// A JSON object
    Json(JsonObject),
    /// A JSON array
    JsonArray(JsonArray),
    /// A parsed HTML document
    Html(HtmlDocument),
    /// Unparsed content
    Bytes(Vec<u8>),
}

impl ArtifactResult {
    /// Kind of this result
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ArtifactKind {
        match self {
            Self::Json(_) => ArtifactKind::Json,
            Self::JsonArray(_) => ArtifactKind::JsonArray,
            Self::Html(_) => ArtifactKind::Html,
            Self::Bytes(_) => ArtifactKind::Bytes,
        }
    }

    /// JSON object, if this is one
    #[must_use]
    pub fn into_json(self) -> Option<JsonObject> {
        match self {
            Self::Json(obj) => Some(obj),
            _ => None,
        }
    }

    /// JSON array, if this is one
    #[must_use]
    pub fn into_json_array(self) -> Option<JsonArray> {
        match self {
            Self::JsonArray(items) => Some(items),
            _ => None,
        }
    }

    /// HTML document, if this is one
    #[must_use]
    pub fn into_html(self) -> Option<HtmlDocument> {
        match self {
            Self::Html(doc) => Some(doc),
            _ => None,
        }
    }

    /// Raw bytes, if this is unparsed content
    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Parse content as `kind`
///
/// # Errors
/// Returns error if the content does not have the requested shape
pub fn parse(kind: ArtifactKind, content: Vec<u8>) -> Result<ArtifactResult, ParseError> {
    match kind {
        ArtifactKind::Json => json::parse_object(&content).map(ArtifactResult::Json),
        ArtifactKind::JsonArray => json::parse_array(&content).map(ArtifactResult::JsonArray),
        ArtifactKind::Html => Ok(ArtifactResult::Html(HtmlDocument::parse(&content))),
        ArtifactKind::Bytes => Ok(ArtifactResult::Bytes(content)),
    }
}
