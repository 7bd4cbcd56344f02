//! Shared types passed between the engine, the deriver and the persistence layer.
//!
//! [`AttachmentRecord`] and [`CropPayload`] are serialized to JSON by callers
//! (the CLI stores records as JSON files, web handlers receive payloads as
//! JSON bodies), so their field names are a wire contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Crop region in source-image pixel coordinates.
///
/// Fields are signed so that a payload carrying negative values still parses
/// and is rejected by bounds validation rather than by the JSON layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    #[serde(rename = "X", alias = "x")]
    pub x: i64,
    #[serde(rename = "Y", alias = "y")]
    pub y: i64,
    #[serde(rename = "Width", alias = "width")]
    pub width: i64,
    #[serde(rename = "Height", alias = "height")]
    pub height: i64,
}

impl Rectangle {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Target output dimensions of a style. Both edges are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One logical media asset as stored by the embedding application.
///
/// The engine reads and writes these fields but never owns the record:
/// creating, persisting and destroying it is the caller's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Attachment identifier, used as the storage directory of every path.
    pub id: String,
    /// Storage path of the uploaded original. Empty until an upload occurs.
    #[serde(default)]
    pub original_path: String,
    /// Content token of the upload. Variant paths derive from it even after
    /// the original has moved to a crop-state token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub upload_token: String,
    #[serde(default)]
    pub crop_applied: bool,
    /// Explicit crop rectangles keyed by style name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub crop_options: BTreeMap<String, Rectangle>,
}

impl AttachmentRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn has_upload(&self) -> bool {
        !self.original_path.is_empty()
    }
}

/// Crop update request: `{"crop": bool, "cropOptions": {style: Rectangle}}`.
///
/// With `crop = false` the named styles go back to the implicit centered crop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropPayload {
    #[serde(alias = "Crop")]
    pub crop: bool,
    #[serde(rename = "cropOptions", alias = "CropOptions", default)]
    pub crop_options: BTreeMap<String, Rectangle>,
}

impl CropPayload {
    /// Parse the canonical textual encoding.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> String {
        // A map of plain integers always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}
