//! Storage path construction and parsing.
//!
//! Every stored file follows one dot-delimited convention:
//!
//! ```text
//! <id>/<basename>.<token>.<ext>           original upload
//! <id>/<basename>.<token>.<style>.<ext>   style variant
//! ```
//!
//! The style is always the third dot-delimited component of the file name.
//! Consumers rely on that for style introspection, so basenames and style
//! names are sanitized to never contain a dot.
//!
//! ## Tokens
//!
//! Tokens are short SHA-256 prefixes, so equal input always yields the same
//! path:
//! - **Upload token**: hash of the uploaded bytes. Shared by the original and
//!   every uncropped variant.
//! - **Crop token**: hash of (upload token, style, rectangle). A new
//!   rectangle gives a new path; repeating the same rectangle reuses it.
//! - **Original token**: the upload token while no style is cropped,
//!   otherwise a hash of the upload token and every crop rectangle. The
//!   original moves whenever the crop state changes and returns to its
//!   upload path once every crop is reset.

use crate::imaging::MediaFormat;
use crate::types::Rectangle;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hex characters kept from a SHA-256 digest.
pub const TOKEN_LEN: usize = 12;

/// Result of parsing a stored path like `42/logo.3fa9c1d2e4b5.small.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// Directory part (the sanitized attachment id), without trailing slash.
    pub dir: String,
    pub stem: String,
    pub token: String,
    /// Style name for variants, `None` for the original.
    pub style: Option<String>,
    pub ext: String,
}

impl ParsedPath {
    pub fn format(&self) -> Option<MediaFormat> {
        MediaFormat::from_extension(&self.ext)
    }

    /// Same file under another token, keeping the style if any.
    pub fn with_token(&self, token: &str) -> String {
        ParsedPath {
            token: token.to_string(),
            ..self.clone()
        }
        .to_path()
    }

    /// Render back to a storage path.
    pub fn to_path(&self) -> String {
        let file = match &self.style {
            Some(style) => format!("{}.{}.{}.{}", self.stem, self.token, style, self.ext),
            None => format!("{}.{}.{}", self.stem, self.token, self.ext),
        };
        if self.dir.is_empty() {
            file
        } else {
            format!("{}/{}", self.dir, file)
        }
    }

    /// Path of `style`'s variant under `token`, sharing this path's directory, stem and extension.
    pub fn variant(&self, style: &str, token: &str) -> String {
        ParsedPath {
            dir: self.dir.clone(),
            stem: self.stem.clone(),
            token: token.to_string(),
            style: Some(sanitize_segment(style)),
            ext: self.ext.clone(),
        }
        .to_path()
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` with `-`.
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Sanitize each `/`-separated segment of an attachment id.
///
/// Empty, `.` and `..` segments are dropped so an id can never escape the
/// storage root.
pub fn sanitize_id(id: &str) -> String {
    id.split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(sanitize_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Sanitized stem of the uploaded file name; `file` if nothing usable remains.
pub fn file_basename(original_file_name: &str) -> String {
    let name = original_file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_file_name);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let clean = sanitize_segment(stem);
    if clean.trim_matches('-').is_empty() {
        "file".to_string()
    } else {
        clean
    }
}

/// Token of an upload: SHA-256 prefix of its bytes.
pub fn upload_token(bytes: &[u8]) -> String {
    short_hex(Sha256::digest(bytes).as_slice())
}

/// Token of one style's crop state within an upload.
pub fn crop_token(upload_token: &str, style: &str, rect: &Rectangle) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"crop\0");
    hasher.update(upload_token.as_bytes());
    hasher.update(b"\0");
    hasher.update(style.as_bytes());
    hasher.update(b"\0");
    hasher.update(rect.x.to_le_bytes());
    hasher.update(rect.y.to_le_bytes());
    hasher.update(rect.width.to_le_bytes());
    hasher.update(rect.height.to_le_bytes());
    short_hex(hasher.finalize().as_slice())
}

/// Token of the original under the record's current crop state.
pub fn original_token(upload_token: &str, crop_options: &BTreeMap<String, Rectangle>) -> String {
    if crop_options.is_empty() {
        return upload_token.to_string();
    }
    let mut hasher = Sha256::new();
    hasher.update(b"original\0");
    hasher.update(upload_token.as_bytes());
    for (style, rect) in crop_options {
        hasher.update(b"\0");
        hasher.update(style.as_bytes());
        hasher.update(b"\0");
        hasher.update(rect.x.to_le_bytes());
        hasher.update(rect.y.to_le_bytes());
        hasher.update(rect.width.to_le_bytes());
        hasher.update(rect.height.to_le_bytes());
    }
    short_hex(hasher.finalize().as_slice())
}

fn short_hex(digest: &[u8]) -> String {
    let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(TOKEN_LEN);
    hex
}

/// `<id>/<basename>.<token>.<ext>`
pub fn build_original_path(
    id: &str,
    original_file_name: &str,
    token: &str,
    format: MediaFormat,
) -> String {
    ParsedPath {
        dir: sanitize_id(id),
        stem: file_basename(original_file_name),
        token: token.to_string(),
        style: None,
        ext: format.extension().to_string(),
    }
    .to_path()
}

/// `<id>/<basename>.<token>.<style>.<ext>`
pub fn build_path(
    id: &str,
    original_file_name: &str,
    style: &str,
    token: &str,
    format: MediaFormat,
) -> String {
    ParsedPath {
        dir: sanitize_id(id),
        stem: file_basename(original_file_name),
        token: token.to_string(),
        style: Some(sanitize_segment(style)),
        ext: format.extension().to_string(),
    }
    .to_path()
}

/// Parse a path produced by [`build_path`] or [`build_original_path`].
pub fn parse_path(path: &str) -> Option<ParsedPath> {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", path),
    };
    let parts: Vec<&str> = file.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let (stem, token, style, ext) = match parts.as_slice() {
        [stem, token, ext] => (*stem, *token, None, *ext),
        [stem, token, style, ext] => (*stem, *token, Some(style.to_string()), *ext),
        _ => return None,
    };
    Some(ParsedPath {
        dir: dir.to_string(),
        stem: stem.to_string(),
        token: token.to_string(),
        style,
        ext: ext.to_string(),
    })
}

/// Style named by a variant path, read from its third dot-delimited component.
pub fn style_of(path: &str) -> Option<String> {
    parse_path(path).and_then(|p| p.style)
}
