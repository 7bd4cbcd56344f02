//! Named style sizes.
//!
//! The registry is built once and never changes. Names are restricted to
//! `[A-Za-z0-9_-]` so a style always occupies exactly one dot-delimited
//! component of a storage path.

use crate::types::Size;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid style name {0:?}: use only letters, digits, '_' and '-'")]
    InvalidName(String),
    #[error("style {style:?} has a zero edge ({size})")]
    ZeroSize { style: String, size: Size },
}

/// Immutable, ordered mapping from style name to target size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleRegistry {
    styles: BTreeMap<String, Size>,
}

pub fn is_valid_style_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl StyleRegistry {
    pub fn new<I, K>(styles: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, Size)>,
        K: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, size) in styles {
            let name = name.into();
            if !is_valid_style_name(&name) {
                return Err(RegistryError::InvalidName(name));
            }
            if size.width == 0 || size.height == 0 {
                return Err(RegistryError::ZeroSize { style: name, size });
            }
            map.insert(name, size);
        }
        Ok(Self { styles: map })
    }

    /// Deterministic name → size mapping.
    pub fn sizes(&self) -> &BTreeMap<String, Size> {
        &self.styles
    }

    pub fn get(&self, style: &str) -> Option<Size> {
        self.styles.get(style).copied()
    }

    pub fn contains(&self, style: &str) -> bool {
        self.styles.contains_key(style)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Size)> {
        self.styles.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
