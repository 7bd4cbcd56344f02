//! Parameter types for codec and derivation operations.
//!
//! These describe *what* to do, not *how*. The
//! [`operations`](super::operations) module resolves geometry and the
//! [`backend`](super::backend) codec does the byte-level work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Interpolation`]: Resampling filter applied identically to every frame.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Resampling filter used when scaling a crop to a style's size.
///
/// One filter is applied to every frame of a sequence so animated variants
/// stay consistent frame to frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Interpolation {
    pub fn filter(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Triangle => FilterType::Triangle,
            Interpolation::CatmullRom => FilterType::CatmullRom,
            Interpolation::Gaussian => FilterType::Gaussian,
            Interpolation::Lanczos3 => FilterType::Lanczos3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Triangle => "triangle",
            Interpolation::CatmullRom => "catmull-rom",
            Interpolation::Gaussian => "gaussian",
            Interpolation::Lanczos3 => "lanczos3",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest" => Ok(Interpolation::Nearest),
            "triangle" | "bilinear" => Ok(Interpolation::Triangle),
            "catmull-rom" => Ok(Interpolation::CatmullRom),
            "gaussian" => Ok(Interpolation::Gaussian),
            "lanczos3" => Ok(Interpolation::Lanczos3),
            other => Err(format!("unknown interpolation '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn interpolation_default_is_bilinear() {
        assert_eq!(Interpolation::default(), Interpolation::Triangle);
        assert_eq!(Interpolation::default().filter(), FilterType::Triangle);
    }

    #[test]
    fn interpolation_parses_names() {
        assert_eq!("lanczos3".parse(), Ok(Interpolation::Lanczos3));
        assert_eq!("bilinear".parse(), Ok(Interpolation::Triangle));
        assert_eq!("catmull-rom".parse(), Ok(Interpolation::CatmullRom));
        assert!("bicubic".parse::<Interpolation>().is_err());
    }

    #[test]
    fn interpolation_name_roundtrips_through_from_str() {
        for i in [
            Interpolation::Nearest,
            Interpolation::Triangle,
            Interpolation::CatmullRom,
            Interpolation::Gaussian,
            Interpolation::Lanczos3,
        ] {
            assert_eq!(i.name().parse(), Ok(i));
        }
    }
}
