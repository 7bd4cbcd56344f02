//! Pure calculation functions for crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::types::{Rectangle, Size};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error("crop {rect} exceeds source bounds {width}x{height}")]
    CropOutOfBounds {
        rect: Rectangle,
        width: u32,
        height: u32,
    },
    #[error("crop {rect} has zero width or height")]
    DegenerateCrop { rect: Rectangle },
}

/// A validated crop region, guaranteed to lie inside its source canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<CropRegion> for Rectangle {
    fn from(r: CropRegion) -> Self {
        Rectangle::new(r.x.into(), r.y.into(), r.width.into(), r.height.into())
    }
}

/// Calculate the largest centered region of `source` with `target`'s aspect ratio.
///
/// # Arguments
/// * `source` - Source canvas dimensions (width, height)
/// * `target` - Style size whose aspect ratio the region must match
///
/// # Examples
/// ```
/// # use media_styles::imaging::{calculate_implicit_crop, CropRegion};
/// # use media_styles::types::Size;
/// // 100x80 source, 1:1 target → 80x80 centered horizontally
/// let r = calculate_implicit_crop((100, 80), Size::new(30, 30)).unwrap();
/// assert_eq!(r, CropRegion { x: 10, y: 0, width: 80, height: 80 });
/// ```
pub fn calculate_implicit_crop(source: (u32, u32), target: Size) -> Result<CropRegion, DeriveError> {
    let (src_w, src_h) = source;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = target.width as f64 / target.height as f64;

    let (w, h) = if src_aspect > tgt_aspect {
        // Source is wider: keep full height, center the width
        let w = (src_h as f64 * tgt_aspect).round() as u32;
        (w.min(src_w), src_h)
    } else {
        // Source is taller (or equal): keep full width, center the height
        let h = (src_w as f64 / tgt_aspect).round() as u32;
        (src_w, h.min(src_h))
    };

    let region = CropRegion {
        x: (src_w - w) / 2,
        y: (src_h - h) / 2,
        width: w,
        height: h,
    };
    if w == 0 || h == 0 {
        return Err(DeriveError::DegenerateCrop {
            rect: region.into(),
        });
    }
    Ok(region)
}

/// Check an explicit rectangle against the source canvas.
///
/// Zero-sized rectangles are degenerate; anything negative or reaching past
/// the canvas edge is out of bounds.
pub fn validate_crop(rect: Rectangle, source: (u32, u32)) -> Result<CropRegion, DeriveError> {
    let (src_w, src_h) = source;

    if rect.width == 0 || rect.height == 0 {
        return Err(DeriveError::DegenerateCrop { rect });
    }

    let out_of_bounds = rect.x < 0
        || rect.y < 0
        || rect.width < 0
        || rect.height < 0
        || rect.x.saturating_add(rect.width) > i64::from(src_w)
        || rect.y.saturating_add(rect.height) > i64::from(src_h);
    if out_of_bounds {
        return Err(DeriveError::CropOutOfBounds {
            rect,
            width: src_w,
            height: src_h,
        });
    }

    // In range: every component now fits in u32
    Ok(CropRegion {
        x: rect.x as u32,
        y: rect.y as u32,
        width: rect.width as u32,
        height: rect.height as u32,
    })
}

/// Resolve the region a style is cut from: explicit if given, implicit otherwise.
pub fn resolve_crop(
    source: (u32, u32),
    target: Size,
    crop: Option<Rectangle>,
) -> Result<CropRegion, DeriveError> {
    match crop {
        Some(rect) => validate_crop(rect, source),
        None => calculate_implicit_crop(source, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: u32, y: u32, width: u32, height: u32) -> CropRegion {
        CropRegion {
            x,
            y,
            width,
            height,
        }
    }

    // =========================================================================
    // calculate_implicit_crop tests
    // =========================================================================

    #[test]
    fn implicit_wide_target_crops_height() {
        // 100x80 (1.25) is narrower than 2:1 → full width, height 50
        assert_eq!(
            calculate_implicit_crop((100, 80), Size::new(20, 10)).unwrap(),
            region(0, 15, 100, 50)
        );
    }

    #[test]
    fn implicit_square_target_from_landscape() {
        assert_eq!(
            calculate_implicit_crop((100, 80), Size::new(50, 50)).unwrap(),
            region(10, 0, 80, 80)
        );
    }

    #[test]
    fn implicit_square_target_from_portrait() {
        assert_eq!(
            calculate_implicit_crop((60, 100), Size::new(30, 30)).unwrap(),
            region(0, 20, 60, 60)
        );
    }

    #[test]
    fn implicit_same_aspect_is_full_canvas() {
        assert_eq!(
            calculate_implicit_crop((800, 600), Size::new(400, 300)).unwrap(),
            region(0, 0, 800, 600)
        );
    }

    #[test]
    fn implicit_rounds_to_nearest_pixel() {
        // 4:5 from 801x600: source wider → width = 600 * 0.8 = 480
        assert_eq!(
            calculate_implicit_crop((801, 600), Size::new(4, 5)).unwrap(),
            region(160, 0, 480, 600)
        );
        // 3:2 from 1000x1000: height = 1000 / 1.5 = 666.7 → 667
        assert_eq!(
            calculate_implicit_crop((1000, 1000), Size::new(3, 2)).unwrap(),
            region(0, 166, 1000, 667)
        );
    }

    #[test]
    fn implicit_upscale_target_uses_same_geometry() {
        // Target bigger than source: region still fits inside the source
        assert_eq!(
            calculate_implicit_crop((10, 10), Size::new(500, 250)).unwrap(),
            region(0, 2, 10, 5)
        );
    }

    #[test]
    fn implicit_extreme_aspect_degenerates() {
        // 1px tall source, very tall target: width rounds to 0
        let err = calculate_implicit_crop((100, 1), Size::new(1, 1000)).unwrap_err();
        assert!(matches!(err, DeriveError::DegenerateCrop { .. }));
    }

    // =========================================================================
    // validate_crop tests
    // =========================================================================

    #[test]
    fn validate_accepts_rect_touching_edges() {
        assert_eq!(
            validate_crop(Rectangle::new(0, 0, 100, 80), (100, 80)).unwrap(),
            region(0, 0, 100, 80)
        );
        assert_eq!(
            validate_crop(Rectangle::new(5, 5, 20, 10), (100, 80)).unwrap(),
            region(5, 5, 20, 10)
        );
    }

    #[test]
    fn validate_rejects_overflowing_width() {
        let err = validate_crop(Rectangle::new(90, 0, 20, 10), (100, 80)).unwrap_err();
        assert_eq!(
            err,
            DeriveError::CropOutOfBounds {
                rect: Rectangle::new(90, 0, 20, 10),
                width: 100,
                height: 80
            }
        );
    }

    #[test]
    fn validate_rejects_overflowing_height() {
        assert!(matches!(
            validate_crop(Rectangle::new(0, 75, 10, 10), (100, 80)),
            Err(DeriveError::CropOutOfBounds { .. })
        ));
    }

    #[test]
    fn validate_rejects_negative_origin() {
        assert!(matches!(
            validate_crop(Rectangle::new(-1, 0, 10, 10), (100, 80)),
            Err(DeriveError::CropOutOfBounds { .. })
        ));
        assert!(matches!(
            validate_crop(Rectangle::new(0, -5, 10, 10), (100, 80)),
            Err(DeriveError::CropOutOfBounds { .. })
        ));
    }

    #[test]
    fn validate_rejects_negative_extent() {
        assert!(matches!(
            validate_crop(Rectangle::new(50, 50, -10, 10), (100, 80)),
            Err(DeriveError::CropOutOfBounds { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_extent_as_degenerate() {
        assert!(matches!(
            validate_crop(Rectangle::new(0, 0, 0, 10), (100, 80)),
            Err(DeriveError::DegenerateCrop { .. })
        ));
        assert!(matches!(
            validate_crop(Rectangle::new(0, 0, 10, 0), (100, 80)),
            Err(DeriveError::DegenerateCrop { .. })
        ));
    }

    #[test]
    fn validate_handles_huge_values_without_overflow() {
        assert!(matches!(
            validate_crop(Rectangle::new(i64::MAX, 0, i64::MAX, 1), (100, 80)),
            Err(DeriveError::CropOutOfBounds { .. })
        ));
    }

    // =========================================================================
    // resolve_crop tests
    // =========================================================================

    #[test]
    fn resolve_prefers_explicit_rect() {
        let r = resolve_crop(
            (100, 80),
            Size::new(50, 50),
            Some(Rectangle::new(1, 2, 3, 4)),
        )
        .unwrap();
        assert_eq!(r, region(1, 2, 3, 4));
    }

    #[test]
    fn resolve_falls_back_to_implicit() {
        let r = resolve_crop((100, 80), Size::new(50, 50), None).unwrap();
        assert_eq!(r, region(10, 0, 80, 80));
    }
}
