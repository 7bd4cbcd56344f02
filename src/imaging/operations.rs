//! High-level image operations.
//!
//! These functions combine crop geometry with pixel work. Encoding is left to
//! the [`ImageCodec`](super::backend::ImageCodec) so derivation stays pure.

use super::backend::{FrameSequence, SequenceFrame};
use super::calculations::{CropRegion, DeriveError, resolve_crop};
use super::params::Interpolation;
use crate::types::{Rectangle, Size};
use image::imageops;
use rayon::prelude::*;

/// Derive a style variant from a decoded source.
///
/// Every frame is cut to the same region and scaled to exactly `target`
/// with the same filter. Frame order, delays and the loop count carry over
/// unchanged; only the pixel dimensions differ from `source`.
pub fn derive_variant(
    source: &FrameSequence,
    target: Size,
    crop: Option<Rectangle>,
    interpolation: Interpolation,
) -> Result<FrameSequence, DeriveError> {
    let region = resolve_crop(source.dimensions(), target, crop)?;
    Ok(apply_region(source, region, target, interpolation))
}

/// Crop and scale every frame to `target`. `region` must already be validated.
pub fn apply_region(
    source: &FrameSequence,
    region: CropRegion,
    target: Size,
    interpolation: Interpolation,
) -> FrameSequence {
    let filter = interpolation.filter();
    let frames = source
        .frames
        .par_iter()
        .map(|frame| {
            let cropped =
                imageops::crop_imm(&frame.pixels, region.x, region.y, region.width, region.height)
                    .to_image();
            let pixels = if cropped.dimensions() == (target.width, target.height) {
                cropped
            } else {
                imageops::resize(&cropped, target.width, target.height, filter)
            };
            SequenceFrame {
                pixels,
                delay: frame.delay,
            }
        })
        .collect();

    FrameSequence {
        width: target.width,
        height: target.height,
        frames,
        loop_count: source.loop_count,
    }
}
