//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify + decode** | `image::guess_format`, raster decoders, `GifDecoder` |
//! | **Crop geometry** | pure functions in `calculations` |
//! | **Crop + scale** | `imageops::crop_imm` + `imageops::resize` per frame |
//! | **Encode** | `JpegEncoder`, `GifEncoder`, `DynamicImage::write_to` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop geometry (unit testable)
//! - **Parameters**: Quality and interpolation settings
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Operations**: Deriving a style variant from decoded frames

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{
    CodecError, Container, FrameSequence, ImageCodec, LoopCount, MediaFormat, SequenceFrame,
};
pub use calculations::{
    CropRegion, DeriveError, calculate_implicit_crop, resolve_crop, validate_crop,
};
pub use operations::derive_variant;
pub use params::{Interpolation, Quality};
pub use rust_backend::{RustCodec, supported_formats};
