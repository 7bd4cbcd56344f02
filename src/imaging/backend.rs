//! Codec trait and the in-memory frame representation.
//!
//! The [`ImageCodec`] trait defines the two operations every codec must
//! support: decode bytes into a [`FrameSequence`], and encode one back.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), built on the `image` crate.
//! Dispatch between single-frame raster formats and animated containers is
//! driven by [`MediaFormat::container`], never by inspecting frame counts.

use image::{Delay, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// How a format stores its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Exactly one frame.
    Raster,
    /// Ordered frames with per-frame delay and a loop count.
    Animated,
}

/// Formats the codec layer can decode and re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Tiff,
}

impl MediaFormat {
    pub const ALL: [MediaFormat; 6] = [
        MediaFormat::Png,
        MediaFormat::Jpeg,
        MediaFormat::Gif,
        MediaFormat::WebP,
        MediaFormat::Bmp,
        MediaFormat::Tiff,
    ];

    pub fn container(self) -> Container {
        match self {
            MediaFormat::Gif => Container::Animated,
            _ => Container::Raster,
        }
    }

    /// Canonical extension written into storage paths.
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Png => "png",
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Gif => "gif",
            MediaFormat::WebP => "webp",
            MediaFormat::Bmp => "bmp",
            MediaFormat::Tiff => "tiff",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(MediaFormat::Png),
            "jpg" | "jpeg" => Some(MediaFormat::Jpeg),
            "gif" => Some(MediaFormat::Gif),
            "webp" => Some(MediaFormat::WebP),
            "bmp" => Some(MediaFormat::Bmp),
            "tif" | "tiff" => Some(MediaFormat::Tiff),
            _ => None,
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            MediaFormat::Png => image::ImageFormat::Png,
            MediaFormat::Jpeg => image::ImageFormat::Jpeg,
            MediaFormat::Gif => image::ImageFormat::Gif,
            MediaFormat::WebP => image::ImageFormat::WebP,
            MediaFormat::Bmp => image::ImageFormat::Bmp,
            MediaFormat::Tiff => image::ImageFormat::Tiff,
        }
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.image_format() == format)
    }
}

/// Loop behaviour of an animated container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopCount {
    /// No loop extension: play through once.
    #[default]
    Once,
    Infinite,
    /// Repeat this many extra times.
    Finite(u16),
}

/// One decoded frame at full canvas size.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceFrame {
    pub pixels: RgbaImage,
    pub delay: Delay,
}

impl SequenceFrame {
    pub fn still(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            delay: Delay::from_numer_denom_ms(0, 1),
        }
    }

    /// Frame delay in whole milliseconds, rounded down.
    pub fn delay_ms(&self) -> u32 {
        let (numer, denom) = self.delay.numer_denom_ms();
        numer / denom.max(1)
    }
}

/// Decoded frames plus the metadata shared by all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<SequenceFrame>,
    pub loop_count: LoopCount,
}

impl FrameSequence {
    /// A single-frame sequence sized to its image.
    pub fn single(pixels: RgbaImage) -> Self {
        Self {
            width: pixels.width(),
            height: pixels.height(),
            frames: vec![SequenceFrame::still(pixels)],
            loop_count: LoopCount::Once,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// Trait for codec implementations.
///
/// `Sync` so one codec can be shared across rayon workers deriving
/// different styles of the same upload.
pub trait ImageCodec: Sync {
    /// Identify the container from its byte signature and decode every frame.
    fn decode(&self, bytes: &[u8]) -> Result<(FrameSequence, MediaFormat), CodecError>;

    /// Encode a sequence in the given format.
    fn encode(&self, frames: &FrameSequence, format: MediaFormat) -> Result<Vec<u8>, CodecError>;
}
