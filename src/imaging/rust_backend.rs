//! Pure Rust codec built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::guess_format` (byte signature, never the file name) |
//! | Decode raster (PNG, JPEG, WebP, BMP, TIFF) | `image::load_from_memory_with_format` |
//! | Decode animated (GIF) | `GifDecoder::into_frames` (composited to full canvas) |
//! | Loop count | NETSCAPE2.0 application extension, read from the raw bytes |
//! | Encode JPEG | `JpegEncoder::new_with_quality` from RGB8 |
//! | Encode PNG / WebP / BMP / TIFF | `DynamicImage::write_to` (WebP is lossless) |
//! | Encode GIF | `GifEncoder::encode_frames` + `set_repeat` |

use super::backend::{
    CodecError, Container, FrameSequence, ImageCodec, LoopCount, MediaFormat, SequenceFrame,
};
use super::params::Quality;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::{AnimationDecoder, DynamicImage, Frame, ImageDecoder};
use std::io::Cursor;
use std::sync::LazyLock;

static SUPPORTED_FORMATS: LazyLock<Vec<MediaFormat>> = LazyLock::new(|| {
    MediaFormat::ALL
        .into_iter()
        .filter(|f| f.image_format().reading_enabled() && f.image_format().writing_enabled())
        .collect()
});

/// Returns the formats that have both a decoder and an encoder compiled in.
pub fn supported_formats() -> &'static [MediaFormat] {
    &SUPPORTED_FORMATS
}

/// Codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCodec {
    quality: Quality,
}

impl RustCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(quality: Quality) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }
}

/// Identify the container from its leading bytes.
fn sniff_format(bytes: &[u8]) -> Result<MediaFormat, CodecError> {
    let guessed = image::guess_format(bytes)
        .map_err(|_| CodecError::UnsupportedFormat("unrecognised byte signature".into()))?;
    MediaFormat::from_image_format(guessed)
        .filter(|f| supported_formats().contains(f))
        .ok_or_else(|| CodecError::UnsupportedFormat(format!("{guessed:?}")))
}

fn decode_raster(bytes: &[u8], format: MediaFormat) -> Result<FrameSequence, CodecError> {
    let img = image::load_from_memory_with_format(bytes, format.image_format())
        .map_err(|e| CodecError::Decode(format!("{}: {}", format.extension(), e)))?;
    Ok(FrameSequence::single(img.into_rgba8()))
}

fn decode_animated(bytes: &[u8]) -> Result<FrameSequence, CodecError> {
    let decoder =
        GifDecoder::new(Cursor::new(bytes)).map_err(|e| CodecError::Decode(format!("gif: {e}")))?;
    let (width, height) = decoder.dimensions();
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| CodecError::Decode(format!("gif frames: {e}")))?;
    if frames.is_empty() {
        return Err(CodecError::Decode("gif has no frames".into()));
    }

    Ok(FrameSequence {
        width,
        height,
        frames: frames
            .into_iter()
            .map(|f| {
                let delay = f.delay();
                SequenceFrame {
                    pixels: f.into_buffer(),
                    delay,
                }
            })
            .collect(),
        loop_count: read_gif_loop_count(bytes),
    })
}

/// Read the loop count from a GIF's NETSCAPE2.0 application extension.
///
/// Only an application extension block counts: introducer `0x21`, label
/// `0xFF`, block size `11`, then the identifier. After it come sub-block
/// size `3`, sub-block id `1` and the count as little-endian u16 where `0`
/// means forever.
pub(crate) fn read_gif_loop_count(bytes: &[u8]) -> LoopCount {
    const HEADER: &[u8] = b"\x21\xFF\x0BNETSCAPE2.0";
    let Some(pos) = bytes.windows(HEADER.len()).position(|w| w == HEADER) else {
        return LoopCount::Once;
    };
    match bytes.get(pos + HEADER.len()..pos + HEADER.len() + 4) {
        Some([3, 1, lo, hi]) => match u16::from_le_bytes([*lo, *hi]) {
            0 => LoopCount::Infinite,
            n => LoopCount::Finite(n),
        },
        _ => LoopCount::Once,
    }
}

fn encode_raster(
    frames: &FrameSequence,
    format: MediaFormat,
    quality: Quality,
) -> Result<Vec<u8>, CodecError> {
    let [frame] = frames.frames.as_slice() else {
        return Err(CodecError::Encode(format!(
            "{} holds exactly one frame, got {}",
            format.extension(),
            frames.frame_count()
        )));
    };

    let mut buf = Vec::new();
    match format {
        // JPEG has no alpha channel
        MediaFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(frame.pixels.clone()).into_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            DynamicImage::ImageRgb8(rgb)
                .write_with_encoder(encoder)
                .map_err(|e| CodecError::Encode(format!("jpg: {e}")))?;
        }
        other => {
            DynamicImage::ImageRgba8(frame.pixels.clone())
                .write_to(&mut Cursor::new(&mut buf), other.image_format())
                .map_err(|e| CodecError::Encode(format!("{}: {}", other.extension(), e)))?;
        }
    }
    Ok(buf)
}

fn encode_animated(frames: &FrameSequence) -> Result<Vec<u8>, CodecError> {
    if frames.frames.is_empty() {
        return Err(CodecError::Encode("gif needs at least one frame".into()));
    }

    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        let repeat = match frames.loop_count {
            LoopCount::Once => None,
            LoopCount::Infinite => Some(Repeat::Infinite),
            LoopCount::Finite(n) => Some(Repeat::Finite(n)),
        };
        if let Some(repeat) = repeat {
            encoder
                .set_repeat(repeat)
                .map_err(|e| CodecError::Encode(format!("gif repeat: {e}")))?;
        }
        encoder
            .encode_frames(
                frames
                    .frames
                    .iter()
                    .map(|f| Frame::from_parts(f.pixels.clone(), 0, 0, f.delay)),
            )
            .map_err(|e| CodecError::Encode(format!("gif: {e}")))?;
    }
    Ok(buf)
}

impl ImageCodec for RustCodec {
    fn decode(&self, bytes: &[u8]) -> Result<(FrameSequence, MediaFormat), CodecError> {
        let format = sniff_format(bytes)?;
        let frames = match format.container() {
            Container::Raster => decode_raster(bytes, format)?,
            Container::Animated => decode_animated(bytes)?,
        };
        Ok((frames, format))
    }

    fn encode(&self, frames: &FrameSequence, format: MediaFormat) -> Result<Vec<u8>, CodecError> {
        match format.container() {
            Container::Raster => encode_raster(frames, format, self.quality),
            Container::Animated => encode_animated(frames),
        }
    }
}
