//! Shared test utilities.
//!
//! Synthetic image builders, a fixture registry, and a storage wrapper that
//! fails on demand. Images are generated with the `image` crate so no binary
//! fixtures are checked in.

use std::io::Cursor;
use std::sync::{Mutex, PoisonError};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageFormat, Rgba, RgbaImage};

use crate::registry::StyleRegistry;
use crate::storage::{MemoryStorage, StorageBackend, StorageError};
use crate::types::Size;

// =========================================================================
// Image fixtures
// =========================================================================

/// A PNG with a horizontal gradient so crops are visually distinct.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 96, 255])
    });
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// An animated GIF with one solid-color frame per delay.
///
/// `repeat = None` leaves out the loop extension entirely.
pub fn gif_bytes(width: u32, height: u32, delays_ms: &[u32], repeat: Option<Repeat>) -> Vec<u8> {
    const PALETTE: [[u8; 4]; 4] = [
        [255, 0, 0, 255],
        [0, 255, 0, 255],
        [0, 0, 255, 255],
        [255, 255, 0, 255],
    ];
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        if let Some(repeat) = repeat {
            encoder.set_repeat(repeat).unwrap();
        }
        let frames = delays_ms.iter().enumerate().map(|(i, &ms)| {
            let pixels = RgbaImage::from_pixel(width, height, Rgba(PALETTE[i % PALETTE.len()]));
            Frame::from_parts(pixels, 0, 0, Delay::from_numer_denom_ms(ms, 1))
        });
        encoder.encode_frames(frames).unwrap();
    }
    buf
}

// =========================================================================
// Registry fixture
// =========================================================================

/// `small1`/`small2` 20x10, `square` 30x30, `big` 50x50.
pub fn style_registry() -> StyleRegistry {
    StyleRegistry::new([
        ("small1", Size::new(20, 10)),
        ("small2", Size::new(20, 10)),
        ("square", Size::new(30, 30)),
        ("big", Size::new(50, 50)),
    ])
    .unwrap()
}

// =========================================================================
// Failure injection
// =========================================================================

/// [`MemoryStorage`] that fails `put` for paths containing a marker, and
/// optionally every `delete`.
#[derive(Debug, Default)]
pub struct FailingStorage {
    pub inner: MemoryStorage,
    fail_put_on: Mutex<Option<String>>,
    fail_delete: Mutex<bool>,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `put` whose path contains `marker`; `None` disarms.
    pub fn fail_put_on(&self, marker: Option<&str>) {
        *self
            .fail_put_on
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = marker.map(str::to_string);
    }

    pub fn fail_deletes(&self, fail: bool) {
        *self
            .fail_delete
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = fail;
    }

    fn injected(what: &str) -> StorageError {
        StorageError::Io(std::io::Error::other(format!("injected {what} failure")))
    }
}

impl StorageBackend for FailingStorage {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let marker = self.fail_put_on.lock().unwrap().clone();
        if marker.is_some_and(|m| path.contains(&m)) {
            return Err(Self::injected("put"));
        }
        self.inner.put(path, bytes)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.get(path)
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        if *self.fail_delete.lock().unwrap() {
            return Err(Self::injected("delete"));
        }
        self.inner.delete(path)
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list(prefix)
    }
}
