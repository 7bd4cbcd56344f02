//! # media-styles
//!
//! Derive, store and address resized and cropped variants ("styles") of
//! uploaded images. Static rasters and animated GIFs are both supported;
//! animated variants keep every frame, delay and loop count.
//!
//! # Architecture
//!
//! ```text
//! upload bytes ─► decode ─► per style (parallel): derive ─► encode ─► put ─► record updated
//! crop payload ─► get original ─► decode ─► named styles only ─► ...   ─► record updated
//! ```
//!
//! The embedding application owns the [`AttachmentRecord`](types::AttachmentRecord)
//! and its persistence. It calls [`AttachmentEngine::scan`](engine::AttachmentEngine::scan)
//! before saving a record, [`url`](engine::AttachmentEngine::url) when rendering,
//! and [`purge`](engine::AttachmentEngine::purge) on destroy.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Scan orchestration, URL lookup, purge and orphan cleanup |
//! | [`registry`] | Immutable style name → size mapping |
//! | [`imaging`] | Codec trait, `image`-crate codec, crop geometry and frame derivation |
//! | [`naming`] | Storage path convention and content tokens |
//! | [`storage`] | Storage backend trait with disk and in-memory implementations |
//! | [`config`] | `media-styles.toml` loading, validation and merging |
//! | [`types`] | Records, crop payloads and geometry shared across modules |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Paths Are Derived, Never Stored
//!
//! A record stores only the original's path, the upload token and the
//! explicit crop rectangles. Every variant path is recomputed from them: the
//! upload token for uncropped styles, the crop token of
//! `(upload token, style, rectangle)` for cropped ones. The original moves
//! to a token of the whole crop state. Re-applying the same crop therefore lands on the same
//! path, and a new crop always gets a new one, so browsers and CDNs never
//! serve a stale variant.
//!
//! ## Crops Always Start From the Original
//!
//! A crop update fetches and decodes the stored original instead of
//! reworking an existing variant. Repeated crops never compound resampling
//! loss.
//!
//! ## All or Nothing
//!
//! A scan either updates the record and leaves every referenced file in
//! place, or fails with the record untouched and every newly written file
//! removed again.

pub mod config;
pub mod engine;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod registry;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
