//! Attachment engine: upload and crop scans, URL lookup, cleanup.
//!
//! The engine composes a [`StyleRegistry`], a [`StorageBackend`] and an
//! [`ImageCodec`]. It owns no record state; every operation takes the
//! caller's [`AttachmentRecord`] and mutates it only on success.
//!
//! ## Scan flow
//!
//! ```text
//! Upload:  bytes ─► decode ─┬─► derive(style₁) ─► encode ─► put ─┐
//!                           ├─► derive(style₂) ─► encode ─► put ─┼─► put original ─► update record ─► delete superseded
//!                           └─► ...                              ┘
//!
//! Crop:    get original ─► decode ─┬─► derive(named style, rect) ─► encode ─► put ─┐
//!                                  └─► ...                                         ┴─► move original ─► update record ─► delete old files
//! ```
//!
//! Styles run in parallel on rayon's pool. If any of them fails, every file
//! the call wrote that the record did not already reference is deleted
//! again, and the first error is returned.
//!
//! ## Paths
//!
//! A variant's path is a pure function of the record: the upload token for
//! uncropped styles, the crop token of `(upload token, style, rectangle)` for
//! cropped ones. The original itself sits under the original token, so its
//! URL changes with every new crop state. See [`crate::naming`].

use crate::imaging::{
    CodecError, DeriveError, FrameSequence, ImageCodec, Interpolation, MediaFormat, RustCodec,
    derive_variant,
};
use crate::naming::{self, ParsedPath};
use crate::registry::StyleRegistry;
use crate::storage::{StorageBackend, StorageError};
use crate::types::{AttachmentRecord, CropPayload, Rectangle, Size};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::io::Read;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("style {style:?}: {source}")]
    Derive {
        style: String,
        #[source]
        source: DeriveError,
    },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("unknown style {0:?}")]
    UnknownStyle(String),
    #[error("no original uploaded yet")]
    NoOriginal,
    #[error("upload is empty")]
    EmptyUpload,
    #[error("invalid crop payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("original {path} decodes as {}", .found.extension())]
    FormatMismatch { path: String, found: MediaFormat },
}

/// What a scan is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanInput {
    /// New file content. `file_name` only contributes the path basename.
    Upload { file_name: String, bytes: Vec<u8> },
    /// Explicit crop rectangles for some styles.
    Crop(CropPayload),
}

impl ScanInput {
    pub fn upload(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        ScanInput::Upload {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an upload from any byte stream.
    pub fn from_reader(file_name: impl Into<String>, mut reader: impl Read) -> std::io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::upload(file_name, bytes))
    }

    /// Parse the textual crop payload, e.g. `{"crop":true,"cropOptions":{...}}`.
    pub fn from_json(text: &str) -> Result<Self, ScanError> {
        Ok(ScanInput::Crop(CropPayload::from_json(text)?))
    }
}

/// Files touched by a successful scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Paths written, variants first (registry order) and the original last.
    pub written: Vec<String>,
    /// Superseded paths removed after the record was updated.
    pub removed: Vec<String>,
}

/// One style to derive and store within a scan.
#[derive(Debug)]
struct VariantJob {
    style: String,
    size: Size,
    crop: Option<Rectangle>,
    path: String,
}

/// Orchestrates derivation, storage and addressing of style variants.
pub struct AttachmentEngine<S, C = RustCodec> {
    registry: StyleRegistry,
    storage: S,
    codec: C,
    interpolation: Interpolation,
}

impl<S: StorageBackend> AttachmentEngine<S, RustCodec> {
    /// Engine with the default `image`-crate codec.
    pub fn with_storage(registry: StyleRegistry, storage: S) -> Self {
        Self::new(registry, storage, RustCodec::new())
    }
}

impl<S: StorageBackend, C: ImageCodec> AttachmentEngine<S, C> {
    pub fn new(registry: StyleRegistry, storage: S, codec: C) -> Self {
        Self {
            registry,
            storage,
            codec,
            interpolation: Interpolation::default(),
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn registry(&self) -> &StyleRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Process an upload or a crop update against `record`.
    ///
    /// On error the record is untouched and no new file is left in storage.
    #[tracing::instrument(skip(self, record, input), fields(id = %record.id))]
    pub fn scan(
        &self,
        record: &mut AttachmentRecord,
        input: ScanInput,
    ) -> Result<ScanReport, ScanError> {
        match input {
            ScanInput::Upload { file_name, bytes } => self.scan_upload(record, &file_name, &bytes),
            ScanInput::Crop(payload) => self.scan_crop(record, &payload),
        }
    }

    fn scan_upload(
        &self,
        record: &mut AttachmentRecord,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ScanReport, ScanError> {
        if bytes.is_empty() {
            return Err(ScanError::EmptyUpload);
        }
        info!(file_name, size = bytes.len(), "scanning upload");

        let (source, format) = self.codec.decode(bytes)?;
        let token = naming::upload_token(bytes);
        let original_path = naming::build_original_path(&record.id, file_name, &token, format);

        let jobs: Vec<VariantJob> = self
            .registry
            .iter()
            .map(|(style, size)| VariantJob {
                style: style.to_string(),
                size,
                crop: None,
                path: naming::build_path(&record.id, file_name, style, &token, format),
            })
            .collect();

        let previous: BTreeSet<String> = self.list_paths(record).into_iter().collect();
        let mut written = self.render_all(&source, format, &jobs, &previous)?;

        if let Err(e) = self.storage.put(&original_path, bytes) {
            self.rollback(&written, &previous);
            return Err(e.into());
        }
        written.push(original_path.clone());

        record.original_path = original_path;
        record.upload_token = token;
        record.crop_options.clear();
        record.crop_applied = false;

        let current: BTreeSet<&String> = written.iter().collect();
        let superseded: Vec<String> = previous
            .into_iter()
            .filter(|p| !current.contains(p))
            .collect();
        let removed = self.remove_superseded(superseded);

        info!(
            original = %record.original_path,
            variants = jobs.len(),
            "upload stored"
        );
        Ok(ScanReport { written, removed })
    }

    fn scan_crop(
        &self,
        record: &mut AttachmentRecord,
        payload: &CropPayload,
    ) -> Result<ScanReport, ScanError> {
        if !record.has_upload() {
            return Err(ScanError::NoOriginal);
        }
        if let Some(unknown) = payload
            .crop_options
            .keys()
            .find(|style| !self.registry.contains(style))
        {
            return Err(ScanError::UnknownStyle(unknown.clone()));
        }
        info!(
            crop = payload.crop,
            styles = payload.crop_options.len(),
            "scanning crop"
        );
        if payload.crop_options.is_empty() {
            record.crop_applied = !record.crop_options.is_empty();
            return Ok(ScanReport::default());
        }

        let original = parse_original(&record.original_path)?;
        let upload_token = upload_token_of(record, &original);
        let bytes = self.storage.get(&record.original_path)?;
        let (source, format) = self.codec.decode(&bytes)?;
        if original.format() != Some(format) {
            return Err(ScanError::FormatMismatch {
                path: record.original_path.clone(),
                found: format,
            });
        }

        let jobs: Vec<VariantJob> = payload
            .crop_options
            .iter()
            .filter_map(|(style, rect)| {
                let size = self.registry.get(style)?;
                let (crop, token) = if payload.crop {
                    (Some(*rect), naming::crop_token(&upload_token, style, rect))
                } else {
                    (None, upload_token.clone())
                };
                Some(VariantJob {
                    style: style.clone(),
                    size,
                    crop,
                    path: original.variant(style, &token),
                })
            })
            .collect();

        let mut crop_options = record.crop_options.clone();
        for job in &jobs {
            match job.crop {
                Some(rect) => {
                    crop_options.insert(job.style.clone(), rect);
                }
                None => {
                    crop_options.remove(&job.style);
                }
            }
        }
        let original_path =
            original.with_token(&naming::original_token(&upload_token, &crop_options));

        let previous: BTreeSet<String> = self.list_paths(record).into_iter().collect();
        let old_paths: Vec<Option<String>> = jobs
            .iter()
            .map(|job| self.style_path(record, &job.style))
            .collect();
        let mut written = self.render_all(&source, format, &jobs, &previous)?;

        let moved = original_path != record.original_path;
        if moved {
            if let Err(e) = self.storage.put(&original_path, &bytes) {
                self.rollback(&written, &previous);
                return Err(e.into());
            }
            written.push(original_path.clone());
        }

        let mut superseded: Vec<String> = jobs
            .iter()
            .zip(old_paths)
            .filter_map(|(job, old)| old.filter(|old| *old != job.path))
            .collect();
        if moved {
            superseded.push(std::mem::replace(&mut record.original_path, original_path));
        }
        record.upload_token = upload_token;
        record.crop_options = crop_options;
        record.crop_applied = !record.crop_options.is_empty();
        let removed = self.remove_superseded(superseded);

        info!(
            styles = jobs.len(),
            crop_applied = record.crop_applied,
            "crop stored"
        );
        Ok(ScanReport { written, removed })
    }

    /// Derive, encode and store every job in parallel.
    ///
    /// Returns the written paths in job order. On failure everything written
    /// that is not in `keep` is deleted and the first error in job order wins.
    fn render_all(
        &self,
        source: &FrameSequence,
        format: MediaFormat,
        jobs: &[VariantJob],
        keep: &BTreeSet<String>,
    ) -> Result<Vec<String>, ScanError> {
        let results: Vec<Result<(), ScanError>> = jobs
            .par_iter()
            .map(|job| self.render(source, format, job))
            .collect();

        let written: Vec<String> = jobs
            .iter()
            .zip(&results)
            .filter(|(_, r)| r.is_ok())
            .map(|(job, _)| job.path.clone())
            .collect();

        if let Some(err) = results.into_iter().find_map(Result::err) {
            self.rollback(&written, keep);
            return Err(err);
        }
        Ok(written)
    }

    fn render(
        &self,
        source: &FrameSequence,
        format: MediaFormat,
        job: &VariantJob,
    ) -> Result<(), ScanError> {
        let variant = derive_variant(source, job.size, job.crop, self.interpolation).map_err(
            |source| ScanError::Derive {
                style: job.style.clone(),
                source,
            },
        )?;
        let encoded = self.codec.encode(&variant, format)?;
        self.storage.put(&job.path, &encoded)?;
        debug!(style = %job.style, path = %job.path, bytes = encoded.len(), "stored variant");
        Ok(())
    }

    /// Best-effort removal of files written by a failed scan.
    fn rollback(&self, written: &[String], keep: &BTreeSet<String>) {
        for path in written.iter().filter(|p| !keep.contains(*p)) {
            if let Err(e) = self.storage.delete(path) {
                warn!(path = %path, error = %e, "rollback could not delete file");
            }
        }
    }

    /// Delete files the updated record no longer references. Failures only warn.
    fn remove_superseded(&self, paths: Vec<String>) -> Vec<String> {
        let mut removed = Vec::with_capacity(paths.len());
        for path in paths {
            match self.storage.delete(&path) {
                Ok(()) => removed.push(path),
                Err(e) => warn!(path = %path, error = %e, "could not delete superseded file"),
            }
        }
        removed
    }

    /// Storage path of a registered style's current variant.
    fn style_path(&self, record: &AttachmentRecord, style: &str) -> Option<String> {
        if !record.has_upload() || !self.registry.contains(style) {
            return None;
        }
        let original = naming::parse_path(&record.original_path)?;
        let upload_token = upload_token_of(record, &original);
        let token = match record.crop_options.get(style) {
            Some(rect) => naming::crop_token(&upload_token, style, rect),
            None => upload_token,
        };
        Some(original.variant(style, &token))
    }

    /// Storage path for the original (no styles) or the first registered style.
    ///
    /// Empty when there is no upload or none of `styles` is registered.
    pub fn path(&self, record: &AttachmentRecord, styles: &[&str]) -> String {
        if !record.has_upload() {
            return String::new();
        }
        if styles.is_empty() {
            return record.original_path.clone();
        }
        styles
            .iter()
            .find_map(|style| self.style_path(record, style))
            .unwrap_or_default()
    }

    /// Public URL for [`path`](Self::path). Empty means no file, never an error.
    pub fn url(&self, record: &AttachmentRecord, styles: &[&str]) -> String {
        let path = self.path(record, styles);
        if path.is_empty() {
            path
        } else {
            self.storage.public_url(&path)
        }
    }

    /// The original plus one path per registered style.
    pub fn list_paths(&self, record: &AttachmentRecord) -> Vec<String> {
        if !record.has_upload() {
            return Vec::new();
        }
        std::iter::once(record.original_path.clone())
            .chain(
                self.registry
                    .names()
                    .filter_map(|style| self.style_path(record, style)),
            )
            .collect()
    }

    /// Delete every file the record references.
    ///
    /// All deletions are attempted; the first failure is reported.
    pub fn purge(&self, record: &AttachmentRecord) -> Result<Vec<String>, StorageError> {
        let mut first_err = None;
        let mut removed = Vec::new();
        for path in self.list_paths(record) {
            match self.storage.delete(&path) {
                Ok(()) => removed.push(path),
                Err(e) => {
                    warn!(path = %path, error = %e, "purge could not delete file");
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Files directly under the record's directory that it no longer references.
    pub fn orphans(&self, record: &AttachmentRecord) -> Result<Vec<String>, StorageError> {
        let dir = naming::sanitize_id(&record.id);
        if dir.is_empty() {
            return Ok(Vec::new());
        }
        let live: BTreeSet<String> = self.list_paths(record).into_iter().collect();
        Ok(self
            .storage
            .list(&format!("{dir}/"))?
            .into_iter()
            .filter(|p| p.rsplit_once('/').is_some_and(|(parent, _)| parent == dir))
            .filter(|p| !live.contains(p))
            .collect())
    }

    /// Delete [`orphans`](Self::orphans) and return them.
    pub fn prune(&self, record: &AttachmentRecord) -> Result<Vec<String>, StorageError> {
        let orphans = self.orphans(record)?;
        for path in &orphans {
            self.storage.delete(path)?;
        }
        Ok(orphans)
    }
}

fn parse_original(path: &str) -> Result<ParsedPath, StorageError> {
    naming::parse_path(path)
        .filter(|p| p.style.is_none())
        .ok_or_else(|| StorageError::InvalidPath(path.to_string()))
}

/// Upload token of a record, read from the original path for records that predate it.
fn upload_token_of(record: &AttachmentRecord, original: &ParsedPath) -> String {
    if record.upload_token.is_empty() {
        original.token.clone()
    } else {
        record.upload_token.clone()
    }
}
