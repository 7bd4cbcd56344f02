//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every listing leads with the semantic identity (style name, or
//! `original`) and shows the storage path as secondary context. Paths are
//! what an operator greps for; the style is what they think in.
//!
//! # Output Format
//!
//! ## Upload / crop
//!
//! ```text
//! 42 (crop applied)
//!     original  42/logo.3fa9c1d2e4b5.png
//!     big       42/logo.3fa9c1d2e4b5.big.png
//!     small1    42/logo.8d0e11a7c2f4.small1.png  [50x20+5+5]
//! Applied {"crop":true,"cropOptions":{"small1":{"X":5,"Y":5,"Width":50,"Height":20}}}
//! Wrote 2 files, removed 2
//! ```
//!
//! The `Applied` line is printed by crops only and shows the payload in
//! its canonical encoding.
//!
//! ## Styles
//!
//! ```text
//! 001 medium  300x300
//! 002 thumb   100x100
//! ```
//!
//! # Architecture
//!
//! Each listing has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::engine::ScanReport;
use crate::naming;
use crate::registry::StyleRegistry;
use crate::types::{AttachmentRecord, CropPayload};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Label a stored path by the style it belongs to.
fn path_label(path: &str) -> String {
    naming::style_of(path).unwrap_or_else(|| "original".to_string())
}

/// One line per stored path of a record, labelled by style.
///
/// Cropped styles show their rectangle after the path.
pub fn format_record(record: &AttachmentRecord, paths: &[String]) -> Vec<String> {
    if paths.is_empty() {
        return vec![format!("{} (no upload)", record.id)];
    }

    let header = if record.crop_applied {
        format!("{} (crop applied)", record.id)
    } else {
        record.id.clone()
    };
    let labels: Vec<String> = paths.iter().map(|p| path_label(p)).collect();
    let width = labels.iter().map(String::len).max().unwrap_or(0);

    let mut lines = vec![header];
    for (label, path) in labels.iter().zip(paths) {
        let mut line = format!("{}{:<width$}  {}", indent(1), label, path);
        if let Some(rect) = record.crop_options.get(label) {
            line.push_str(&format!("  [{rect}]"));
        }
        lines.push(line);
    }
    lines
}

fn format_summary(report: &ScanReport) -> String {
    let mut summary = format!("Wrote {}", plural(report.written.len(), "file"));
    if !report.removed.is_empty() {
        summary.push_str(&format!(", removed {}", report.removed.len()));
    }
    summary
}

/// Record listing followed by a one-line summary of the scan.
pub fn format_scan_output(
    record: &AttachmentRecord,
    paths: &[String],
    report: &ScanReport,
) -> Vec<String> {
    let mut lines = format_record(record, paths);
    lines.push(format_summary(report));
    lines
}

/// Record listing, the applied crop payload, then the scan summary.
pub fn format_crop_output(
    record: &AttachmentRecord,
    paths: &[String],
    payload: &CropPayload,
    report: &ScanReport,
) -> Vec<String> {
    let mut lines = format_record(record, paths);
    lines.push(format!("Applied {}", payload.to_json()));
    lines.push(format_summary(report));
    lines
}

pub fn print_crop_output(
    record: &AttachmentRecord,
    paths: &[String],
    payload: &CropPayload,
    report: &ScanReport,
) {
    for line in format_crop_output(record, paths, payload, report) {
        println!("{}", line);
    }
}

pub fn print_scan_output(record: &AttachmentRecord, paths: &[String], report: &ScanReport) {
    for line in format_scan_output(record, paths, report) {
        println!("{}", line);
    }
}

pub fn print_record(record: &AttachmentRecord, paths: &[String]) {
    for line in format_record(record, paths) {
        println!("{}", line);
    }
}

/// Deleted paths under a verb heading (`Pruned`, `Purged`).
pub fn format_removed(verb: &str, paths: &[String]) -> Vec<String> {
    if paths.is_empty() {
        return vec![format!("{verb} nothing")];
    }
    let mut lines = vec![format!("{verb} {}", plural(paths.len(), "file"))];
    lines.extend(paths.iter().map(|p| format!("{}{}", indent(1), p)));
    lines
}

pub fn print_removed(verb: &str, paths: &[String]) {
    for line in format_removed(verb, paths) {
        println!("{}", line);
    }
}

/// Registered styles in registry order with their target sizes.
pub fn format_styles(registry: &StyleRegistry) -> Vec<String> {
    let width = registry.names().map(str::len).max().unwrap_or(0);
    registry
        .iter()
        .enumerate()
        .map(|(i, (name, size))| format!("{} {:<width$}  {}", format_index(i + 1), name, size))
        .collect()
}

pub fn print_styles(registry: &StyleRegistry) {
    for line in format_styles(registry) {
        println!("{}", line);
    }
}
