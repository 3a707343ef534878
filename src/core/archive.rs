// src/core/archive.rs

//! Sandboxed extraction of the gzipped model tarball.
//!
//! Members are iterated one at a time rather than using `Archive::unpack`,
//! because the sandbox must skip individual unsafe members and continue,
//! not abort the whole extraction.

use crate::core::metrics::EXTRACTION_REJECTIONS_TOTAL;
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Component, Path};
use tracing::warn;

/// Returns true iff `path` is safe to extract relative to the archive root:
/// not absolute, and containing no `..` component.
fn member_is_safe(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }
    !path.components().any(|c| c == Component::ParentDir)
}

/// Extracts `tar_gz_path` into `dest_dir`, which must already exist.
/// Rejects any member whose path is absolute or contains a `..` segment,
/// logging and counting each rejection; all other members are extracted
/// normally. Returns the number of members extracted.
pub fn extract_sandboxed(tar_gz_path: &Path, dest_dir: &Path) -> std::io::Result<usize> {
    let file = File::open(tar_gz_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    let mut extracted = 0usize;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let member_path = entry.path()?.into_owned();
        if !member_is_safe(&member_path) {
            EXTRACTION_REJECTIONS_TOTAL.inc();
            warn!(member = %member_path.display(), "rejecting unsafe tar member");
            continue;
        }
        entry.unpack_in(dest_dir)?;
        extracted += 1;
    }
    Ok(extracted)
}
