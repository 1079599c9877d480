//! `tar` + `gzip` bundling for `upload_tree(..., compress = true)`.
//!
//! Supplements the distilled spec with the `tar` parameter found in
//! `original_source/.../python/backup_restore/core/archive.py`: a directory
//! becomes a single `<basename>.tar.gz` blob rather than one object per file.

use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use kbr_core::{CoreError, CoreResult};

/// Archives every file under `dir` into a gzip-compressed tar, returning the
/// resulting bytes. Paths inside the archive are relative to `dir`.
pub fn tar_gzip_dir(dir: &Path) -> CoreResult<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", dir)
        .map_err(|e| CoreError::Internal(format!("failed to archive '{}': {e}", dir.display())))?;
    let encoder = builder
        .into_inner()
        .map_err(|e| CoreError::Internal(format!("failed to finalize archive: {e}")))?;
    encoder
        .finish()
        .map_err(|e| CoreError::Internal(format!("failed to finish gzip stream: {e}")))
}

/// Extracts a gzip-compressed tar produced by `tar_gzip_dir` into `dest`,
/// creating it if necessary.
pub fn untar_gzip_into(bytes: &[u8], dest: &Path) -> CoreResult<()> {
    std::fs::create_dir_all(dest)?;
    let decoder = GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    archive
        .unpack(dest)
        .map_err(|e| CoreError::Internal(format!("failed to unpack archive into '{}': {e}", dest.display())))?;
    Ok(())
}

/// Returns the archive object name for a given key prefix: `<prefix>.tar.gz`.
pub fn archive_name(prefix: &str) -> String {
    format!("{prefix}.tar.gz")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn round_trips_a_directory_tree() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.json"), b"{}").unwrap();
        fs::create_dir(src.path().join("sub")).unwrap();
        fs::write(src.path().join("sub").join("b.json"), b"[]").unwrap();

        let archived = tar_gzip_dir(src.path()).unwrap();

        let dest = tempfile::tempdir().unwrap();
        untar_gzip_into(&archived, dest.path()).unwrap();

        assert_eq!(fs::read(dest.path().join("a.json")).unwrap(), b"{}");
        assert_eq!(fs::read(dest.path().join("sub").join("b.json")).unwrap(), b"[]");
    }

    #[test]
    fn archive_name_appends_tar_gz_to_the_prefix() {
        assert_eq!(archive_name("abc123"), "abc123.tar.gz");
    }
}
