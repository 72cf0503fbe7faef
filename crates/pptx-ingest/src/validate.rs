//! Cheap structural checks on an uploaded artifact.
//!
//! Nothing here decompresses or walks the archive; the loader does that once
//! these checks pass.

use std::path::Path;

use crate::config::MAX_ARTIFACT_SIZE;
use crate::error::ValidationError;

/// Local file header signature that starts every non-empty ZIP archive.
const ZIP_LOCAL_HEADER: &[u8; 4] = b"PK\x03\x04";

/// Check that `data` is plausibly a presentation package.
pub fn validate(data: &[u8]) -> Result<(), ValidationError> {
    check_size(data.len() as u64)?;
    if !data.starts_with(ZIP_LOCAL_HEADER) {
        return Err(ValidationError::BadSignature);
    }
    Ok(())
}

/// Read and validate a file from disk, returning its bytes on success.
///
/// A missing or unreadable file is reported as [`ValidationError::NotFound`].
/// The size ceiling is checked against the file's metadata before reading.
pub fn validate_path(path: impl AsRef<Path>) -> Result<Vec<u8>, ValidationError> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path)
        .map_err(|e| ValidationError::NotFound(format!("{}: {e}", path.display())))?;
    if !meta.is_file() {
        return Err(ValidationError::NotFound(format!(
            "{}: not a regular file",
            path.display()
        )));
    }
    check_size(meta.len())?;

    let data = std::fs::read(path)
        .map_err(|e| ValidationError::NotFound(format!("{}: {e}", path.display())))?;
    validate(&data)?;
    Ok(data)
}

fn check_size(size: u64) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::Empty);
    }
    if size > MAX_ARTIFACT_SIZE {
        return Err(ValidationError::TooLarge {
            size,
            limit: MAX_ARTIFACT_SIZE,
        });
    }
    Ok(())
}
