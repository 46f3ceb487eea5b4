//! Client-side checks applied before a submission leaves the machine.

use crate::error::{CodelensError, Result};

/// Largest archive accepted for batch analysis (50 MiB).
pub const MAX_ARCHIVE_BYTES: u64 = 50 * 1024 * 1024;

/// Longest inline submission the backend accepts, in characters.
pub const MAX_CODE_CHARS: usize = 50_000;
/// Shortest submission worth analyzing, in characters.
pub const MIN_CODE_CHARS: usize = 10;

const ARCHIVE_EXTENSIONS: [&str; 2] = [".zip", ".rar"];
const GOOGLE_DRIVE_HOST: &str = "drive.google.com";

/// Accept only `.zip`/`.rar` archives up to [`MAX_ARCHIVE_BYTES`].
pub fn validate_archive(filename: &str, size: u64) -> Result<()> {
    let lower = filename.to_ascii_lowercase();
    if !ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Err(CodelensError::Validation(
            "only ZIP or RAR archives are supported".to_string(),
        ));
    }
    if size > MAX_ARCHIVE_BYTES {
        return Err(CodelensError::Validation(format!(
            "archive is {size} bytes; the limit is 50MB"
        )));
    }
    Ok(())
}

/// Accept only Google Drive links, returning the trimmed URL.
pub fn validate_google_drive_url(url: &str) -> Result<&str> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(CodelensError::Validation(
            "a Google Drive URL is required".to_string(),
        ));
    }
    if !trimmed.contains(GOOGLE_DRIVE_HOST) {
        return Err(CodelensError::Validation(
            "invalid URL; expected a Google Drive folder or file link".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Reject blank code and code outside [`MIN_CODE_CHARS`]..=[`MAX_CODE_CHARS`].
pub fn validate_code(code: &str) -> Result<()> {
    if code.trim().is_empty() {
        return Err(CodelensError::Validation("code cannot be empty".to_string()));
    }
    let length = code.chars().count();
    if length > MAX_CODE_CHARS {
        return Err(CodelensError::Validation(
            "code is too long (maximum 50,000 characters)".to_string(),
        ));
    }
    if length < MIN_CODE_CHARS {
        return Err(CodelensError::Validation(
            "code is too short (minimum 10 characters)".to_string(),
        ));
    }
    Ok(())
}
