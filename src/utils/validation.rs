use crate::error::{Result, UploadError};
use crate::store::MAX_PARTS;

pub fn validate_upload_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(UploadError::InvalidArgument(
            "file uploading key cannot be empty".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_total_parts(total_parts: i64) -> Result<()> {
    if !(1..=MAX_PARTS).contains(&total_parts) {
        return Err(UploadError::InvalidArgument(format!(
            "total parts can be between 1 and {}, got {}",
            MAX_PARTS, total_parts
        )));
    }
    Ok(())
}

pub fn validate_part_number(part_number: i64, total_parts: i64) -> Result<()> {
    validate_total_parts(total_parts)?;
    if part_number < 1 || part_number > total_parts {
        return Err(UploadError::InvalidArgument(format!(
            "part number can be between 1 and {}, got {}",
            total_parts, part_number
        )));
    }
    Ok(())
}

/// Number of parts needed to upload `file_size` bytes in `part_size` chunks.
pub fn total_parts_for(file_size: u64, part_size: usize) -> Result<i64> {
    if part_size == 0 {
        return Err(UploadError::InvalidArgument(
            "part size must be greater than zero".to_string(),
        ));
    }
    if file_size == 0 {
        return Err(UploadError::InvalidArgument("file is empty".to_string()));
    }

    let parts = file_size.div_ceil(part_size as u64) as i64;
    validate_total_parts(parts)?;
    Ok(parts)
}

/// Extension after the last dot.
///
/// A name without a dot has no extension and yields an empty string; the
/// whole name is never returned as its own extension.
pub fn file_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}
