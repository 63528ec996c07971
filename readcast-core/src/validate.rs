//! Pre-flight upload validation
//!
//! Rejects bad uploads before any network call is made: wrong file type,
//! empty files, and files over the size limit all fail synchronously with
//! a descriptive message, and no job is created.

use thiserror::Error;

/// Default upload ceiling: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Magic bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Limits applied to an upload before it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Why an upload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
    #[error("file is empty")]
    Empty,

    #[error("file is {actual} bytes, over the {limit} byte upload limit")]
    TooLarge { actual: u64, limit: u64 },

    #[error("only PDF files are accepted, got {0:?}")]
    NotPdf(String),

    #[error("file does not start with the %PDF- header")]
    BadMagic,
}

/// Validate an upload candidate.
///
/// `head` is the beginning of the file contents; pass an empty slice to
/// skip the magic-byte check (e.g. when only metadata is known).
pub fn validate_upload(
    filename: &str,
    len: u64,
    head: &[u8],
    limits: &UploadLimits,
) -> Result<(), ValidateError> {
    if len == 0 {
        return Err(ValidateError::Empty);
    }
    if len > limits.max_bytes {
        return Err(ValidateError::TooLarge {
            actual: len,
            limit: limits.max_bytes,
        });
    }
    if !has_pdf_extension(filename) {
        return Err(ValidateError::NotPdf(filename.to_string()));
    }
    if !head.is_empty() && !head.starts_with(PDF_MAGIC) {
        return Err(ValidateError::BadMagic);
    }
    Ok(())
}

fn has_pdf_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
}
