//! Error types for the filesig scanner.
//!
//! Two failure families exist: catalog-load errors, which are fatal at
//! startup and abort before any file is touched, and per-file I/O errors,
//! which are reported inline and never abort a batch. Matching and scoring
//! are total functions and contribute no variants here.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for filesig operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Signature source could not be opened or read.
    #[error("signature source unreadable: {0}")]
    CatalogSource(#[source] std::io::Error),

    /// Signature source is not valid JSON or violates the record schema.
    #[error("malformed signature record: {0}")]
    CatalogParse(#[from] serde_json::Error),

    /// A `magic_bytes` string is not a sequence of hex/wildcard byte pairs.
    #[error("invalid magic byte string {magic:?} for {type_id}: {reason}")]
    InvalidMagic {
        type_id: String,
        magic: String,
        reason: String,
    },

    /// Two records declare the same `type` id.
    #[error("duplicate type id in signature source: {0}")]
    DuplicateTypeId(String),

    /// A record carries no pattern bytes.
    #[error("empty pattern for type id: {0}")]
    EmptyPattern(String),

    /// A pattern would end beyond the maximum supported sample window.
    #[error("pattern for {type_id} ends at byte {end}, beyond the {max}-byte sample window")]
    PatternOutOfRange {
        type_id: String,
        end: usize,
        max: usize,
    },

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Path exists but is not a regular file (directory, socket, ...).
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    /// File exceeds the configured size limit for hashing.
    #[error("file too large: {size} bytes (limit: {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    /// File missing, unreadable, or truncated mid-read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// True for errors that invalidate the signature source as a whole.
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            ScanError::CatalogSource(_)
                | ScanError::CatalogParse(_)
                | ScanError::InvalidMagic { .. }
                | ScanError::DuplicateTypeId(_)
                | ScanError::EmptyPattern(_)
                | ScanError::PatternOutOfRange { .. }
        )
    }
}

/// Result type alias for filesig operations.
pub type Result<T> = std::result::Result<T, ScanError>;
