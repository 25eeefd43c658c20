//! Byte sample extraction.
//!
//! A [`ByteSample`] is the immutable snapshot the matching engine and the
//! scorer operate on: a bounded header prefix, the declared extension, the
//! file size, and integrity hashes over the full content. One streaming
//! pass captures the prefix and feeds both hash states, so even files far
//! larger than the prefix window are read exactly once.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::IoConfig;
use crate::error::{Result, ScanError};

const READ_CHUNK: usize = 64 * 1024;

/// Immutable snapshot of one file's header and identity.
///
/// Constructed once per analyzed file and read-only thereafter; it holds no
/// file handle, so samples can be scored concurrently without touching the
/// filesystem again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteSample {
    /// Up to `max_prefix_len` leading bytes; shorter when the file is.
    pub prefix: Vec<u8>,
    /// Lowercased extension from the file name; empty when absent.
    pub declared_extension: String,
    pub size_bytes: u64,
    /// MD5 over the full content, hex.
    pub md5: String,
    /// SHA-256 over the full content, hex.
    pub sha256: String,
}

impl ByteSample {
    /// Extract a sample from a file on disk.
    ///
    /// Fails when the path is missing, not a regular file, unreadable, or
    /// larger than `limits.max_file_size`. A file shorter than the prefix
    /// window is not an error; the prefix is simply shorter.
    pub fn extract(path: &Path, limits: &IoConfig) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(ScanError::NotAFile(path.to_path_buf()));
        }
        if metadata.len() > limits.max_file_size {
            return Err(ScanError::FileTooLarge {
                size: metadata.len(),
                limit: limits.max_file_size,
            });
        }

        let mut file = File::open(path)?;
        let mut prefix = Vec::with_capacity(limits.max_prefix_len.min(metadata.len() as usize));
        let mut md5_state = md5::Context::new();
        let mut sha256_state = Sha256::new();
        let mut size_bytes: u64 = 0;
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            let data = &chunk[..n];
            if prefix.len() < limits.max_prefix_len {
                let want = limits.max_prefix_len - prefix.len();
                prefix.extend_from_slice(&data[..want.min(n)]);
            }
            md5_state.consume(data);
            sha256_state.update(data);
            size_bytes += n as u64;
        }

        debug!(
            path = %path.display(),
            size_bytes,
            prefix_len = prefix.len(),
            "sample extracted"
        );

        Ok(Self {
            prefix,
            declared_extension: declared_extension(path),
            size_bytes,
            md5: format!("{:x}", md5_state.compute()),
            sha256: format!("{:x}", sha256_state.finalize()),
        })
    }

    /// Build a sample from in-memory bytes, e.g. an archive entry handed
    /// over by the recursion collaborator. `name` supplies the declared
    /// extension.
    pub fn from_bytes(name: &str, data: &[u8], max_prefix_len: usize) -> Self {
        let prefix = data[..data.len().min(max_prefix_len)].to_vec();
        Self {
            prefix,
            declared_extension: declared_extension(Path::new(name)),
            size_bytes: data.len() as u64,
            md5: crate::hashing::md5_digest(data),
            sha256: crate::hashing::sha256_digest(data),
        }
    }
}

/// Lowercased final extension of a file name; empty when there is none.
fn declared_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(data: &[u8]) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        file.as_file().write_all(data).unwrap();
        file
    }

    #[test]
    fn test_extract_basic() {
        let data = b"MZ\x90\x00 test payload";
        let file = write_temp(data);
        let sample = ByteSample::extract(file.path(), &IoConfig::default()).unwrap();
        assert_eq!(sample.size_bytes, data.len() as u64);
        assert_eq!(&sample.prefix, data);
        assert_eq!(sample.md5, crate::hashing::md5_digest(data));
        assert_eq!(sample.sha256, crate::hashing::sha256_digest(data));
    }

    #[test]
    fn test_prefix_is_bounded_but_hashes_cover_everything() {
        let data = vec![0xABu8; 4096];
        let file = write_temp(&data);
        let limits = IoConfig {
            max_prefix_len: 512,
            ..IoConfig::default()
        };
        let sample = ByteSample::extract(file.path(), &limits).unwrap();
        assert_eq!(sample.prefix.len(), 512);
        assert_eq!(sample.size_bytes, 4096);
        // Hashes are over the full file, not the prefix
        assert_eq!(sample.sha256, crate::hashing::sha256_digest(&data));
        assert_eq!(sample.md5, crate::hashing::md5_digest(&data));
    }

    #[test]
    fn test_short_file_is_not_an_error() {
        let file = write_temp(b"hi");
        let sample = ByteSample::extract(file.path(), &IoConfig::default()).unwrap();
        assert_eq!(sample.prefix, b"hi");
        assert_eq!(sample.size_bytes, 2);
    }

    #[test]
    fn test_empty_file() {
        let file = write_temp(b"");
        let sample = ByteSample::extract(file.path(), &IoConfig::default()).unwrap();
        assert!(sample.prefix.is_empty());
        assert_eq!(sample.size_bytes, 0);
        assert_eq!(sample.md5, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_missing_path_fails() {
        let err = ByteSample::extract(
            Path::new("/definitely/not/here.bin"),
            &IoConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::Io(_)));
    }

    #[test]
    fn test_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ByteSample::extract(dir.path(), &IoConfig::default()).unwrap_err();
        assert!(matches!(err, ScanError::NotAFile(_)));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let file = write_temp(&[0u8; 128]);
        let limits = IoConfig {
            max_file_size: 64,
            ..IoConfig::default()
        };
        let err = ByteSample::extract(file.path(), &limits).unwrap_err();
        assert!(matches!(err, ScanError::FileTooLarge { size: 128, .. }));
    }

    #[test]
    fn test_declared_extension_lowercased() {
        assert_eq!(declared_extension(Path::new("report.PDF")), "pdf");
        assert_eq!(declared_extension(Path::new("archive.tar.GZ")), "gz");
        assert_eq!(declared_extension(Path::new("noext")), "");
        assert_eq!(declared_extension(Path::new(".bashrc")), "");
    }

    #[test]
    fn test_from_bytes() {
        let sample = ByteSample::from_bytes("inner/evil.Exe", b"MZ\x90\x00", 512);
        assert_eq!(sample.declared_extension, "exe");
        assert_eq!(sample.prefix, b"MZ\x90\x00");
        assert_eq!(sample.md5, "20879c987e2f9a916e578386d499f629");
    }
}
