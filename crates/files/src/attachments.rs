//! Attachment storage service.
//!
//! # Storage Layout
//!
//! All attachments live under one root directory, optionally grouped by a
//! caller-chosen folder (one level, validated):
//!
//! ```text
//! <root>/
//! └── exams/
//!     └── 20251101T090000_ab3f9e_report.pdf
//! ```
//!
//! The stored name is `<utc timestamp>_<content hash prefix>_<sanitised
//! original name>`. The hash prefix makes the name deterministic for a given
//! upload and collision-safe without a random source; identical bytes
//! uploaded twice in the same second land on the same name, which is the
//! same file.
//!
//! # Security Model
//!
//! - Folder and file names are restricted to a conservative character set
//! - Relative paths are re-validated on every read-side operation, so a
//!   stored `..` can never walk out of the root
//! - Uploads are validated as PDF by magic bytes before touching disk

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::FileError;

/// Upload size cap. Exam reports are scanned documents, not archives.
const MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

/// Length of the content-hash prefix embedded in stored names.
const HASH_PREFIX_LEN: usize = 12;

/// Metadata for a stored attachment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StoredAttachment {
    /// Path relative to the store root; this is what rows reference.
    pub path: String,
    /// Size of the file in bytes.
    pub size_bytes: u64,
    /// Hex SHA-256 of the content.
    pub sha256: String,
    /// UTC timestamp when the file was stored.
    pub stored_at: DateTime<Utc>,
}

/// Service for managing attachments under a single root directory.
#[derive(Debug)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    /// Creates a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `FileError::InvalidRootDirectory` if the path exists but is
    /// not a directory, or if it cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, FileError> {
        let root = root.into();
        if root.exists() {
            if !root.is_dir() {
                return Err(FileError::InvalidRootDirectory(format!(
                    "Not a directory: {}",
                    root.display()
                )));
            }
        } else {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores PDF bytes and returns the attachment metadata.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The uploaded content
    /// * `original_name` - Client-supplied filename; sanitised before use
    /// * `folder` - Optional single-level grouping folder (e.g. "exams")
    ///
    /// # Errors
    ///
    /// Returns `FileError` if:
    /// - the content is not a PDF (`NotAPdf`)
    /// - the content exceeds the size cap (`TooLarge`)
    /// - the folder or sanitised name is unusable (`InvalidPath`)
    /// - writing fails (`Io`)
    pub fn put(
        &self,
        bytes: &[u8],
        original_name: &str,
        folder: Option<&str>,
    ) -> Result<StoredAttachment, FileError> {
        validate_pdf(bytes, original_name)?;

        let size = bytes.len() as u64;
        if size > MAX_ATTACHMENT_BYTES {
            return Err(FileError::TooLarge {
                max: MAX_ATTACHMENT_BYTES,
                got: size,
            });
        }

        let digest = hex::encode(Sha256::digest(bytes));
        let stored_at = Utc::now();
        let safe_name = sanitise_name(original_name)?;
        let file_name = format!(
            "{}_{}_{}",
            stored_at.format("%Y%m%dT%H%M%S"),
            &digest[..HASH_PREFIX_LEN],
            safe_name
        );

        let relative = match folder {
            Some(folder) => {
                validate_segment(folder)?;
                format!("{}/{}", folder, file_name)
            }
            None => file_name,
        };

        let absolute = self.resolve(&relative)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&absolute, bytes)?;

        Ok(StoredAttachment {
            path: relative,
            size_bytes: size,
            sha256: digest,
            stored_at,
        })
    }

    /// Reads a stored attachment back.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, FileError> {
        let absolute = self.resolve(path)?;
        if !absolute.is_file() {
            return Err(FileError::NotFound(path.to_owned()));
        }
        Ok(fs::read(absolute)?)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Removes a stored attachment. Missing files are an error so callers
    /// notice a dangling row reference.
    pub fn delete(&self, path: &str) -> Result<(), FileError> {
        let absolute = self.resolve(path)?;
        if !absolute.is_file() {
            return Err(FileError::NotFound(path.to_owned()));
        }
        fs::remove_file(absolute)?;
        Ok(())
    }

    /// Validates a relative path and joins it under the root.
    fn resolve(&self, relative: &str) -> Result<PathBuf, FileError> {
        if relative.is_empty() {
            return Err(FileError::InvalidPath("empty path".into()));
        }
        for segment in relative.split('/') {
            validate_segment(segment)?;
        }
        Ok(self.root.join(relative))
    }
}

fn validate_segment(segment: &str) -> Result<(), FileError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(FileError::InvalidPath(format!(
            "unsafe path segment: '{}'",
            segment
        )));
    }
    let ok = segment
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));
    if !ok {
        return Err(FileError::InvalidPath(format!(
            "path segment contains invalid characters: '{}'",
            segment
        )));
    }
    Ok(())
}

/// Replaces anything outside a conservative character set and guards
/// against empty results.
fn sanitise_name(original: &str) -> Result<String, FileError> {
    let safe: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.trim_matches(['.', '_']).is_empty() {
        return Err(FileError::InvalidPath(format!(
            "filename unusable after sanitisation: '{}'",
            original
        )));
    }
    Ok(safe)
}

/// Magic-byte PDF detection, with an extension fallback for byte streams
/// `infer` cannot classify.
fn validate_pdf(bytes: &[u8], original_name: &str) -> Result<(), FileError> {
    if let Some(kind) = infer::get(bytes) {
        if kind.mime_type() == "application/pdf" {
            return Ok(());
        }
        return Err(FileError::NotAPdf);
    }
    if original_name.to_ascii_lowercase().ends_with(".pdf") && bytes.starts_with(b"%PDF") {
        return Ok(());
    }
    Err(FileError::NotAPdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF";

    fn store() -> (TempDir, AttachmentStore) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = AttachmentStore::new(dir.path()).expect("store should build");
        (dir, store)
    }

    #[test]
    fn test_put_stores_pdf_under_folder() {
        let (_dir, store) = store();
        let stored = store
            .put(PDF_BYTES, "report final.pdf", Some("exams"))
            .expect("put should succeed");

        assert!(stored.path.starts_with("exams/"));
        assert!(stored.path.ends_with("_report_final.pdf"));
        assert_eq!(stored.size_bytes, PDF_BYTES.len() as u64);
        assert!(store.exists(&stored.path), "stored file should exist");
        assert_eq!(
            store.read(&stored.path).expect("read should succeed"),
            PDF_BYTES
        );
    }

    #[test]
    fn test_put_rejects_non_pdf_bytes() {
        let (_dir, store) = store();
        let err = store
            .put(b"PK\x03\x04 zip bytes", "report.pdf", None)
            .expect_err("non-pdf should be rejected");
        assert!(matches!(err, FileError::NotAPdf));
    }

    #[test]
    fn test_put_rejects_traversal_folder() {
        let (_dir, store) = store();
        let err = store
            .put(PDF_BYTES, "report.pdf", Some(".."))
            .expect_err("traversal folder should be rejected");
        assert!(matches!(err, FileError::InvalidPath(_)));
    }

    #[test]
    fn test_read_rejects_traversal_path() {
        let (_dir, store) = store();
        let err = store
            .read("../outside.pdf")
            .expect_err("traversal path should be rejected");
        assert!(matches!(err, FileError::InvalidPath(_)));
    }

    #[test]
    fn test_delete_missing_file_is_not_found() {
        let (_dir, store) = store();
        let err = store
            .delete("exams/gone.pdf")
            .expect_err("missing file should fail");
        assert!(matches!(err, FileError::NotFound(_)));
    }

    #[test]
    fn test_delete_removes_the_file() {
        let (_dir, store) = store();
        let stored = store
            .put(PDF_BYTES, "report.pdf", Some("exams"))
            .expect("put should succeed");

        store.delete(&stored.path).expect("delete should succeed");
        assert!(!store.exists(&stored.path));
    }

    #[test]
    fn test_metadata_serialises_roundtrip() {
        let (_dir, store) = store();
        let stored = store
            .put(PDF_BYTES, "report.pdf", None)
            .expect("put should succeed");

        let json = serde_json::to_string(&stored).expect("serialize should succeed");
        let back: StoredAttachment =
            serde_json::from_str(&json).expect("deserialize should succeed");
        assert_eq!(back, stored);
    }
}
