//! Clinia attachment storage.
//!
//! Exam reports are uploaded as PDF files and referenced from rows by
//! storage path. This crate owns both halves of that contract:
//!
//! - [`AttachmentStore`]: validated writes under a single root directory,
//!   names derived from content and upload time, no path ever escaping the
//!   root
//! - [`signed`]: time-limited signed URLs so a preview can be rendered
//!   without making the bucket public
//!
//! Binary bytes are deliberately kept out of the row store; rows carry only
//! the relative storage path.

mod attachments;
pub mod signed;

pub use attachments::{AttachmentStore, StoredAttachment};

/// Errors that can occur during attachment operations
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Path validation failed (potential directory traversal or unsafe path)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The uploaded bytes are not a PDF document
    #[error("Only PDF attachments are accepted")]
    NotAPdf,

    /// The upload exceeds the configured size cap
    #[error("Attachment exceeds the maximum size of {max} bytes (got {got})")]
    TooLarge { max: u64, got: u64 },

    /// The attachment is not present in storage
    #[error("Attachment not found: {0}")]
    NotFound(String),

    /// The signed URL token does not match the path and expiry
    #[error("Signed URL token mismatch")]
    BadToken,

    /// The signed URL has expired
    #[error("Signed URL expired")]
    Expired,

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
