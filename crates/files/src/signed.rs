//! Time-limited signed URLs for attachments.
//!
//! A signed URL carries the storage path, a unix expiry timestamp and a hex
//! SHA-256 token over `(secret, path, expiry)`. The issuer and the verifier
//! share the secret; nobody else can mint a token, and an expired or
//! tampered URL fails verification. Consumers request a URL on demand when
//! rendering a preview and treat it as opaque.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::FileError;

/// A URL granting read access to one attachment until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

fn token(secret: &str, path: &str, expires_unix: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b"\x00");
    hasher.update(path.as_bytes());
    hasher.update(b"\x00");
    hasher.update(expires_unix.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Issues a signed URL for `path`, valid for `ttl_seconds` from `now`.
///
/// The URL is relative (`/files/<path>?expires=...&token=...`); the serving
/// layer decides the host.
pub fn issue(secret: &str, path: &str, ttl_seconds: i64, now: DateTime<Utc>) -> SignedUrl {
    let expires_at = now + chrono::Duration::seconds(ttl_seconds.max(0));
    let expires_unix = expires_at.timestamp();
    let token = token(secret, path, expires_unix);
    SignedUrl {
        url: format!("/files/{}?expires={}&token={}", path, expires_unix, token),
        expires_at,
    }
}

/// Verifies a presented `(path, expiry, token)` triple.
///
/// # Errors
///
/// - `FileError::Expired` when `now` is past the expiry
/// - `FileError::BadToken` when the token does not match
pub fn verify(
    secret: &str,
    path: &str,
    expires_unix: i64,
    presented: &str,
    now: DateTime<Utc>,
) -> Result<(), FileError> {
    if now.timestamp() > expires_unix {
        return Err(FileError::Expired);
    }

    let expected = token(secret, path, expires_unix);
    // Constant-time-ish comparison; both sides are fixed-length hex.
    let mut diff = 0u8;
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    if a.len() != b.len() {
        return Err(FileError::BadToken);
    }
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    if diff != 0 {
        return Err(FileError::BadToken);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn now() -> DateTime<Utc> {
        "2025-11-01T10:00:00Z".parse().expect("valid timestamp")
    }

    #[test]
    fn test_issued_url_verifies_until_expiry() {
        let signed = issue(SECRET, "exams/report.pdf", 3600, now());
        let expires_unix = signed.expires_at.timestamp();
        let token = signed
            .url
            .rsplit("token=")
            .next()
            .expect("url should carry a token")
            .to_owned();

        verify(SECRET, "exams/report.pdf", expires_unix, &token, now())
            .expect("fresh url should verify");

        let late = now() + chrono::Duration::seconds(3601);
        let err = verify(SECRET, "exams/report.pdf", expires_unix, &token, late)
            .expect_err("expired url should fail");
        assert!(matches!(err, FileError::Expired));
    }

    #[test]
    fn test_tampered_path_or_expiry_fails() {
        let signed = issue(SECRET, "exams/report.pdf", 3600, now());
        let expires_unix = signed.expires_at.timestamp();
        let token = signed
            .url
            .rsplit("token=")
            .next()
            .expect("url should carry a token")
            .to_owned();

        let err = verify(SECRET, "exams/other.pdf", expires_unix, &token, now())
            .expect_err("path swap should fail");
        assert!(matches!(err, FileError::BadToken));

        let err = verify(
            SECRET,
            "exams/report.pdf",
            expires_unix + 9999,
            &token,
            now(),
        )
        .expect_err("extended expiry should fail");
        assert!(matches!(err, FileError::BadToken));
    }

    #[test]
    fn test_different_secret_fails() {
        let signed = issue(SECRET, "exams/report.pdf", 60, now());
        let expires_unix = signed.expires_at.timestamp();
        let token = signed
            .url
            .rsplit("token=")
            .next()
            .expect("url should carry a token")
            .to_owned();

        let err = verify("another-secret-0123456789", "exams/report.pdf", expires_unix, &token, now())
            .expect_err("different secret should fail");
        assert!(matches!(err, FileError::BadToken));
    }

    #[test]
    fn test_negative_ttl_is_clamped_to_now() {
        let signed = issue(SECRET, "exams/report.pdf", -100, now());
        assert_eq!(signed.expires_at, now());
    }
}
