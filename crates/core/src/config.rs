//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into
//! services as a shared value. Request handling never reads process-wide
//! environment variables; that keeps behaviour consistent across worker
//! threads and test harnesses.

use std::path::{Path, PathBuf};

use crate::scheduling::CanonicalSlots;
use crate::scope::ScopePolicy;
use crate::{StoreError, StoreResult};

const MIN_SECRET_LEN: usize = 16;

/// Core configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    attachment_dir: PathBuf,
    url_signing_secret: String,
    slots: CanonicalSlots,
    scope_policy: ScopePolicy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Rejects a signing secret shorter than 16 bytes; a guessable secret
    /// makes every signed attachment URL forgeable.
    pub fn new(
        attachment_dir: PathBuf,
        url_signing_secret: String,
        slots: CanonicalSlots,
        scope_policy: ScopePolicy,
    ) -> StoreResult<Self> {
        if url_signing_secret.len() < MIN_SECRET_LEN {
            return Err(StoreError::InvalidInput(format!(
                "url signing secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            attachment_dir,
            url_signing_secret,
            slots,
            scope_policy,
        })
    }

    pub fn attachment_dir(&self) -> &Path {
        &self.attachment_dir
    }

    pub fn url_signing_secret(&self) -> &str {
        &self.url_signing_secret
    }

    pub fn slots(&self) -> &CanonicalSlots {
        &self.slots
    }

    pub fn scope_policy(&self) -> &ScopePolicy {
        &self.scope_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_short_secret() {
        let err = CoreConfig::new(
            PathBuf::from("/tmp/attachments"),
            "short".into(),
            CanonicalSlots::default(),
            ScopePolicy::default(),
        )
        .expect_err("short secret should be rejected");
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn test_config_exposes_resolved_values() {
        let cfg = CoreConfig::new(
            PathBuf::from("/tmp/attachments"),
            "0123456789abcdef".into(),
            CanonicalSlots::default(),
            ScopePolicy {
                admins_may_cancel: true,
            },
        )
        .expect("config should build");

        assert_eq!(cfg.attachment_dir(), Path::new("/tmp/attachments"));
        assert_eq!(cfg.slots().len(), 8);
        assert!(cfg.scope_policy().admins_may_cancel);
    }
}
