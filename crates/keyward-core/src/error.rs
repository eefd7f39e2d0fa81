// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Keyward.
//!
//! Messages never carry plaintext secrets. Callers building an error from a
//! remote response must pass only status codes and service error strings.

use thiserror::Error;

/// The primary error type used across all Keyward adapters and services.
#[derive(Debug, Error)]
pub enum KeywardError {
    /// Configuration errors detected at startup (missing secrets, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller input was missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The transit service could not be reached or returned a server-side failure.
    #[error("transit service unavailable: {message}")]
    TransitUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The transit service rejected our credentials.
    #[error("transit authentication rejected: {0}")]
    TransitAuth(String),

    /// The transit token was malformed or not recognized by the service.
    #[error("transit token invalid: {0}")]
    TransitTokenInvalid(String),

    /// Local authenticated decryption failed (tampered data or wrong key).
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// The database dump step failed.
    #[error("backup failed at dump stage: {0}")]
    Dump(String),

    /// Looking up the release for a tag failed for a reason other than "not found".
    #[error("backup failed at release lookup stage: {0}")]
    ReleaseLookup(String),

    /// Creating the release for a tag failed.
    #[error("backup failed at release create stage: {0}")]
    ReleaseCreate(String),

    /// Uploading the dump as a release asset failed.
    #[error("backup failed at upload stage: {0}")]
    Upload(String),

    /// Persisting a record failed. The previous record, if any, is intact.
    #[error("store write failed: {source}")]
    StoreWrite {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Storage backend errors outside of writes (open, migrate, read).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A looked-up entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A bounded remote call did not finish in time.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KeywardError {
    /// Shorthand for a [`KeywardError::TransitUnavailable`] without a source.
    pub fn transit_unavailable(message: impl Into<String>) -> Self {
        Self::TransitUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the failure may be transient and worth a bounded retry by the caller.
    ///
    /// Validation and integrity failures indicate a caller or data defect and
    /// are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransitUnavailable { .. }
                | Self::ReleaseLookup(_)
                | Self::ReleaseCreate(_)
                | Self::Upload(_)
                | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(KeywardError::transit_unavailable("down").is_retryable());
        assert!(KeywardError::ReleaseCreate("race".into()).is_retryable());
        assert!(KeywardError::Upload("reset".into()).is_retryable());
        assert!(
            KeywardError::Timeout {
                operation: "pg_dump".into(),
                duration: std::time::Duration::from_secs(1),
            }
            .is_retryable()
        );

        assert!(!KeywardError::Validation("missing".into()).is_retryable());
        assert!(!KeywardError::Integrity("tag".into()).is_retryable());
        assert!(!KeywardError::TransitAuth("denied".into()).is_retryable());
        assert!(!KeywardError::Dump("exit 1".into()).is_retryable());
    }

    #[test]
    fn backup_errors_name_their_stage() {
        assert!(KeywardError::Dump("x".into()).to_string().contains("dump stage"));
        assert!(KeywardError::Upload("x".into()).to_string().contains("upload stage"));
        assert!(
            KeywardError::ReleaseCreate("x".into())
                .to_string()
                .contains("release create stage")
        );
    }
}
