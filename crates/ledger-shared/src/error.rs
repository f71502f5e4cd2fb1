//! Error types shared by every ledger operation.
//!
//! Every public operation either succeeds or reports exactly one terminal
//! [`HealthError`]. Nothing here is retried automatically.

use serde::{Deserialize, Serialize};

use crate::store::Partition;

/// Standard error type for consistent error handling across crates
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthError {
    /// Wrong argument count, empty required field, bad configuration
    #[error("Validation error: {0}")]
    Validation(String),

    /// Role or attribute mismatch, or missing identity attribute
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Missing master or private record
    #[error("Not found: {key} in {partition}")]
    NotFound { partition: Partition, key: String },

    /// Malformed JSON on the way in or out
    #[error("Codec error: {context} -->\n{fragment}")]
    Codec { context: String, fragment: String },

    /// The backing store failed the call
    #[error("Store error: {0}")]
    Store(String),
}

/// Type alias for results that can fail with a [`HealthError`].
pub type HealthResult<T> = Result<T, HealthError>;

/// Stable discriminant of [`HealthError`], carried on error responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    NotFound,
    Codec,
    Store,
}

impl HealthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HealthError::Validation(_) => ErrorKind::Validation,
            HealthError::Unauthorized(_) => ErrorKind::Unauthorized,
            HealthError::NotFound { .. } => ErrorKind::NotFound,
            HealthError::Codec { .. } => ErrorKind::Codec,
            HealthError::Store(_) => ErrorKind::Store,
        }
    }

    pub fn not_found(partition: Partition, key: impl Into<String>) -> Self {
        HealthError::NotFound {
            partition,
            key: key.into(),
        }
    }

    /// Build a codec error carrying at most `max_fragment` characters of the
    /// offending input.
    pub fn codec(
        context: impl std::fmt::Display,
        fragment: &[u8],
        max_fragment: usize,
    ) -> Self {
        HealthError::Codec {
            context: context.to_string(),
            fragment: truncate_fragment(fragment, max_fragment),
        }
    }
}

/// Render up to `max_chars` characters of a (possibly non UTF-8) payload.
pub fn truncate_fragment(bytes: &[u8], max_chars: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
