// Error kinds surfaced by the cross-check core

use thiserror::Error;

/// Failures that abort a cross-check before any partition is built.
///
/// Empty inputs are not errors: they short-circuit into a degenerate
/// result (see `reconciliation::ReconciliationStatus`).
#[derive(Debug, Error)]
pub enum CrossCheckError {
    /// Raw bytes could not be parsed under the format implied by the extension
    #[error("could not read '{filename}': {reason}")]
    UnreadableFile { filename: String, reason: String },

    /// Requested key is not one of File A's columns
    #[error("column '{0}' was not found in File A")]
    UnknownComparisonKey(String),
}

impl CrossCheckError {
    pub fn unreadable(filename: &str, reason: impl ToString) -> Self {
        CrossCheckError::UnreadableFile {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrossCheckError>;
