//! Error types for the table reconstruction library.

use thiserror::Error;

/// Primary error type for table reconstruction operations.
///
/// Geometry errors are fatal for the region that produced them but must
/// never abort a batch of sibling regions; callers are expected to log
/// the failure against the region key and fall back to plain text.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("invalid {kind} geometry: {reason}")]
    Geometry { kind: &'static str, reason: String },

    #[error("unknown strategy: {0:?} (expected \"lines\" or \"text\")")]
    UnknownStrategy(String),

    #[error("invalid setting {name}: {value} (must be non-negative)")]
    InvalidSetting { name: &'static str, value: f64 },
}

impl TableError {
    pub(crate) fn geometry(kind: &'static str, reason: impl Into<String>) -> Self {
        TableError::Geometry {
            kind,
            reason: reason.into(),
        }
    }
}

/// Convenience Result type alias for TableError.
pub type Result<T> = std::result::Result<T, TableError>;
