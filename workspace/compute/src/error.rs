use thiserror::Error;
use tracing::error;

use crate::access::DenialReason;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A referenced record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Input rejected before any state change
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Version mismatch or duplicate key on write; the caller may retry
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requester holds the right role but not the scope
    #[error("Access denied: {0}")]
    Denied(DenialReason),

    /// Error while producing a transcript document
    #[error("Render error: {0}")]
    Render(String),

    /// Error while reading a roster file
    #[error("Import error: {0}")]
    Import(String),

    /// Error from password hashing
    #[error("Credential error: {0}")]
    Credential(String),
}

impl From<polars::error::PolarsError> for ComputeError {
    fn from(error: polars::error::PolarsError) -> Self {
        let compute_error = match error {
            polars::error::PolarsError::NoData(_) => {
                ComputeError::Import(format!("No data: {}", error))
            }
            polars::error::PolarsError::ColumnNotFound(_) => {
                ComputeError::Import(format!("Column not found: {}", error))
            }
            polars::error::PolarsError::SchemaMismatch(_) => {
                ComputeError::Import(format!("Schema mismatch: {}", error))
            }
            _ => ComputeError::Import(format!("Malformed roster: {}", error)),
        };
        error!(err = ?compute_error, "Roster parsing failed");
        compute_error
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
