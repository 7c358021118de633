use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Why a roster row was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// A required column was empty or absent.
    MissingField(String),
    /// The username is already taken, either in the store or earlier in the file.
    DuplicateUsername(String),
    /// The `section` column names a section that does not exist.
    UnknownSection(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField(field) => write!(f, "missing field '{}'", field),
            SkipReason::DuplicateUsername(name) => write!(f, "duplicate username '{}'", name),
            SkipReason::UnknownSection(name) => write!(f, "unknown section '{}'", name),
        }
    }
}

/// A roster row that was skipped, with its 1-based data row number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportRowSkipped {
    pub row_number: usize,
    pub reason: SkipReason,
}

/// Result of a roster import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportReport {
    /// Usernames of the student accounts that were created.
    pub created: Vec<String>,
    pub skipped: Vec<ImportRowSkipped>,
}
