//! Common transport-layer types shared between the compute crate and the
//! HTTP handlers. Grade payloads keep the camelCase field names the school
//! dashboards already send (`studentId`, `gradeValue`, `finalRating`, ...).

mod grades;
mod roster;

pub use grades::{
    GradeAction, GradeEntryDto, GradeType, LedgerSemester, LedgerSubject, SubjectScores,
    PASSING_RATING,
};
pub use roster::{ImportReport, ImportRowSkipped, SkipReason};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic API response wrapper used by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success flag
    pub success: bool,
}

impl<T> ApiResponse<T> {
    /// Wraps `data` in a successful envelope.
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}
