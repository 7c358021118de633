use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Minimum final rating that counts as a pass.
pub const PASSING_RATING: f64 = 75.0;

/// Which partial score a submission writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GradeType {
    Midterm,
    Finals,
}

impl fmt::Display for GradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeType::Midterm => f.write_str("midterm"),
            GradeType::Finals => f.write_str("finals"),
        }
    }
}

/// Outcome derived from the final rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum GradeAction {
    Passed,
    Failed,
}

impl fmt::Display for GradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeAction::Passed => f.write_str("PASSED"),
            GradeAction::Failed => f.write_str("FAILED"),
        }
    }
}

/// Score fields of a single subject block.
///
/// `final_rating` and `action` are always derived from `midterm` and
/// `finals`; they are never accepted from a client.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScores {
    pub midterm: Option<f64>,
    pub finals: Option<f64>,
    pub final_rating: Option<f64>,
    pub action: Option<GradeAction>,
}

/// A single ledger row as returned after an upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntryDto {
    pub id: i32,
    pub student_id: i32,
    pub semester_id: i32,
    pub subject_id: i32,
    #[serde(flatten)]
    pub scores: SubjectScores,
    /// Version token of the stored row; bumps on every effective write.
    pub version: i32,
}

/// One subject line inside a semester block of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSubject {
    pub subject_id: i32,
    pub subject_name: Option<String>,
    #[serde(flatten)]
    pub scores: SubjectScores,
}

/// All subject lines recorded for a student in one semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSemester {
    pub semester_id: i32,
    pub semester_name: String,
    pub year_level_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub subjects: Vec<LedgerSubject>,
}
