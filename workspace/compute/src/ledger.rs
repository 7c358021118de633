//! The per-student grade ledger.
//!
//! Each (student, semester, subject) owns exactly one row holding the two
//! partial scores. Writes go through a compare-and-swap on the row version so
//! a lost update surfaces as [`ComputeError::Conflict`] instead of silently
//! overwriting a concurrent write.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use common::{GradeEntryDto, GradeType, LedgerSemester, LedgerSubject, SubjectScores};
use model::entities::{grade_entry, semester, subject};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::access::find_active_student;
use crate::error::{ComputeError, Result};
use crate::grading::{derive_scores, validate_score};

/// A single score submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeSubmission {
    pub student_id: i32,
    pub subject_id: i32,
    pub semester_id: i32,
    pub grade_type: GradeType,
    pub value: f64,
    /// Version the caller last saw; a mismatch is a conflict.
    pub expected_version: Option<i32>,
    /// Account that made the submission.
    pub submitted_by: Option<i32>,
}

pub fn entry_to_dto(row: &grade_entry::Model) -> GradeEntryDto {
    GradeEntryDto {
        id: row.id,
        student_id: row.student_id,
        semester_id: row.semester_id,
        subject_id: row.subject_id,
        scores: derive_scores(row.midterm, row.finals),
        version: row.version,
    }
}

fn current_score(row: &grade_entry::Model, grade_type: GradeType) -> Option<f64> {
    match grade_type {
        GradeType::Midterm => row.midterm,
        GradeType::Finals => row.finals,
    }
}

/// Records one partial score, creating the ledger row on first write.
///
/// Only the field named by `grade_type` changes. Submitting the value that is
/// already stored leaves the row (and its version) untouched.
#[instrument(skip(db), fields(student_id = submission.student_id, subject_id = submission.subject_id, semester_id = submission.semester_id))]
pub async fn upsert_grade(
    db: &DatabaseConnection,
    submission: GradeSubmission,
) -> Result<GradeEntryDto> {
    let value = validate_score(submission.value)?;

    find_active_student(db, submission.student_id).await?;
    if subject::Entity::find_by_id(submission.subject_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ComputeError::NotFound("Subject not found".to_string()));
    }
    if semester::Entity::find_by_id(submission.semester_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ComputeError::NotFound("Semester not found".to_string()));
    }

    let existing = grade_entry::Entity::find()
        .filter(grade_entry::Column::StudentId.eq(submission.student_id))
        .filter(grade_entry::Column::SemesterId.eq(submission.semester_id))
        .filter(grade_entry::Column::SubjectId.eq(submission.subject_id))
        .one(db)
        .await?;

    let row = match existing {
        None => {
            if let Some(expected) = submission.expected_version {
                warn!("Expected version {} but no ledger row exists yet", expected);
                return Err(ComputeError::Conflict(
                    "grade entry does not exist yet".to_string(),
                ));
            }
            insert_entry(db, &submission, value).await?
        }
        Some(row) => {
            if let Some(expected) = submission.expected_version {
                if expected != row.version {
                    warn!(
                        "Stale version for grade entry {}: expected {}, stored {}",
                        row.id, expected, row.version
                    );
                    return Err(ComputeError::Conflict(
                        "grade entry was modified by another request".to_string(),
                    ));
                }
            }
            if current_score(&row, submission.grade_type) == Some(value) {
                debug!("Score unchanged for grade entry {}, skipping write", row.id);
                row
            } else {
                apply_score(db, &row, submission.grade_type, value, submission.submitted_by)
                    .await?
            }
        }
    };

    info!(
        "Recorded {} = {} for student {} (entry {}, version {})",
        submission.grade_type, value, row.student_id, row.id, row.version
    );
    Ok(entry_to_dto(&row))
}

async fn insert_entry(
    db: &DatabaseConnection,
    submission: &GradeSubmission,
    value: f64,
) -> Result<grade_entry::Model> {
    let (midterm, finals) = match submission.grade_type {
        GradeType::Midterm => (Some(value), None),
        GradeType::Finals => (None, Some(value)),
    };
    let active = grade_entry::ActiveModel {
        student_id: Set(submission.student_id),
        semester_id: Set(submission.semester_id),
        subject_id: Set(submission.subject_id),
        midterm: Set(midterm),
        finals: Set(finals),
        version: Set(1),
        updated_by: Set(submission.submitted_by),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };

    match active.insert(db).await {
        Ok(row) => {
            trace!("Created grade entry {}", row.id);
            Ok(row)
        }
        Err(err) => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                warn!("Concurrent first write on grade entry: {}", detail);
                Err(ComputeError::Conflict(
                    "grade entry was created by another request".to_string(),
                ))
            }
            _ => Err(err.into()),
        },
    }
}

/// Writes one score onto `row` if its version is still current.
///
/// Returns the row as stored after the write, with its version bumped.
pub async fn apply_score(
    db: &DatabaseConnection,
    row: &grade_entry::Model,
    grade_type: GradeType,
    value: f64,
    updated_by: Option<i32>,
) -> Result<grade_entry::Model> {
    let column = match grade_type {
        GradeType::Midterm => grade_entry::Column::Midterm,
        GradeType::Finals => grade_entry::Column::Finals,
    };
    let now = Utc::now();
    let next_version = row.version + 1;

    let result = grade_entry::Entity::update_many()
        .col_expr(column, Expr::value(value))
        .col_expr(grade_entry::Column::Version, Expr::value(next_version))
        .col_expr(grade_entry::Column::UpdatedBy, Expr::value(updated_by))
        .col_expr(grade_entry::Column::UpdatedAt, Expr::value(now))
        .filter(grade_entry::Column::Id.eq(row.id))
        .filter(grade_entry::Column::Version.eq(row.version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(
            "Compare-and-swap lost on grade entry {} at version {}",
            row.id, row.version
        );
        return Err(ComputeError::Conflict(
            "grade entry was modified by another request".to_string(),
        ));
    }

    let mut updated = row.clone();
    match grade_type {
        GradeType::Midterm => updated.midterm = Some(value),
        GradeType::Finals => updated.finals = Some(value),
    }
    updated.version = next_version;
    updated.updated_by = updated_by;
    updated.updated_at = now;
    Ok(updated)
}

/// Reads a student's ledger grouped by semester.
///
/// Semesters are ordered by start date, subjects by name. A student with no
/// rows yields `NotFound`.
#[instrument(skip(db))]
pub async fn student_ledger(
    db: &DatabaseConnection,
    student_id: i32,
) -> Result<Vec<LedgerSemester>> {
    let rows = grade_entry::Entity::find()
        .filter(grade_entry::Column::StudentId.eq(student_id))
        .order_by_asc(grade_entry::Column::Id)
        .all(db)
        .await?;

    if rows.is_empty() {
        debug!("No ledger rows for student {}", student_id);
        return Err(ComputeError::NotFound(
            "No grades found for this student".to_string(),
        ));
    }

    let semester_ids: HashSet<i32> = rows.iter().map(|r| r.semester_id).collect();
    let subject_ids: HashSet<i32> = rows.iter().map(|r| r.subject_id).collect();

    let semesters: HashMap<i32, semester::Model> = semester::Entity::find()
        .filter(semester::Column::Id.is_in(semester_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let subject_names: HashMap<i32, String> = subject::Entity::find()
        .filter(subject::Column::Id.is_in(subject_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let mut grouped: HashMap<i32, Vec<LedgerSubject>> = HashMap::new();
    for row in rows {
        if !semesters.contains_key(&row.semester_id) {
            warn!(
                "Grade entry {} references missing semester {}",
                row.id, row.semester_id
            );
            continue;
        }
        grouped.entry(row.semester_id).or_default().push(LedgerSubject {
            subject_id: row.subject_id,
            subject_name: subject_names.get(&row.subject_id).cloned(),
            scores: derive_scores(row.midterm, row.finals),
        });
    }

    let mut ledger: Vec<LedgerSemester> = grouped
        .into_iter()
        .filter_map(|(semester_id, mut subjects)| {
            let semester = semesters.get(&semester_id)?;
            subjects.sort_by(|a, b| {
                a.subject_name
                    .cmp(&b.subject_name)
                    .then(a.subject_id.cmp(&b.subject_id))
            });
            Some(LedgerSemester {
                semester_id,
                semester_name: semester.name.clone(),
                year_level_id: semester.year_level_id,
                start_date: semester.start_date,
                end_date: semester.end_date,
                subjects,
            })
        })
        .collect();
    ledger.sort_by_key(|s| (s.start_date, s.semester_id));

    debug!("Ledger for student {} spans {} semesters", student_id, ledger.len());
    Ok(ledger)
}

/// Scores for one subject in one semester, keyed by student id and limited to
/// `student_ids`.
#[instrument(skip(db, student_ids), fields(num_students = student_ids.len()))]
pub async fn subject_grades(
    db: &DatabaseConnection,
    subject_id: i32,
    semester_id: i32,
    student_ids: &HashSet<i32>,
) -> Result<BTreeMap<i32, SubjectScores>> {
    if subject::Entity::find_by_id(subject_id).one(db).await?.is_none() {
        return Err(ComputeError::NotFound("Subject not found".to_string()));
    }
    if semester::Entity::find_by_id(semester_id).one(db).await?.is_none() {
        return Err(ComputeError::NotFound("Semester not found".to_string()));
    }
    if student_ids.is_empty() {
        return Ok(BTreeMap::new());
    }

    let rows = grade_entry::Entity::find()
        .filter(grade_entry::Column::SubjectId.eq(subject_id))
        .filter(grade_entry::Column::SemesterId.eq(semester_id))
        .filter(grade_entry::Column::StudentId.is_in(student_ids.iter().copied()))
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.student_id, derive_scores(row.midterm, row.finals)))
        .collect())
}
