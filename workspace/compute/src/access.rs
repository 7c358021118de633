//! Teacher-to-student access scoping.
//!
//! A teacher may read or write a student's grades only when the student is
//! enrolled in a section the teacher is assigned to. The decision itself is a
//! pure function over looked-up facts ([`decide`]); [`check_teacher_access`]
//! performs the lookups.

use std::collections::HashSet;
use std::fmt;

use model::entities::user::Role;
use model::entities::{section, section_enrollment, user};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use tracing::{debug, instrument, warn};

use crate::error::{ComputeError, Result};

/// Why a scoped request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The requester does not hold the teacher role.
    NotATeacher,
    /// The student is not enrolled in any section.
    Unassigned,
    /// The student's section is not one the teacher is assigned to.
    NotInTeacherSections,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NotATeacher => "not_a_teacher",
            DenialReason::Unassigned => "unassigned",
            DenialReason::NotInTeacherSections => "not_in_teacher_sections",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NotATeacher => f.write_str("requester is not a teacher"),
            DenialReason::Unassigned => f.write_str("student is not assigned to a section"),
            DenialReason::NotInTeacherSections => {
                f.write_str("student is not in any of the teacher's sections")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    /// Turns a denial into [`ComputeError::Denied`].
    pub fn into_result(self) -> Result<()> {
        match self {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied(reason) => Err(ComputeError::Denied(reason)),
        }
    }
}

/// Decides access from the requester's role, the sections they teach, and the
/// student's enrolled section.
pub fn decide(
    requester_role: Option<Role>,
    teacher_sections: &HashSet<i32>,
    student_section: Option<i32>,
) -> AccessDecision {
    if requester_role != Some(Role::Teacher) {
        return AccessDecision::Denied(DenialReason::NotATeacher);
    }
    match student_section {
        None => AccessDecision::Denied(DenialReason::Unassigned),
        Some(section_id) if teacher_sections.contains(&section_id) => AccessDecision::Allowed,
        Some(_) => AccessDecision::Denied(DenialReason::NotInTeacherSections),
    }
}

/// Ids of the sections where the user is the assigned teacher.
pub async fn teacher_section_ids(db: &DatabaseConnection, teacher_id: i32) -> Result<HashSet<i32>> {
    let ids: Vec<i32> = section::Entity::find()
        .select_only()
        .column(section::Column::Id)
        .filter(section::Column::TeacherId.eq(teacher_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Loads an active student account, or `NotFound`.
pub async fn find_active_student(db: &DatabaseConnection, student_id: i32) -> Result<user::Model> {
    match user::Entity::find_by_id(student_id).one(db).await? {
        Some(student) if student.is_active_student() => Ok(student),
        Some(_) => {
            debug!("User {} exists but is not an active student", student_id);
            Err(ComputeError::NotFound("Student not found".to_string()))
        }
        None => Err(ComputeError::NotFound("Student not found".to_string())),
    }
}

/// The section a student is enrolled in, if any.
pub async fn enrolled_section_id(db: &DatabaseConnection, student_id: i32) -> Result<Option<i32>> {
    let enrollment = section_enrollment::Entity::find_by_id(student_id)
        .one(db)
        .await?;
    Ok(enrollment.map(|e| e.section_id))
}

/// Looks up the facts for `teacher_id` and `student_id` and decides access.
///
/// Fails with `NotFound` when the student is absent, not a student, or
/// deactivated.
#[instrument(skip(db))]
pub async fn check_teacher_access(
    db: &DatabaseConnection,
    teacher_id: i32,
    student_id: i32,
) -> Result<AccessDecision> {
    let requester = user::Entity::find_by_id(teacher_id).one(db).await?;
    let requester_role = requester.filter(|u| u.is_active).map(|u| u.role);
    if requester_role != Some(Role::Teacher) {
        warn!("User {} requested student {} without the teacher role", teacher_id, student_id);
        return Ok(AccessDecision::Denied(DenialReason::NotATeacher));
    }

    let sections = teacher_section_ids(db, teacher_id).await?;
    find_active_student(db, student_id).await?;
    let student_section = enrolled_section_id(db, student_id).await?;

    let decision = decide(requester_role, &sections, student_section);
    debug!(?decision, "Access decision for teacher {} on student {}", teacher_id, student_id);
    Ok(decision)
}

/// Like [`check_teacher_access`] but turns a denial into an error.
pub async fn ensure_teacher_access(
    db: &DatabaseConnection,
    teacher_id: i32,
    student_id: i32,
) -> Result<()> {
    check_teacher_access(db, teacher_id, student_id)
        .await?
        .into_result()
}

/// Ids of every active student enrolled in a section the teacher is
/// assigned to.
///
/// Enrollment rows survive deactivation and role changes, so the accounts
/// are filtered the same way [`find_active_student`] filters them.
#[instrument(skip(db))]
pub async fn accessible_student_ids(
    db: &DatabaseConnection,
    teacher_id: i32,
) -> Result<HashSet<i32>> {
    let sections = teacher_section_ids(db, teacher_id).await?;
    if sections.is_empty() {
        return Ok(HashSet::new());
    }
    let enrolled: Vec<i32> = section_enrollment::Entity::find()
        .select_only()
        .column(section_enrollment::Column::StudentId)
        .filter(section_enrollment::Column::SectionId.is_in(sections))
        .into_tuple()
        .all(db)
        .await?;
    if enrolled.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<i32> = user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::Id.is_in(enrolled))
        .filter(user::Column::IsActive.eq(true))
        .filter(user::Column::Role.eq(Role::Student))
        .into_tuple()
        .all(db)
        .await?;
    debug!("Teacher {} may access {} students", teacher_id, ids.len());
    Ok(ids.into_iter().collect())
}
