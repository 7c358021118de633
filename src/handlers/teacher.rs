//! Views for the signed-in teacher: own sections, advisory class,
//! subject rosters and per-subject grade sheets.

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::academics::{students_in_sections, SectionStudent};
use crate::handlers::users::{load_user_response, UserResponse};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use axum_valid::Valid;
use chrono::Utc;
use common::SubjectScores;
use compute::access::accessible_student_ids;
use compute::ledger::subject_grades;
use model::entities::user::{self, Role};
use model::entities::{grade_entry, section, section_enrollment, semester, subject, user_subject};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// A section the teacher teaches, advises, or both
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeacherSection {
    pub id: i32,
    pub name: String,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
    /// The teacher is the section's adviser
    pub is_advisory: bool,
    /// The teacher's grade access covers this section
    pub is_teaching: bool,
    pub student_count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeacherStudent {
    pub id: i32,
    pub username: String,
    pub name: Option<String>,
    pub lrn: Option<String>,
    pub section_id: i32,
    /// Enrolled in a section the teacher advises
    pub is_advisory: bool,
}

impl TeacherStudent {
    fn new(section_id: i32, student: SectionStudent, advisory: &HashSet<i32>) -> Self {
        Self {
            id: student.id,
            username: student.username,
            name: student.name,
            lrn: student.lrn,
            section_id,
            is_advisory: advisory.contains(&section_id),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct TeacherProfileRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase", parameter_in = Query)]
pub struct SubjectStudentsQuery {
    #[validate(range(min = 1))]
    pub subject_id: i32,
    #[validate(range(min = 1))]
    pub semester_id: i32,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase", parameter_in = Query)]
pub struct SubjectGradesQuery {
    #[validate(range(min = 1))]
    pub semester_id: i32,
}

async fn teacher_sections(
    state: &AppState,
    teacher_id: i32,
) -> Result<Vec<section::Model>, ApiError> {
    Ok(section::Entity::find()
        .filter(
            Condition::any()
                .add(section::Column::TeacherId.eq(teacher_id))
                .add(section::Column::AdviserId.eq(teacher_id)),
        )
        .order_by_asc(section::Column::Name)
        .all(&state.db)
        .await?)
}

fn advisory_ids(sections: &[section::Model], teacher_id: i32) -> HashSet<i32> {
    sections
        .iter()
        .filter(|s| s.adviser_id == Some(teacher_id))
        .map(|s| s.id)
        .collect()
}

/// Sections the signed-in teacher teaches or advises
#[utoipa::path(
    get,
    path = "/api/v1/teacher/sections",
    tag = "teacher",
    responses(
        (status = 200, description = "Sections retrieved", body = ApiResponse<Vec<TeacherSection>>),
        (status = 403, description = "Caller is not a teacher", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(teacher_id = auth.id))]
pub async fn get_teacher_sections(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<TeacherSection>>>, ApiError> {
    auth.require(&[Role::Teacher])?;
    let sections = teacher_sections(&state, auth.id).await?;

    let mut response = Vec::with_capacity(sections.len());
    for s in sections {
        let student_count = section_enrollment::Entity::find()
            .filter(section_enrollment::Column::SectionId.eq(s.id))
            .count(&state.db)
            .await?;
        trace!("Section {} has {} students", s.id, student_count);
        response.push(TeacherSection {
            id: s.id,
            is_advisory: s.adviser_id == Some(auth.id),
            is_teaching: s.teacher_id == Some(auth.id),
            name: s.name,
            strand_id: s.strand_id,
            year_level_id: s.year_level_id,
            student_count,
        });
    }
    debug!("Teacher {} has {} sections", auth.id, response.len());
    Ok(Json(ApiResponse::ok(response, "Sections retrieved successfully")))
}

/// Students of the sections the signed-in teacher advises
#[utoipa::path(
    get,
    path = "/api/v1/teacher/adviser/students",
    tag = "teacher",
    responses(
        (status = 200, description = "Advisory students", body = ApiResponse<Vec<TeacherStudent>>),
        (status = 403, description = "Caller is not a teacher", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(teacher_id = auth.id))]
pub async fn get_advisory_students(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<TeacherStudent>>>, ApiError> {
    auth.require(&[Role::Teacher])?;
    let sections = teacher_sections(&state, auth.id).await?;
    let advisory = advisory_ids(&sections, auth.id);
    if advisory.is_empty() {
        debug!("Teacher {} advises no section", auth.id);
        return Ok(Json(ApiResponse::ok(Vec::new(), "Teacher advises no section")));
    }

    let students = students_in_sections(&state.db, advisory.iter().copied().collect())
        .await?
        .into_iter()
        .map(|(section_id, student)| TeacherStudent::new(section_id, student, &advisory))
        .collect();
    Ok(Json(ApiResponse::ok(students, "Advisory students retrieved successfully")))
}

/// Students of the teacher's sections who take a subject in a semester
///
/// A student takes the subject when it is on their subject list or when
/// they already have a grade row for it in that semester.
#[utoipa::path(
    get,
    path = "/api/v1/teacher/subject-students",
    tag = "teacher",
    params(SubjectStudentsQuery),
    responses(
        (status = 200, description = "Students retrieved", body = ApiResponse<Vec<TeacherStudent>>),
        (status = 404, description = "Subject or semester not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(teacher_id = auth.id))]
pub async fn get_subject_students(
    State(state): State<AppState>,
    auth: AuthUser,
    Valid(Query(query)): Valid<Query<SubjectStudentsQuery>>,
) -> Result<Json<ApiResponse<Vec<TeacherStudent>>>, ApiError> {
    auth.require(&[Role::Teacher])?;
    if subject::Entity::find_by_id(query.subject_id).one(&state.db).await?.is_none() {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }
    if semester::Entity::find_by_id(query.semester_id).one(&state.db).await?.is_none() {
        return Err(ApiError::NotFound("Semester not found".to_string()));
    }

    let sections = teacher_sections(&state, auth.id).await?;
    let advisory = advisory_ids(&sections, auth.id);
    let students = students_in_sections(&state.db, sections.iter().map(|s| s.id).collect()).await?;

    let mut taking: HashSet<i32> = user_subject::Entity::find()
        .select_only()
        .column(user_subject::Column::UserId)
        .filter(user_subject::Column::SubjectId.eq(query.subject_id))
        .into_tuple::<i32>()
        .all(&state.db)
        .await?
        .into_iter()
        .collect();
    taking.extend(
        grade_entry::Entity::find()
            .select_only()
            .column(grade_entry::Column::StudentId)
            .filter(grade_entry::Column::SubjectId.eq(query.subject_id))
            .filter(grade_entry::Column::SemesterId.eq(query.semester_id))
            .into_tuple::<i32>()
            .all(&state.db)
            .await?,
    );

    let students: Vec<TeacherStudent> = students
        .into_iter()
        .filter(|(_, student)| taking.contains(&student.id))
        .map(|(section_id, student)| TeacherStudent::new(section_id, student, &advisory))
        .collect();
    debug!(
        "{} students take subject {} in semester {}",
        students.len(),
        query.subject_id,
        query.semester_id
    );
    Ok(Json(ApiResponse::ok(students, "Students retrieved successfully")))
}

/// Change the signed-in teacher's username
#[utoipa::path(
    put,
    path = "/api/v1/teacher/profile",
    tag = "teacher",
    request_body = TeacherProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserResponse>),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request), fields(teacher_id = auth.id))]
pub async fn update_teacher_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<TeacherProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    auth.require(&[Role::Teacher])?;
    request.validate()?;
    let account = user::Entity::find_by_id(auth.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let mut active: user::ActiveModel = account.into();
    active.username = Set(request.username.trim().to_string());
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    info!("Teacher {} changed username", auth.id);
    let response = load_user_response(&state.db, updated).await?;
    Ok(Json(ApiResponse::ok(response, "Profile updated successfully")))
}

/// Scores for one subject in one semester, keyed by student id
///
/// Only students the signed-in teacher may access are included.
#[utoipa::path(
    get,
    path = "/api/v1/teacher/subject-grades/{subject_id}",
    tag = "teacher",
    params(
        ("subject_id" = i32, Path, description = "Subject ID"),
        SubjectGradesQuery,
    ),
    responses(
        (status = 200, description = "Grades retrieved", body = ApiResponse<BTreeMap<i32, SubjectScores>>),
        (status = 400, description = "Missing or invalid semesterId", body = ErrorResponse),
        (status = 404, description = "Subject or semester not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(teacher_id = auth.id))]
pub async fn get_subject_grades(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Valid(Query(query)): Valid<Query<SubjectGradesQuery>>,
) -> Result<Json<ApiResponse<BTreeMap<i32, SubjectScores>>>, ApiError> {
    auth.require(&[Role::Teacher])?;
    let students = accessible_student_ids(&state.db, auth.id).await?;
    let grades = subject_grades(&state.db, subject_id, query.semester_id, &students).await?;
    debug!("Returning grades of {} students", grades.len());
    Ok(Json(ApiResponse::ok(grades, "Subject grades retrieved successfully")))
}
