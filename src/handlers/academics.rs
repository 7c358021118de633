//! Strands, year levels, subjects and sections.

use crate::auth::{AuthUser, ADMIN_ROLES};
use crate::error::ApiError;
use crate::handlers::users::assign_section;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use model::entities::user::Role;
use model::entities::{section, section_enrollment, strand, student_profile, subject, user, year_level};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct StrandRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StrandResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl From<strand::Model> for StrandResponse {
    fn from(model: strand::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct YearLevelRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct YearLevelResponse {
    pub id: i32,
    pub name: String,
}

impl From<year_level::Model> for YearLevelResponse {
    fn from(model: year_level::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct SubjectRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub code: Option<String>,
    pub strand_id: Option<i32>,
    pub semester_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubjectResponse {
    pub id: i32,
    pub name: String,
    pub code: Option<String>,
    pub strand_id: Option<i32>,
    pub semester_id: Option<i32>,
}

impl From<subject::Model> for SubjectResponse {
    fn from(model: subject::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            strand_id: model.strand_id,
            semester_id: model.semester_id,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct SectionRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Teacher whose scope covers the section's students
    pub teacher_id: Option<i32>,
    /// Adviser; may differ from the teacher
    pub adviser_id: Option<i32>,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionResponse {
    pub id: i32,
    pub name: String,
    pub teacher_id: Option<i32>,
    pub adviser_id: Option<i32>,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
}

impl From<section::Model> for SectionResponse {
    fn from(model: section::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            teacher_id: model.teacher_id,
            adviser_id: model.adviser_id,
            strand_id: model.strand_id,
            year_level_id: model.year_level_id,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct EnrollRequest {
    pub student_id: i32,
}

/// A student listed under a section
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionStudent {
    pub id: i32,
    pub username: String,
    /// "Last, First Middle" when a profile exists
    pub name: Option<String>,
    pub lrn: Option<String>,
}

/// Students of the given sections, with profile names, ordered by username.
pub async fn students_in_sections(
    db: &DatabaseConnection,
    section_ids: Vec<i32>,
) -> Result<Vec<(i32, SectionStudent)>, ApiError> {
    let enrollments = section_enrollment::Entity::find()
        .filter(section_enrollment::Column::SectionId.is_in(section_ids))
        .all(db)
        .await?;
    let section_of: HashMap<i32, i32> = enrollments
        .iter()
        .map(|e| (e.student_id, e.section_id))
        .collect();

    let students = user::Entity::find()
        .filter(user::Column::Id.is_in(section_of.keys().copied()))
        .filter(user::Column::Role.eq(Role::Student))
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?;
    let profiles: HashMap<i32, student_profile::Model> = student_profile::Entity::find()
        .filter(student_profile::Column::UserId.is_in(section_of.keys().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.user_id, p))
        .collect();

    Ok(students
        .into_iter()
        .filter_map(|s| {
            let section_id = *section_of.get(&s.id)?;
            let profile = profiles.get(&s.id);
            Some((
                section_id,
                SectionStudent {
                    id: s.id,
                    username: s.username,
                    name: profile.map(|p| p.display_name()),
                    lrn: profile.and_then(|p| p.lrn.clone()),
                },
            ))
        })
        .collect())
}

async fn ensure_teacher_account(db: &DatabaseConnection, user_id: Option<i32>) -> Result<(), ApiError> {
    let Some(user_id) = user_id else {
        return Ok(());
    };
    match user::Entity::find_by_id(user_id).one(db).await? {
        Some(account) if account.role == Role::Teacher && account.is_active => Ok(()),
        _ => Err(ApiError::InvalidArgument(format!(
            "User {} is not an active teacher",
            user_id
        ))),
    }
}

/// Create a strand
#[utoipa::path(
    post,
    path = "/api/v1/admin/strands",
    tag = "admin",
    request_body = StrandRequest,
    responses(
        (status = 201, description = "Strand created", body = ApiResponse<StrandResponse>),
        (status = 409, description = "Strand name already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn create_strand(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<StrandRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StrandResponse>>), ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    let created = strand::ActiveModel {
        name: Set(request.name.trim().to_string()),
        description: Set(request.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    info!("Strand {} created", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(StrandResponse::from(created), "Strand created successfully")),
    ))
}

/// List strands
#[utoipa::path(
    get,
    path = "/api/v1/admin/strands",
    tag = "admin",
    responses((status = 200, description = "Strands retrieved", body = ApiResponse<Vec<StrandResponse>>))
)]
#[instrument(skip(state, auth))]
pub async fn get_strands(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<StrandResponse>>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let strands = strand::Entity::find()
        .order_by_asc(strand::Column::Name)
        .all(&state.db)
        .await?;
    let strands = strands.into_iter().map(StrandResponse::from).collect();
    Ok(Json(ApiResponse::ok(strands, "Strands retrieved successfully")))
}

/// Update a strand
#[utoipa::path(
    put,
    path = "/api/v1/admin/strands/{strand_id}",
    tag = "admin",
    params(("strand_id" = i32, Path, description = "Strand ID")),
    request_body = StrandRequest,
    responses(
        (status = 200, description = "Strand updated", body = ApiResponse<StrandResponse>),
        (status = 404, description = "Strand not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn update_strand(
    Path(strand_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<StrandRequest>,
) -> Result<Json<ApiResponse<StrandResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    let existing = strand::Entity::find_by_id(strand_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Strand not found".to_string()))?;

    let mut active: strand::ActiveModel = existing.into();
    active.name = Set(request.name.trim().to_string());
    active.description = Set(request.description);
    let updated = active.update(&state.db).await?;
    Ok(Json(ApiResponse::ok(StrandResponse::from(updated), "Strand updated successfully")))
}

/// Delete a strand
#[utoipa::path(
    delete,
    path = "/api/v1/admin/strands/{strand_id}",
    tag = "admin",
    params(("strand_id" = i32, Path, description = "Strand ID")),
    responses(
        (status = 204, description = "Strand deleted"),
        (status = 404, description = "Strand not found", body = ErrorResponse),
        (status = 409, description = "Strand still has semesters", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn delete_strand(
    Path(strand_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let result = strand::Entity::delete_by_id(strand_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Strand not found".to_string()));
    }
    info!("Strand {} deleted", strand_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Create a year level
#[utoipa::path(
    post,
    path = "/api/v1/admin/year-levels",
    tag = "admin",
    request_body = YearLevelRequest,
    responses(
        (status = 201, description = "Year level created", body = ApiResponse<YearLevelResponse>),
        (status = 409, description = "Year level already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn create_year_level(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<YearLevelRequest>,
) -> Result<(StatusCode, Json<ApiResponse<YearLevelResponse>>), ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    let created = year_level::ActiveModel {
        name: Set(request.name.trim().to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(YearLevelResponse::from(created), "Year level created successfully")),
    ))
}

/// List year levels
#[utoipa::path(
    get,
    path = "/api/v1/admin/year-levels",
    tag = "admin",
    responses((status = 200, description = "Year levels retrieved", body = ApiResponse<Vec<YearLevelResponse>>))
)]
#[instrument(skip(state, auth))]
pub async fn get_year_levels(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<YearLevelResponse>>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let levels = year_level::Entity::find()
        .order_by_asc(year_level::Column::Id)
        .all(&state.db)
        .await?;
    let levels = levels.into_iter().map(YearLevelResponse::from).collect();
    Ok(Json(ApiResponse::ok(levels, "Year levels retrieved successfully")))
}

/// Rename a year level
#[utoipa::path(
    put,
    path = "/api/v1/admin/year-levels/{year_level_id}",
    tag = "admin",
    params(("year_level_id" = i32, Path, description = "Year level ID")),
    request_body = YearLevelRequest,
    responses(
        (status = 200, description = "Year level updated", body = ApiResponse<YearLevelResponse>),
        (status = 404, description = "Year level not found", body = ErrorResponse),
        (status = 409, description = "Year level name already taken", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn update_year_level(
    Path(year_level_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<YearLevelRequest>,
) -> Result<Json<ApiResponse<YearLevelResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    let existing = year_level::Entity::find_by_id(year_level_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Year level not found".to_string()))?;

    let mut active: year_level::ActiveModel = existing.into();
    active.name = Set(request.name.trim().to_string());
    let updated = active.update(&state.db).await?;

    // Year level names are printed on transcripts
    state.cache.invalidate_all().await;
    Ok(Json(ApiResponse::ok(
        YearLevelResponse::from(updated),
        "Year level updated successfully",
    )))
}

/// Delete a year level
#[utoipa::path(
    delete,
    path = "/api/v1/admin/year-levels/{year_level_id}",
    tag = "admin",
    params(("year_level_id" = i32, Path, description = "Year level ID")),
    responses(
        (status = 204, description = "Year level deleted"),
        (status = 404, description = "Year level not found", body = ErrorResponse),
        (status = 409, description = "Year level still has semesters", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn delete_year_level(
    Path(year_level_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let result = year_level::Entity::delete_by_id(year_level_id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Year level not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Create a subject
#[utoipa::path(
    post,
    path = "/api/v1/admin/subjects",
    tag = "admin",
    request_body = SubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = ApiResponse<SubjectResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn create_subject(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SubjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubjectResponse>>), ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    let created = subject::ActiveModel {
        name: Set(request.name.trim().to_string()),
        code: Set(request.code),
        strand_id: Set(request.strand_id),
        semester_id: Set(request.semester_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    info!("Subject {} created", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SubjectResponse::from(created), "Subject created successfully")),
    ))
}

/// List subjects
#[utoipa::path(
    get,
    path = "/api/v1/admin/subjects",
    tag = "admin",
    responses((status = 200, description = "Subjects retrieved", body = ApiResponse<Vec<SubjectResponse>>))
)]
#[instrument(skip(state, auth))]
pub async fn get_subjects(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<SubjectResponse>>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let subjects = subject::Entity::find()
        .order_by_asc(subject::Column::Name)
        .all(&state.db)
        .await?;
    let subjects = subjects.into_iter().map(SubjectResponse::from).collect();
    Ok(Json(ApiResponse::ok(subjects, "Subjects retrieved successfully")))
}

/// Update a subject
#[utoipa::path(
    put,
    path = "/api/v1/admin/subjects/{subject_id}",
    tag = "admin",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    request_body = SubjectRequest,
    responses(
        (status = 200, description = "Subject updated", body = ApiResponse<SubjectResponse>),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn update_subject(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SubjectRequest>,
) -> Result<Json<ApiResponse<SubjectResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    let existing = subject::Entity::find_by_id(subject_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    let mut active: subject::ActiveModel = existing.into();
    active.name = Set(request.name.trim().to_string());
    active.code = Set(request.code);
    active.strand_id = Set(request.strand_id);
    active.semester_id = Set(request.semester_id);
    let updated = active.update(&state.db).await?;

    // Subject names are printed on transcripts
    state.cache.invalidate_all().await;
    Ok(Json(ApiResponse::ok(SubjectResponse::from(updated), "Subject updated successfully")))
}

/// Delete a subject
#[utoipa::path(
    delete,
    path = "/api/v1/admin/subjects/{subject_id}",
    tag = "admin",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 404, description = "Subject not found", body = ErrorResponse),
        (status = 409, description = "Subject has recorded grades", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn delete_subject(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let result = subject::Entity::delete_by_id(subject_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }
    info!("Subject {} deleted", subject_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Create a section
#[utoipa::path(
    post,
    path = "/api/v1/admin/sections",
    tag = "admin",
    request_body = SectionRequest,
    responses(
        (status = 201, description = "Section created", body = ApiResponse<SectionResponse>),
        (status = 400, description = "Teacher or adviser is not a teacher", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn create_section(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SectionResponse>>), ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    ensure_teacher_account(&state.db, request.teacher_id).await?;
    ensure_teacher_account(&state.db, request.adviser_id).await?;

    let created = section::ActiveModel {
        name: Set(request.name.trim().to_string()),
        teacher_id: Set(request.teacher_id),
        adviser_id: Set(request.adviser_id),
        strand_id: Set(request.strand_id),
        year_level_id: Set(request.year_level_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    info!("Section {} created", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SectionResponse::from(created), "Section created successfully")),
    ))
}

/// List sections
#[utoipa::path(
    get,
    path = "/api/v1/admin/sections",
    tag = "admin",
    responses((status = 200, description = "Sections retrieved", body = ApiResponse<Vec<SectionResponse>>))
)]
#[instrument(skip(state, auth))]
pub async fn get_sections(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<SectionResponse>>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let sections = section::Entity::find()
        .order_by_asc(section::Column::Name)
        .all(&state.db)
        .await?;
    let sections = sections.into_iter().map(SectionResponse::from).collect();
    Ok(Json(ApiResponse::ok(sections, "Sections retrieved successfully")))
}

/// Update a section
#[utoipa::path(
    put,
    path = "/api/v1/admin/sections/{section_id}",
    tag = "admin",
    params(("section_id" = i32, Path, description = "Section ID")),
    request_body = SectionRequest,
    responses(
        (status = 200, description = "Section updated", body = ApiResponse<SectionResponse>),
        (status = 404, description = "Section not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn update_section(
    Path(section_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SectionRequest>,
) -> Result<Json<ApiResponse<SectionResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    ensure_teacher_account(&state.db, request.teacher_id).await?;
    ensure_teacher_account(&state.db, request.adviser_id).await?;
    let existing = section::Entity::find_by_id(section_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Section not found".to_string()))?;

    if existing.teacher_id != request.teacher_id {
        debug!(
            "Section {} teacher changes from {:?} to {:?}",
            section_id, existing.teacher_id, request.teacher_id
        );
    }
    let mut active: section::ActiveModel = existing.into();
    active.name = Set(request.name.trim().to_string());
    active.teacher_id = Set(request.teacher_id);
    active.adviser_id = Set(request.adviser_id);
    active.strand_id = Set(request.strand_id);
    active.year_level_id = Set(request.year_level_id);
    let updated = active.update(&state.db).await?;

    state.cache.invalidate_all().await;
    Ok(Json(ApiResponse::ok(SectionResponse::from(updated), "Section updated successfully")))
}

/// Delete a section
#[utoipa::path(
    delete,
    path = "/api/v1/admin/sections/{section_id}",
    tag = "admin",
    params(("section_id" = i32, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 404, description = "Section not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn delete_section(
    Path(section_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let result = section::Entity::delete_by_id(section_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Section not found".to_string()));
    }
    warn!("Section {} deleted; its students are now unassigned", section_id);
    state.cache.invalidate_all().await;
    Ok(StatusCode::NO_CONTENT)
}

/// List the students enrolled in a section
#[utoipa::path(
    get,
    path = "/api/v1/admin/sections/{section_id}/students",
    tag = "admin",
    params(("section_id" = i32, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Students retrieved", body = ApiResponse<Vec<SectionStudent>>),
        (status = 404, description = "Section not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn get_section_students(
    Path(section_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<SectionStudent>>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    if section::Entity::find_by_id(section_id).one(&state.db).await?.is_none() {
        return Err(ApiError::NotFound("Section not found".to_string()));
    }
    let students = students_in_sections(&state.db, vec![section_id])
        .await?
        .into_iter()
        .map(|(_, student)| student)
        .collect();
    Ok(Json(ApiResponse::ok(students, "Students retrieved successfully")))
}

/// Enroll a student in a section, moving them out of any previous one
#[utoipa::path(
    post,
    path = "/api/v1/admin/sections/{section_id}/students",
    tag = "admin",
    params(("section_id" = i32, Path, description = "Section ID")),
    request_body = EnrollRequest,
    responses(
        (status = 200, description = "Student enrolled", body = ApiResponse<SectionResponse>),
        (status = 404, description = "Section or student not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn enroll_student(
    Path(section_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<EnrollRequest>,
) -> Result<Json<ApiResponse<SectionResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    compute::access::find_active_student(&state.db, request.student_id).await?;

    let txn = state.db.begin().await?;
    assign_section(&txn, request.student_id, section_id).await?;
    txn.commit().await?;

    let section = section::Entity::find_by_id(section_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Section not found".to_string()))?;
    state.cache.invalidate(&request.student_id).await;
    info!("Student {} enrolled in section {}", request.student_id, section_id);
    Ok(Json(ApiResponse::ok(SectionResponse::from(section), "Student enrolled successfully")))
}

/// Remove a student from a section
#[utoipa::path(
    delete,
    path = "/api/v1/admin/sections/{section_id}/students/{student_id}",
    tag = "admin",
    params(
        ("section_id" = i32, Path, description = "Section ID"),
        ("student_id" = i32, Path, description = "Student user ID"),
    ),
    responses(
        (status = 204, description = "Student removed"),
        (status = 404, description = "Student is not in this section", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn unenroll_student(
    Path((section_id, student_id)): Path<(i32, i32)>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let result = section_enrollment::Entity::delete_many()
        .filter(section_enrollment::Column::StudentId.eq(student_id))
        .filter(section_enrollment::Column::SectionId.eq(section_id))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Student is not in this section".to_string()));
    }
    state.cache.invalidate(&student_id).await;
    info!("Student {} removed from section {}", student_id, section_id);
    Ok(StatusCode::NO_CONTENT)
}
