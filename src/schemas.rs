use compute::TranscriptRenderer;
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::cache::TranscriptCache;
use crate::config::AppConfig;

pub use common::ApiResponse;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Rendered Form 137 documents keyed by student id
    pub cache: TranscriptCache,
    /// Tokens invalidated by logout
    pub revoked_tokens: Cache<String, ()>,
    pub renderer: Arc<dyn TranscriptRenderer>,
    pub config: Arc<AppConfig>,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Denial reason for scope failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::superadmin::create_admin,
        crate::handlers::superadmin::get_admins,
        crate::handlers::superadmin::update_admin,
        crate::handlers::superadmin::deactivate_admin,
        crate::handlers::users::create_user,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::deactivate_user,
        crate::handlers::users::set_user_subjects,
        crate::handlers::academics::create_strand,
        crate::handlers::academics::get_strands,
        crate::handlers::academics::update_strand,
        crate::handlers::academics::delete_strand,
        crate::handlers::academics::create_year_level,
        crate::handlers::academics::get_year_levels,
        crate::handlers::academics::update_year_level,
        crate::handlers::academics::delete_year_level,
        crate::handlers::academics::create_subject,
        crate::handlers::academics::get_subjects,
        crate::handlers::academics::update_subject,
        crate::handlers::academics::delete_subject,
        crate::handlers::academics::create_section,
        crate::handlers::academics::get_sections,
        crate::handlers::academics::update_section,
        crate::handlers::academics::delete_section,
        crate::handlers::academics::get_section_students,
        crate::handlers::academics::enroll_student,
        crate::handlers::academics::unenroll_student,
        crate::handlers::semesters::get_active_semesters,
        crate::handlers::semesters::create_semester,
        crate::handlers::semesters::update_semester,
        crate::handlers::semesters::delete_semester,
        crate::handlers::semesters::archive_semesters,
        crate::handlers::semesters::get_archived_semesters,
        crate::handlers::students::get_student_profile,
        crate::handlers::students::upsert_student_profile,
        crate::handlers::students::get_own_profile,
        crate::handlers::students::get_own_grades,
        crate::handlers::teacher::get_teacher_sections,
        crate::handlers::teacher::get_advisory_students,
        crate::handlers::teacher::get_subject_students,
        crate::handlers::teacher::update_teacher_profile,
        crate::handlers::teacher::get_subject_grades,
        crate::handlers::grades::get_student_grades,
        crate::handlers::grades::submit_grade,
        crate::handlers::grades::submit_teacher_grade,
        crate::handlers::grades::update_legacy_grade,
        crate::handlers::grades::delete_legacy_grade,
        crate::handlers::grades::generate_form137,
        crate::handlers::imports::import_students,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            common::GradeType,
            common::GradeAction,
            common::SubjectScores,
            common::GradeEntryDto,
            common::LedgerSubject,
            common::LedgerSemester,
            common::ImportReport,
            common::ImportRowSkipped,
            common::SkipReason,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::users::UserResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::SetSubjectsRequest,
            crate::handlers::superadmin::CreateAdminRequest,
            crate::handlers::superadmin::UpdateAdminRequest,
            crate::handlers::academics::StrandRequest,
            crate::handlers::academics::StrandResponse,
            crate::handlers::academics::YearLevelRequest,
            crate::handlers::academics::YearLevelResponse,
            crate::handlers::academics::SubjectRequest,
            crate::handlers::academics::SubjectResponse,
            crate::handlers::academics::SectionRequest,
            crate::handlers::academics::SectionResponse,
            crate::handlers::academics::EnrollRequest,
            crate::handlers::academics::SectionStudent,
            crate::handlers::semesters::SemesterRequest,
            crate::handlers::semesters::SemesterResponse,
            crate::handlers::semesters::ArchiveRequest,
            crate::handlers::students::ProfileRequest,
            crate::handlers::students::ProfileResponse,
            crate::handlers::teacher::TeacherSection,
            crate::handlers::teacher::TeacherStudent,
            crate::handlers::teacher::TeacherProfileRequest,
            crate::handlers::grades::GradeSubmissionRequest,
            crate::handlers::grades::LegacyGradeRequest,
            crate::handlers::grades::LegacyGradeResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Session endpoints"),
        (name = "superadmin", description = "Administrator account management"),
        (name = "admin", description = "Accounts and academic structure"),
        (name = "semesters", description = "Semester management and archiving"),
        (name = "students", description = "Student profiles and own records"),
        (name = "teacher", description = "Teacher views"),
        (name = "grades", description = "Grade ledger and Form 137"),
    ),
    info(
        title = "Registrar API",
        description = "School records API: accounts, academic structure, grade ledger and Form 137 transcripts",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
