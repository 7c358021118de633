use crate::handlers::{
    academics::{
        create_section, create_strand, create_subject, create_year_level, delete_section,
        delete_strand, delete_subject, delete_year_level, enroll_student, get_section_students,
        get_sections, get_strands, get_subjects, get_year_levels, unenroll_student,
        update_section, update_strand, update_subject, update_year_level,
    },
    auth::{login, logout, me},
    grades::{
        delete_legacy_grade, generate_form137, get_student_grades, submit_grade,
        submit_teacher_grade, update_legacy_grade,
    },
    health::health_check,
    imports::import_students,
    semesters::{
        archive_semesters, create_semester, delete_semester, get_active_semesters,
        get_archived_semesters, update_semester,
    },
    students::{get_own_grades, get_own_profile, get_student_profile, upsert_student_profile},
    superadmin::{create_admin, deactivate_admin, get_admins, update_admin},
    teacher::{
        get_advisory_students, get_subject_grades, get_subject_students, get_teacher_sections,
        update_teacher_profile,
    },
    users::{create_user, deactivate_user, get_user, get_users, set_user_subjects, update_user},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Session
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/me", get(me))
        // Admin account management
        .route("/api/v1/superadmin/admins", post(create_admin).get(get_admins))
        .route(
            "/api/v1/superadmin/admins/:admin_id",
            put(update_admin).delete(deactivate_admin),
        )
        .route("/api/v1/admin/users", post(create_user).get(get_users))
        .route(
            "/api/v1/admin/users/:user_id",
            get(get_user).put(update_user).delete(deactivate_user),
        )
        .route("/api/v1/admin/users/:user_id/subjects", put(set_user_subjects))
        // Academic structure
        .route("/api/v1/admin/strands", post(create_strand).get(get_strands))
        .route(
            "/api/v1/admin/strands/:strand_id",
            put(update_strand).delete(delete_strand),
        )
        .route("/api/v1/admin/year-levels", post(create_year_level).get(get_year_levels))
        .route(
            "/api/v1/admin/year-levels/:year_level_id",
            put(update_year_level).delete(delete_year_level),
        )
        .route("/api/v1/admin/subjects", post(create_subject).get(get_subjects))
        .route(
            "/api/v1/admin/subjects/:subject_id",
            put(update_subject).delete(delete_subject),
        )
        .route("/api/v1/admin/sections", post(create_section).get(get_sections))
        .route(
            "/api/v1/admin/sections/:section_id",
            put(update_section).delete(delete_section),
        )
        .route(
            "/api/v1/admin/sections/:section_id/students",
            get(get_section_students).post(enroll_student),
        )
        .route(
            "/api/v1/admin/sections/:section_id/students/:student_id",
            delete(unenroll_student),
        )
        .route(
            "/api/v1/admin/students/:student_id/profile",
            get(get_student_profile).put(upsert_student_profile),
        )
        .route("/api/v1/admin/import/students", post(import_students))
        // Semesters
        .route("/api/v1/semesters", get(get_active_semesters))
        .route("/api/v1/admin/semesters", post(create_semester))
        .route(
            "/api/v1/admin/semesters/:semester_id",
            put(update_semester).delete(delete_semester),
        )
        .route("/api/v1/admin/semesters/archive", post(archive_semesters))
        .route("/api/v1/admin/archived-semesters", get(get_archived_semesters))
        // Grade ledger
        .route("/api/v1/grades", post(submit_grade))
        .route("/api/v1/grades/student/:student_id", get(get_student_grades))
        .route("/api/v1/grades/form137/:student_id", get(generate_form137))
        .route(
            "/api/v1/grades/:grade_id",
            put(update_legacy_grade).delete(delete_legacy_grade),
        )
        // Teacher views
        .route("/api/v1/teacher/grades", post(submit_teacher_grade))
        .route("/api/v1/teacher/sections", get(get_teacher_sections))
        .route("/api/v1/teacher/adviser/students", get(get_advisory_students))
        .route("/api/v1/teacher/subject-students", get(get_subject_students))
        .route("/api/v1/teacher/profile", put(update_teacher_profile))
        .route("/api/v1/teacher/subject-grades/:subject_id", get(get_subject_grades))
        // Student views
        .route("/api/v1/student/profile", get(get_own_profile))
        .route("/api/v1/student/grades", get(get_own_grades))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
