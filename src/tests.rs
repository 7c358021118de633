#[cfg(test)]
mod integration_tests {
    use crate::handlers::grades::GradeSubmissionRequest;
    use crate::schemas::{ApiResponse, ErrorResponse};
    use crate::test_utils::test_utils::{
        init_test_tracing, setup_fixture, setup_test_app, Fixture, TEST_PASSWORD,
    };
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::{TestResponse, TestServer};
    use common::GradeType;
    use model::entities::legacy_grade;
    use sea_orm::{ActiveModelTrait, Set};
    use serde_json::json;

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    fn submission(f: &Fixture, grade_type: GradeType, value: f64) -> GradeSubmissionRequest {
        GradeSubmissionRequest {
            student_id: f.student_id,
            subject_id: f.subject_id,
            grade_type,
            grade_value: value,
            semester_id: f.semester_id,
            expected_version: None,
        }
    }

    async fn post_grade(server: &TestServer, token: &str, request: &GradeSubmissionRequest) -> TestResponse {
        server
            .post("/api/v1/grades")
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(request)
            .await
    }

    fn error_of(response: &TestResponse) -> ErrorResponse {
        let body: ErrorResponse = response.json();
        assert!(!body.success);
        body
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_login_me_logout() {
        let _guard = init_test_tracing();
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "teacher_reyes", "password": TEST_PASSWORD}))
            .await;
        response.assert_status(StatusCode::OK);
        let cookie = response.header(header::SET_COOKIE);
        assert!(cookie.to_str().unwrap().starts_with("jwt="));
        let body: ApiResponse<serde_json::Value> = response.json();
        let token = body.data["token"].as_str().unwrap().to_string();
        assert_eq!(body.data["user"]["role"], "teacher");

        let me = server
            .get("/api/v1/auth/me")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        me.assert_status(StatusCode::OK);
        let me_body: ApiResponse<serde_json::Value> = me.json();
        assert_eq!(me_body.data["username"], "teacher_reyes");
        assert_eq!(me_body.data["section_ids"].as_array().unwrap().len(), 2);

        server
            .post("/api/v1/auth/logout")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await
            .assert_status(StatusCode::OK);

        let after = server
            .get("/api/v1/auth/me")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        after.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(&after).code, "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_session_cookie_is_accepted() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .get("/api/v1/auth/me")
            .add_header(
                header::COOKIE,
                HeaderValue::from_str(&format!("theme=dark; jwt={}", f.student_token)).unwrap(),
            )
            .await;

        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "teacher_reyes", "password": "wrong-password"}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(&response).code, "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_unknown_username_matches_wrong_password() {
        let f = setup_fixture().await;
        let server = f.server();

        let wrong_password = server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "teacher_reyes", "password": "wrong-password"}))
            .await;
        let unknown_user = server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "nobody_here", "password": "wrong-password"}))
            .await;

        unknown_user.assert_status(StatusCode::UNAUTHORIZED);
        let unknown = error_of(&unknown_user);
        let wrong = error_of(&wrong_password);
        assert_eq!(unknown.code, wrong.code);
        assert_eq!(unknown.error, wrong.error);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .get(&format!("/api/v1/grades/student/{}", f.student_id))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(&response).code, "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_student_cannot_submit_grades() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = post_grade(&server, &f.student_token, &submission(&f, GradeType::Midterm, 90.0)).await;

        response.assert_status(StatusCode::FORBIDDEN);
        let error = error_of(&response);
        assert_eq!(error.code, "UNAUTHORIZED_ROLE");
        assert!(error.reason.is_none());
    }

    #[tokio::test]
    async fn test_grade_flow_derives_rating() {
        let _guard = init_test_tracing();
        let f = setup_fixture().await;
        let server = f.server();

        let midterm = post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 80.0)).await;
        midterm.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = midterm.json();
        assert_eq!(body.data["midterm"], 80.0);
        assert!(body.data["finalRating"].is_null());
        assert!(body.data["action"].is_null());

        let finals = post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Finals, 70.0)).await;
        finals.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = finals.json();
        assert_eq!(body.data["finalRating"], 75.0);
        assert_eq!(body.data["action"], "PASSED");
        assert_eq!(body.data["version"], 2);

        let lower = post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Finals, 69.0)).await;
        let body: ApiResponse<serde_json::Value> = lower.json();
        assert_eq!(body.data["finalRating"], 74.5);
        assert_eq!(body.data["action"], "FAILED");

        let ledger = server
            .get(&format!("/api/v1/grades/student/{}", f.student_id))
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;
        ledger.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = ledger.json();
        let semesters = body.data.as_array().unwrap();
        assert_eq!(semesters.len(), 1);
        assert_eq!(semesters[0]["semesterName"], "First Semester");
        assert_eq!(semesters[0]["subjects"][0]["subjectName"], "General Mathematics");
        assert_eq!(semesters[0]["subjects"][0]["finals"], 69.0);
    }

    #[tokio::test]
    async fn test_teacher_grades_route_records_grade() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .post("/api/v1/teacher/grades")
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .json(&json!({
                "studentId": f.student_id,
                "subjectId": f.subject_id,
                "gradeType": "midterm",
                "gradeValue": 88.5,
                "semesterId": f.semester_id,
            }))
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["midterm"], 88.5);
        assert_eq!(body.data["studentId"], f.student_id);
    }

    #[tokio::test]
    async fn test_repeated_score_keeps_version() {
        let f = setup_fixture().await;
        let server = f.server();

        let first = post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 80.0)).await;
        let second = post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 80.0)).await;

        let first: ApiResponse<serde_json::Value> = first.json();
        let second: ApiResponse<serde_json::Value> = second.json();
        assert_eq!(first.data, second.data);
    }

    #[tokio::test]
    async fn test_teacher_without_sections_is_denied() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = post_grade(&server, &f.other_teacher_token, &submission(&f, GradeType::Midterm, 80.0)).await;

        response.assert_status(StatusCode::FORBIDDEN);
        let error = error_of(&response);
        assert_eq!(error.code, "FORBIDDEN_SCOPE");
        assert_eq!(error.reason.as_deref(), Some("not_in_teacher_sections"));
    }

    #[tokio::test]
    async fn test_adviser_alone_has_no_grade_access() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .get(&format!("/api/v1/grades/student/{}", f.outsider_id))
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(error_of(&response).reason.as_deref(), Some("not_in_teacher_sections"));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_rejected() {
        let f = setup_fixture().await;
        let server = f.server();

        for value in [101.0, -1.0] {
            let response = post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, value)).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(error_of(&response).code, "INVALID_ARGUMENT");
        }

        let ledger = server
            .get(&format!("/api/v1/grades/student/{}", f.student_id))
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;
        ledger.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_student_is_not_found() {
        let f = setup_fixture().await;
        let server = f.server();

        let mut request = submission(&f, GradeType::Midterm, 80.0);
        request.student_id = 9999;
        let response = post_grade(&server, &f.teacher_token, &request).await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(error_of(&response).code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let f = setup_fixture().await;
        let server = f.server();

        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 80.0))
            .await
            .assert_status(StatusCode::OK);
        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Finals, 85.0))
            .await
            .assert_status(StatusCode::OK);

        let mut stale = submission(&f, GradeType::Midterm, 95.0);
        stale.expected_version = Some(1);
        let response = post_grade(&server, &f.teacher_token, &stale).await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(error_of(&response).code, "CONFLICT");
    }

    #[tokio::test]
    async fn test_form137_renders_pdf_and_stores_copy() {
        let _guard = init_test_tracing();
        let f = setup_fixture().await;
        let server = f.server();

        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 80.0))
            .await
            .assert_status(StatusCode::OK);

        let response = server
            .get(&format!("/api/v1/grades/form137/{}", f.student_id))
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.header(header::CONTENT_TYPE), "application/pdf");
        let disposition = response.header(header::CONTENT_DISPOSITION);
        assert!(disposition.to_str().unwrap().contains("Form137_Santos_Juan.pdf"));
        assert!(response.as_bytes().starts_with(b"%PDF"));

        let copy = std::path::Path::new(&f.state.config.transcript_dir).join("Form137_Santos_Juan.pdf");
        let stored = std::fs::read(&copy).unwrap();
        assert!(stored.starts_with(b"%PDF"));
        let _ = std::fs::remove_dir_all(&f.state.config.transcript_dir);
    }

    #[tokio::test]
    async fn test_form137_cache_is_invalidated_by_grade_write() {
        let f = setup_fixture().await;
        let server = f.server();

        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 80.0)).await;
        server
            .get(&format!("/api/v1/grades/form137/{}", f.student_id))
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await
            .assert_status(StatusCode::OK);
        assert!(f.state.cache.get(&f.student_id).await.is_some());

        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Finals, 90.0)).await;

        assert!(f.state.cache.get(&f.student_id).await.is_none());
        let _ = std::fs::remove_dir_all(&f.state.config.transcript_dir);
    }

    #[tokio::test]
    async fn test_form137_render_racing_a_grade_write_is_not_cached() {
        let f = setup_fixture().await;
        let server = f.server();
        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 80.0)).await;

        // A render starts, then a grade write lands before it is stored
        let ticket = f.state.cache.ticket(f.student_id).await;
        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Finals, 70.0))
            .await
            .assert_status(StatusCode::OK);
        let stale = std::sync::Arc::new(b"%PDF-stale".to_vec());
        assert!(!f.state.cache.insert(ticket, stale).await);
        assert!(f.state.cache.get(&f.student_id).await.is_none());

        let response = server
            .get(&format!("/api/v1/grades/form137/{}", f.student_id))
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;
        response.assert_status(StatusCode::OK);
        assert_ne!(response.as_bytes().as_ref(), b"%PDF-stale");
        let _ = std::fs::remove_dir_all(&f.state.config.transcript_dir);
    }

    #[tokio::test]
    async fn test_form137_without_grades_is_not_found() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .get(&format!("/api/v1/grades/form137/{}", f.student_id))
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_subject_grades_map() {
        let f = setup_fixture().await;
        let server = f.server();

        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 80.0)).await;
        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Finals, 90.0)).await;

        let response = server
            .get(&format!("/api/v1/teacher/subject-grades/{}", f.subject_id))
            .add_query_param("semesterId", f.semester_id)
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        let scores = &body.data[f.student_id.to_string()];
        assert_eq!(scores["finalRating"], 85.0);
        assert_eq!(scores["action"], "PASSED");
        assert_eq!(body.data.as_object().unwrap().len(), 1);

        let other = server
            .get(&format!("/api/v1/teacher/subject-grades/{}", f.subject_id))
            .add_query_param("semesterId", f.semester_id)
            .add_header(header::AUTHORIZATION, bearer(&f.other_teacher_token))
            .await;
        let body: ApiResponse<serde_json::Value> = other.json();
        assert!(body.data.as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subject_grades_hide_deactivated_students() {
        let f = setup_fixture().await;
        let server = f.server();

        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 80.0)).await;
        server
            .delete(&format!("/api/v1/admin/users/{}", f.student_id))
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .await
            .assert_status(StatusCode::OK);

        let response = server
            .get(&format!("/api/v1/teacher/subject-grades/{}", f.subject_id))
            .add_query_param("semesterId", f.semester_id)
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.data.as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subject_grades_unknown_semester() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .get(&format!("/api/v1/teacher/subject-grades/{}", f.subject_id))
            .add_query_param("semesterId", 9_999)
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(error_of(&response).code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_legacy_grade_update_and_delete() {
        let f = setup_fixture().await;
        let server = f.server();

        let record = legacy_grade::ActiveModel {
            student_id: Set(f.student_id),
            teacher_id: Set(f.teacher_id),
            subject_id: Set(f.subject_id),
            grade: Set(82.0),
            year: Set(2023),
            ..Default::default()
        }
        .insert(&f.state.db)
        .await
        .unwrap();
        let path = format!("/api/v1/grades/{}", record.id);

        let updated = server
            .put(&path)
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .json(&json!({"grade": 91.0}))
            .await;
        updated.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = updated.json();
        assert_eq!(body.data["grade"], 91.0);
        assert_eq!(body.data["year"], 2023);

        server
            .put(&path)
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .json(&json!({"grade": 150.0}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .delete(&path)
            .add_header(header::AUTHORIZATION, bearer(&f.other_teacher_token))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .delete(&path)
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&path)
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_creates_and_lists_students() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .post("/api/v1/admin/users")
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .json(&json!({
                "username": "student_lopez",
                "password": "secret123",
                "role": "student",
                "section_id": f.section_id,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.message, "User created successfully");
        assert_eq!(body.data["section_ids"], json!([f.section_id]));

        let duplicate = server
            .post("/api/v1/admin/users")
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .json(&json!({"username": "student_lopez", "password": "secret123", "role": "student"}))
            .await;
        duplicate.assert_status(StatusCode::CONFLICT);

        let list = server
            .get("/api/v1/admin/users")
            .add_query_param("role", "student")
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .await;
        list.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = list.json();
        assert_eq!(body.data.as_array().unwrap().len(), 3);

        server
            .get("/api/v1/admin/users")
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_only_superadmin_manages_admins() {
        let f = setup_fixture().await;
        let server = f.server();

        let request = json!({"username": "registrar2", "password": "secret123"});
        server
            .post("/api/v1/superadmin/admins")
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .json(&request)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .post("/api/v1/superadmin/admins")
            .add_header(header::AUTHORIZATION, bearer(&f.superadmin_token))
            .json(&request)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["role"], "admin");
    }

    #[tokio::test]
    async fn test_roster_import_reports_skipped_rows() {
        let _guard = init_test_tracing();
        let f = setup_fixture().await;
        let server = f.server();

        let csv = "username,password,first_name,last_name,section\n\
                   student_lim,secret123,Ana,Lim,Rizal\n\
                   student_santos,secret123,Juan,Santos,Rizal\n\
                   student_tan,secret123,Ben,Tan,Bonifacio\n\
                   student_go,secret123,,Go,\n";
        let response = server
            .post("/api/v1/admin/import/students")
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .text(csv)
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["created"], json!(["student_lim"]));
        let skipped = body.data["skipped"].as_array().unwrap();
        assert_eq!(skipped.len(), 3);
        assert_eq!(skipped[0]["row_number"], 2);
        assert_eq!(skipped[0]["reason"]["kind"], "duplicate_username");
        assert_eq!(skipped[1]["row_number"], 3);
        assert_eq!(skipped[1]["reason"]["kind"], "unknown_section");
        assert_eq!(skipped[2]["row_number"], 4);
        assert_eq!(skipped[2]["reason"], json!({"kind": "missing_field", "detail": "first_name"}));

        let section = server
            .get(&format!("/api/v1/admin/sections/{}/students", f.section_id))
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .await;
        let body: ApiResponse<serde_json::Value> = section.json();
        assert_eq!(body.data.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_archived_semesters_leave_active_list() {
        let f = setup_fixture().await;
        let server = f.server();

        let active = server
            .get("/api/v1/semesters")
            .add_header(header::AUTHORIZATION, bearer(&f.student_token))
            .await;
        let body: ApiResponse<serde_json::Value> = active.json();
        assert_eq!(body.data.as_array().unwrap().len(), 1);

        let archived = server
            .post("/api/v1/admin/semesters/archive")
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .json(&json!({"today": "2024-11-01"}))
            .await;
        archived.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = archived.json();
        assert_eq!(body.data[0]["id"], f.semester_id);

        let active = server
            .get("/api/v1/semesters")
            .add_header(header::AUTHORIZATION, bearer(&f.student_token))
            .await;
        let body: ApiResponse<serde_json::Value> = active.json();
        assert!(body.data.as_array().unwrap().is_empty());

        let listed = server
            .get("/api/v1/admin/archived-semesters")
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .await;
        let body: ApiResponse<serde_json::Value> = listed.json();
        assert_eq!(body.data.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_semester_dates_are_validated() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .post("/api/v1/admin/semesters")
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .json(&json!({
                "name": "Second Semester",
                "strand_id": f.strand_id,
                "year_level_id": f.year_level_id,
                "start_date": "2025-03-31",
                "end_date": "2024-11-01",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_teacher_sections_flag_advisory() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .get("/api/v1/teacher/sections")
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        let sections = body.data.as_array().unwrap();
        assert_eq!(sections.len(), 2);
        let mabini = sections.iter().find(|s| s["id"] == f.advisory_section_id).unwrap();
        assert_eq!(mabini["is_advisory"], true);
        assert_eq!(mabini["is_teaching"], false);

        let advisory = server
            .get("/api/v1/teacher/adviser/students")
            .add_header(header::AUTHORIZATION, bearer(&f.teacher_token))
            .await;
        let body: ApiResponse<serde_json::Value> = advisory.json();
        let students = body.data.as_array().unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0]["id"], f.outsider_id);
        assert_eq!(students[0]["is_advisory"], true);
    }

    #[tokio::test]
    async fn test_student_reads_own_records() {
        let f = setup_fixture().await;
        let server = f.server();

        let profile = server
            .get("/api/v1/student/profile")
            .add_header(header::AUTHORIZATION, bearer(&f.student_token))
            .await;
        profile.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = profile.json();
        assert_eq!(body.data["display_name"], "Santos, Juan Dela");

        server
            .get("/api/v1/student/grades")
            .add_header(header::AUTHORIZATION, bearer(&f.student_token))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        post_grade(&server, &f.teacher_token, &submission(&f, GradeType::Midterm, 92.0)).await;

        let grades = server
            .get("/api/v1/student/grades")
            .add_header(header::AUTHORIZATION, bearer(&f.student_token))
            .await;
        grades.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = grades.json();
        assert_eq!(body.data[0]["subjects"][0]["midterm"], 92.0);
    }

    #[tokio::test]
    async fn test_admin_upserts_profile() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .put(&format!("/api/v1/admin/students/{}/profile", f.outsider_id))
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .json(&json!({"first_name": "Maria", "last_name": "Garcia", "sex": "F"}))
            .await;
        response.assert_status(StatusCode::OK);

        let fetched = server
            .get(&format!("/api/v1/admin/students/{}/profile", f.outsider_id))
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .await;
        let body: ApiResponse<serde_json::Value> = fetched.json();
        assert_eq!(body.data["display_name"], "Garcia, Maria");
        assert_eq!(body.data["sex"], "F");
    }

    #[tokio::test]
    async fn test_year_level_rename() {
        let f = setup_fixture().await;
        let server = f.server();

        let response = server
            .put(&format!("/api/v1/admin/year-levels/{}", f.year_level_id))
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .json(&json!({"name": "Grade 11 (SHS)"}))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["name"], "Grade 11 (SHS)");

        let missing = server
            .put("/api/v1/admin/year-levels/9999")
            .add_header(header::AUTHORIZATION, bearer(&f.admin_token))
            .json(&json!({"name": "Grade 13"}))
            .await;
        missing.assert_status(StatusCode::NOT_FOUND);
    }
}
