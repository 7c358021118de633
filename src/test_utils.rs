#[cfg(test)]
pub mod test_utils {
    use crate::auth::issue_token;
    use crate::config::{build_app_state, AppConfig};
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::Router;
    use axum_test::TestServer;
    use chrono::{NaiveDate, Utc};
    use compute::credentials::hash_password;
    use migration::{Migrator, MigratorTrait};
    use model::entities::user::{self, Role};
    use model::entities::{
        section, section_enrollment, semester, strand, student_profile, subject, year_level,
    };
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    pub const TEST_PASSWORD: &str = "password123";

    static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Configuration pointing transcript copies at a fresh temp directory
    pub fn test_config() -> AppConfig {
        let dir = std::env::temp_dir().join(format!(
            "registrar-test-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::SeqCst)
        ));
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            transcript_dir: dir.to_string_lossy().into_owned(),
            school_name: "Test Senior High School".to_string(),
            ..AppConfig::default()
        }
    }

    /// Ids and session tokens of the seeded accounts.
    ///
    /// `teacher` teaches section Rizal where `student` is enrolled and also
    /// advises section Mabini. `other_teacher` has no sections. `outsider`
    /// is a student enrolled in Mabini, which nobody teaches.
    pub struct Fixture {
        pub state: AppState,
        pub superadmin_token: String,
        pub admin_token: String,
        pub teacher_id: i32,
        pub teacher_token: String,
        pub other_teacher_token: String,
        pub student_id: i32,
        pub student_token: String,
        pub outsider_id: i32,
        pub section_id: i32,
        pub advisory_section_id: i32,
        pub strand_id: i32,
        pub year_level_id: i32,
        pub semester_id: i32,
        pub subject_id: i32,
    }

    impl Fixture {
        pub fn server(&self) -> TestServer {
            TestServer::new(create_router(self.state.clone())).unwrap()
        }
    }

    async fn insert_user(db: &DatabaseConnection, username: &str, role: Role, password_hash: &str) -> user::Model {
        let now = Utc::now();
        user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            role: Set(role),
            strand_id: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test user")
    }

    async fn insert_section(db: &DatabaseConnection, name: &str, teacher_id: Option<i32>, adviser_id: Option<i32>) -> section::Model {
        section::ActiveModel {
            name: Set(name.to_string()),
            teacher_id: Set(teacher_id),
            adviser_id: Set(adviser_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test section")
    }

    async fn enroll(db: &DatabaseConnection, student_id: i32, section_id: i32) {
        section_enrollment::ActiveModel {
            student_id: Set(student_id),
            section_id: Set(section_id),
        }
        .insert(db)
        .await
        .expect("Failed to enroll test student");
    }

    /// Seeds accounts and academic structure and mints a token per account
    pub async fn setup_fixture() -> Fixture {
        let db = setup_test_db().await;
        let password_hash = hash_password(TEST_PASSWORD).expect("Failed to hash test password");

        let superadmin = insert_user(&db, "root", Role::Superadmin, &password_hash).await;
        let admin = insert_user(&db, "registrar", Role::Admin, &password_hash).await;
        let teacher = insert_user(&db, "teacher_reyes", Role::Teacher, &password_hash).await;
        let other_teacher = insert_user(&db, "teacher_cruz", Role::Teacher, &password_hash).await;
        let student = insert_user(&db, "student_santos", Role::Student, &password_hash).await;
        let outsider = insert_user(&db, "student_garcia", Role::Student, &password_hash).await;

        let section = insert_section(&db, "Rizal", Some(teacher.id), None).await;
        let advisory = insert_section(&db, "Mabini", None, Some(teacher.id)).await;
        enroll(&db, student.id, section.id).await;
        enroll(&db, outsider.id, advisory.id).await;

        student_profile::ActiveModel {
            user_id: Set(student.id),
            first_name: Set("Juan".to_string()),
            middle_name: Set(Some("Dela".to_string())),
            last_name: Set("Santos".to_string()),
            lrn: Set(Some("123456789012".to_string())),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to create test profile");

        let strand = strand::ActiveModel {
            name: Set("STEM".to_string()),
            description: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to create test strand");
        let year_level = year_level::ActiveModel {
            name: Set("Grade 11".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to create test year level");
        let semester = semester::ActiveModel {
            name: Set("First Semester".to_string()),
            strand_id: Set(strand.id),
            year_level_id: Set(year_level.id),
            start_date: Set(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            end_date: Set(NaiveDate::from_ymd_opt(2024, 10, 31).unwrap()),
            archived_at: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to create test semester");
        let subject = subject::ActiveModel {
            name: Set("General Mathematics".to_string()),
            code: Set(Some("GM11".to_string())),
            strand_id: Set(Some(strand.id)),
            semester_id: Set(Some(semester.id)),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to create test subject");

        let state = build_app_state(db, test_config());
        let token = |account: &user::Model| issue_token(account, &state.config).unwrap();

        Fixture {
            superadmin_token: token(&superadmin),
            admin_token: token(&admin),
            teacher_id: teacher.id,
            teacher_token: token(&teacher),
            other_teacher_token: token(&other_teacher),
            student_id: student.id,
            student_token: token(&student),
            outsider_id: outsider.id,
            section_id: section.id,
            advisory_section_id: advisory.id,
            strand_id: strand.id,
            year_level_id: year_level.id,
            semester_id: semester.id,
            subject_id: subject.id,
            state,
        }
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        build_app_state(setup_test_db().await, test_config())
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is determined by the RUST_LOG environment variable,
    /// defaulting to WARN if not set.
    pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        let state = setup_test_app_state().await;
        create_router(state)
    }
}
