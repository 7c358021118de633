//! Root of the SeaORM entity modules for the school records store.

pub mod grade_entry;
pub mod legacy_grade;
pub mod section;
pub mod section_enrollment;
pub mod semester;
pub mod strand;
pub mod student_profile;
pub mod subject;
pub mod user;
pub mod user_subject;
pub mod year_level;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::grade_entry::Entity as GradeEntry;
    pub use super::legacy_grade::Entity as LegacyGrade;
    pub use super::section::Entity as Section;
    pub use super::section_enrollment::Entity as SectionEnrollment;
    pub use super::semester::Entity as Semester;
    pub use super::strand::Entity as Strand;
    pub use super::student_profile::Entity as StudentProfile;
    pub use super::subject::Entity as Subject;
    pub use super::user::Entity as User;
    pub use super::user_subject::Entity as UserSubject;
    pub use super::year_level::Entity as YearLevel;
}

#[cfg(test)]
mod test {
    use chrono::{NaiveDate, Utc};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn create_user(
        db: &DatabaseConnection,
        username: &str,
        role: user::Role,
    ) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set("not-a-real-hash".to_string()),
            role: Set(role),
            strand_id: Set(None),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let teacher = create_user(&db, "teacher001", user::Role::Teacher).await?;
        let student = create_user(&db, "student001", user::Role::Student).await?;

        let strand = strand::ActiveModel {
            name: Set("STEM".to_string()),
            description: Set(Some("Science, Technology, Engineering and Mathematics".to_string())),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let grade11 = year_level::ActiveModel {
            name: Set("Grade 11".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let section = section::ActiveModel {
            name: Set("Einstein".to_string()),
            teacher_id: Set(Some(teacher.id)),
            adviser_id: Set(Some(teacher.id)),
            strand_id: Set(Some(strand.id)),
            year_level_id: Set(Some(grade11.id)),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        section_enrollment::ActiveModel {
            student_id: Set(student.id),
            section_id: Set(section.id),
        }
        .insert(&db)
        .await?;

        let semester = semester::ActiveModel {
            name: Set("First Semester".to_string()),
            strand_id: Set(strand.id),
            year_level_id: Set(grade11.id),
            start_date: Set(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()),
            end_date: Set(NaiveDate::from_ymd_opt(2024, 10, 25).unwrap()),
            archived_at: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let subject = subject::ActiveModel {
            name: Set("General Mathematics".to_string()),
            code: Set(Some("GENMATH".to_string())),
            strand_id: Set(Some(strand.id)),
            semester_id: Set(Some(semester.id)),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        grade_entry::ActiveModel {
            student_id: Set(student.id),
            semester_id: Set(semester.id),
            subject_id: Set(subject.id),
            midterm: Set(Some(80.0)),
            finals: Set(None),
            version: Set(1),
            updated_by: Set(Some(teacher.id)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Section students are derived from the enrollment table.
        let enrolled = section
            .find_related(SectionEnrollment)
            .all(&db)
            .await?;
        assert_eq!(enrolled.len(), 1);
        assert_eq!(enrolled[0].student_id, student.id);

        let entries = semester.find_related(GradeEntry).all(&db).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].midterm, Some(80.0));
        assert_eq!(entries[0].finals, None);

        let students = User::find()
            .filter(user::Column::Role.eq(user::Role::Student))
            .all(&db)
            .await?;
        assert_eq!(students.len(), 1);
        assert!(students[0].is_active_student());

        Ok(())
    }

    #[tokio::test]
    async fn test_grade_entry_key_is_unique() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let student = create_user(&db, "student002", user::Role::Student).await?;

        let strand = strand::ActiveModel {
            name: Set("ABM".to_string()),
            description: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        let level = year_level::ActiveModel {
            name: Set("Grade 12".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        let semester = semester::ActiveModel {
            name: Set("Second Semester".to_string()),
            strand_id: Set(strand.id),
            year_level_id: Set(level.id),
            start_date: Set(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()),
            end_date: Set(NaiveDate::from_ymd_opt(2025, 5, 30).unwrap()),
            archived_at: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        let subject = subject::ActiveModel {
            name: Set("Business Ethics".to_string()),
            code: Set(None),
            strand_id: Set(Some(strand.id)),
            semester_id: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let row = || grade_entry::ActiveModel {
            student_id: Set(student.id),
            semester_id: Set(semester.id),
            subject_id: Set(subject.id),
            midterm: Set(None),
            finals: Set(Some(90.0)),
            version: Set(1),
            updated_by: Set(None),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        row().insert(&db).await?;
        assert!(row().insert(&db).await.is_err());
        Ok(())
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Teacher".parse::<user::Role>(), Ok(user::Role::Teacher));
        assert_eq!(" superadmin ".parse::<user::Role>(), Ok(user::Role::Superadmin));
        assert!("principal".parse::<user::Role>().is_err());
        assert!(user::Role::Admin.is_administrative());
        assert!(!user::Role::Teacher.is_administrative());
    }

    #[test]
    fn test_profile_display_name() {
        let profile = student_profile::Model {
            user_id: 1,
            first_name: "Juan".to_string(),
            middle_name: Some("Santos".to_string()),
            last_name: "Dela Cruz".to_string(),
            lrn: None,
            birthdate: None,
            sex: None,
            address: None,
            guardian: None,
            school_year: None,
        };
        assert_eq!(profile.display_name(), "Dela Cruz, Juan Santos");
    }
}
