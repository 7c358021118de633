//! Database fixtures shared by the compute tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, Utc};
use migration::{Migrator, MigratorTrait};
use model::entities::user::Role;
use model::entities::{
    section, section_enrollment, semester, strand, student_profile, subject, user, year_level,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

use crate::error::Result;

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_id() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Opens an in-memory database with every migration applied.
pub async fn setup_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    db.execute_unprepared("PRAGMA foreign_keys = ON").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn new_user(db: &DatabaseConnection, role: Role) -> Result<user::Model> {
    let now = Utc::now();
    let user = user::ActiveModel {
        username: Set(format!("{}_{}", role, next_id())),
        password_hash: Set("unused".to_string()),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(user)
}

pub async fn new_strand(db: &DatabaseConnection) -> Result<strand::Model> {
    let strand = strand::ActiveModel {
        name: Set(format!("STEM {}", next_id())),
        description: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(strand)
}

pub async fn new_year_level(db: &DatabaseConnection, name: &str) -> Result<year_level::Model> {
    let year_level = year_level::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(year_level)
}

pub async fn new_semester(
    db: &DatabaseConnection,
    name: &str,
    strand_id: i32,
    year_level_id: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<semester::Model> {
    let semester = semester::ActiveModel {
        name: Set(name.to_string()),
        strand_id: Set(strand_id),
        year_level_id: Set(year_level_id),
        start_date: Set(start_date),
        end_date: Set(end_date),
        archived_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(semester)
}

pub async fn new_subject(db: &DatabaseConnection, name: &str) -> Result<subject::Model> {
    let subject = subject::ActiveModel {
        name: Set(name.to_string()),
        code: Set(None),
        strand_id: Set(None),
        semester_id: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(subject)
}

pub async fn new_section(
    db: &DatabaseConnection,
    name: &str,
    teacher_id: Option<i32>,
    adviser_id: Option<i32>,
) -> Result<section::Model> {
    let section = section::ActiveModel {
        name: Set(name.to_string()),
        teacher_id: Set(teacher_id),
        adviser_id: Set(adviser_id),
        strand_id: Set(None),
        year_level_id: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(section)
}

pub async fn enroll(db: &DatabaseConnection, student_id: i32, section_id: i32) -> Result<()> {
    section_enrollment::ActiveModel {
        student_id: Set(student_id),
        section_id: Set(section_id),
    }
    .insert(db)
    .await?;
    Ok(())
}

pub async fn new_profile(
    db: &DatabaseConnection,
    user_id: i32,
    first_name: &str,
    last_name: &str,
) -> Result<student_profile::Model> {
    let profile = student_profile::ActiveModel {
        user_id: Set(user_id),
        first_name: Set(first_name.to_string()),
        middle_name: Set(None),
        last_name: Set(last_name.to_string()),
        lrn: Set(Some("123456789012".to_string())),
        birthdate: Set(NaiveDate::from_ymd_opt(2008, 3, 14)),
        sex: Set(Some("F".to_string())),
        address: Set(None),
        guardian: Set(None),
        school_year: Set(Some("2024-2025".to_string())),
    }
    .insert(db)
    .await?;
    Ok(profile)
}

/// A teacher, a section they teach, and one enrolled student, plus the
/// academic records needed to post grades.
pub struct Classroom {
    pub teacher: user::Model,
    pub student: user::Model,
    pub section: section::Model,
    pub semester: semester::Model,
    pub subject: subject::Model,
}

pub async fn new_classroom(db: &DatabaseConnection) -> Result<Classroom> {
    let teacher = new_user(db, Role::Teacher).await?;
    let student = new_user(db, Role::Student).await?;
    let section = new_section(db, "Rizal", Some(teacher.id), None).await?;
    enroll(db, student.id, section.id).await?;

    let strand = new_strand(db).await?;
    let year_level = new_year_level(db, &format!("Grade 11 ({})", next_id())).await?;
    let semester = new_semester(
        db,
        "First Semester",
        strand.id,
        year_level.id,
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 10, 31).unwrap(),
    )
    .await?;
    let subject = new_subject(db, "General Mathematics").await?;

    Ok(Classroom {
        teacher,
        student,
        section,
        semester,
        subject,
    })
}
