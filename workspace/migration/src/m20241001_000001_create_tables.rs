use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create strands table
        manager
            .create_table(
                Table::create()
                    .table(Strands::Table)
                    .if_not_exists()
                    .col(pk_auto(Strands::Id))
                    .col(string(Strands::Name).unique_key())
                    .col(string_null(Strands::Description))
                    .to_owned(),
            )
            .await?;

        // Create year_levels table
        manager
            .create_table(
                Table::create()
                    .table(YearLevels::Table)
                    .if_not_exists()
                    .col(pk_auto(YearLevels::Id))
                    .col(string(YearLevels::Name).unique_key())
                    .to_owned(),
            )
            .await?;

        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string_len(Users::Role, 16))
                    .col(integer_null(Users::StrandId))
                    .col(boolean(Users::IsActive).default(true))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .col(timestamp_with_time_zone(Users::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_strand")
                            .from(Users::Table, Users::StrandId)
                            .to(Strands::Table, Strands::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create semesters table
        manager
            .create_table(
                Table::create()
                    .table(Semesters::Table)
                    .if_not_exists()
                    .col(pk_auto(Semesters::Id))
                    .col(string(Semesters::Name))
                    .col(integer(Semesters::StrandId))
                    .col(integer(Semesters::YearLevelId))
                    .col(date(Semesters::StartDate))
                    .col(date(Semesters::EndDate))
                    .col(timestamp_with_time_zone_null(Semesters::ArchivedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_semester_strand")
                            .from(Semesters::Table, Semesters::StrandId)
                            .to(Strands::Table, Strands::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_semester_year_level")
                            .from(Semesters::Table, Semesters::YearLevelId)
                            .to(YearLevels::Table, YearLevels::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create subjects table
        manager
            .create_table(
                Table::create()
                    .table(Subjects::Table)
                    .if_not_exists()
                    .col(pk_auto(Subjects::Id))
                    .col(string(Subjects::Name))
                    .col(string_null(Subjects::Code))
                    .col(integer_null(Subjects::StrandId))
                    .col(integer_null(Subjects::SemesterId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_strand")
                            .from(Subjects::Table, Subjects::StrandId)
                            .to(Strands::Table, Strands::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_semester")
                            .from(Subjects::Table, Subjects::SemesterId)
                            .to(Semesters::Table, Semesters::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create user_subjects table (join table)
        manager
            .create_table(
                Table::create()
                    .table(UserSubjects::Table)
                    .if_not_exists()
                    .col(integer(UserSubjects::UserId))
                    .col(integer(UserSubjects::SubjectId))
                    .primary_key(
                        Index::create()
                            .name("pk_user_subjects")
                            .col(UserSubjects::UserId)
                            .col(UserSubjects::SubjectId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_subjects_user")
                            .from(UserSubjects::Table, UserSubjects::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_subjects_subject")
                            .from(UserSubjects::Table, UserSubjects::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create sections table
        manager
            .create_table(
                Table::create()
                    .table(Sections::Table)
                    .if_not_exists()
                    .col(pk_auto(Sections::Id))
                    .col(string(Sections::Name))
                    .col(integer_null(Sections::TeacherId))
                    .col(integer_null(Sections::AdviserId))
                    .col(integer_null(Sections::StrandId))
                    .col(integer_null(Sections::YearLevelId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_teacher")
                            .from(Sections::Table, Sections::TeacherId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_adviser")
                            .from(Sections::Table, Sections::AdviserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_strand")
                            .from(Sections::Table, Sections::StrandId)
                            .to(Strands::Table, Strands::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_year_level")
                            .from(Sections::Table, Sections::YearLevelId)
                            .to(YearLevels::Table, YearLevels::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create section_enrollments table; one row per student
        manager
            .create_table(
                Table::create()
                    .table(SectionEnrollments::Table)
                    .if_not_exists()
                    .col(integer(SectionEnrollments::StudentId).primary_key())
                    .col(integer(SectionEnrollments::SectionId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_enrollments_student")
                            .from(SectionEnrollments::Table, SectionEnrollments::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_enrollments_section")
                            .from(SectionEnrollments::Table, SectionEnrollments::SectionId)
                            .to(Sections::Table, Sections::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create student_profiles table
        manager
            .create_table(
                Table::create()
                    .table(StudentProfiles::Table)
                    .if_not_exists()
                    .col(integer(StudentProfiles::UserId).primary_key())
                    .col(string(StudentProfiles::FirstName))
                    .col(string_null(StudentProfiles::MiddleName))
                    .col(string(StudentProfiles::LastName))
                    .col(string_null(StudentProfiles::Lrn))
                    .col(date_null(StudentProfiles::Birthdate))
                    .col(string_null(StudentProfiles::Sex))
                    .col(string_null(StudentProfiles::Address))
                    .col(string_null(StudentProfiles::Guardian))
                    .col(string_null(StudentProfiles::SchoolYear))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_profile_user")
                            .from(StudentProfiles::Table, StudentProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create grade_entries table
        manager
            .create_table(
                Table::create()
                    .table(GradeEntries::Table)
                    .if_not_exists()
                    .col(pk_auto(GradeEntries::Id))
                    .col(integer(GradeEntries::StudentId))
                    .col(integer(GradeEntries::SemesterId))
                    .col(integer(GradeEntries::SubjectId))
                    .col(double_null(GradeEntries::Midterm))
                    .col(double_null(GradeEntries::Finals))
                    .col(integer(GradeEntries::Version).default(1))
                    .col(integer_null(GradeEntries::UpdatedBy))
                    .col(timestamp_with_time_zone(GradeEntries::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grade_entry_student")
                            .from(GradeEntries::Table, GradeEntries::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grade_entry_semester")
                            .from(GradeEntries::Table, GradeEntries::SemesterId)
                            .to(Semesters::Table, Semesters::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grade_entry_subject")
                            .from(GradeEntries::Table, GradeEntries::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create legacy_grades table
        manager
            .create_table(
                Table::create()
                    .table(LegacyGrades::Table)
                    .if_not_exists()
                    .col(pk_auto(LegacyGrades::Id))
                    .col(integer(LegacyGrades::StudentId))
                    .col(integer(LegacyGrades::TeacherId))
                    .col(integer(LegacyGrades::SubjectId))
                    .col(double(LegacyGrades::Grade))
                    .col(integer(LegacyGrades::Year))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_legacy_grade_student")
                            .from(LegacyGrades::Table, LegacyGrades::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_legacy_grade_subject")
                            .from(LegacyGrades::Table, LegacyGrades::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(LegacyGrades::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(GradeEntries::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(StudentProfiles::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SectionEnrollments::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Sections::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(UserSubjects::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Subjects::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Semesters::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(YearLevels::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Strands::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Strands {
    Table,
    Id,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum YearLevels {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Role,
    StrandId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Semesters {
    Table,
    Id,
    Name,
    StrandId,
    YearLevelId,
    StartDate,
    EndDate,
    ArchivedAt,
}

#[derive(DeriveIden)]
enum Subjects {
    Table,
    Id,
    Name,
    Code,
    StrandId,
    SemesterId,
}

#[derive(DeriveIden)]
enum UserSubjects {
    Table,
    UserId,
    SubjectId,
}

#[derive(DeriveIden)]
enum Sections {
    Table,
    Id,
    Name,
    TeacherId,
    AdviserId,
    StrandId,
    YearLevelId,
}

#[derive(DeriveIden)]
enum SectionEnrollments {
    Table,
    StudentId,
    SectionId,
}

#[derive(DeriveIden)]
enum StudentProfiles {
    Table,
    UserId,
    FirstName,
    MiddleName,
    LastName,
    Lrn,
    Birthdate,
    Sex,
    Address,
    Guardian,
    SchoolYear,
}

#[derive(DeriveIden)]
enum GradeEntries {
    Table,
    Id,
    StudentId,
    SemesterId,
    SubjectId,
    Midterm,
    Finals,
    Version,
    UpdatedBy,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LegacyGrades {
    Table,
    Id,
    StudentId,
    TeacherId,
    SubjectId,
    Grade,
    Year,
}
