use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // At most one ledger row per (student, semester, subject)
        manager
            .create_index(
                Index::create()
                    .name("idx_grade_entries_student_semester_subject")
                    .table(Alias::new("grade_entries"))
                    .col(Alias::new("student_id"))
                    .col(Alias::new("semester_id"))
                    .col(Alias::new("subject_id"))
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Scope checks look sections up by teacher
        manager
            .create_index(
                Index::create()
                    .name("idx_sections_teacher_id")
                    .table(Alias::new("sections"))
                    .col(Alias::new("teacher_id"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_sections_teacher_id")
                    .table(Alias::new("sections"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_grade_entries_student_semester_subject")
                    .table(Alias::new("grade_entries"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
