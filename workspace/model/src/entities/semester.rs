use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "semesters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub strand_id: i32,
    pub year_level_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Set once the semester has ended and been archived. Archived
    /// semesters stay referenced by grade entries.
    pub archived_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::strand::Entity",
        from = "Column::StrandId",
        to = "super::strand::Column::Id"
    )]
    Strand,
    #[sea_orm(
        belongs_to = "super::year_level::Entity",
        from = "Column::YearLevelId",
        to = "super::year_level::Column::Id"
    )]
    YearLevel,
    #[sea_orm(has_many = "super::grade_entry::Entity")]
    GradeEntry,
}

impl Related<super::strand::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Strand.def()
    }
}

impl Related<super::year_level::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::YearLevel.def()
    }
}

impl Related<super::grade_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GradeEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}
