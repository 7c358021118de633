use sea_orm::entity::prelude::*;

/// A class section. Enrolled students are derived from
/// `section_enrollment`; the section itself never stores a student list.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Teacher whose grade access is scoped to this section.
    pub teacher_id: Option<i32>,
    /// Adviser of the section; may differ from the teacher.
    pub adviser_id: Option<i32>,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id"
    )]
    Teacher,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AdviserId",
        to = "super::user::Column::Id"
    )]
    Adviser,
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
    #[sea_orm(has_many = "super::section_enrollment::Entity")]
    SectionEnrollment,
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

impl Related<super::section_enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SectionEnrollment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
