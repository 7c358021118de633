use super::{section, user};
use sea_orm::entity::prelude::*;

/// The single authoritative student → section link. Keyed by student, so a
/// student is enrolled in at most one section.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "section_enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i32,
    pub section_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::StudentId",
        to = "user::Column::Id"
    )]
    Student,
    #[sea_orm(
        belongs_to = "section::Entity",
        from = "Column::SectionId",
        to = "section::Column::Id"
    )]
    Section,
}

impl Related<section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Section.def()
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
