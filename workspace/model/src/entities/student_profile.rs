use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

/// Extended biographical fields of a student, keyed by the account id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "student_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// Learner reference number.
    pub lrn: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub sex: Option<String>,
    pub address: Option<String>,
    pub guardian: Option<String>,
    pub school_year: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// "Last, First Middle" as printed on school records.
    pub fn display_name(&self) -> String {
        match &self.middle_name {
            Some(middle) if !middle.trim().is_empty() => {
                format!("{}, {} {}", self.last_name, self.first_name, middle)
            }
            _ => format!("{}, {}", self.last_name, self.first_name),
        }
    }
}
