//! CSV roster import.
//!
//! Every data row either becomes a student account (with profile and, when a
//! known section is named, an enrollment) or is reported back as an
//! [`ImportRowSkipped`]. Nothing is dropped silently.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use chrono::Utc;
use common::{ImportReport, ImportRowSkipped, SkipReason};
use model::entities::user::Role;
use model::entities::{section, section_enrollment, student_profile, user};
use polars::prelude::*;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use crate::credentials::hash_password;
use crate::error::{ComputeError, Result};

/// Columns every row must fill.
pub const REQUIRED_COLUMNS: [&str; 4] = ["username", "password", "first_name", "last_name"];

/// A roster row with all required fields present.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    /// 1-based, header excluded.
    pub row_number: usize,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub lrn: Option<String>,
    pub section: Option<String>,
}

fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    let values = column.as_materialized_series().str()?;
    Ok(values
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
        .collect())
}

/// Parses roster CSV bytes into rows, reporting rows with missing fields.
pub fn parse_roster(bytes: &[u8]) -> Result<Vec<std::result::Result<RosterRow, ImportRowSkipped>>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    debug!("Roster has {} rows and columns {:?}", df.height(), df.get_column_names());

    let mut required: Vec<Vec<Option<String>>> = Vec::with_capacity(REQUIRED_COLUMNS.len());
    for name in REQUIRED_COLUMNS {
        required.push(column_values(&df, name)?);
    }
    let middle_names = column_values(&df, "middle_name")?;
    let lrns = column_values(&df, "lrn")?;
    let sections = column_values(&df, "section")?;

    let rows = (0..df.height())
        .map(|index| -> std::result::Result<RosterRow, ImportRowSkipped> {
            let row_number = index + 1;
            let field = |column: usize| {
                required[column][index]
                    .clone()
                    .ok_or_else(|| ImportRowSkipped {
                        row_number,
                        reason: SkipReason::MissingField(REQUIRED_COLUMNS[column].to_string()),
                    })
            };
            Ok(RosterRow {
                row_number,
                username: field(0)?,
                password: field(1)?,
                first_name: field(2)?,
                last_name: field(3)?,
                middle_name: middle_names[index].clone(),
                lrn: lrns[index].clone(),
                section: sections[index].clone(),
            })
        })
        .collect();
    Ok(rows)
}

/// Imports student accounts from roster CSV bytes.
#[instrument(skip(db, bytes), fields(num_bytes = bytes.len()))]
pub async fn import_roster(db: &DatabaseConnection, bytes: &[u8]) -> Result<ImportReport> {
    let rows = parse_roster(bytes)?;
    info!("Importing roster with {} rows", rows.len());

    let mut section_ids: HashMap<String, i32> = HashMap::new();
    for s in section::Entity::find()
        .order_by_asc(section::Column::Id)
        .all(db)
        .await?
    {
        section_ids.entry(s.name).or_insert(s.id);
    }

    let mut report = ImportReport::default();
    // Usernames created by earlier rows of this file. Skipped rows never
    // claim their username.
    let mut seen: HashSet<String> = HashSet::new();

    for row in rows {
        let row = match row {
            Ok(row) => row,
            Err(skipped) => {
                warn!("Skipping roster row {}: {}", skipped.row_number, skipped.reason);
                report.skipped.push(skipped);
                continue;
            }
        };

        let skip = |reason: SkipReason| ImportRowSkipped {
            row_number: row.row_number,
            reason,
        };

        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(row.username.as_str()))
            .one(db)
            .await?
            .is_some();
        if taken || seen.contains(&row.username) {
            warn!("Skipping roster row {}: duplicate username", row.row_number);
            report
                .skipped
                .push(skip(SkipReason::DuplicateUsername(row.username.clone())));
            continue;
        }

        let section_id = match &row.section {
            Some(name) => match section_ids.get(name) {
                Some(id) => Some(*id),
                None => {
                    warn!("Skipping roster row {}: unknown section {}", row.row_number, name);
                    report
                        .skipped
                        .push(skip(SkipReason::UnknownSection(name.clone())));
                    continue;
                }
            },
            None => None,
        };

        match create_student(db, &row, section_id).await {
            Ok(()) => {
                seen.insert(row.username.clone());
                report.created.push(row.username.clone());
            }
            Err(ComputeError::Conflict(_)) => report
                .skipped
                .push(skip(SkipReason::DuplicateUsername(row.username.clone()))),
            Err(e) => return Err(e),
        }
    }

    info!(
        "Roster import finished: {} created, {} skipped",
        report.created.len(),
        report.skipped.len()
    );
    Ok(report)
}

async fn create_student(
    db: &DatabaseConnection,
    row: &RosterRow,
    section_id: Option<i32>,
) -> Result<()> {
    let password_hash = hash_password(&row.password)?;
    let now = Utc::now();
    let txn = db.begin().await?;

    let inserted = user::ActiveModel {
        username: Set(row.username.clone()),
        password_hash: Set(password_hash),
        role: Set(Role::Student),
        strand_id: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await;
    let student = match inserted {
        Ok(student) => student,
        Err(err) => {
            return match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(ComputeError::Conflict(
                    format!("username {} already exists", row.username),
                )),
                _ => Err(err.into()),
            };
        }
    };

    student_profile::ActiveModel {
        user_id: Set(student.id),
        first_name: Set(row.first_name.clone()),
        middle_name: Set(row.middle_name.clone()),
        last_name: Set(row.last_name.clone()),
        lrn: Set(row.lrn.clone()),
        birthdate: Set(None),
        sex: Set(None),
        address: Set(None),
        guardian: Set(None),
        school_year: Set(None),
    }
    .insert(&txn)
    .await?;

    if let Some(section_id) = section_id {
        section_enrollment::ActiveModel {
            student_id: Set(student.id),
            section_id: Set(section_id),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    debug!("Created student {} from roster row {}", student.id, row.row_number);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_section, setup_db};

    #[test]
    fn test_parse_reports_missing_fields() {
        let csv = "username,password,first_name,last_name\n\
                   jdoe,pw1,John,Doe\n\
                   ,pw2,Ann,Lee\n\
                   msmith,pw3,,Smith\n";
        let rows = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].as_ref().unwrap().username, "jdoe");
        assert_eq!(
            rows[1].as_ref().unwrap_err(),
            &ImportRowSkipped {
                row_number: 2,
                reason: SkipReason::MissingField("username".to_string()),
            }
        );
        assert_eq!(
            rows[2].as_ref().unwrap_err().reason,
            SkipReason::MissingField("first_name".to_string())
        );
    }

    #[test]
    fn test_parse_without_required_column() {
        let csv = "username,first_name,last_name\njdoe,John,Doe\n";
        let rows = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(
            rows[0].as_ref().unwrap_err().reason,
            SkipReason::MissingField("password".to_string())
        );
    }

    #[tokio::test]
    async fn test_import_reports_every_skipped_row() -> Result<()> {
        let db = setup_db().await?;
        let section = new_section(&db, "Rizal", None, None).await?;

        let csv = "username,password,first_name,last_name,middle_name,lrn,section\n\
                   ana,pw,Ana,Reyes,,1001,Rizal\n\
                   ana,pw,Ana,Cruz,,1002,\n\
                   ben,pw,Ben,Tan,,1003,Atlantis\n\
                   carl,,Carl,Lim,,1004,\n\
                   dina,pw,Dina,Go,Mae,,\n";
        let report = import_roster(&db, csv.as_bytes()).await?;

        assert_eq!(report.created, vec!["ana".to_string(), "dina".to_string()]);
        let skipped: Vec<(usize, SkipReason)> = report
            .skipped
            .iter()
            .map(|s| (s.row_number, s.reason.clone()))
            .collect();
        assert_eq!(
            skipped,
            vec![
                (2, SkipReason::DuplicateUsername("ana".to_string())),
                (3, SkipReason::UnknownSection("Atlantis".to_string())),
                (4, SkipReason::MissingField("password".to_string())),
            ]
        );

        let ana = user::Entity::find()
            .filter(user::Column::Username.eq("ana"))
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(ana.role, Role::Student);
        let enrollment = section_enrollment::Entity::find_by_id(ana.id).one(&db).await?;
        assert_eq!(enrollment.map(|e| e.section_id), Some(section.id));

        let dina = user::Entity::find()
            .filter(user::Column::Username.eq("dina"))
            .one(&db)
            .await?
            .unwrap();
        let profile = student_profile::Entity::find_by_id(dina.id).one(&db).await?.unwrap();
        assert_eq!(profile.middle_name.as_deref(), Some("Mae"));
        Ok(())
    }

    #[tokio::test]
    async fn test_corrected_row_after_unknown_section_is_created() -> Result<()> {
        let db = setup_db().await?;

        let csv = "username,password,first_name,last_name,section\n\
                   ana,pw,Ana,Reyes,Atlantis\n\
                   ana,pw,Ana,Reyes,\n";
        let report = import_roster(&db, csv.as_bytes()).await?;

        assert_eq!(report.created, vec!["ana".to_string()]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].row_number, 1);
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::UnknownSection("Atlantis".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_username_is_duplicate() -> Result<()> {
        let db = setup_db().await?;
        let existing = crate::testing::new_user(&db, Role::Teacher).await?;

        let csv = format!(
            "username,password,first_name,last_name\n{},pw,Some,One\n",
            existing.username
        );
        let report = import_roster(&db, csv.as_bytes()).await?;
        assert!(report.created.is_empty());
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::DuplicateUsername(existing.username.clone())
        );
        Ok(())
    }
}
