use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::{info, trace};

use super::initdb::connect;

pub async fn archive_semesters(database_url: &str, today: Option<NaiveDate>) -> Result<()> {
    trace!("Entering archive_semesters function");
    let today = today.unwrap_or_else(|| Utc::now().date_naive());

    let db = connect(database_url).await?;
    let archived = compute::archive::archive_ended_semesters(&db, today).await?;
    for semester in &archived {
        info!("Archived semester {} ({}), ended {}", semester.id, semester.name, semester.end_date);
    }
    info!("{} semesters archived", archived.len());
    Ok(())
}
