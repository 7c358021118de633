use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, trace, warn};

use super::initdb::connect;

pub async fn import_roster(database_url: &str, csv_path: &Path) -> Result<()> {
    trace!("Entering import_roster function");
    info!("Importing roster from {}", csv_path.display());

    let bytes = tokio::fs::read(csv_path)
        .await
        .with_context(|| format!("Failed to read roster file {}", csv_path.display()))?;
    debug!("Read {} bytes", bytes.len());

    let db = connect(database_url).await?;
    let report = compute::roster::import_roster(&db, &bytes).await?;

    for name in &report.created {
        debug!("Created student '{}'", name);
    }
    for skipped in &report.skipped {
        warn!("Row {} skipped: {}", skipped.row_number, skipped.reason);
    }
    info!(
        "Roster import finished: {} created, {} skipped",
        report.created.len(),
        report.skipped.len()
    );
    Ok(())
}
