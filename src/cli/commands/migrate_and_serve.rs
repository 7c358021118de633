use anyhow::Result;
use tracing::{debug, info, trace};

use super::initdb::{connect, run_migrations};
use super::serve::serve;
use crate::config::AppConfig;

pub async fn migrate_and_serve(config: AppConfig) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", config.database_url);
    config.ensure_secure_secret()?;

    let db = connect(&config.database_url).await?;
    run_migrations(&db).await?;
    db.close().await?;

    serve(config).await
}
