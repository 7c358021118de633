use anyhow::{bail, Result};
use chrono::Utc;
use compute::credentials::hash_password;
use model::entities::user::{self, Role};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{debug, info, trace, warn};

use super::initdb::connect;

pub async fn create_superadmin(database_url: &str, username: &str, password: &str) -> Result<()> {
    trace!("Entering create_superadmin function");
    let username = username.trim();
    if username.is_empty() || password.len() < 6 {
        bail!("Username must not be empty and the password needs at least 6 characters");
    }

    let db = connect(database_url).await?;
    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(&db)
        .await?;
    if taken.is_some() {
        warn!("Username '{}' already exists", username);
        bail!("Username '{}' already exists", username);
    }

    debug!("Hashing superadmin password");
    let password_hash = hash_password(password)?;
    let now = Utc::now();
    let created = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        role: Set(Role::Superadmin),
        strand_id: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    info!("Superadmin '{}' created with id {}", created.username, created.id);
    Ok(())
}
