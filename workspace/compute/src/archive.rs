use chrono::{NaiveDate, Utc};
use model::entities::semester;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Marks every open semester that ended before `today` as archived.
///
/// Returns the semesters that were archived by this call. Grade rows keep
/// pointing at archived semesters; nothing is deleted.
#[instrument(skip(db))]
pub async fn archive_ended_semesters(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<Vec<semester::Model>> {
    let ended = semester::Entity::find()
        .filter(semester::Column::ArchivedAt.is_null())
        .filter(semester::Column::EndDate.lt(today))
        .order_by_asc(semester::Column::EndDate)
        .all(db)
        .await?;

    if ended.is_empty() {
        debug!("No semesters ended before {}", today);
        return Ok(ended);
    }

    let now = Utc::now();
    let ids: Vec<i32> = ended.iter().map(|s| s.id).collect();
    semester::Entity::update_many()
        .col_expr(semester::Column::ArchivedAt, Expr::value(now))
        .filter(semester::Column::Id.is_in(ids))
        .filter(semester::Column::ArchivedAt.is_null())
        .exec(db)
        .await?;

    info!("Archived {} semesters that ended before {}", ended.len(), today);
    Ok(ended
        .into_iter()
        .map(|mut s| {
            s.archived_at = Some(now);
            s
        })
        .collect())
}
