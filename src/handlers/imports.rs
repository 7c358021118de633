use crate::auth::{AuthUser, ADMIN_ROLES};
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{body::Bytes, extract::State, response::Json};
use common::ImportReport;
use compute::roster::import_roster;
use tracing::{info, instrument, warn};

/// Import student accounts from a roster CSV
///
/// The body is the raw CSV. Required columns are `username`, `password`,
/// `first_name` and `last_name`; `middle_name`, `lrn` and `section` are
/// optional. Rows that cannot be imported are reported with their row
/// number instead of failing the whole import.
#[utoipa::path(
    post,
    path = "/api/v1/admin/import/students",
    tag = "admin",
    request_body(content = String, content_type = "text/csv", description = "Roster CSV"),
    responses(
        (status = 200, description = "Import finished", body = ApiResponse<ImportReport>),
        (status = 400, description = "Unreadable CSV or missing required columns", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, body), fields(num_bytes = body.len()))]
pub async fn import_students(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    if body.is_empty() {
        return Err(ApiError::InvalidArgument("Roster CSV is empty".to_string()));
    }

    let report = import_roster(&state.db, &body).await?;
    for skipped in &report.skipped {
        warn!("Roster row {} skipped: {}", skipped.row_number, skipped.reason);
    }
    info!(
        "Roster import created {} students, skipped {} rows",
        report.created.len(),
        report.skipped.len()
    );
    Ok(Json(ApiResponse::ok(report, "Roster imported")))
}
