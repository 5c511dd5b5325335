//! GET /app/info

use crate::error::AppError;
use crate::service::{AppInfo, InfoService};
use crate::state::AppState;
use axum::{extract::State, Json};

pub async fn app_info(State(state): State<AppState>) -> Result<Json<AppInfo>, AppError> {
    let info = InfoService::collect(&state.pool, &state.model, &state.settings).await?;
    Ok(Json(info))
}
