//! `/api/analytics`

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::extract::CurrentUser;
use crate::api::AppState;
use crate::error::AppResult;
use crate::workflow::report_flow::PerformanceReport;

pub fn router() -> Router<AppState> {
    Router::new().route("/performance", get(performance))
}

async fn performance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<PerformanceReport>> {
    Ok(Json(state.reports.performance(&user).await?))
}
