//! `/api/users`

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{PeriodQuery, ProfileResponse};
use crate::api::extract::{CurrentUser, ValidQuery};
use crate::api::AppState;
use crate::error::AppResult;
use crate::workflow::report_flow::UserAnalytics;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/:user_id/analytics", get(analytics))
}

async fn profile(CurrentUser(user): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(&user))
}

async fn analytics(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<String>,
    ValidQuery(query): ValidQuery<PeriodQuery>,
) -> AppResult<Json<UserAnalytics>> {
    let analytics = state
        .reports
        .user_analytics(&viewer, &user_id, &query.period)
        .await?;
    Ok(Json(analytics))
}
