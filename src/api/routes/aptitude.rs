//! `/api/aptitude`

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::api::dto::{
    AptitudeAccessResponse, AptitudeAnswerRequest, AptitudeCompleteResponse, AptitudeHistoryItem,
    AptitudeTestSummary,
};
use crate::api::extract::{CurrentUser, ValidJson};
use crate::api::AppState;
use crate::error::AppResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/history", get(history))
        .route("/:test_id", get(detail))
        .route("/:test_id/start", post(start))
        .route("/:test_id/answer", post(answer))
        .route("/:test_id/complete", post(complete))
        // `/tests` 前缀的别名
        .route("/tests", get(list))
        .route("/tests/:test_id", get(detail))
        .route("/tests/:test_id/start", post(start))
        .route("/tests/:test_id/answer", post(answer))
        .route("/tests/:test_id/complete", post(complete))
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> AppResult<Json<Vec<AptitudeTestSummary>>> {
    let tests = state.aptitude.list().await?;
    Ok(Json(tests.iter().map(AptitudeTestSummary::from).collect()))
}

async fn history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<Vec<AptitudeHistoryItem>> {
    Json(
        state
            .aptitude
            .history(&user)
            .into_iter()
            .map(AptitudeHistoryItem::from)
            .collect(),
    )
}

async fn detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(test_id): Path<String>,
) -> AppResult<Json<AptitudeAccessResponse>> {
    let access = state.aptitude.get(&user, &test_id).await?;
    Ok(Json(AptitudeAccessResponse::from(&access)))
}

async fn start(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(test_id): Path<String>,
) -> AppResult<Json<AptitudeAccessResponse>> {
    let access = state.aptitude.start(&user, &test_id).await?;
    Ok(Json(AptitudeAccessResponse::from(&access)))
}

async fn answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(test_id): Path<String>,
    ValidJson(req): ValidJson<AptitudeAnswerRequest>,
) -> AppResult<Json<Value>> {
    state.aptitude.answer(&user, &test_id, req.into()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Answer submitted successfully",
    })))
}

async fn complete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(test_id): Path<String>,
) -> AppResult<Json<AptitudeCompleteResponse>> {
    let (test, results) = state.aptitude.complete(&user, &test_id).await?;
    Ok(Json(AptitudeCompleteResponse::new(&test, results)))
}
