//! `/api/admin`，仅管理员

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::api::dto::{
    AdminAssessmentItem, AdminAssessmentQuery, AdminQuestionItem, AdminQuestionQuery, AdminUserItem,
    AdminUserQuery, UserStatusQuery,
};
use crate::api::extract::{AdminUser, ValidQuery};
use crate::api::AppState;
use crate::error::AppResult;
use crate::infrastructure::{AssessmentFilter, QuestionFilter, UserFilter};
use crate::workflow::report_flow::AdminDashboard;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(users))
        .route("/users/:user_id/status", put(set_status))
        .route("/assessments", get(assessments))
        .route("/questions", get(questions))
}

async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<AdminDashboard>> {
    Ok(Json(state.reports.admin_dashboard().await?))
}

async fn users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidQuery(query): ValidQuery<AdminUserQuery>,
) -> AppResult<Json<Value>> {
    let filter = UserFilter {
        role: query.role,
        is_active: query.is_active,
        search: query.search.filter(|s| !s.trim().is_empty()),
        ..Default::default()
    };
    let page = state.reports.users_page(&filter, query.page, query.limit).await?;
    Ok(Json(json!({
        "users": page.items.iter().map(AdminUserItem::from).collect::<Vec<_>>(),
        "pagination": page.pagination,
    })))
}

async fn set_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
    ValidQuery(query): ValidQuery<UserStatusQuery>,
) -> AppResult<Json<Value>> {
    let user = state
        .reports
        .set_user_status(&admin, &user_id, query.is_active)
        .await?;
    let action = if user.is_active { "activated" } else { "deactivated" };
    Ok(Json(json!({
        "message": format!("User {} successfully", action),
        "user_id": user.id,
        "is_active": user.is_active,
    })))
}

async fn assessments(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidQuery(query): ValidQuery<AdminAssessmentQuery>,
) -> AppResult<Json<Value>> {
    let filter = AssessmentFilter {
        user_id: query.user_id,
        statuses: query.status.into_iter().collect(),
        subject: query.subject,
        ..Default::default()
    };
    let page = state
        .reports
        .assessments_page(&filter, query.page, query.limit)
        .await?;
    Ok(Json(json!({
        "assessments": page.items.iter().map(AdminAssessmentItem::from).collect::<Vec<_>>(),
        "pagination": page.pagination,
    })))
}

async fn questions(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidQuery(query): ValidQuery<AdminQuestionQuery>,
) -> AppResult<Json<Value>> {
    let filter = QuestionFilter {
        subject: query.subject,
        topic: query.topic,
        difficulty: query.difficulty,
        is_active: query.is_active,
    };
    let page = state
        .reports
        .questions_page(&filter, query.page, query.limit)
        .await?;
    Ok(Json(json!({
        "questions": page.items.iter().map(AdminQuestionItem::from).collect::<Vec<_>>(),
        "pagination": page.pagination,
    })))
}
