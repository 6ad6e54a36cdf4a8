//! `/api/questions`

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::api::dto::{
    BankQuestion, CreateQuestionRequest, GenerateQuestionsRequest, QuestionListQuery,
    ReviewQuestionRequest,
};
use crate::api::extract::{CurrentUser, StaffUser, ValidJson, ValidQuery};
use crate::api::AppState;
use crate::error::AppResult;
use crate::infrastructure::QuestionFilter;
use crate::workflow::report_flow::Pagination;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/generate", post(generate))
        .route("/:question_id", get(detail))
        .route("/:question_id/review", put(review))
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidQuery(query): ValidQuery<QuestionListQuery>,
) -> AppResult<Json<Value>> {
    let filter = QuestionFilter {
        subject: query.subject,
        topic: query.topic,
        difficulty: query.difficulty,
        ..Default::default()
    };
    let (questions, total) = state.questions.list(filter, query.page, query.limit).await?;
    let reveal = user.is_staff();

    Ok(Json(json!({
        "questions": questions.iter().map(|q| BankQuestion::new(q, reveal)).collect::<Vec<_>>(),
        "pagination": Pagination::new(query.page, query.limit, total),
    })))
}

async fn detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<String>,
) -> AppResult<Json<BankQuestion>> {
    let question = state.questions.get(&question_id).await?;
    Ok(Json(BankQuestion::new(&question, user.is_staff())))
}

async fn create(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    ValidJson(req): ValidJson<CreateQuestionRequest>,
) -> AppResult<Json<BankQuestion>> {
    let question = state.questions.create(&user, req.into_question()).await?;
    Ok(Json(BankQuestion::new(&question, true)))
}

async fn generate(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    ValidJson(req): ValidJson<GenerateQuestionsRequest>,
) -> AppResult<Json<Value>> {
    let questions = state
        .questions
        .generate(&user, &req.subject, &req.topics, req.count, req.difficulty_distribution)
        .await?;
    Ok(Json(json!({
        "generated": questions.len(),
        "questions": questions.iter().map(|q| BankQuestion::new(q, true)).collect::<Vec<_>>(),
    })))
}

async fn review(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(question_id): Path<String>,
    ValidJson(req): ValidJson<ReviewQuestionRequest>,
) -> AppResult<Json<BankQuestion>> {
    let question = state
        .questions
        .review(&user, &question_id, req.review_status, req.review_comments)
        .await?;
    Ok(Json(BankQuestion::new(&question, true)))
}
