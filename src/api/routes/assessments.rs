//! `/api/assessments`

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AnswerRequest, AssessmentCreatedResponse, AssessmentDetail, AssessmentListItem,
    AssessmentListResponse, CreateAssessmentRequest, IncompleteAssessmentItem, NextQuestionResponse,
};
use crate::api::extract::{CurrentUser, ValidJson};
use crate::api::realtime::{self, ServerEvent};
use crate::api::AppState;
use crate::error::AppResult;
use crate::workflow::assessment_flow::{AnswerOutcome, CreateAssessment};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/create", post(create))
        .route("/:assessment_id", get(detail))
        .route("/:assessment_id/start", post(start))
        .route("/:assessment_id/next-question", get(next_question))
        .route("/:assessment_id/answer", post(answer))
        .route("/:assessment_id/complete", post(complete))
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(req): ValidJson<CreateAssessmentRequest>,
) -> AppResult<Json<AssessmentCreatedResponse>> {
    let created = state
        .assessments
        .create(
            &user,
            CreateAssessment {
                assessment_type: req.assessment_type,
                subject: req.subject,
                topics: req.topics,
                config: req.config,
                distribution: req.difficulty_distribution,
            },
        )
        .await?;
    Ok(Json(AssessmentCreatedResponse::new(&created.assessment, &created.questions)))
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<AssessmentListResponse>> {
    let overview = state.assessments.list(&user).await?;
    Ok(Json(AssessmentListResponse {
        assessments: overview.recent.iter().map(AssessmentListItem::from).collect(),
        incomplete_assessments: overview
            .incomplete
            .iter()
            .map(IncompleteAssessmentItem::from)
            .collect(),
    }))
}

async fn detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assessment_id): Path<String>,
) -> AppResult<Json<AssessmentDetail>> {
    let assessment = state.assessments.get(&user, &assessment_id).await?;
    Ok(Json(AssessmentDetail::from(&assessment)))
}

async fn start(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assessment_id): Path<String>,
) -> AppResult<Json<AssessmentDetail>> {
    let assessment = state.assessments.start(&user, &assessment_id).await?;
    Ok(Json(AssessmentDetail::from(&assessment)))
}

async fn next_question(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assessment_id): Path<String>,
) -> AppResult<Json<NextQuestionResponse>> {
    let next = state.assessments.next_question(&user, &assessment_id).await?;
    Ok(Json(NextQuestionResponse::from(next)))
}

async fn answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assessment_id): Path<String>,
    ValidJson(req): ValidJson<AnswerRequest>,
) -> AppResult<Json<AnswerOutcome>> {
    let outcome = state
        .assessments
        .answer(&user, &assessment_id, req.into())
        .await?;
    Ok(Json(outcome))
}

async fn complete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assessment_id): Path<String>,
) -> AppResult<Json<AssessmentDetail>> {
    let assessment = state.assessments.complete(&user, &assessment_id).await?;
    realtime::publish(
        &state.events,
        &assessment.user_id,
        &ServerEvent::AssessmentCompleted {
            assessment_id: &assessment.id,
            score: assessment.results.score,
        },
    );
    Ok(Json(AssessmentDetail::from(&assessment)))
}
