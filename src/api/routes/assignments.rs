//! `/api/assignments`，教师或管理员

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AssignStudentQuery, AssignStudentResponse, BatchQuery, MyStudentsResponse, StudentItem,
    StudentPerformanceResponse,
};
use crate::api::extract::{AdminUser, StaffUser, ValidQuery};
use crate::api::AppState;
use crate::error::AppResult;
use crate::workflow::report_flow::BatchPerformance;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my-students", get(my_students))
        .route("/student/:student_id/performance", get(student_performance))
        .route("/assign-student", post(assign_student))
        .route("/batch-performance", get(batch_performance))
}

async fn my_students(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
) -> AppResult<Json<MyStudentsResponse>> {
    let students: Vec<StudentItem> = state
        .reports
        .my_students(&user)
        .await?
        .into_iter()
        .map(StudentItem::from)
        .collect();
    Ok(Json(MyStudentsResponse {
        total_count: students.len(),
        students,
    }))
}

async fn student_performance(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(student_id): Path<String>,
) -> AppResult<Json<StudentPerformanceResponse>> {
    let performance = state.reports.student_performance(&user, &student_id).await?;
    Ok(Json(StudentPerformanceResponse::from(performance)))
}

async fn assign_student(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ValidQuery(query): ValidQuery<AssignStudentQuery>,
) -> AppResult<Json<AssignStudentResponse>> {
    let (student, instructor) = state
        .reports
        .assign_student(&query.student_id, &query.instructor_id)
        .await?;
    Ok(Json(AssignStudentResponse {
        message: "Student assigned to instructor successfully",
        student_name: student.full_name(),
        instructor_name: instructor.full_name(),
        student_id: student.id,
        instructor_id: instructor.id,
    }))
}

async fn batch_performance(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    ValidQuery(query): ValidQuery<BatchQuery>,
) -> AppResult<Json<BatchPerformance>> {
    Ok(Json(state.reports.batch_performance(&query.batch).await?))
}
