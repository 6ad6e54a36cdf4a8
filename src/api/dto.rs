//! 请求体与响应体
//!
//! 字段命名与前端约定保持一致：认证和能力测试用 camelCase，其余 snake_case

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::aptitude::{question_ref, AptitudeTest, AptitudeTestType, QuestionCategory, TestSection};
use crate::models::assessment::{
    Assessment, AssessmentConfig, AssessmentResults, AssessmentStatus, AssessmentType,
    PerformanceAnalysis, PsychometricAnalysis,
};
use crate::models::question::{Difficulty, Question, QuestionOption, ReviewStatus};
use crate::models::user::{AptitudeHistory, PerformanceMetrics, StudentProfile, User, UserRole};
use crate::services::adaptive_engine::TerminationVerdict;
use crate::services::analytics_service::{AssessmentSummary, SubjectBreakdown};
use crate::services::DifficultyDistribution;
use crate::workflow::aptitude_flow::{AptitudeAccess, AptitudeAnswerSubmission, AptitudeResult};
use crate::workflow::assessment_flow::{AnswerSubmission, NextQuestion};
use crate::workflow::report_flow::{StudentOverview, StudentPerformance};

// ========== 认证 ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(alias = "first_name")]
    pub first_name: String,
    #[serde(alias = "last_name")]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub institution: String,
    pub department: Option<String>,
    pub year: Option<String>,
    #[serde(alias = "roll_number")]
    pub roll_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// 登录、注册返回的用户信息
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub institution: String,
    pub department: Option<String>,
    pub year: Option<String>,
    pub roll_number: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            institution: user.institution.clone(),
            department: user.department.clone(),
            year: user.year.clone(),
            roll_number: user.roll_number.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// 与 `access_token` 相同，兼容旧前端
    pub token: String,
    pub token_type: &'static str,
    pub user: UserInfo,
}

impl AuthResponse {
    pub fn new(user: &User, token: String) -> Self {
        Self {
            access_token: token.clone(),
            token,
            token_type: "bearer",
            user: UserInfo::from(user),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    #[serde(flatten)]
    pub user: UserInfo,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for CurrentUserResponse {
    fn from(user: &User) -> Self {
        Self {
            user: UserInfo::from(user),
            is_active: user.is_active,
            last_login: user.last_login,
        }
    }
}

/// `/api/users/profile`
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub institution: String,
    pub department: Option<String>,
    pub year: Option<String>,
    pub roll_number: Option<String>,
    pub student_profile: Option<StudentProfile>,
    pub performance_metrics: PerformanceMetrics,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            institution: user.institution.clone(),
            department: user.department.clone(),
            year: user.year.clone(),
            roll_number: user.roll_number.clone(),
            student_profile: user.student_profile.clone(),
            performance_metrics: user.performance_metrics.clone(),
            created_at: user.created_at,
        }
    }
}

// ========== 题目 ==========

/// 只含选项文本，不暴露答案
#[derive(Debug, Serialize)]
pub struct OptionText {
    pub text: String,
}

fn option_texts(options: &[QuestionOption]) -> Vec<OptionText> {
    options.iter().map(|o| OptionText { text: o.text.clone() }).collect()
}

/// 作答时看到的题目
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub order: usize,
    pub question_text: String,
    pub options: Vec<OptionText>,
    pub difficulty: Difficulty,
    pub topic: String,
    pub estimated_time: u32,
}

impl QuestionView {
    pub fn new(question: &Question, order: usize) -> Self {
        Self {
            id: question.id.clone(),
            order,
            question_text: question.question_text.clone(),
            options: option_texts(&question.options),
            difficulty: question.difficulty,
            topic: question.topic.clone(),
            estimated_time: question.estimated_time,
        }
    }
}

/// 题库中的题目；学生看不到答案和审核信息
#[derive(Debug, Serialize)]
pub struct BankQuestion {
    pub id: String,
    pub question_text: String,
    pub options: Vec<OptionText>,
    pub difficulty: Difficulty,
    pub difficulty_score: f64,
    pub subject: String,
    pub topic: String,
    pub subtopic: Option<String>,
    pub tags: Vec<String>,
    pub estimated_time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_status: Option<ReviewStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ai_generated: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl BankQuestion {
    pub fn new(question: &Question, reveal_answer: bool) -> Self {
        Self {
            id: question.id.clone(),
            question_text: question.question_text.clone(),
            options: option_texts(&question.options),
            difficulty: question.difficulty,
            difficulty_score: question.difficulty_score,
            subject: question.subject.clone(),
            topic: question.topic.clone(),
            subtopic: question.subtopic.clone(),
            tags: question.tags.clone(),
            estimated_time: question.estimated_time,
            correct_answer: reveal_answer.then_some(question.correct_answer),
            explanation: if reveal_answer { question.explanation.clone() } else { None },
            review_status: reveal_answer.then_some(question.review_status),
            is_ai_generated: reveal_answer.then_some(question.ai_generated.is_ai_generated),
            created_at: question.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionListQuery {
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub subject: String,
    pub topic: String,
    pub subtopic: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub estimated_time: Option<u32>,
}

impl CreateQuestionRequest {
    pub fn into_question(self) -> Question {
        let options = self
            .options
            .into_iter()
            .map(|text| QuestionOption { text, is_correct: false })
            .collect();
        let mut question = Question::new(
            self.question_text,
            options,
            self.correct_answer,
            self.difficulty,
            self.subject,
            self.topic,
            "",
        );
        question.difficulty_score = self.difficulty.default_score();
        question.explanation = self.explanation;
        question.subtopic = self.subtopic;
        question.tags = self.tags;
        if let Some(estimated_time) = self.estimated_time {
            question.estimated_time = estimated_time;
        }
        question
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuestionsRequest {
    pub subject: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default = "default_generate_count")]
    pub count: usize,
    pub difficulty_distribution: Option<DifficultyDistribution>,
}

fn default_generate_count() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuestionRequest {
    pub review_status: ReviewStatus,
    pub review_comments: Option<String>,
}

// ========== 测评 ==========

#[derive(Debug, Deserialize)]
pub struct CreateAssessmentRequest {
    pub assessment_type: AssessmentType,
    pub subject: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub config: AssessmentConfig,
    pub difficulty_distribution: Option<DifficultyDistribution>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentCreatedResponse {
    pub id: String,
    pub title: String,
    pub assessment_type: AssessmentType,
    pub subject: String,
    pub topics: Vec<String>,
    pub config: AssessmentConfig,
    pub status: AssessmentStatus,
    pub questions: Vec<QuestionView>,
    pub created_at: DateTime<Utc>,
}

impl AssessmentCreatedResponse {
    pub fn new(assessment: &Assessment, questions: &[Question]) -> Self {
        Self {
            id: assessment.id.clone(),
            title: assessment.title.clone(),
            assessment_type: assessment.assessment_type,
            subject: assessment.subject.clone(),
            topics: assessment.topics.clone(),
            config: assessment.config.clone(),
            status: assessment.status,
            questions: questions
                .iter()
                .enumerate()
                .map(|(i, q)| QuestionView::new(q, i + 1))
                .collect(),
            created_at: assessment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssessmentListItem {
    pub id: String,
    pub title: String,
    pub assessment_type: AssessmentType,
    pub subject: String,
    pub status: AssessmentStatus,
    pub created_at: DateTime<Utc>,
    pub results: AssessmentResults,
}

impl From<&Assessment> for AssessmentListItem {
    fn from(a: &Assessment) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            assessment_type: a.assessment_type,
            subject: a.subject.clone(),
            status: a.status,
            created_at: a.created_at,
            results: a.results.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IncompleteAssessmentItem {
    pub id: String,
    pub title: String,
    pub assessment_type: AssessmentType,
    pub subject: String,
    pub status: AssessmentStatus,
    pub last_accessed_at: DateTime<Utc>,
    pub progress: f64,
}

impl From<&Assessment> for IncompleteAssessmentItem {
    fn from(a: &Assessment) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            assessment_type: a.assessment_type,
            subject: a.subject.clone(),
            status: a.status,
            last_accessed_at: a.last_accessed_at,
            progress: a.progress(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssessmentListResponse {
    pub assessments: Vec<AssessmentListItem>,
    pub incomplete_assessments: Vec<IncompleteAssessmentItem>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    pub id: String,
    pub title: String,
    pub assessment_type: AssessmentType,
    pub subject: String,
    pub topics: Vec<String>,
    pub config: AssessmentConfig,
    pub status: AssessmentStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub time_spent: f64,
    pub progress: f64,
    pub results: AssessmentResults,
    pub performance_analysis: PerformanceAnalysis,
    pub psychometric_analysis: PsychometricAnalysis,
    pub auto_submitted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Assessment> for AssessmentDetail {
    fn from(a: &Assessment) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            assessment_type: a.assessment_type,
            subject: a.subject.clone(),
            topics: a.topics.clone(),
            config: a.config.clone(),
            status: a.status,
            start_time: a.start_time,
            end_time: a.end_time,
            time_spent: a.time_spent,
            progress: a.progress(),
            results: a.results.clone(),
            performance_analysis: a.performance_analysis.clone(),
            psychometric_analysis: a.psychometric_analysis.clone(),
            auto_submitted: a.auto_submitted,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NextQuestionResponse {
    pub question: Option<QuestionView>,
    pub progress: f64,
    pub selection_reason: Option<String>,
    pub termination: Option<TerminationVerdict>,
    /// 没有下一题时为 true，前端据此提交测评
    pub finished: bool,
}

impl From<NextQuestion> for NextQuestionResponse {
    fn from(next: NextQuestion) -> Self {
        let question = match (&next.question, next.order) {
            (Some(q), Some(order)) => Some(QuestionView::new(q, order)),
            _ => None,
        };
        Self {
            finished: question.is_none(),
            question,
            progress: next.progress,
            selection_reason: next.reason,
            termination: next.verdict,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    #[serde(alias = "questionId")]
    pub question_id: String,
    #[serde(alias = "selectedAnswer")]
    pub selected_answer: usize,
    #[serde(default, alias = "timeSpent")]
    pub time_spent: f64,
}

impl From<AnswerRequest> for AnswerSubmission {
    fn from(req: AnswerRequest) -> Self {
        Self {
            question_id: req.question_id,
            selected_answer: req.selected_answer,
            time_spent: req.time_spent,
        }
    }
}

// ========== 能力测试 ==========

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AptitudeConfigView {
    pub total_questions: usize,
    pub time_limit: i64,
    pub passing_score: f64,
    pub max_attempts: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AptitudeUsageView {
    pub total_attempts: u32,
    pub average_score: f64,
    pub completion_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AptitudeTestSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub test_type: AptitudeTestType,
    pub config: AptitudeConfigView,
    pub usage_stats: AptitudeUsageView,
}

impl From<&AptitudeTest> for AptitudeTestSummary {
    fn from(test: &AptitudeTest) -> Self {
        Self {
            id: test.id.clone(),
            title: test.title.clone(),
            description: test.description.clone(),
            test_type: test.test_type,
            config: AptitudeConfigView {
                total_questions: test.config.total_questions,
                time_limit: test.config.time_limit,
                passing_score: test.config.passing_score,
                max_attempts: test.config.max_attempts,
            },
            usage_stats: AptitudeUsageView {
                total_attempts: test.usage_stats.total_attempts,
                average_score: test.usage_stats.average_score,
                completion_rate: test.usage_stats.completion_rate,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AptitudeQuestionView {
    pub id: String,
    pub question_text: String,
    pub options: Vec<OptionText>,
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
    pub estimated_time: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AptitudeTestDetail {
    #[serde(flatten)]
    pub summary: AptitudeTestSummary,
    pub sections: Vec<TestSection>,
    pub questions: Vec<AptitudeQuestionView>,
}

impl From<&AptitudeTest> for AptitudeTestDetail {
    fn from(test: &AptitudeTest) -> Self {
        Self {
            summary: AptitudeTestSummary::from(test),
            sections: test.config.sections.clone(),
            questions: test
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| AptitudeQuestionView {
                    id: question_ref(i),
                    question_text: q.question_text.clone(),
                    options: option_texts(&q.options),
                    category: q.category,
                    difficulty: q.difficulty,
                    estimated_time: q.estimated_time,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AptitudeAccessResponse {
    pub test: AptitudeTestDetail,
    pub attempts_remaining: u32,
    pub user_attempts: u32,
}

impl From<&AptitudeAccess> for AptitudeAccessResponse {
    fn from(access: &AptitudeAccess) -> Self {
        Self {
            test: AptitudeTestDetail::from(&access.test),
            attempts_remaining: access.attempts_remaining,
            user_attempts: access.attempts,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AptitudeAnswerRequest {
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub answer: Option<usize>,
    #[serde(default)]
    pub time_spent: Option<f64>,
}

impl From<AptitudeAnswerRequest> for AptitudeAnswerSubmission {
    fn from(req: AptitudeAnswerRequest) -> Self {
        Self {
            question_id: req.question_id,
            answer: req.answer,
            time_spent: req.time_spent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AptitudeTestRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub test_type: AptitudeTestType,
}

#[derive(Debug, Serialize)]
pub struct AptitudeCompleteResponse {
    pub results: AptitudeResult,
    pub test: AptitudeTestRef,
}

impl AptitudeCompleteResponse {
    pub fn new(test: &AptitudeTest, results: AptitudeResult) -> Self {
        Self {
            results,
            test: AptitudeTestRef {
                id: test.id.clone(),
                title: test.title.clone(),
                test_type: test.test_type,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AptitudeHistoryItem {
    pub test_id: String,
    pub test_title: String,
    pub test_type: String,
    pub score: f64,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
    pub time_spent: f64,
    pub total_questions: usize,
    pub correct_answers: usize,
}

impl From<AptitudeHistory> for AptitudeHistoryItem {
    fn from(h: AptitudeHistory) -> Self {
        Self {
            test_id: h.test_id,
            test_title: h.test_title,
            test_type: h.test_type,
            score: h.score,
            passed: h.passed,
            completed_at: h.completed_at,
            time_spent: h.time_spent,
            total_questions: h.total_questions,
            correct_answers: h.correct_answers,
        }
    }
}

// ========== 统计 / 管理 ==========

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "30d".to_string()
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct AdminUserQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminAssessmentQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<AssessmentStatus>,
    pub subject: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminQuestionQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UserStatusQuery {
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminUserItem {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub institution: String,
    pub department: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for AdminUserItem {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            institution: user.institution.clone(),
            department: user.department.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminAssessmentItem {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub assessment_type: AssessmentType,
    pub subject: String,
    pub status: AssessmentStatus,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&Assessment> for AdminAssessmentItem {
    fn from(a: &Assessment) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            user_id: a.user_id.clone(),
            assessment_type: a.assessment_type,
            subject: a.subject.clone(),
            status: a.status,
            score: a.results.score,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminQuestionItem {
    pub id: String,
    pub question_text: String,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub review_status: ReviewStatus,
    pub is_active: bool,
    pub is_ai_generated: bool,
    pub times_used: u32,
    /// 题目有效度 (0-100)
    pub effectiveness: f64,
    /// 综合难度 (0-100)
    pub adaptive_difficulty: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&Question> for AdminQuestionItem {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question_text: q.question_text.clone(),
            subject: q.subject.clone(),
            topic: q.topic.clone(),
            difficulty: q.difficulty,
            review_status: q.review_status,
            is_active: q.is_active,
            is_ai_generated: q.ai_generated.is_ai_generated,
            times_used: q.usage_stats.times_used,
            effectiveness: q.effectiveness(),
            adaptive_difficulty: q.adaptive_difficulty(),
            created_at: q.created_at,
        }
    }
}

// ========== 教师视图 ==========

#[derive(Debug, Serialize)]
pub struct StudentItem {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: Option<String>,
    pub year: Option<String>,
    pub roll_number: Option<String>,
    pub batch: String,
    pub section: String,
    pub performance_metrics: PerformanceMetrics,
    pub recent_assessments: Vec<AssessmentSummary>,
}

impl From<StudentOverview> for StudentItem {
    fn from(overview: StudentOverview) -> Self {
        let s = overview.student;
        Self {
            id: s.id,
            first_name: s.first_name,
            last_name: s.last_name,
            email: s.email,
            department: s.department,
            year: s.year,
            roll_number: s.roll_number,
            batch: s.batch,
            section: s.section,
            performance_metrics: s.performance_metrics,
            recent_assessments: overview.recent_assessments,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MyStudentsResponse {
    pub students: Vec<StudentItem>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct StudentInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub year: Option<String>,
    pub roll_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PerformanceSummary {
    pub total_assessments: usize,
    pub average_score: f64,
    pub subject_breakdown: BTreeMap<String, SubjectBreakdown>,
    pub recent_assessments: Vec<AssessmentSummary>,
}

#[derive(Debug, Serialize)]
pub struct StudentPerformanceResponse {
    pub student: StudentInfo,
    pub performance: PerformanceSummary,
}

impl From<StudentPerformance> for StudentPerformanceResponse {
    fn from(p: StudentPerformance) -> Self {
        let s = p.student;
        Self {
            student: StudentInfo {
                name: format!("{} {}", s.first_name, s.last_name),
                id: s.id,
                email: s.email,
                department: s.department,
                year: s.year,
                roll_number: s.roll_number,
            },
            performance: PerformanceSummary {
                total_assessments: p.total_assessments,
                average_score: p.average_score,
                subject_breakdown: p.subject_breakdown,
                recent_assessments: p.recent_assessments,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignStudentQuery {
    pub student_id: String,
    pub instructor_id: String,
}

#[derive(Debug, Serialize)]
pub struct AssignStudentResponse {
    pub message: &'static str,
    pub student_id: String,
    pub instructor_id: String,
    pub student_name: String,
    pub instructor_name: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub batch: String,
}
