//! 报表流程 - 流程层
//!
//! 个人成绩、教师视图和管理后台的统计查询，只读为主

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::clamp_page_limit;
use crate::infrastructure::{AssessmentFilter, Page, QuestionFilter, Store, UserFilter};
use crate::models::assessment::{Assessment, AssessmentStatus};
use crate::models::question::Question;
use crate::models::user::{PerformanceMetrics, StudentProfile, User, UserRole};
use crate::services::analytics_service::{
    self, AssessmentSummary, PeriodAnalytics, SubjectBreakdown,
};

/// 个人成绩面板
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub user_id: String,
    pub performance_metrics: PerformanceMetrics,
    pub overall_proficiency: f64,
    pub skill_levels: BTreeMap<String, f64>,
    pub completed_assessments: usize,
    pub average_score: f64,
    pub subject_breakdown: BTreeMap<String, SubjectBreakdown>,
    pub recent_assessments: Vec<AssessmentSummary>,
}

/// 某个用户在一段时间内的统计
#[derive(Debug, Clone, Serialize)]
pub struct UserAnalytics {
    pub user_id: String,
    pub period: String,
    pub performance_metrics: PerformanceMetrics,
    pub student_profile: Option<StudentProfile>,
    pub analytics: PeriodAnalytics,
}

/// 分页信息
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let limit = clamp_page_limit(limit);
        Self {
            page: page.max(1),
            limit,
            total,
            pages: total.div_ceil(limit),
        }
    }

    fn as_page(&self) -> Page {
        Page::numbered(self.page, self.limit)
    }
}

/// 一页数据
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub new_30_days: u64,
    pub new_7_days: u64,
    pub by_role: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentStats {
    pub total: u64,
    pub completed: u64,
    pub last_30_days: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionStats {
    pub total: u64,
    pub active: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub status: &'static str,
    pub storage: &'static str,
    pub last_updated: DateTime<Utc>,
}

/// 管理后台总览
#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub users: UserStats,
    pub assessments: AssessmentStats,
    pub questions: QuestionStats,
    pub system: SystemStatus,
}

/// 教师名下的学生及其最近成绩
#[derive(Debug, Clone)]
pub struct StudentOverview {
    pub student: User,
    pub recent_assessments: Vec<AssessmentSummary>,
}

/// 单个学生的成绩详情
#[derive(Debug, Clone)]
pub struct StudentPerformance {
    pub student: User,
    pub total_assessments: usize,
    pub average_score: f64,
    pub subject_breakdown: BTreeMap<String, SubjectBreakdown>,
    pub recent_assessments: Vec<AssessmentSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchStudent {
    pub student_id: String,
    pub name: String,
    pub roll_number: Option<String>,
    pub total_assessments: usize,
    pub average_score: f64,
    pub last_assessment: Option<DateTime<Utc>>,
}

/// 班级成绩
#[derive(Debug, Clone, Serialize)]
pub struct BatchPerformance {
    pub batch: String,
    pub total_students: usize,
    pub students: Vec<BatchStudent>,
    pub batch_average: f64,
}

/// 最近测评的条数
const RECENT_FOR_DASHBOARD: usize = 10;
const RECENT_FOR_STUDENT_LIST: usize = 5;

/// 报表流程
pub struct ReportFlow {
    store: Arc<dyn Store>,
}

impl ReportFlow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // ========== 个人 ==========

    /// 当前用户的成绩面板
    pub async fn performance(&self, user: &User) -> AppResult<PerformanceReport> {
        let completed = self.completed_assessments(&user.id).await?;
        let skill_levels: BTreeMap<String, f64> = user
            .student_profile
            .as_ref()
            .map(|p| p.skill_level.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();

        Ok(PerformanceReport {
            user_id: user.id.clone(),
            performance_metrics: user.performance_metrics.clone(),
            overall_proficiency: user.overall_proficiency(),
            skill_levels,
            completed_assessments: completed.len(),
            average_score: analytics_service::average_score(&completed),
            subject_breakdown: analytics_service::subject_breakdown(&completed),
            recent_assessments: summaries(&completed, RECENT_FOR_DASHBOARD),
        })
    }

    /// 某个用户的周期统计；本人或教师、管理员可查看
    pub async fn user_analytics(&self, viewer: &User, user_id: &str, period: &str) -> AppResult<UserAnalytics> {
        if viewer.id != user_id && !viewer.is_staff() {
            return Err(AppError::forbidden("Access denied"));
        }
        let window = analytics_service::parse_period(period).ok_or_else(|| {
            AppError::validation(format!(
                "Invalid period '{}': use a number followed by d, w, m or y, or 'all'",
                period
            ))
        })?;

        let target = self.load_user(user_id, "User not found").await?;
        let completed = self.completed_assessments(&target.id).await?;

        Ok(UserAnalytics {
            user_id: target.id.clone(),
            period: period.to_string(),
            analytics: analytics_service::period_analytics(&completed, period, window, Utc::now()),
            performance_metrics: target.performance_metrics,
            student_profile: target.student_profile,
        })
    }

    // ========== 管理后台 ==========

    pub async fn admin_dashboard(&self) -> AppResult<AdminDashboard> {
        let now = Utc::now();
        let last_30_days = now - Duration::days(30);
        let last_7_days = now - Duration::days(7);
        let store = &self.store;

        let mut by_role = BTreeMap::new();
        for role in UserRole::ALL {
            let filter = UserFilter { role: Some(role), ..Default::default() };
            by_role.insert(role.as_str(), store.count_users(&filter).await?);
        }

        let users = UserStats {
            total: store.count_users(&UserFilter::default()).await?,
            active: store
                .count_users(&UserFilter { is_active: Some(true), ..Default::default() })
                .await?,
            new_30_days: store
                .count_users(&UserFilter { created_after: Some(last_30_days), ..Default::default() })
                .await?,
            new_7_days: store
                .count_users(&UserFilter { created_after: Some(last_7_days), ..Default::default() })
                .await?,
            by_role,
        };

        let assessments = AssessmentStats {
            total: store.count_assessments(&AssessmentFilter::default()).await?,
            completed: store
                .count_assessments(&AssessmentFilter::default().with_statuses(&[AssessmentStatus::Completed]))
                .await?,
            last_30_days: store
                .count_assessments(&AssessmentFilter {
                    created_after: Some(last_30_days),
                    ..Default::default()
                })
                .await?,
        };

        let questions = QuestionStats {
            total: store.count_questions(&QuestionFilter::default()).await?,
            active: store
                .count_questions(&QuestionFilter { is_active: Some(true), ..Default::default() })
                .await?,
        };

        debug!("管理后台统计: {} 用户, {} 测评", users.total, assessments.total);
        Ok(AdminDashboard {
            users,
            assessments,
            questions,
            system: SystemStatus {
                status: "healthy",
                storage: store.name(),
                last_updated: now,
            },
        })
    }

    pub async fn users_page(&self, filter: &UserFilter, page: u64, limit: u64) -> AppResult<Paginated<User>> {
        let total = self.store.count_users(filter).await?;
        let pagination = Pagination::new(page, limit, total);
        let items = self.store.list_users(filter, pagination.as_page()).await?;
        Ok(Paginated { items, pagination })
    }

    pub async fn assessments_page(
        &self,
        filter: &AssessmentFilter,
        page: u64,
        limit: u64,
    ) -> AppResult<Paginated<Assessment>> {
        let total = self.store.count_assessments(filter).await?;
        let pagination = Pagination::new(page, limit, total);
        let items = self.store.list_assessments(filter, pagination.as_page()).await?;
        Ok(Paginated { items, pagination })
    }

    pub async fn questions_page(
        &self,
        filter: &QuestionFilter,
        page: u64,
        limit: u64,
    ) -> AppResult<Paginated<Question>> {
        let total = self.store.count_questions(filter).await?;
        let pagination = Pagination::new(page, limit, total);
        let items = self.store.list_questions(filter, pagination.as_page()).await?;
        Ok(Paginated { items, pagination })
    }

    /// 启用或停用账号
    pub async fn set_user_status(&self, admin: &User, user_id: &str, is_active: bool) -> AppResult<User> {
        let mut user = self.load_user(user_id, "User not found").await?;
        user.is_active = is_active;
        self.store.update_user(&user).await?;
        info!(
            "[{}] 🔧 {} 账号 {}",
            admin.id,
            if is_active { "启用" } else { "停用" },
            user.email
        );
        Ok(user)
    }

    // ========== 教师视图 ==========

    /// 分配给该教师的在读学生
    pub async fn my_students(&self, instructor: &User) -> AppResult<Vec<StudentOverview>> {
        let filter = UserFilter {
            role: Some(UserRole::Student),
            is_active: Some(true),
            assigned_instructor: Some(instructor.id.clone()),
            ..Default::default()
        };
        let students = self.store.list_users(&filter, Page::all()).await?;

        let mut overviews = Vec::with_capacity(students.len());
        for student in students {
            let completed = self.completed_assessments(&student.id).await?;
            overviews.push(StudentOverview {
                recent_assessments: summaries(&completed, RECENT_FOR_STUDENT_LIST),
                student,
            });
        }
        Ok(overviews)
    }

    /// 学生成绩详情；管理员或该学生的负责教师可查看
    pub async fn student_performance(&self, viewer: &User, student_id: &str) -> AppResult<StudentPerformance> {
        let student = self.load_user(student_id, "Student not found").await?;
        if !viewer.is_admin() && student.assigned_instructor.as_deref() != Some(viewer.id.as_str()) {
            return Err(AppError::forbidden("Access denied to this student"));
        }

        let completed = self.completed_assessments(&student.id).await?;
        Ok(StudentPerformance {
            total_assessments: completed.len(),
            average_score: analytics_service::average_score(&completed),
            subject_breakdown: analytics_service::subject_breakdown(&completed),
            recent_assessments: summaries(&completed, RECENT_FOR_DASHBOARD),
            student,
        })
    }

    /// 把学生分配给教师，返回 (学生, 教师)
    pub async fn assign_student(&self, student_id: &str, instructor_id: &str) -> AppResult<(User, User)> {
        let mut student = self
            .store
            .find_user(student_id)
            .await?
            .filter(|u| u.role == UserRole::Student)
            .ok_or_else(|| AppError::not_found("Student not found"))?;
        let instructor = self
            .store
            .find_user(instructor_id)
            .await?
            .filter(|u| u.role == UserRole::Instructor)
            .ok_or_else(|| AppError::not_found("Instructor not found"))?;

        student.assigned_instructor = Some(instructor.id.clone());
        self.store.update_user(&student).await?;
        info!("👥 学生 {} 分配给教师 {}", student.email, instructor.email);
        Ok((student, instructor))
    }

    /// 班级成绩，按平均分从高到低
    pub async fn batch_performance(&self, batch: &str) -> AppResult<BatchPerformance> {
        let filter = UserFilter {
            role: Some(UserRole::Student),
            is_active: Some(true),
            batch: Some(batch.to_string()),
            ..Default::default()
        };
        let students = self.store.list_users(&filter, Page::all()).await?;

        let mut rows = Vec::with_capacity(students.len());
        for student in students {
            let completed = self.completed_assessments(&student.id).await?;
            rows.push(BatchStudent {
                name: student.full_name(),
                student_id: student.id,
                roll_number: student.roll_number,
                total_assessments: completed.len(),
                average_score: analytics_service::average_score(&completed),
                last_assessment: completed.first().and_then(|a| a.end_time),
            });
        }
        rows.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));

        let batch_average = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.average_score).sum::<f64>() / rows.len() as f64
        };
        Ok(BatchPerformance {
            batch: batch.to_string(),
            total_students: rows.len(),
            students: rows,
            batch_average,
        })
    }

    // ========== 内部方法 ==========

    async fn load_user(&self, user_id: &str, not_found: &str) -> AppResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(not_found))
    }

    /// 已完成的测评，最近完成的在前
    async fn completed_assessments(&self, user_id: &str) -> AppResult<Vec<Assessment>> {
        let filter = AssessmentFilter::for_user(user_id).with_statuses(&[AssessmentStatus::Completed]);
        let mut completed = self.store.list_assessments(&filter, Page::all()).await?;
        analytics_service::sort_by_completion(&mut completed);
        Ok(completed)
    }
}

fn summaries(assessments: &[Assessment], limit: usize) -> Vec<AssessmentSummary> {
    assessments.iter().take(limit).map(AssessmentSummary::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;
    use crate::models::assessment::{AssessmentConfig, AssessmentType};
    use crate::models::user::NewUser;

    fn user(role: UserRole, email: &str) -> User {
        User::new(NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: email.split('@').next().unwrap_or_default().to_string(),
            last_name: "X".to_string(),
            role,
            institution: "Inst".to_string(),
            department: None,
            year: None,
            roll_number: None,
        })
    }

    fn completed(user_id: &str, subject: &str, score: f64, days_ago: i64) -> Assessment {
        let config = AssessmentConfig {
            total_questions: 5,
            time_limit: 600,
            passing_score: 60.0,
            adaptive_enabled: false,
            question_selection_strategy: Default::default(),
        };
        let mut a = Assessment::new(user_id, AssessmentType::Practice, subject, vec![], config, vec![]);
        a.status = AssessmentStatus::Completed;
        a.results.score = score;
        a.results.passed = score >= 60.0;
        a.end_time = Some(Utc::now() - Duration::days(days_ago));
        a
    }

    #[test]
    fn test_pagination_pages() {
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).pages, 1);
        assert_eq!(Pagination::new(2, 20, 21).pages, 2);
        assert_eq!(Pagination::new(0, 0, 3).limit, 1);
        let huge = Pagination::new(u64::MAX, u64::MAX, 250);
        assert_eq!((huge.limit, huge.pages), (100, 3));
    }

    #[tokio::test]
    async fn test_student_performance_access() {
        let store = Arc::new(MemoryStore::new());
        let flow = ReportFlow::new(store.clone());
        let admin = user(UserRole::Admin, "admin@x.com");
        let instructor = user(UserRole::Instructor, "instructor@x.com");
        let other_instructor = user(UserRole::Instructor, "other@x.com");
        let student = user(UserRole::Student, "student@x.com");
        for u in [&admin, &instructor, &other_instructor, &student] {
            store.insert_user(u).await.unwrap();
        }
        store.insert_assessment(&completed(&student.id, "Math", 80.0, 2)).await.unwrap();
        store.insert_assessment(&completed(&student.id, "Math", 60.0, 1)).await.unwrap();

        let (assigned, _) = flow.assign_student(&student.id, &instructor.id).await.unwrap();
        assert_eq!(assigned.assigned_instructor.as_deref(), Some(instructor.id.as_str()));

        let report = flow.student_performance(&instructor, &student.id).await.unwrap();
        assert_eq!(report.total_assessments, 2);
        assert_eq!(report.average_score, 70.0);
        assert_eq!(report.subject_breakdown["Math"].total, 2);
        // 最近完成的在前
        assert_eq!(report.recent_assessments[0].score, 60.0);

        assert!(flow.student_performance(&admin, &student.id).await.is_ok());
        let err = flow.student_performance(&other_instructor, &student.id).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);

        let students = flow.my_students(&instructor).await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].recent_assessments.len(), 2);

        // 角色不符
        let err = flow.assign_student(&instructor.id, &instructor.id).await.unwrap_err();
        assert_eq!(err.to_string(), "业务错误: Student not found");
        let err = flow.assign_student(&student.id, &admin.id).await.unwrap_err();
        assert_eq!(err.to_string(), "业务错误: Instructor not found");
    }

    #[tokio::test]
    async fn test_batch_performance_sorted() {
        let store = Arc::new(MemoryStore::new());
        let flow = ReportFlow::new(store.clone());
        let mut a = user(UserRole::Student, "a@x.com");
        let mut b = user(UserRole::Student, "b@x.com");
        a.batch = "2024".to_string();
        b.batch = "2024".to_string();
        store.insert_user(&a).await.unwrap();
        store.insert_user(&b).await.unwrap();
        store.insert_assessment(&completed(&a.id, "Math", 50.0, 1)).await.unwrap();
        store.insert_assessment(&completed(&b.id, "Math", 90.0, 1)).await.unwrap();

        let batch = flow.batch_performance("2024").await.unwrap();
        assert_eq!(batch.total_students, 2);
        assert_eq!(batch.students[0].student_id, b.id);
        assert_eq!(batch.batch_average, 70.0);

        let empty = flow.batch_performance("1999").await.unwrap();
        assert_eq!(empty.batch_average, 0.0);
    }

    #[tokio::test]
    async fn test_user_analytics_guard() {
        let store = Arc::new(MemoryStore::new());
        let flow = ReportFlow::new(store.clone());
        let s1 = user(UserRole::Student, "s1@x.com");
        let s2 = user(UserRole::Student, "s2@x.com");
        store.insert_user(&s1).await.unwrap();
        store.insert_user(&s2).await.unwrap();
        store.insert_assessment(&completed(&s1.id, "Math", 80.0, 3)).await.unwrap();
        store.insert_assessment(&completed(&s1.id, "Math", 40.0, 60)).await.unwrap();

        let own = flow.user_analytics(&s1, &s1.id, "30d").await.unwrap();
        assert_eq!(own.analytics.assessments_completed, 1);

        let err = flow.user_analytics(&s2, &s1.id, "30d").await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);

        let instructor = user(UserRole::Instructor, "t@x.com");
        let err = flow.user_analytics(&instructor, "missing", "30d").await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);

        let err = flow.user_analytics(&s1, &s1.id, "forever").await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_admin_dashboard_counts() {
        let store = Arc::new(MemoryStore::new());
        let flow = ReportFlow::new(store.clone());
        let mut inactive = user(UserRole::Student, "s@x.com");
        inactive.is_active = false;
        store.insert_user(&inactive).await.unwrap();
        store.insert_user(&user(UserRole::Admin, "a@x.com")).await.unwrap();
        store.insert_assessment(&completed(&inactive.id, "Math", 80.0, 1)).await.unwrap();

        let dashboard = flow.admin_dashboard().await.unwrap();
        assert_eq!(dashboard.users.total, 2);
        assert_eq!(dashboard.users.active, 1);
        assert_eq!(dashboard.users.by_role["student"], 1);
        assert_eq!(dashboard.users.by_role["instructor"], 0);
        assert_eq!(dashboard.assessments.completed, 1);
        assert_eq!(dashboard.system.storage, "memory");

        let page = flow.users_page(&UserFilter::default(), 1, 1).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.pages, 2);
    }
}
