//! 文档存储 - 基础设施层
//!
//! 只负责文档的读写和查询，不包含业务规则

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::aptitude::AptitudeTest;
use crate::models::assessment::{Assessment, AssessmentStatus};
use crate::models::question::{Difficulty, Question};
use crate::models::user::{User, UserRole};

/// 分页参数
/// 分页查询每页的最大条数
pub const MAX_PAGE_LIMIT: u64 = 100;

pub fn clamp_page_limit(limit: u64) -> u64 {
    limit.clamp(1, MAX_PAGE_LIMIT)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    /// `None` 表示不限制
    pub limit: Option<i64>,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn first(limit: i64) -> Self {
        Self { skip: 0, limit: Some(limit) }
    }

    /// 按页码（从 1 开始）分页，每页条数限制在 1..=MAX_PAGE_LIMIT
    pub fn numbered(page: u64, limit: u64) -> Self {
        let limit = clamp_page_limit(limit);
        Self {
            // 驱动按 i64 传递 skip
            skip: (page.max(1) - 1).saturating_mul(limit).min(i64::MAX as u64),
            limit: Some(limit as i64),
        }
    }

    /// 在内存中截取一页
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.skip as usize);
        match self.limit {
            Some(limit) => iter.take(limit.max(0) as usize).collect(),
            None => iter.collect(),
        }
    }
}

/// 用户查询条件
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub created_after: Option<DateTime<Utc>>,
    pub assigned_instructor: Option<String>,
    pub batch: Option<String>,
    /// 姓名或邮箱模糊匹配（不区分大小写）
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|role| user.role != role) {
            return false;
        }
        if self.is_active.is_some_and(|active| user.is_active != active) {
            return false;
        }
        if self.created_after.is_some_and(|t| user.created_at < t) {
            return false;
        }
        if let Some(instructor) = &self.assigned_instructor {
            if user.assigned_instructor.as_deref() != Some(instructor.as_str()) {
                return false;
            }
        }
        if let Some(batch) = &self.batch {
            if &user.batch != batch {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [&user.first_name, &user.last_name, &user.email]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// 题目查询条件
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub is_active: Option<bool>,
}

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        if let Some(subject) = &self.subject {
            if &question.subject != subject {
                return false;
            }
        }
        if let Some(topic) = &self.topic {
            if &question.topic != topic {
                return false;
            }
        }
        if self.difficulty.is_some_and(|d| question.difficulty != d) {
            return false;
        }
        if self.is_active.is_some_and(|active| question.is_active != active) {
            return false;
        }
        true
    }
}

/// 测评查询条件
#[derive(Debug, Clone, Default)]
pub struct AssessmentFilter {
    pub user_id: Option<String>,
    /// 为空表示不限状态
    pub statuses: Vec<AssessmentStatus>,
    pub subject: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub last_accessed_before: Option<DateTime<Utc>>,
}

impl AssessmentFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[AssessmentStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn matches(&self, assessment: &Assessment) -> bool {
        if let Some(user_id) = &self.user_id {
            if &assessment.user_id != user_id {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&assessment.status) {
            return false;
        }
        if let Some(subject) = &self.subject {
            if &assessment.subject != subject {
                return false;
            }
        }
        if self.created_after.is_some_and(|t| assessment.created_at < t) {
            return false;
        }
        if self
            .last_accessed_before
            .is_some_and(|t| assessment.last_accessed_at >= t)
        {
            return false;
        }
        true
    }
}

/// 文档存储接口
///
/// 列表查询一律按 `created_at` 倒序返回
#[async_trait]
pub trait Store: Send + Sync {
    /// 存储后端名称，用于日志
    fn name(&self) -> &'static str;

    // ---------- users ----------

    /// 插入用户；邮箱或学号重复时返回 `StoreError::Duplicate`
    async fn insert_user(&self, user: &User) -> AppResult<()>;
    async fn find_user(&self, id: &str) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_user_by_roll_number(&self, roll_number: &str) -> AppResult<Option<User>>;
    async fn update_user(&self, user: &User) -> AppResult<()>;
    async fn list_users(&self, filter: &UserFilter, page: Page) -> AppResult<Vec<User>>;
    async fn count_users(&self, filter: &UserFilter) -> AppResult<u64>;

    // ---------- questions ----------

    async fn insert_questions(&self, questions: &[Question]) -> AppResult<()>;
    async fn find_question(&self, id: &str) -> AppResult<Option<Question>>;
    /// 返回顺序与 `ids` 无关
    async fn find_questions(&self, ids: &[String]) -> AppResult<Vec<Question>>;
    async fn update_question(&self, question: &Question) -> AppResult<()>;
    async fn list_questions(&self, filter: &QuestionFilter, page: Page) -> AppResult<Vec<Question>>;
    async fn count_questions(&self, filter: &QuestionFilter) -> AppResult<u64>;

    // ---------- assessments ----------

    async fn insert_assessment(&self, assessment: &Assessment) -> AppResult<()>;
    async fn find_assessment(&self, id: &str) -> AppResult<Option<Assessment>>;
    async fn update_assessment(&self, assessment: &Assessment) -> AppResult<()>;
    async fn list_assessments(
        &self,
        filter: &AssessmentFilter,
        page: Page,
    ) -> AppResult<Vec<Assessment>>;
    async fn count_assessments(&self, filter: &AssessmentFilter) -> AppResult<u64>;

    // ---------- aptitude tests ----------

    async fn insert_aptitude_test(&self, test: &AptitudeTest) -> AppResult<()>;
    async fn find_aptitude_test(&self, id: &str) -> AppResult<Option<AptitudeTest>>;
    async fn update_aptitude_test(&self, test: &AptitudeTest) -> AppResult<()>;
    async fn list_aptitude_tests(&self, active_only: bool) -> AppResult<Vec<AptitudeTest>>;

    /// 单条插入的便捷方法
    async fn insert_question(&self, question: &Question) -> AppResult<()> {
        self.insert_questions(std::slice::from_ref(question)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_numbering() {
        assert_eq!(Page::numbered(1, 20), Page { skip: 0, limit: Some(20) });
        assert_eq!(Page::numbered(3, 10), Page { skip: 20, limit: Some(10) });
        assert_eq!(Page::numbered(0, 10), Page { skip: 0, limit: Some(10) });
    }

    #[test]
    fn test_page_numbering_is_bounded() {
        assert_eq!(Page::numbered(1, 100_000_000).limit, Some(MAX_PAGE_LIMIT as i64));
        assert_eq!(Page::numbered(1, 0).limit, Some(1));
        assert_eq!(Page::numbered(u64::MAX / 10, 20).skip, i64::MAX as u64);
        assert_eq!(Page::numbered(1_000_000_000_000_000_000, 100).skip, i64::MAX as u64);

        let items: Vec<u32> = (0..10).collect();
        assert!(Page::numbered(u64::MAX, u64::MAX).apply(items).is_empty());
    }

    #[test]
    fn test_page_apply() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(Page::numbered(2, 4).apply(items.clone()), vec![4, 5, 6, 7]);
        assert_eq!(Page::all().apply(items.clone()).len(), 10);
        assert!(Page::numbered(5, 4).apply(items).is_empty());
    }
}
