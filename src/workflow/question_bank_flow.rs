//! 题库流程 - 流程层
//!
//! 流程顺序：
//! 1. list / get：按条件查询题目
//! 2. create：教师手工录入，校验后入库
//! 3. generate：AI 出题 → 入库
//! 4. review：记录审核结果

use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::infrastructure::{Page, QuestionFilter, Store};
use crate::models::question::{Question, ReviewStatus};
use crate::models::user::User;
use crate::services::{DifficultyDistribution, QuestionGenerator};

/// 单次生成的题量上限
pub const MAX_GENERATED_PER_REQUEST: usize = 20;

/// 题库流程
pub struct QuestionBankFlow {
    store: Arc<dyn Store>,
    generator: Arc<QuestionGenerator>,
}

impl QuestionBankFlow {
    pub fn new(store: Arc<dyn Store>, generator: Arc<QuestionGenerator>) -> Self {
        Self { store, generator }
    }

    /// 查询在用题目，返回 (当前页, 总数)
    pub async fn list(&self, filter: QuestionFilter, page: u64, limit: u64) -> AppResult<(Vec<Question>, u64)> {
        let filter = QuestionFilter {
            is_active: Some(true),
            ..filter
        };
        let total = self.store.count_questions(&filter).await?;
        let questions = self
            .store
            .list_questions(&filter, Page::numbered(page, limit))
            .await?;
        Ok((questions, total))
    }

    pub async fn get(&self, question_id: &str) -> AppResult<Question> {
        self.store
            .find_question(question_id)
            .await?
            .ok_or_else(|| AppError::not_found("Question not found"))
    }

    /// 手工录入
    pub async fn create(&self, author: &User, mut question: Question) -> AppResult<Question> {
        question.created_by = author.id.clone();
        for (i, option) in question.options.iter_mut().enumerate() {
            option.is_correct = i == question.correct_answer;
        }
        question.validate().map_err(AppError::validation)?;

        self.store.insert_question(&question).await?;
        info!("[{}] 📝 录入题目 {} ({}/{})", author.id, question.id, question.subject, question.topic);
        Ok(question)
    }

    /// AI 出题并入库
    pub async fn generate(
        &self,
        author: &User,
        subject: &str,
        topics: &[String],
        count: usize,
        distribution: Option<DifficultyDistribution>,
    ) -> AppResult<Vec<Question>> {
        if subject.trim().is_empty() {
            return Err(AppError::validation("subject must not be empty"));
        }
        if count == 0 || count > MAX_GENERATED_PER_REQUEST {
            return Err(AppError::validation(format!(
                "count must be between 1 and {}",
                MAX_GENERATED_PER_REQUEST
            )));
        }

        let questions: Vec<Question> = self
            .generator
            .generate_many(subject, topics, count, distribution)
            .await
            .into_iter()
            .map(|g| g.into_question(&author.id))
            .collect();
        self.store.insert_questions(&questions).await?;

        info!("[{}] 🤖 生成并入库 {} 道题目 ({})", author.id, questions.len(), subject);
        Ok(questions)
    }

    /// 记录审核结果
    pub async fn review(
        &self,
        reviewer: &User,
        question_id: &str,
        status: ReviewStatus,
        comments: Option<String>,
    ) -> AppResult<Question> {
        let mut question = self.get(question_id).await?;
        question.review_status = status;
        question.reviewed_by = Some(reviewer.id.clone());
        question.review_comments = comments;
        if status == ReviewStatus::Rejected {
            question.is_active = false;
        }
        self.store.update_question(&question).await?;
        info!("[{}] ✅ 审核题目 {}: {:?}", reviewer.id, question.id, status);
        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;
    use crate::models::question::{Difficulty, QuestionOption};
    use crate::models::user::{NewUser, UserRole};

    fn teacher() -> User {
        User::new(NewUser {
            email: "t@x.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "T".to_string(),
            last_name: "X".to_string(),
            role: UserRole::Instructor,
            institution: "Inst".to_string(),
            department: None,
            year: None,
            roll_number: None,
        })
    }

    fn flow() -> (Arc<MemoryStore>, QuestionBankFlow) {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(QuestionGenerator::with_model(None, 2).unwrap());
        (store.clone(), QuestionBankFlow::new(store, generator))
    }

    fn options(n: usize) -> Vec<QuestionOption> {
        (0..n)
            .map(|i| QuestionOption { text: format!("option {i}"), is_correct: false })
            .collect()
    }

    #[tokio::test]
    async fn test_create_marks_correct_option() {
        let (_, flow) = flow();
        let q = Question::new("2 + 2 = ?", options(4), 2, Difficulty::Easy, "Math", "Arithmetic", "");
        let saved = flow.create(&teacher(), q).await.unwrap();
        assert!(saved.options[2].is_correct);
        assert!(!saved.options[0].is_correct);
        assert_eq!(flow.get(&saved.id).await.unwrap().question_text, "2 + 2 = ?");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_answer_index() {
        let (_, flow) = flow();
        let q = Question::new("?", options(2), 5, Difficulty::Easy, "Math", "Arithmetic", "");
        let err = flow.create(&teacher(), q).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_generate_and_review() {
        let (store, flow) = flow();
        let author = teacher();
        let topics = vec!["Algebra".to_string()];
        let questions = flow.generate(&author, "Mathematics", &topics, 3, None).await.unwrap();
        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|q| q.ai_generated.is_ai_generated));

        let (page, total) = flow.list(QuestionFilter::default(), 1, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);

        let reviewed = flow
            .review(&author, &questions[0].id, ReviewStatus::Rejected, Some("unclear".into()))
            .await
            .unwrap();
        assert!(!reviewed.is_active);
        let stored = store.find_question(&questions[0].id).await.unwrap().unwrap();
        assert_eq!(stored.review_status, ReviewStatus::Rejected);

        let (_, total) = flow.list(QuestionFilter::default(), 1, 10).await.unwrap();
        assert_eq!(total, 2);

        assert!(flow.generate(&author, "Math", &topics, 0, None).await.is_err());
        assert!(flow.get("missing").await.is_err());
    }
}
