//! 能力测试流程 - 流程层
//!
//! 流程顺序：
//! 1. 启动时写入内置测试（题库为空时）
//! 2. get / start：检查可用状态和作答次数
//! 3. answer：记录答案，同一题重复作答覆盖
//! 4. complete：按正确答案计分 → 写入历史 → 更新测试统计

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::Store;
use crate::models::aptitude::AptitudeTest;
use crate::models::loaders::load_aptitude_seed;
use crate::models::user::{AptitudeAnswer, AptitudeHistory, CurrentAptitudeTest, User};

/// 测试及当前用户的作答次数
#[derive(Debug, Clone)]
pub struct AptitudeAccess {
    pub test: AptitudeTest,
    pub attempts: u32,
    pub attempts_remaining: u32,
}

/// 提交的答案，字段缺失时由流程返回 400
#[derive(Debug, Clone, Default)]
pub struct AptitudeAnswerSubmission {
    pub question_id: Option<String>,
    pub answer: Option<usize>,
    pub time_spent: Option<f64>,
}

/// 能力测试成绩
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AptitudeResult {
    pub score: f64,
    pub total_questions: usize,
    pub correct_answers: usize,
    /// 秒
    pub time_taken: f64,
    pub passed: bool,
    pub test_type: String,
}

/// 能力测试流程
pub struct AptitudeFlow {
    store: Arc<dyn Store>,
}

impl AptitudeFlow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 没有可用测试时写入内置测试，返回写入数量
    pub async fn seed_if_empty(&self) -> AppResult<usize> {
        if !self.store.list_aptitude_tests(true).await?.is_empty() {
            debug!("能力测试已存在，跳过初始化");
            return Ok(0);
        }

        let tests = load_aptitude_seed()?.build_tests()?;
        for test in &tests {
            self.store.insert_aptitude_test(test).await?;
            info!("🌱 写入能力测试: {} ({} 题)", test.title, test.questions.len());
        }
        Ok(tests.len())
    }

    /// 可用的测试
    pub async fn list(&self) -> AppResult<Vec<AptitudeTest>> {
        self.store.list_aptitude_tests(true).await
    }

    /// 作答历史，最新的在前
    pub fn history(&self, user: &User) -> Vec<AptitudeHistory> {
        let mut history = user.aptitude_history.clone();
        history.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        history
    }

    /// 读取测试并检查是否还能作答
    pub async fn get(&self, user: &User, test_id: &str) -> AppResult<AptitudeAccess> {
        let test = self.load_test(test_id).await?;
        if !test.is_active {
            return Err(AppError::forbidden("Aptitude test is not available"));
        }

        let attempts = user.aptitude_attempts.get(&test.id).copied().unwrap_or(0);
        let max_attempts = test.config.max_attempts;
        if attempts >= max_attempts {
            return Err(AppError::forbidden(format!(
                "Maximum attempts ({}) reached for this test",
                max_attempts
            )));
        }

        Ok(AptitudeAccess {
            attempts_remaining: max_attempts - attempts,
            attempts,
            test,
        })
    }

    /// 开始作答，覆盖之前未完成的作答
    pub async fn start(&self, user: &User, test_id: &str) -> AppResult<AptitudeAccess> {
        let access = self.get(user, test_id).await?;

        let mut user = user.clone();
        user.current_aptitude_test = Some(CurrentAptitudeTest {
            test_id: access.test.id.clone(),
            start_time: Utc::now(),
            answers: Vec::new(),
        });
        self.store.update_user(&user).await?;

        info!(
            "[{}] ▶️ 开始能力测试 {} (第 {} 次)",
            user.id,
            access.test.title,
            access.attempts + 1
        );
        Ok(access)
    }

    /// 记录一道题的答案
    pub async fn answer(
        &self,
        user: &User,
        test_id: &str,
        submission: AptitudeAnswerSubmission,
    ) -> AppResult<()> {
        let (Some(question_id), Some(answer)) = (submission.question_id, submission.answer) else {
            return Err(AppError::bad_request("questionId and answer are required"));
        };

        let test = self.load_test(test_id).await?;
        let mut user = user.clone();
        let current = active_attempt(&mut user, &test.id)?;

        let question = test
            .question_by_ref(&question_id)
            .ok_or_else(|| AppError::bad_request(format!("Unknown questionId: {}", question_id)))?;
        if answer >= question.options.len() {
            return Err(AppError::bad_request(format!(
                "answer must be between 0 and {}",
                question.options.len().saturating_sub(1)
            )));
        }

        current.answers.retain(|a| a.question_id != question_id);
        current.answers.push(AptitudeAnswer {
            question_id,
            answer,
            time_spent: submission.time_spent.filter(|t| t.is_finite() && *t >= 0.0).unwrap_or(0.0),
            timestamp: Utc::now(),
        });
        self.store.update_user(&user).await?;
        Ok(())
    }

    /// 完成作答并计分
    pub async fn complete(&self, user: &User, test_id: &str) -> AppResult<(AptitudeTest, AptitudeResult)> {
        let mut test = self.load_test(test_id).await?;
        let mut user = user.clone();
        let current = active_attempt(&mut user, &test.id)?.clone();

        let now = Utc::now();
        let total_questions = test.questions.len();
        let correct_answers = current
            .answers
            .iter()
            .filter(|a| {
                test.question_by_ref(&a.question_id)
                    .is_some_and(|q| q.correct_answer == a.answer)
            })
            .count();
        let score = if total_questions > 0 {
            correct_answers as f64 / total_questions as f64 * 100.0
        } else {
            0.0
        };
        let passed = score >= test.config.passing_score;
        let time_taken = ((now - current.start_time).num_milliseconds() as f64 / 1000.0).max(0.0);

        user.aptitude_history.push(AptitudeHistory {
            test_id: test.id.clone(),
            test_title: test.title.clone(),
            test_type: test.test_type.as_str().to_string(),
            score,
            passed,
            correct_answers,
            total_questions,
            completed_at: now,
            time_spent: time_taken,
            answers: current.answers,
        });
        *user.aptitude_attempts.entry(test.id.clone()).or_insert(0) += 1;
        user.current_aptitude_test = None;
        self.store.update_user(&user).await?;

        test.record_attempt(score, true);
        self.store.update_aptitude_test(&test).await?;

        info!(
            "[{}] ✅ 完成能力测试 {}: {}/{} ({:.1}%)",
            user.id, test.title, correct_answers, total_questions, score
        );

        let result = AptitudeResult {
            score,
            total_questions,
            correct_answers,
            time_taken,
            passed,
            test_type: test.test_type.as_str().to_string(),
        };
        Ok((test, result))
    }

    async fn load_test(&self, test_id: &str) -> AppResult<AptitudeTest> {
        self.store
            .find_aptitude_test(test_id)
            .await?
            .ok_or_else(|| AppError::not_found("Aptitude test not found"))
    }
}

/// 当前用户在该测试上的进行中作答
fn active_attempt<'a>(user: &'a mut User, test_id: &str) -> AppResult<&'a mut CurrentAptitudeTest> {
    match user.current_aptitude_test.as_mut() {
        Some(current) if current.test_id == test_id => Ok(current),
        _ => Err(AppError::bad_request("No active attempt for this test. Start the test first")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;
    use crate::models::aptitude::{question_ref, AptitudeTestType};
    use crate::models::user::{NewUser, UserRole};

    async fn setup() -> (Arc<MemoryStore>, AptitudeFlow, User) {
        let store = Arc::new(MemoryStore::new());
        let flow = AptitudeFlow::new(store.clone());
        let user = User::new(NewUser {
            email: "s@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "S".to_string(),
            last_name: "T".to_string(),
            role: UserRole::Student,
            institution: "Inst".to_string(),
            department: None,
            year: None,
            roll_number: None,
        });
        store.insert_user(&user).await.unwrap();
        (store, flow, user)
    }

    async fn quantitative(flow: &AptitudeFlow) -> AptitudeTest {
        flow.list()
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.test_type == AptitudeTestType::Quantitative)
            .unwrap()
    }

    #[tokio::test]
    async fn test_seed_once() {
        let (_, flow, _) = setup().await;
        assert_eq!(flow.seed_if_empty().await.unwrap(), 4);
        assert_eq!(flow.seed_if_empty().await.unwrap(), 0);

        let tests = flow.list().await.unwrap();
        assert_eq!(tests.len(), 4);
        let comprehensive = tests.iter().find(|t| t.is_comprehensive()).unwrap();
        assert_eq!(comprehensive.config.time_limit, 3600);
        assert_eq!(comprehensive.total_sections(), 3);
    }

    #[tokio::test]
    async fn test_answer_requires_fields_and_attempt() {
        let (_, flow, user) = setup().await;
        flow.seed_if_empty().await.unwrap();
        let test = quantitative(&flow).await;

        let err = flow
            .answer(&user, &test.id, AptitudeAnswerSubmission::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "业务错误: questionId and answer are required");

        let submission = AptitudeAnswerSubmission {
            question_id: Some("q_1".to_string()),
            answer: Some(0),
            time_spent: None,
        };
        let err = flow.answer(&user, &test.id, submission.clone()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

        let err = flow.answer(&user, "missing", submission).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_full_attempt_scores_answers() {
        let (store, flow, user) = setup().await;
        flow.seed_if_empty().await.unwrap();
        let test = quantitative(&flow).await;

        let access = flow.start(&user, &test.id).await.unwrap();
        assert_eq!(access.attempts, 0);
        assert_eq!(access.attempts_remaining, 3);
        let user = store.find_user(&user.id).await.unwrap().unwrap();

        // 第一题先答错再改对，第二题答错
        let wrong_first = (test.questions[0].correct_answer + 1) % test.questions[0].options.len();
        for (index, answer) in [
            (0, wrong_first),
            (0, test.questions[0].correct_answer),
            (1, (test.questions[1].correct_answer + 1) % test.questions[1].options.len()),
        ] {
            let user = store.find_user(&user.id).await.unwrap().unwrap();
            flow.answer(
                &user,
                &test.id,
                AptitudeAnswerSubmission {
                    question_id: Some(question_ref(index)),
                    answer: Some(answer),
                    time_spent: Some(12.0),
                },
            )
            .await
            .unwrap();
        }

        let user = store.find_user(&user.id).await.unwrap().unwrap();
        assert_eq!(user.current_aptitude_test.as_ref().unwrap().answers.len(), 2);

        let (updated, result) = flow.complete(&user, &test.id).await.unwrap();
        let total = test.questions.len();
        assert_eq!(result.total_questions, total);
        assert_eq!(result.correct_answers, 1);
        assert!((result.score - 100.0 / total as f64).abs() < 1e-9);
        assert!(!result.passed);
        assert_eq!(result.test_type, "quantitative");
        assert_eq!(updated.usage_stats.total_attempts, 1);

        let user = store.find_user(&user.id).await.unwrap().unwrap();
        assert!(user.current_aptitude_test.is_none());
        assert_eq!(user.aptitude_attempts[&test.id], 1);
        let history = flow.history(&user);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].correct_answers, 1);

        // 没有进行中的作答时不能完成
        let err = flow.complete(&user, &test.id).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_attempt_limit() {
        let (store, flow, mut user) = setup().await;
        flow.seed_if_empty().await.unwrap();
        let test = quantitative(&flow).await;

        user.aptitude_attempts.insert(test.id.clone(), 3);
        store.update_user(&user).await.unwrap();

        let err = flow.start(&user, &test.id).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert_eq!(
            err.to_string(),
            "认证错误: Maximum attempts (3) reached for this test"
        );
    }

    #[tokio::test]
    async fn test_inactive_test_is_forbidden() {
        let (store, flow, user) = setup().await;
        flow.seed_if_empty().await.unwrap();
        let mut test = quantitative(&flow).await;
        test.is_active = false;
        store.update_aptitude_test(&test).await.unwrap();

        let err = flow.get(&user, &test.id).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
