//! 进程内存存储，用于本地调试和测试

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{AssessmentFilter, Page, QuestionFilter, Store, UserFilter};
use crate::error::{AppResult, StoreError};
use crate::models::aptitude::AptitudeTest;
use crate::models::assessment::Assessment;
use crate::models::question::Question;
use crate::models::user::User;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    questions: RwLock<HashMap<String, Question>>,
    assessments: RwLock<HashMap<String, Assessment>>,
    aptitude_tests: RwLock<HashMap<String, AptitudeTest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 按创建时间倒序，时间相同按 ID 倒序
fn newest_first<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (chrono::DateTime<chrono::Utc>, &str),
{
    items.sort_by(|a, b| {
        let (ta, ia) = key(a);
        let (tb, ib) = key(b);
        tb.cmp(&ta).then_with(|| ib.cmp(ia))
    });
    items
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate { collection: "users", field: "email" }.into());
        }
        if let Some(roll) = &user.roll_number {
            if users.values().any(|u| u.roll_number.as_ref() == Some(roll)) {
                return Err(StoreError::Duplicate {
                    collection: "users",
                    field: "roll_number",
                }
                .into());
            }
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_roll_number(&self, roll_number: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.roll_number.as_deref() == Some(roll_number))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> AppResult<()> {
        self.users.write().await.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list_users(&self, filter: &UserFilter, page: Page) -> AppResult<Vec<User>> {
        let users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        Ok(page.apply(newest_first(users, |u| (u.created_at, u.id.as_str()))))
    }

    async fn count_users(&self, filter: &UserFilter) -> AppResult<u64> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| filter.matches(u)).count() as u64)
    }

    async fn insert_questions(&self, questions: &[Question]) -> AppResult<()> {
        let mut store = self.questions.write().await;
        for q in questions {
            store.insert(q.id.clone(), q.clone());
        }
        Ok(())
    }

    async fn find_question(&self, id: &str) -> AppResult<Option<Question>> {
        Ok(self.questions.read().await.get(id).cloned())
    }

    async fn find_questions(&self, ids: &[String]) -> AppResult<Vec<Question>> {
        let store = self.questions.read().await;
        Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
    }

    async fn update_question(&self, question: &Question) -> AppResult<()> {
        self.questions
            .write()
            .await
            .insert(question.id.clone(), question.clone());
        Ok(())
    }

    async fn list_questions(&self, filter: &QuestionFilter, page: Page) -> AppResult<Vec<Question>> {
        let questions: Vec<Question> = self
            .questions
            .read()
            .await
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        Ok(page.apply(newest_first(questions, |q| (q.created_at, q.id.as_str()))))
    }

    async fn count_questions(&self, filter: &QuestionFilter) -> AppResult<u64> {
        let questions = self.questions.read().await;
        Ok(questions.values().filter(|q| filter.matches(q)).count() as u64)
    }

    async fn insert_assessment(&self, assessment: &Assessment) -> AppResult<()> {
        self.assessments
            .write()
            .await
            .insert(assessment.id.clone(), assessment.clone());
        Ok(())
    }

    async fn find_assessment(&self, id: &str) -> AppResult<Option<Assessment>> {
        Ok(self.assessments.read().await.get(id).cloned())
    }

    async fn update_assessment(&self, assessment: &Assessment) -> AppResult<()> {
        self.assessments
            .write()
            .await
            .insert(assessment.id.clone(), assessment.clone());
        Ok(())
    }

    async fn list_assessments(
        &self,
        filter: &AssessmentFilter,
        page: Page,
    ) -> AppResult<Vec<Assessment>> {
        let assessments: Vec<Assessment> = self
            .assessments
            .read()
            .await
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        Ok(page.apply(newest_first(assessments, |a| (a.created_at, a.id.as_str()))))
    }

    async fn count_assessments(&self, filter: &AssessmentFilter) -> AppResult<u64> {
        let assessments = self.assessments.read().await;
        Ok(assessments.values().filter(|a| filter.matches(a)).count() as u64)
    }

    async fn insert_aptitude_test(&self, test: &AptitudeTest) -> AppResult<()> {
        self.aptitude_tests
            .write()
            .await
            .insert(test.id.clone(), test.clone());
        Ok(())
    }

    async fn find_aptitude_test(&self, id: &str) -> AppResult<Option<AptitudeTest>> {
        Ok(self.aptitude_tests.read().await.get(id).cloned())
    }

    async fn update_aptitude_test(&self, test: &AptitudeTest) -> AppResult<()> {
        self.aptitude_tests
            .write()
            .await
            .insert(test.id.clone(), test.clone());
        Ok(())
    }

    async fn list_aptitude_tests(&self, active_only: bool) -> AppResult<Vec<AptitudeTest>> {
        let tests: Vec<AptitudeTest> = self
            .aptitude_tests
            .read()
            .await
            .values()
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect();
        Ok(newest_first(tests, |t| (t.created_at, t.id.as_str())))
    }
}
