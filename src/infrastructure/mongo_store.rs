//! MongoDB 存储

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use super::store::{AssessmentFilter, Page, QuestionFilter, Store, UserFilter};
use crate::error::{AppError, AppResult, StoreError};
use crate::models::aptitude::AptitudeTest;
use crate::models::assessment::Assessment;
use crate::models::question::Question;
use crate::models::user::User;

const USERS: &str = "users";
const QUESTIONS: &str = "questions";
const ASSESSMENTS: &str = "assessments";
const APTITUDE_TESTS: &str = "aptitude_tests";

const DEFAULT_DATABASE: &str = "adaptive_assessment";
const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    db: Database,
}

fn mongo_err(collection: &'static str) -> impl FnOnce(mongodb::error::Error) -> AppError {
    move |source| StoreError::Mongo { collection, source }.into()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// 从唯一索引冲突信息中判断是哪个字段
fn duplicate_field(err: &mongodb::error::Error) -> &'static str {
    if err.to_string().contains("roll_number") {
        "roll_number"
    } else {
        "email"
    }
}

impl MongoStore {
    /// 连接数据库并建立索引
    pub async fn connect(uri: &str) -> AppResult<Self> {
        let client = Client::with_uri_str(uri).await.map_err(mongo_err("client"))?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));
        info!("🍃 已连接 MongoDB 数据库: {}", db.name());

        let store = Self { db };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let users = self.users();
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await
            .map_err(mongo_err(USERS))?;
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "roll_number": 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .partial_filter_expression(doc! { "roll_number": { "$type": "string" } })
                            .build(),
                    )
                    .build(),
            )
            .await
            .map_err(mongo_err(USERS))?;

        self.questions()
            .create_index(IndexModel::builder().keys(doc! { "subject": 1, "topic": 1 }).build())
            .await
            .map_err(mongo_err(QUESTIONS))?;
        self.assessments()
            .create_index(IndexModel::builder().keys(doc! { "user_id": 1, "created_at": -1 }).build())
            .await
            .map_err(mongo_err(ASSESSMENTS))?;
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn questions(&self) -> Collection<Question> {
        self.db.collection(QUESTIONS)
    }

    fn assessments(&self) -> Collection<Assessment> {
        self.db.collection(ASSESSMENTS)
    }

    fn aptitude_tests(&self) -> Collection<AptitudeTest> {
        self.db.collection(APTITUDE_TESTS)
    }
}

// ========== 通用操作 ==========

async fn find_many<T>(
    coll: &Collection<T>,
    name: &'static str,
    filter: Document,
    page: Page,
) -> AppResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut find = coll
        .find(filter)
        .sort(doc! { "created_at": -1, "_id": -1 })
        .skip(page.skip);
    if let Some(limit) = page.limit {
        find = find.limit(limit);
    }
    let cursor = find.await.map_err(mongo_err(name))?;
    cursor.try_collect().await.map_err(mongo_err(name))
}

async fn replace_by_id<T>(coll: &Collection<T>, name: &'static str, id: &str, doc: &T) -> AppResult<()>
where
    T: Serialize + Send + Sync,
{
    coll.replace_one(doc! { "_id": id }, doc)
        .await
        .map_err(mongo_err(name))?;
    Ok(())
}

// ========== 查询条件 ==========

fn user_filter(filter: &UserFilter) -> Document {
    let mut d = Document::new();
    if let Some(role) = filter.role {
        d.insert("role", role.as_str());
    }
    if let Some(active) = filter.is_active {
        d.insert("is_active", active);
    }
    if let Some(t) = filter.created_after {
        d.insert("created_at", doc! { "$gte": t.timestamp_millis() });
    }
    if let Some(instructor) = &filter.assigned_instructor {
        d.insert("assigned_instructor", instructor.as_str());
    }
    if let Some(batch) = &filter.batch {
        d.insert("batch", batch.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = regex::escape(search);
        let regex = doc! { "$regex": pattern, "$options": "i" };
        d.insert(
            "$or",
            vec![
                doc! { "first_name": regex.clone() },
                doc! { "last_name": regex.clone() },
                doc! { "email": regex },
            ],
        );
    }
    d
}

fn question_filter(filter: &QuestionFilter) -> Document {
    let mut d = Document::new();
    if let Some(subject) = &filter.subject {
        d.insert("subject", subject.as_str());
    }
    if let Some(topic) = &filter.topic {
        d.insert("topic", topic.as_str());
    }
    if let Some(difficulty) = filter.difficulty {
        d.insert("difficulty", difficulty.as_str());
    }
    if let Some(active) = filter.is_active {
        d.insert("is_active", active);
    }
    d
}

fn assessment_filter(filter: &AssessmentFilter) -> Document {
    let mut d = Document::new();
    if let Some(user_id) = &filter.user_id {
        d.insert("user_id", user_id.as_str());
    }
    if !filter.statuses.is_empty() {
        let statuses: Vec<&str> = filter.statuses.iter().map(|s| s.as_str()).collect();
        d.insert("status", doc! { "$in": statuses });
    }
    if let Some(subject) = &filter.subject {
        d.insert("subject", subject.as_str());
    }
    if let Some(t) = filter.created_after {
        d.insert("created_at", doc! { "$gte": t.timestamp_millis() });
    }
    if let Some(t) = filter.last_accessed_before {
        d.insert("last_accessed_at", doc! { "$lt": t.timestamp_millis() });
    }
    d
}

#[async_trait]
impl Store for MongoStore {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        match self.users().insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate {
                collection: USERS,
                field: duplicate_field(&e),
            }
            .into()),
            Err(e) => Err(mongo_err(USERS)(e)),
        }
    }

    async fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        self.users()
            .find_one(doc! { "_id": id })
            .await
            .map_err(mongo_err(USERS))
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.users()
            .find_one(doc! { "email": email.to_lowercase() })
            .await
            .map_err(mongo_err(USERS))
    }

    async fn find_user_by_roll_number(&self, roll_number: &str) -> AppResult<Option<User>> {
        self.users()
            .find_one(doc! { "roll_number": roll_number })
            .await
            .map_err(mongo_err(USERS))
    }

    async fn update_user(&self, user: &User) -> AppResult<()> {
        replace_by_id(&self.users(), USERS, &user.id, user).await
    }

    async fn list_users(&self, filter: &UserFilter, page: Page) -> AppResult<Vec<User>> {
        find_many(&self.users(), USERS, user_filter(filter), page).await
    }

    async fn count_users(&self, filter: &UserFilter) -> AppResult<u64> {
        self.users()
            .count_documents(user_filter(filter))
            .await
            .map_err(mongo_err(USERS))
    }

    async fn insert_questions(&self, questions: &[Question]) -> AppResult<()> {
        if questions.is_empty() {
            return Ok(());
        }
        self.questions()
            .insert_many(questions)
            .await
            .map_err(mongo_err(QUESTIONS))?;
        Ok(())
    }

    async fn find_question(&self, id: &str) -> AppResult<Option<Question>> {
        self.questions()
            .find_one(doc! { "_id": id })
            .await
            .map_err(mongo_err(QUESTIONS))
    }

    async fn find_questions(&self, ids: &[String]) -> AppResult<Vec<Question>> {
        let filter = doc! { "_id": { "$in": ids.to_vec() } };
        find_many(&self.questions(), QUESTIONS, filter, Page::all()).await
    }

    async fn update_question(&self, question: &Question) -> AppResult<()> {
        replace_by_id(&self.questions(), QUESTIONS, &question.id, question).await
    }

    async fn list_questions(&self, filter: &QuestionFilter, page: Page) -> AppResult<Vec<Question>> {
        find_many(&self.questions(), QUESTIONS, question_filter(filter), page).await
    }

    async fn count_questions(&self, filter: &QuestionFilter) -> AppResult<u64> {
        self.questions()
            .count_documents(question_filter(filter))
            .await
            .map_err(mongo_err(QUESTIONS))
    }

    async fn insert_assessment(&self, assessment: &Assessment) -> AppResult<()> {
        self.assessments()
            .insert_one(assessment)
            .await
            .map_err(mongo_err(ASSESSMENTS))?;
        Ok(())
    }

    async fn find_assessment(&self, id: &str) -> AppResult<Option<Assessment>> {
        self.assessments()
            .find_one(doc! { "_id": id })
            .await
            .map_err(mongo_err(ASSESSMENTS))
    }

    async fn update_assessment(&self, assessment: &Assessment) -> AppResult<()> {
        replace_by_id(&self.assessments(), ASSESSMENTS, &assessment.id, assessment).await
    }

    async fn list_assessments(
        &self,
        filter: &AssessmentFilter,
        page: Page,
    ) -> AppResult<Vec<Assessment>> {
        find_many(&self.assessments(), ASSESSMENTS, assessment_filter(filter), page).await
    }

    async fn count_assessments(&self, filter: &AssessmentFilter) -> AppResult<u64> {
        self.assessments()
            .count_documents(assessment_filter(filter))
            .await
            .map_err(mongo_err(ASSESSMENTS))
    }

    async fn insert_aptitude_test(&self, test: &AptitudeTest) -> AppResult<()> {
        self.aptitude_tests()
            .insert_one(test)
            .await
            .map_err(mongo_err(APTITUDE_TESTS))?;
        Ok(())
    }

    async fn find_aptitude_test(&self, id: &str) -> AppResult<Option<AptitudeTest>> {
        self.aptitude_tests()
            .find_one(doc! { "_id": id })
            .await
            .map_err(mongo_err(APTITUDE_TESTS))
    }

    async fn update_aptitude_test(&self, test: &AptitudeTest) -> AppResult<()> {
        replace_by_id(&self.aptitude_tests(), APTITUDE_TESTS, &test.id, test).await
    }

    async fn list_aptitude_tests(&self, active_only: bool) -> AppResult<Vec<AptitudeTest>> {
        let filter = if active_only {
            doc! { "is_active": true }
        } else {
            Document::new()
        };
        find_many(&self.aptitude_tests(), APTITUDE_TESTS, filter, Page::all()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::AssessmentStatus;
    use crate::models::user::UserRole;

    #[test]
    fn test_user_filter_document() {
        let d = user_filter(&UserFilter {
            role: Some(UserRole::Instructor),
            is_active: Some(true),
            ..Default::default()
        });
        assert_eq!(d, doc! { "role": "instructor", "is_active": true });
    }

    #[test]
    fn test_user_search_is_escaped() {
        let d = user_filter(&UserFilter {
            search: Some("a.b".to_string()),
            ..Default::default()
        });
        let or = d.get_array("$or").unwrap();
        assert_eq!(or.len(), 3);
        let first = or[0].as_document().unwrap();
        let pattern = first.get_document("first_name").unwrap().get_str("$regex").unwrap();
        assert_eq!(pattern, "a\\.b");
    }

    #[test]
    fn test_assessment_filter_document() {
        let d = assessment_filter(
            &AssessmentFilter::for_user("u1")
                .with_statuses(&[AssessmentStatus::NotStarted, AssessmentStatus::InProgress]),
        );
        assert_eq!(
            d,
            doc! { "user_id": "u1", "status": { "$in": ["not-started", "in-progress"] } }
        );
    }
}
