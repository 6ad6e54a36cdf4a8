pub mod aptitude;
pub mod assessment;
pub mod grade;
pub mod loaders;
pub mod question;
pub mod user;

pub use aptitude::{AptitudeQuestion, AptitudeTest, AptitudeTestType};
pub use assessment::{Assessment, AssessmentConfig, AssessmentQuestion, AssessmentStatus, AssessmentType};
pub use grade::Grade;
pub use question::{Difficulty, Question, QuestionOption};
pub use user::{User, UserRole};

/// 生成新的文档 ID（ObjectId 十六进制串）
pub fn new_object_id() -> String {
    mongodb::bson::oid::ObjectId::new().to_hex()
}
