pub mod aptitude_flow;
pub mod assessment_flow;
pub mod auth_flow;
pub mod question_bank_flow;
pub mod report_flow;

pub use aptitude_flow::AptitudeFlow;
pub use assessment_flow::AssessmentFlow;
pub use auth_flow::{AuthFlow, Registration};
pub use question_bank_flow::QuestionBankFlow;
pub use report_flow::ReportFlow;
