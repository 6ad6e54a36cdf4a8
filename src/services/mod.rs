pub mod adaptive_engine;
pub mod analytics_service;
pub mod auth_service;
pub mod llm_service;
pub mod question_generator;

pub use adaptive_engine::{AdaptiveEngine, ItemParameters, ItemResponse, SelectionStrategy};
pub use auth_service::{AuthService, Claims};
pub use llm_service::{ChatModel, LlmService};
pub use question_generator::{DifficultyDistribution, GenerationRequest, QuestionGenerator};
