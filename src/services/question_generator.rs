//! 出题服务 - 业务能力层
//!
//! 通过 LLM 生成选择题，失败时退回内置模板

use chrono::Utc;
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::adaptive_engine;
use super::llm_service::{ChatModel, LlmService};
use crate::config::Config;
use crate::error::{AppResult, LlmError};
use crate::models::loaders::{load_fallback_bank, FallbackBank};
use crate::models::question::{AiGenerated, Difficulty, Question, QuestionOption};

const SYSTEM_PROMPT: &str =
    "You are an expert assessment designer. Respond with a single JSON object and nothing else.";

/// 单题生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub subtopic: Option<String>,
    pub skill_tested: Option<String>,
}

impl GenerationRequest {
    pub fn new(subject: impl Into<String>, topic: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            subject: subject.into(),
            topic: topic.into(),
            difficulty,
            subtopic: None,
            skill_tested: None,
        }
    }
}

/// 生成的题目
#[derive(Debug, Clone)]
pub struct GeneratedQuestion {
    pub question_text: String,
    pub options: Vec<QuestionOption>,
    pub correct_answer: usize,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub difficulty_score: f64,
    pub subject: String,
    pub topic: String,
    pub subtopic: Option<String>,
    pub tags: Vec<String>,
    pub skill_tested: String,
    /// 来自 LLM 时为模型名，兜底模板为 `None`
    pub generation_model: Option<String>,
    pub generation_prompt: Option<String>,
}

impl GeneratedQuestion {
    /// 转成题库文档
    pub fn into_question(self, created_by: &str) -> Question {
        let mut question = Question::new(
            self.question_text,
            self.options,
            self.correct_answer,
            self.difficulty,
            self.subject,
            self.topic,
            created_by,
        );
        question.explanation = Some(self.explanation);
        question.difficulty_score = self.difficulty_score;
        // 新题没有作答数据，难度参数先按难度分估计
        question.psychometrics.difficulty = (self.difficulty_score / 100.0).clamp(0.0, 1.0);
        question.psychometrics.irt_difficulty = Some(adaptive_engine::theta_for_score(self.difficulty_score));
        question.subtopic = self.subtopic;
        question.tags = self.tags;
        question.ai_generated = AiGenerated {
            is_ai_generated: true,
            generation_prompt: self.generation_prompt,
            generation_model: Some(
                self.generation_model
                    .unwrap_or_else(|| "fallback-template".to_string()),
            ),
            generation_timestamp: Some(Utc::now()),
        };
        question
    }
}

/// 难度分布（各难度题数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DifficultyDistribution {
    #[serde(default)]
    pub easy: usize,
    #[serde(default)]
    pub medium: usize,
    #[serde(default)]
    pub hard: usize,
}

impl DifficultyDistribution {
    /// 默认每个难度 count/3
    pub fn even(count: usize) -> Self {
        Self {
            easy: count / 3,
            medium: count / 3,
            hard: count / 3,
        }
    }

    /// 第 `index` 题的难度：先 easy，再 medium，其余 hard
    pub fn difficulty_at(&self, index: usize) -> Difficulty {
        if index < self.easy {
            Difficulty::Easy
        } else if index < self.easy + self.medium {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }
}

/// 出题服务
pub struct QuestionGenerator {
    model: Option<Arc<dyn ChatModel>>,
    fallback: FallbackBank,
    max_concurrency: usize,
}

impl QuestionGenerator {
    /// 根据配置创建；没有 API key 时只使用兜底模板
    pub fn new(config: &Config) -> AppResult<Self> {
        let model: Option<Arc<dyn ChatModel>> = if config.ai_enabled() {
            info!("🤖 AI 出题已启用，模型: {}", config.gemini_model_name);
            Some(Arc::new(LlmService::new(config)))
        } else {
            warn!("⚠️ 未配置 GEMINI_API_KEY，使用兜底模板出题");
            None
        };
        Self::with_model(model, config.max_concurrent_generations)
    }

    pub fn with_model(model: Option<Arc<dyn ChatModel>>, max_concurrency: usize) -> AppResult<Self> {
        Ok(Self {
            model,
            fallback: load_fallback_bank()?,
            max_concurrency: max_concurrency.max(1),
        })
    }

    pub fn ai_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// 生成一道题，LLM 不可用或返回内容不合格时使用兜底模板
    pub async fn generate(&self, request: &GenerationRequest) -> GeneratedQuestion {
        let Some(model) = &self.model else {
            return self.fallback_question(request);
        };

        let prompt = build_prompt(request);
        let result = match model.send_to_llm(&prompt, Some(SYSTEM_PROMPT)).await {
            Ok(text) => parse_response(&text, request).map_err(Into::into),
            Err(e) => Err(e),
        };

        match result {
            Ok(mut question) => {
                question.generation_model = Some(model.model_name().to_string());
                question.generation_prompt = Some(prompt);
                debug!("✅ AI 出题成功: {} / {}", request.subject, request.topic);
                question
            }
            Err(e) => {
                warn!("AI 出题失败，使用兜底模板: {}", e);
                self.fallback_question(request)
            }
        }
    }

    /// 批量生成，知识点轮流使用，结果保持顺序
    pub async fn generate_many(
        &self,
        subject: &str,
        topics: &[String],
        count: usize,
        distribution: Option<DifficultyDistribution>,
    ) -> Vec<GeneratedQuestion> {
        let distribution = distribution.unwrap_or_else(|| DifficultyDistribution::even(count));
        let fallback_topics = [subject.to_string()];
        let topics = if topics.is_empty() { &fallback_topics[..] } else { topics };

        let requests: Vec<GenerationRequest> = (0..count)
            .map(|i| {
                GenerationRequest::new(subject, topics[i % topics.len()].clone(), distribution.difficulty_at(i))
            })
            .collect();

        info!(
            "📝 开始生成 {} 道题目 (科目: {}, 并发: {})",
            count, subject, self.max_concurrency
        );

        stream::iter(requests)
            .map(|request| async move { self.generate(&request).await })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    /// 兜底模板出题
    pub fn fallback_question(&self, request: &GenerationRequest) -> GeneratedQuestion {
        let GenerationRequest { subject, topic, difficulty, .. } = request;
        let (question_text, options, correct, explanation) =
            match self.fallback.find(subject, topic, *difficulty) {
                Some(t) => (t.question.clone(), t.options.clone(), t.correct, t.explanation.clone()),
                None => (
                    format!("What is a key concept in {}?", topic),
                    ["Option A", "Option B", "Option C", "Option D"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                    1,
                    format!("This question tests understanding of {} concepts.", topic),
                ),
            };

        GeneratedQuestion {
            question_text,
            options: options
                .into_iter()
                .enumerate()
                .map(|(i, text)| QuestionOption { text, is_correct: i == correct })
                .collect(),
            correct_answer: correct,
            explanation,
            difficulty: *difficulty,
            difficulty_score: difficulty.default_score(),
            subject: subject.clone(),
            topic: topic.clone(),
            subtopic: Some(request.subtopic.clone().unwrap_or_else(|| "General".to_string())),
            tags: default_tags(subject, topic),
            skill_tested: request
                .skill_tested
                .clone()
                .unwrap_or_else(|| format!("{} knowledge", topic)),
            generation_model: None,
            generation_prompt: None,
        }
    }
}

fn default_tags(subject: &str, topic: &str) -> Vec<String> {
    vec![subject.to_lowercase(), topic.to_lowercase().replace(' ', "-")]
}

/// 构建出题提示词
pub fn build_prompt(request: &GenerationRequest) -> String {
    let difficulty = request.difficulty;
    format!(
        r#"Generate a high-quality multiple-choice question for an educational assessment platform.

Subject: {subject}
Topic: {topic}
Difficulty: {level} ({description})
Subtopic: {subtopic}
Skill Tested: {skill}

Requirements:
1. Create a clear, well-structured question
2. Provide exactly 4 options (A, B, C, D)
3. Only one option should be correct
4. Include a detailed explanation
5. Make it appropriate for {level} level
6. Ensure the question tests practical understanding

Format your response as JSON:
{{
    "question_text": "Your question here",
    "options": [
        {{"text": "Option A", "is_correct": false}},
        {{"text": "Option B", "is_correct": false}},
        {{"text": "Option C", "is_correct": true}},
        {{"text": "Option D", "is_correct": false}}
    ],
    "correct_answer": 2,
    "explanation": "Detailed explanation of why the correct answer is right",
    "difficulty_score": 75,
    "tags": ["tag1", "tag2"],
    "skill_tested": "Specific skill being tested"
}}

Generate the question now:"#,
        subject = request.subject,
        topic = request.topic,
        level = difficulty.as_str(),
        description = difficulty.description(),
        subtopic = request.subtopic.as_deref().unwrap_or("General"),
        skill = request.skill_tested.as_deref().unwrap_or("General knowledge"),
    )
}

fn code_fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").ok())
        .as_ref()
}

/// 取出回复中的 JSON 对象：优先代码块，再取第一个 `{` 到最后一个 `}`
pub fn extract_json(text: &str) -> Option<&str> {
    let body = code_fence()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Text(String),
    Full {
        text: String,
        #[serde(default)]
        is_correct: bool,
    },
}

#[derive(Deserialize)]
struct RawQuestion {
    question_text: Option<String>,
    options: Option<Vec<RawOption>>,
    correct_answer: Option<i64>,
    explanation: Option<String>,
    difficulty_score: Option<f64>,
    #[serde(default)]
    tags: Vec<String>,
    skill_tested: Option<String>,
}

fn unparseable(reason: impl Into<String>) -> LlmError {
    LlmError::UnparseableQuestion { reason: reason.into() }
}

/// 解析并校验 LLM 返回的题目
pub fn parse_response(text: &str, request: &GenerationRequest) -> Result<GeneratedQuestion, LlmError> {
    let json = extract_json(text).ok_or_else(|| unparseable("回复中没有 JSON 对象"))?;
    let raw: RawQuestion =
        serde_json::from_str(json).map_err(|e| unparseable(format!("JSON 解析失败: {}", e)))?;

    let question_text = raw
        .question_text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| unparseable("缺少 question_text"))?;
    let options = raw.options.ok_or_else(|| unparseable("缺少 options"))?;
    let correct = raw.correct_answer.ok_or_else(|| unparseable("缺少 correct_answer"))?;
    let explanation = raw.explanation.ok_or_else(|| unparseable("缺少 explanation"))?;

    if options.len() != 4 {
        return Err(unparseable(format!("需要 4 个选项，实际 {} 个", options.len())));
    }
    if !(0..=3).contains(&correct) {
        return Err(unparseable(format!("correct_answer 越界: {}", correct)));
    }
    let correct = correct as usize;

    let options = options
        .into_iter()
        .enumerate()
        .map(|(i, option)| {
            let text = match option {
                RawOption::Text(text) => text,
                RawOption::Full { text, .. } => text,
            };
            QuestionOption { text, is_correct: i == correct }
        })
        .collect();

    let difficulty_score = raw
        .difficulty_score
        .filter(|s| (0.0..=100.0).contains(s))
        .unwrap_or_else(|| request.difficulty.default_score());
    let tags = if raw.tags.is_empty() {
        default_tags(&request.subject, &request.topic)
    } else {
        raw.tags
    };

    Ok(GeneratedQuestion {
        question_text,
        options,
        correct_answer: correct,
        explanation,
        difficulty: request.difficulty,
        difficulty_score,
        subject: request.subject.clone(),
        topic: request.topic.clone(),
        subtopic: request.subtopic.clone(),
        tags,
        skill_tested: raw
            .skill_tested
            .or_else(|| request.skill_tested.clone())
            .unwrap_or_else(|| format!("{} knowledge", request.topic)),
        generation_model: None,
        generation_prompt: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const GOOD_REPLY: &str = r#"Sure! Here it is:
```json
{
  "question_text": "Which keyword defines a trait in Rust?",
  "options": [
    {"text": "impl", "is_correct": false},
    {"text": "trait", "is_correct": true},
    {"text": "struct", "is_correct": false},
    {"text": "enum", "is_correct": false}
  ],
  "correct_answer": 1,
  "explanation": "The trait keyword declares a trait.",
  "difficulty_score": 40,
  "tags": ["rust"],
  "skill_tested": "Syntax"
}
```"#;

    struct FakeModel {
        reply: String,
        calls: AtomicUsize,
    }

    impl FakeModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatModel for FakeModel {
        async fn send_to_llm(&self, _user: &str, _system: Option<&str>) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "fake-model"
        }
    }

    fn request(difficulty: Difficulty) -> GenerationRequest {
        GenerationRequest::new("Computer Science", "Object-Oriented Programming", difficulty)
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json("x {\"a\":1} y"), Some("{\"a\":1}"));
        assert_eq!(extract_json("```json\n{\"a\":{\"b\":2}}\n```"), Some("{\"a\":{\"b\":2}}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_good_reply() {
        let q = parse_response(GOOD_REPLY, &request(Difficulty::Easy)).unwrap();
        assert_eq!(q.correct_answer, 1);
        assert_eq!(q.options.len(), 4);
        assert!(q.options[1].is_correct);
        assert_eq!(q.difficulty_score, 40.0);
        assert_eq!(q.tags, vec!["rust".to_string()]);
        assert_eq!(q.difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        let req = request(Difficulty::Medium);
        let three_options = r#"{"question_text":"q","options":["a","b","c"],"correct_answer":0,"explanation":"e"}"#;
        assert!(parse_response(three_options, &req).is_err());

        let out_of_range = r#"{"question_text":"q","options":["a","b","c","d"],"correct_answer":4,"explanation":"e"}"#;
        assert!(parse_response(out_of_range, &req).is_err());

        let missing_explanation = r#"{"question_text":"q","options":["a","b","c","d"],"correct_answer":0}"#;
        let err = parse_response(missing_explanation, &req).unwrap_err();
        assert!(err.to_string().contains("explanation"));
    }

    #[test]
    fn test_parse_accepts_plain_string_options() {
        let reply = r#"{"question_text":"q","options":["a","b","c","d"],"correct_answer":3,"explanation":"e"}"#;
        let q = parse_response(reply, &request(Difficulty::Hard)).unwrap();
        assert!(q.options[3].is_correct);
        assert_eq!(q.difficulty_score, 85.0);
        assert_eq!(q.tags, vec!["computer science", "object-oriented-programming"]);
    }

    #[test]
    fn test_fallback_template_and_generic() {
        let generator = QuestionGenerator::with_model(None, 2).unwrap();
        let q = generator.fallback_question(&request(Difficulty::Medium));
        assert_eq!(
            q.question_text,
            "Which OOP concept allows a class to inherit properties from another class?"
        );
        assert_eq!(q.difficulty_score, 60.0);
        assert_eq!(q.subtopic.as_deref(), Some("General"));

        let generic = generator.fallback_question(&GenerationRequest::new("Biology", "Cell Division", Difficulty::Easy));
        assert_eq!(generic.question_text, "What is a key concept in Cell Division?");
        assert_eq!(generic.correct_answer, 1);
        assert_eq!(generic.tags, vec!["biology", "cell-division"]);
        assert_eq!(generic.skill_tested, "Cell Division knowledge");
    }

    #[tokio::test]
    async fn test_generate_uses_model_reply() {
        let model = FakeModel::replying(GOOD_REPLY);
        let generator = QuestionGenerator::with_model(Some(model.clone()), 2).unwrap();
        let q = generator.generate(&request(Difficulty::Easy)).await;
        assert_eq!(q.question_text, "Which keyword defines a trait in Rust?");
        assert_eq!(q.generation_model.as_deref(), Some("fake-model"));
        assert!(q.generation_prompt.unwrap().contains("Object-Oriented Programming"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_garbage() {
        let generator =
            QuestionGenerator::with_model(Some(FakeModel::replying("I cannot help")), 2).unwrap();
        let q = generator.generate(&request(Difficulty::Easy)).await;
        assert_eq!(q.question_text, "What is the main principle of Object-Oriented Programming?");
        assert!(q.generation_model.is_none());
    }

    #[tokio::test]
    async fn test_generate_many_distribution_and_order() {
        let generator = QuestionGenerator::with_model(None, 3).unwrap();
        let topics = vec![
            "Object-Oriented Programming".to_string(),
            "Database Fundamentals".to_string(),
        ];
        let questions = generator.generate_many("Computer Science", &topics, 7, None).await;
        assert_eq!(questions.len(), 7);

        let difficulties: Vec<Difficulty> = questions.iter().map(|q| q.difficulty).collect();
        use Difficulty::*;
        assert_eq!(difficulties, vec![Easy, Easy, Medium, Medium, Hard, Hard, Hard]);

        let topics_used: Vec<&str> = questions.iter().map(|q| q.topic.as_str()).collect();
        assert_eq!(topics_used[0], "Object-Oriented Programming");
        assert_eq!(topics_used[1], "Database Fundamentals");
        assert_eq!(topics_used[2], "Object-Oriented Programming");
    }

    #[tokio::test]
    async fn test_generate_many_without_topics_uses_subject() {
        let generator = QuestionGenerator::with_model(None, 1).unwrap();
        let questions = generator.generate_many("Physics", &[], 2, None).await;
        assert!(questions.iter().all(|q| q.topic == "Physics"));
        // count/3 == 0，全部为 hard
        assert!(questions.iter().all(|q| q.difficulty == Difficulty::Hard));
    }

    #[test]
    fn test_into_question_marks_ai_metadata() {
        let generator = QuestionGenerator::with_model(None, 1).unwrap();
        let q = generator
            .fallback_question(&request(Difficulty::Hard))
            .into_question("system");
        assert!(q.ai_generated.is_ai_generated);
        assert_eq!(q.ai_generated.generation_model.as_deref(), Some("fallback-template"));
        assert!(q.validate().is_ok());
        assert_eq!(q.correct_answer, 2);
        // hard 模板难度分 85，对应能力量表 2.8
        assert!((q.item_parameters().difficulty - 2.8).abs() < 1e-9);
    }

    #[test]
    fn test_generate_many_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let generator = Arc::new(QuestionGenerator::with_model(None, 2).unwrap());
        let topics = vec!["Algebra".to_string()];
        let batch = async move { generator.generate_many("Math", &topics, 3, None).await };
        assert_send(&batch);
    }
}
