use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_object_id;
use super::question::{CognitiveLevel, Difficulty, QuestionOption};

/// 能力测试类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AptitudeTestType {
    Quantitative,
    Logical,
    Verbal,
    Comprehensive,
}

impl AptitudeTestType {
    pub fn as_str(self) -> &'static str {
        match self {
            AptitudeTestType::Quantitative => "quantitative",
            AptitudeTestType::Logical => "logical",
            AptitudeTestType::Verbal => "verbal",
            AptitudeTestType::Comprehensive => "comprehensive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionCategory {
    Arithmetic,
    Algebra,
    Geometry,
    LogicalReasoning,
    VerbalReasoning,
    Analytical,
    PatternRecognition,
}

fn default_aptitude_score() -> f64 {
    50.0
}

fn default_estimated_time() -> u32 {
    60
}

fn default_cognitive_level() -> CognitiveLevel {
    CognitiveLevel::Apply
}

/// 能力测试题目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AptitudeQuestion {
    pub question_text: String,
    pub options: Vec<QuestionOption>,
    pub correct_answer: usize,
    pub explanation: Option<String>,
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
    #[serde(default = "default_aptitude_score")]
    pub difficulty_score: f64,
    #[serde(default = "default_estimated_time")]
    pub estimated_time: u32,
    pub skill_tested: String,
    #[serde(default = "default_cognitive_level")]
    pub cognitive_level: CognitiveLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSection {
    pub name: String,
    pub questions: usize,
    pub time_limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AptitudeTestConfig {
    pub total_questions: usize,
    /// 时间限制（秒）
    pub time_limit: i64,
    pub passing_score: f64,
    pub max_attempts: u32,
    #[serde(default)]
    pub sections: Vec<TestSection>,
}

impl Default for AptitudeTestConfig {
    fn default() -> Self {
        Self {
            total_questions: 30,
            time_limit: 1800,
            passing_score: 60.0,
            max_attempts: 3,
            sections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AptitudeUsageStats {
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub average_score: f64,
    /// 完成率 (0-1)
    #[serde(default)]
    pub completion_rate: f64,
}

/// 能力测试文档（`aptitude_tests` 集合）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AptitudeTest {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub test_type: AptitudeTestType,
    #[serde(default)]
    pub questions: Vec<AptitudeQuestion>,
    #[serde(default)]
    pub config: AptitudeTestConfig,
    #[serde(default)]
    pub usage_stats: AptitudeUsageStats,
    pub is_active: bool,
    pub created_by: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl AptitudeTest {
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        test_type: AptitudeTestType,
        questions: Vec<AptitudeQuestion>,
        config: AptitudeTestConfig,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: new_object_id(),
            title: title.into(),
            description,
            test_type,
            questions,
            config,
            usage_stats: AptitudeUsageStats::default(),
            is_active: true,
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }

    /// 测试有效度：完成率 40% + 平均分 60%
    pub fn effectiveness(&self) -> f64 {
        if self.usage_stats.total_attempts == 0 {
            return 0.0;
        }
        self.usage_stats.completion_rate * 0.4 + self.usage_stats.average_score * 0.6
    }

    /// 记录一次作答，更新平均分和完成率
    pub fn record_attempt(&mut self, score: f64, completed: bool) {
        let stats = &mut self.usage_stats;
        stats.total_attempts += 1;
        let n = stats.total_attempts as f64;

        stats.average_score = (stats.average_score * (n - 1.0) + score) / n;
        let completed = if completed { 1.0 } else { 0.0 };
        stats.completion_rate = (stats.completion_rate * (n - 1.0) + completed) / n;
    }

    pub fn questions_by_category(&self, category: QuestionCategory) -> Vec<&AptitudeQuestion> {
        self.questions.iter().filter(|q| q.category == category).collect()
    }

    pub fn questions_by_difficulty(&self, difficulty: Difficulty) -> Vec<&AptitudeQuestion> {
        self.questions
            .iter()
            .filter(|q| q.difficulty == difficulty)
            .collect()
    }

    pub fn total_sections(&self) -> usize {
        self.config.sections.len()
    }

    pub fn is_comprehensive(&self) -> bool {
        self.test_type == AptitudeTestType::Comprehensive
    }

    /// 按 `q_N` 形式的题号（从 1 开始）取题
    pub fn question_by_ref(&self, question_ref: &str) -> Option<&AptitudeQuestion> {
        question_index(question_ref).and_then(|i| self.questions.get(i))
    }
}

/// `q_3` → 下标 2；`q_0` 或格式不符返回 `None`
pub fn question_index(question_ref: &str) -> Option<usize> {
    let n: usize = question_ref.strip_prefix("q_")?.parse().ok()?;
    n.checked_sub(1)
}

/// 下标 2 → `q_3`
pub fn question_ref(index: usize) -> String {
    format!("q_{}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(category: QuestionCategory, difficulty: Difficulty) -> AptitudeQuestion {
        AptitudeQuestion {
            question_text: "2 + 2 = ?".to_string(),
            options: vec![
                QuestionOption { text: "4".to_string(), is_correct: true },
                QuestionOption { text: "5".to_string(), is_correct: false },
            ],
            correct_answer: 0,
            explanation: None,
            category,
            difficulty,
            difficulty_score: 50.0,
            estimated_time: 60,
            skill_tested: "Addition".to_string(),
            cognitive_level: CognitiveLevel::Apply,
        }
    }

    fn test() -> AptitudeTest {
        AptitudeTest::new(
            "Quant",
            None,
            AptitudeTestType::Quantitative,
            vec![
                question(QuestionCategory::Arithmetic, Difficulty::Hard),
                question(QuestionCategory::Algebra, Difficulty::Easy),
                question(QuestionCategory::Arithmetic, Difficulty::Easy),
            ],
            AptitudeTestConfig::default(),
            "system",
        )
    }

    #[test]
    fn test_effectiveness_and_attempts() {
        let mut t = test();
        assert_eq!(t.effectiveness(), 0.0);

        t.record_attempt(80.0, true);
        t.record_attempt(40.0, false);
        assert_eq!(t.usage_stats.total_attempts, 2);
        assert!((t.usage_stats.average_score - 60.0).abs() < 1e-9);
        assert!((t.usage_stats.completion_rate - 0.5).abs() < 1e-9);
        assert!((t.effectiveness() - (0.5 * 0.4 + 60.0 * 0.6)).abs() < 1e-9);
    }

    #[test]
    fn test_filters() {
        let t = test();
        assert_eq!(t.questions_by_category(QuestionCategory::Arithmetic).len(), 2);
        assert_eq!(t.questions_by_difficulty(Difficulty::Easy).len(), 2);
        assert_eq!(t.total_sections(), 0);
        assert!(!t.is_comprehensive());
    }

    #[test]
    fn test_question_refs() {
        let t = test();
        assert_eq!(question_index("q_2"), Some(1));
        assert_eq!(question_index("q_0"), None);
        assert_eq!(question_index("2"), None);
        assert_eq!(question_ref(0), "q_1");
        assert!(t.question_by_ref("q_1").is_some());
        assert!(t.question_by_ref("q_3").is_some());
        assert!(t.question_by_ref("q_4").is_none());
    }

    #[test]
    fn test_type_serializes_under_type_key() {
        let value = serde_json::to_value(test()).unwrap();
        assert_eq!(value["type"], "quantitative");
        assert!(value.get("_id").is_some());
    }
}
