use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_object_id;
use crate::services::adaptive_engine::{self, ItemParameters, THETA_MAX, THETA_MIN};

/// 每道题保留的最近作答记录条数
pub const MAX_RESPONSE_LOG: usize = 200;

/// 难度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// 更新技能熟练度时使用的难度系数
    pub fn weight(self) -> f64 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    /// 出题提示词中的难度说明
    pub fn description(self) -> &'static str {
        match self {
            Difficulty::Easy => "basic understanding and recall",
            Difficulty::Medium => "application and analysis",
            Difficulty::Hard => "complex problem-solving and evaluation",
        }
    }

    /// 兜底题目的默认难度分
    pub fn default_score(self) -> f64 {
        match self {
            Difficulty::Easy => 30.0,
            Difficulty::Medium => 60.0,
            Difficulty::Hard => 85.0,
        }
    }
}

/// 布鲁姆认知层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CognitiveLevel {
    Remember,
    #[default]
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[default]
    Conceptual,
    ProblemSolving,
    Analytical,
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    NeedsRevision,
}

/// 选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// IRT 心理测量参数
///
/// `difficulty` 等为 [0, 1] 的经典指标；`irt_difficulty` 是能力量表 [-4, 4] 上的难度 b，
/// 为空时由难度分换算
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Psychometrics {
    pub discrimination: f64,
    pub difficulty: f64,
    pub guessing: f64,
    pub upper_asymptote: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irt_difficulty: Option<f64>,
}

impl Default for Psychometrics {
    fn default() -> Self {
        Self {
            discrimination: 0.5,
            difficulty: 0.5,
            guessing: 0.25,
            upper_asymptote: 1.0,
            irt_difficulty: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub times_used: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub average_time_spent: f64,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_used: Option<DateTime<Utc>>,
}

/// AI 出题元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiGenerated {
    #[serde(default)]
    pub is_ai_generated: bool,
    pub generation_prompt: Option<String>,
    pub generation_model: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub generation_timestamp: Option<DateTime<Utc>>,
}

/// 题库题目（`questions` 集合）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub question_text: String,
    pub options: Vec<QuestionOption>,
    pub correct_answer: usize,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub difficulty_score: f64,
    pub subject: String,
    pub topic: String,
    pub subtopic: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cognitive_level: CognitiveLevel,
    #[serde(default)]
    pub question_type: QuestionType,
    /// 预计用时（秒）
    #[serde(default = "default_estimated_time")]
    pub estimated_time: u32,

    #[serde(default)]
    pub psychometrics: Psychometrics,
    #[serde(default)]
    pub usage_stats: UsageStats,
    /// 最近的作答记录，用于校准参数
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_log: Vec<ResponseRecord>,
    #[serde(default)]
    pub ai_generated: AiGenerated,

    #[serde(default = "default_quality_score")]
    pub quality_score: f64,
    #[serde(default)]
    pub review_status: ReviewStatus,
    pub reviewed_by: Option<String>,
    pub review_comments: Option<String>,

    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub previous_versions: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_by: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// 为空表示所有专业
    #[serde(default)]
    pub target_branch: String,
    /// 为空表示所有年级
    #[serde(default)]
    pub target_year: String,
}

fn default_estimated_time() -> u32 {
    60
}

fn default_quality_score() -> f64 {
    50.0
}

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// 一次作答记录，用于重新估计心理测量参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub is_correct: bool,
    pub user_ability: f64,
}

impl Question {
    /// 创建一道新题，其余字段取默认值
    pub fn new(
        question_text: impl Into<String>,
        options: Vec<QuestionOption>,
        correct_answer: usize,
        difficulty: Difficulty,
        subject: impl Into<String>,
        topic: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: new_object_id(),
            question_text: question_text.into(),
            options,
            correct_answer,
            explanation: None,
            difficulty,
            difficulty_score: 50.0,
            subject: subject.into(),
            topic: topic.into(),
            subtopic: None,
            tags: Vec::new(),
            cognitive_level: CognitiveLevel::default(),
            question_type: QuestionType::default(),
            estimated_time: default_estimated_time(),
            psychometrics: Psychometrics::default(),
            usage_stats: UsageStats::default(),
            response_log: Vec::new(),
            ai_generated: AiGenerated::default(),
            quality_score: default_quality_score(),
            review_status: ReviewStatus::default(),
            reviewed_by: None,
            review_comments: None,
            version: default_version(),
            previous_versions: Vec::new(),
            is_active: true,
            created_by: created_by.into(),
            created_at: Utc::now(),
            target_branch: String::new(),
            target_year: String::new(),
        }
    }

    /// 校验题目结构
    pub fn validate(&self) -> Result<(), String> {
        if self.question_text.trim().is_empty() {
            return Err("question_text must not be empty".to_string());
        }
        if !(2..=4).contains(&self.options.len()) {
            return Err(format!(
                "a question needs 2 to 4 options, got {}",
                self.options.len()
            ));
        }
        if self.correct_answer >= self.options.len() {
            return Err(format!(
                "correct_answer {} is out of range for {} options",
                self.correct_answer,
                self.options.len()
            ));
        }
        if !(0.0..=100.0).contains(&self.difficulty_score) {
            return Err("difficulty_score must be within 0-100".to_string());
        }
        let p = &self.psychometrics;
        for (name, value) in [
            ("discrimination", p.discrimination),
            ("difficulty", p.difficulty),
            ("guessing", p.guessing),
            ("upper_asymptote", p.upper_asymptote),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("psychometrics.{} must be within 0-1", name));
            }
        }
        if let Some(b) = p.irt_difficulty {
            if !(THETA_MIN..=THETA_MAX).contains(&b) {
                return Err(format!(
                    "psychometrics.irt_difficulty must be within [{}, {}]",
                    THETA_MIN, THETA_MAX
                ));
            }
        }
        Ok(())
    }

    /// 题目有效度 (0-100)
    ///
    /// 综合正确率、区分度和难度是否适中
    pub fn effectiveness(&self) -> f64 {
        if self.usage_stats.times_used == 0 {
            return 0.0;
        }
        let accuracy = self.usage_stats.correct_answers as f64 / self.usage_stats.times_used as f64;
        let discrimination = self.psychometrics.discrimination;
        let difficulty = self.psychometrics.difficulty;

        (accuracy * 0.4 + discrimination * 0.4 + (1.0 - (difficulty - 0.5).abs()) * 0.2) * 100.0
    }

    /// 记录一次作答
    pub fn record_usage(&mut self, is_correct: bool, time_spent: f64) {
        let stats = &mut self.usage_stats;
        stats.times_used += 1;
        if is_correct {
            stats.correct_answers += 1;
        }
        let total_time = stats.average_time_spent * (stats.times_used - 1) as f64 + time_spent;
        stats.average_time_spent = total_time / stats.times_used as f64;
        stats.last_used = Some(Utc::now());
    }

    /// 根据作答记录重新估计难度和区分度
    ///
    /// 区分度 = 能力最高的 1/3 正确率 - 能力最低的 1/3 正确率
    pub fn update_psychometrics(&mut self, responses: &[ResponseRecord]) {
        if responses.is_empty() {
            return;
        }
        let total = responses.len();
        let correct = responses.iter().filter(|r| r.is_correct).count();
        self.psychometrics.difficulty = correct as f64 / total as f64;

        let mut sorted = responses.to_vec();
        sorted.sort_by(|a, b| b.user_ability.total_cmp(&a.user_ability));

        let top_third = (total + 2) / 3;
        let bottom_third = total / 3;
        if top_third == 0 || bottom_third == 0 {
            return;
        }

        let top_correct = sorted[..top_third].iter().filter(|r| r.is_correct).count();
        let bottom_correct = sorted[total - bottom_third..]
            .iter()
            .filter(|r| r.is_correct)
            .count();

        let discrimination =
            top_correct as f64 / top_third as f64 - bottom_correct as f64 / bottom_third as f64;
        self.psychometrics.discrimination = discrimination.clamp(0.0, 1.0);
        self.psychometrics.irt_difficulty = Some(self.estimate_irt_difficulty(responses));
    }

    /// 记录一次带能力估计的作答，并用最近的记录重新校准
    pub fn calibrate(&mut self, record: ResponseRecord) {
        self.response_log.push(record);
        if self.response_log.len() > MAX_RESPONSE_LOG {
            let overflow = self.response_log.len() - MAX_RESPONSE_LOG;
            self.response_log.drain(..overflow);
        }
        let log = std::mem::take(&mut self.response_log);
        self.update_psychometrics(&log);
        self.response_log = log;
    }

    /// 在作答者平均能力处反解 4PL，得到能力量表上的难度
    fn estimate_irt_difficulty(&self, responses: &[ResponseRecord]) -> f64 {
        let p = &self.psychometrics;
        let n = responses.len() as f64;
        let mean_ability = responses.iter().map(|r| r.user_ability).sum::<f64>() / n;
        let proportion = responses.iter().filter(|r| r.is_correct).count() as f64 / n;

        let span = (p.upper_asymptote - p.guessing).max(f64::EPSILON);
        let adjusted = ((proportion - p.guessing) / span).clamp(0.02, 0.98);
        let logit = (adjusted / (1.0 - adjusted)).ln();
        let slope = p.discrimination.max(0.1);
        (mean_ability - logit / slope).clamp(THETA_MIN, THETA_MAX)
    }

    /// 自适应算法使用的综合难度 (0-100)
    pub fn adaptive_difficulty(&self) -> f64 {
        let usage_accuracy = if self.usage_stats.times_used > 0 {
            self.usage_stats.correct_answers as f64 / self.usage_stats.times_used as f64 * 100.0
        } else {
            50.0
        };
        self.difficulty_score * 0.4 + self.psychometrics.difficulty * 100.0 * 0.4 + usage_accuracy * 0.2
    }

    /// 正确选项的文本
    pub fn correct_option_text(&self) -> &str {
        self.options
            .get(self.correct_answer)
            .map(|o| o.text.as_str())
            .unwrap_or("")
    }

    /// IRT 题目参数，难度取能力量表上的 b
    pub fn item_parameters(&self) -> ItemParameters {
        let difficulty = self
            .psychometrics
            .irt_difficulty
            .unwrap_or_else(|| adaptive_engine::theta_for_score(self.difficulty_score));
        ItemParameters {
            discrimination: self.psychometrics.discrimination,
            difficulty,
            guessing: self.psychometrics.guessing,
            upper_asymptote: self.psychometrics.upper_asymptote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<QuestionOption> {
        (0..n)
            .map(|i| QuestionOption {
                text: format!("Option {}", i),
                is_correct: i == 1,
            })
            .collect()
    }

    fn sample() -> Question {
        Question::new("What?", options(4), 1, Difficulty::Medium, "CS", "OOP", "system")
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut q = sample();
        q.options = options(1);
        q.correct_answer = 0;
        assert!(q.validate().is_err());

        let mut q = sample();
        q.correct_answer = 4;
        assert!(q.validate().is_err());

        let mut q = sample();
        q.psychometrics.guessing = 1.5;
        assert!(q.validate().unwrap_err().contains("guessing"));
    }

    #[test]
    fn test_effectiveness() {
        let mut q = sample();
        assert_eq!(q.effectiveness(), 0.0);
        q.usage_stats.times_used = 4;
        q.usage_stats.correct_answers = 2;
        // (0.5*0.4 + 0.5*0.4 + 1.0*0.2) * 100 = 60
        assert!((q.effectiveness() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_usage_running_average() {
        let mut q = sample();
        q.record_usage(true, 30.0);
        q.record_usage(false, 60.0);
        assert_eq!(q.usage_stats.times_used, 2);
        assert_eq!(q.usage_stats.correct_answers, 1);
        assert!((q.usage_stats.average_time_spent - 45.0).abs() < 1e-9);
        assert!(q.usage_stats.last_used.is_some());
    }

    #[test]
    fn test_update_psychometrics() {
        let mut q = sample();
        let responses = [
            ResponseRecord { is_correct: true, user_ability: 2.0 },
            ResponseRecord { is_correct: true, user_ability: 1.0 },
            ResponseRecord { is_correct: false, user_ability: 0.0 },
            ResponseRecord { is_correct: false, user_ability: -1.0 },
            ResponseRecord { is_correct: true, user_ability: 0.5 },
            ResponseRecord { is_correct: false, user_ability: -2.0 },
        ];
        q.update_psychometrics(&responses);
        assert!((q.psychometrics.difficulty - 0.5).abs() < 1e-9);
        // 前 2 人全对，后 2 人全错
        assert!((q.psychometrics.discrimination - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_psychometrics_small_sample_keeps_discrimination() {
        let mut q = sample();
        q.update_psychometrics(&[ResponseRecord { is_correct: true, user_ability: 0.0 }]);
        assert_eq!(q.psychometrics.difficulty, 1.0);
        assert_eq!(q.psychometrics.discrimination, 0.5);
    }

    #[test]
    fn test_update_psychometrics_places_difficulty_on_ability_scale() {
        let mut q = sample();
        let responses = [
            ResponseRecord { is_correct: true, user_ability: 2.0 },
            ResponseRecord { is_correct: true, user_ability: 1.0 },
            ResponseRecord { is_correct: false, user_ability: 0.0 },
            ResponseRecord { is_correct: false, user_ability: -1.0 },
            ResponseRecord { is_correct: true, user_ability: 0.5 },
            ResponseRecord { is_correct: false, user_ability: -2.0 },
        ];
        q.update_psychometrics(&responses);
        let b = q.psychometrics.irt_difficulty.unwrap();
        // 扣除猜测后正确率 1/3，难度高于作答者平均能力
        let mean_ability = 0.5 / 6.0;
        assert!(b > mean_ability && b <= THETA_MAX);
        assert_eq!(q.item_parameters().difficulty, b);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_item_difficulty_follows_difficulty_score() {
        let mut easy = sample();
        easy.difficulty_score = 30.0;
        let mut hard = sample();
        hard.difficulty_score = 85.0;
        let (b_easy, b_hard) = (easy.item_parameters().difficulty, hard.item_parameters().difficulty);
        assert!((b_easy - -1.6).abs() < 1e-9);
        assert!((b_hard - 2.8).abs() < 1e-9);

        let mut q = sample();
        q.psychometrics.irt_difficulty = Some(9.0);
        assert!(q.validate().unwrap_err().contains("irt_difficulty"));
    }

    #[test]
    fn test_calibrate_keeps_recent_responses() {
        let mut q = sample();
        for i in 0..MAX_RESPONSE_LOG + 10 {
            q.calibrate(ResponseRecord { is_correct: i % 2 == 0, user_ability: 0.0 });
        }
        assert_eq!(q.response_log.len(), MAX_RESPONSE_LOG);
        assert!((q.psychometrics.difficulty - 0.5).abs() < 1e-9);
        assert!(q.psychometrics.irt_difficulty.is_some());
    }

    #[test]
    fn test_adaptive_difficulty_and_correct_text() {
        let q = sample();
        // 50*0.4 + 50*0.4 + 50*0.2
        assert!((q.adaptive_difficulty() - 50.0).abs() < 1e-9);
        assert_eq!(q.correct_option_text(), "Option 1");
    }
}
