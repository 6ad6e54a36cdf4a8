use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::grade::Grade;
use super::new_object_id;
use super::question::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssessmentType {
    PreAssessment,
    AdaptiveAssessment,
    FinalAssessment,
    Practice,
    TopicWise,
    Overall,
}

impl AssessmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentType::PreAssessment => "pre-assessment",
            AssessmentType::AdaptiveAssessment => "adaptive-assessment",
            AssessmentType::FinalAssessment => "final-assessment",
            AssessmentType::Practice => "practice",
            AssessmentType::TopicWise => "topic-wise",
            AssessmentType::Overall => "overall",
        }
    }

    /// 标题用的名称，如 `pre-assessment` → `Pre Assessment`
    pub fn title_case(self) -> String {
        self.as_str()
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AssessmentStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Abandoned,
    Expired,
}

impl AssessmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentStatus::NotStarted => "not-started",
            AssessmentStatus::InProgress => "in-progress",
            AssessmentStatus::Completed => "completed",
            AssessmentStatus::Abandoned => "abandoned",
            AssessmentStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not-started" => Some(AssessmentStatus::NotStarted),
            "in-progress" => Some(AssessmentStatus::InProgress),
            "completed" => Some(AssessmentStatus::Completed),
            "abandoned" => Some(AssessmentStatus::Abandoned),
            "expired" => Some(AssessmentStatus::Expired),
            _ => None,
        }
    }

    /// 未完成（可继续作答）
    pub fn is_open(self) -> bool {
        matches!(self, AssessmentStatus::NotStarted | AssessmentStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionReason {
    #[default]
    UserCompleted,
    TimeExpired,
    AutoSubmitted,
    NetworkError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionSelectionStrategy {
    Random,
    #[default]
    Adaptive,
    DifficultyBased,
    TopicBased,
}

fn default_passing_score() -> f64 {
    60.0
}

/// 测评配置（字段名与前端保持 camelCase）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentConfig {
    pub total_questions: usize,
    /// 时间限制（秒）
    pub time_limit: i64,
    #[serde(default = "default_passing_score")]
    pub passing_score: f64,
    #[serde(default)]
    pub adaptive_enabled: bool,
    #[serde(default)]
    pub question_selection_strategy: QuestionSelectionStrategy,
}

/// 测评中的一道题
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    /// 题库中的题目 ID
    pub question_id: String,
    pub order: usize,
    #[serde(default)]
    pub time_spent: f64,
    #[serde(default)]
    pub is_answered: bool,
    pub selected_answer: Option<usize>,
    pub is_correct: Option<bool>,
    pub difficulty: Option<Difficulty>,
    pub topic: Option<String>,
    pub adaptive_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecoveryAnswer {
    pub question_id: String,
    pub answer: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// 断网恢复数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecoveryData {
    #[serde(default)]
    pub current_question_index: usize,
    #[serde(default)]
    pub answers: Vec<NetworkRecoveryAnswer>,
    #[serde(default)]
    pub time_remaining: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_saved_at: DateTime<Utc>,
}

/// 测评结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssessmentResults {
    pub total_questions: usize,
    pub answered_questions: usize,
    pub correct_answers: usize,
    pub incorrect_answers: usize,
    pub skipped_questions: usize,
    pub score: f64,
    pub percentage: f64,
    pub grade: Option<Grade>,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityHistory {
    pub question_index: usize,
    pub ability: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSelectionLog {
    pub question_id: String,
    pub reason: String,
    pub difficulty: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationTrigger {
    pub trigger: String,
    pub action: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// 自适应测评数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdaptiveData {
    #[serde(default)]
    pub initial_ability: f64,
    #[serde(default)]
    pub final_ability: f64,
    #[serde(default)]
    pub ability_history: Vec<AbilityHistory>,
    #[serde(default)]
    pub question_selection_log: Vec<QuestionSelectionLog>,
    #[serde(default)]
    pub adaptation_triggers: Vec<AdaptationTrigger>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommended_topics: Vec<String>,
    #[serde(default)]
    pub skill_gaps: Vec<String>,
    #[serde(default)]
    pub improvement_areas: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PsychometricAnalysis {
    pub reliability: Option<f64>,
    pub validity: Option<f64>,
    pub standard_error: Option<f64>,
    pub confidence_interval: Option<ConfidenceInterval>,
}

/// 测评文档（`assessments` 集合）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub assessment_type: AssessmentType,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub config: AssessmentConfig,
    #[serde(default)]
    pub questions: Vec<AssessmentQuestion>,

    #[serde(default)]
    pub status: AssessmentStatus,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    /// 总用时（秒）
    #[serde(default)]
    pub time_spent: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    pub auto_submitted: bool,
    #[serde(default)]
    pub completion_reason: CompletionReason,

    pub network_recovery_data: Option<NetworkRecoveryData>,
    #[serde(default)]
    pub results: AssessmentResults,
    #[serde(default)]
    pub adaptive_data: AdaptiveData,
    #[serde(default)]
    pub performance_analysis: PerformanceAnalysis,
    #[serde(default)]
    pub psychometric_analysis: PsychometricAnalysis,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Assessment {
    pub fn new(
        user_id: impl Into<String>,
        assessment_type: AssessmentType,
        subject: impl Into<String>,
        topics: Vec<String>,
        config: AssessmentConfig,
        questions: Vec<AssessmentQuestion>,
    ) -> Self {
        let subject = subject.into();
        let now = Utc::now();
        Self {
            id: new_object_id(),
            user_id: user_id.into(),
            assessment_type,
            title: format!("{} - {}", assessment_type.title_case(), subject),
            description: None,
            subject,
            topics,
            config,
            questions,
            status: AssessmentStatus::NotStarted,
            start_time: None,
            end_time: None,
            time_spent: 0.0,
            last_accessed_at: now,
            auto_submitted: false,
            completion_reason: CompletionReason::UserCompleted,
            network_recovery_data: None,
            results: AssessmentResults::default(),
            adaptive_data: AdaptiveData::default(),
            performance_analysis: PerformanceAnalysis::default(),
            psychometric_analysis: PsychometricAnalysis::default(),
            created_at: now,
        }
    }

    fn answered_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_answered).count()
    }

    /// 计算成绩（按全部题目计分）
    pub fn calculate_score(&mut self) -> &AssessmentResults {
        let total = self.questions.len();
        let correct = self.questions.iter().filter(|q| q.is_correct == Some(true)).count();
        let incorrect = self.questions.iter().filter(|q| q.is_correct == Some(false)).count();
        let answered = self.answered_count();

        let percentage = if total > 0 {
            correct as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        self.results = AssessmentResults {
            total_questions: total,
            answered_questions: answered,
            correct_answers: correct,
            incorrect_answers: incorrect,
            skipped_questions: total - answered,
            score: percentage,
            percentage,
            grade: Some(Grade::from_percentage(percentage)),
            passed: percentage >= self.config.passing_score,
        };
        &self.results
    }

    /// 自动提交：只按已答题目计分
    pub fn auto_submit(&mut self, now: DateTime<Utc>, reason: CompletionReason) {
        let total = self.questions.len();
        let answered = self.answered_count();
        let correct = self
            .questions
            .iter()
            .filter(|q| q.is_answered && q.is_correct == Some(true))
            .count();

        let percentage = if answered > 0 {
            correct as f64 / answered as f64 * 100.0
        } else {
            0.0
        };

        self.results = AssessmentResults {
            total_questions: total,
            answered_questions: answered,
            correct_answers: correct,
            incorrect_answers: answered - correct,
            skipped_questions: total - answered,
            score: percentage,
            percentage,
            grade: Some(Grade::from_percentage(percentage)),
            passed: percentage >= self.config.passing_score,
        };
        self.status = AssessmentStatus::Completed;
        self.end_time = Some(now);
        self.auto_submitted = true;
        self.completion_reason = reason;
    }

    /// 是否已超时
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.start_time {
            Some(start) => (now - start).num_seconds() > self.config.time_limit,
            None => false,
        }
    }

    /// 长时间未访问的未完成测评
    pub fn is_stale(&self, now: DateTime<Utc>, hours: i64) -> bool {
        self.status.is_open() && self.last_accessed_at < now - Duration::hours(hours)
    }

    /// 作答进度 (0-100)
    pub fn progress(&self) -> f64 {
        let total = self.questions.len();
        if total == 0 {
            return 0.0;
        }
        self.answered_count() as f64 / total as f64 * 100.0
    }

    /// 当前能力估计值
    pub fn current_ability(&self) -> f64 {
        if self.adaptive_data.ability_history.is_empty() {
            self.adaptive_data.initial_ability
        } else {
            self.adaptive_data.final_ability
        }
    }

    /// 记录一次能力估计
    pub fn record_ability(&mut self, question_index: usize, ability: f64, now: DateTime<Utc>) {
        self.adaptive_data.ability_history.push(AbilityHistory {
            question_index,
            ability,
            timestamp: now,
        });
        self.adaptive_data.final_ability = ability;
    }

    /// 各知识点的正确率 (0-100)，按知识点名排序
    pub fn topic_accuracy(&self) -> Vec<(String, f64)> {
        let mut buckets: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for q in self.questions.iter().filter(|q| q.is_answered) {
            let topic = q.topic.clone().unwrap_or_else(|| self.subject.clone());
            let entry = buckets.entry(topic).or_default();
            entry.1 += 1;
            if q.is_correct == Some(true) {
                entry.0 += 1;
            }
        }
        buckets
            .into_iter()
            .map(|(topic, (correct, total))| (topic, correct as f64 / total as f64 * 100.0))
            .collect()
    }

    /// 已答题目中出现最多的难度，用于更新技能熟练度
    pub fn dominant_difficulty(&self) -> Difficulty {
        let mut counts = [0usize; 3];
        for q in self.questions.iter().filter(|q| q.is_answered) {
            match q.difficulty.unwrap_or_default() {
                Difficulty::Easy => counts[0] += 1,
                Difficulty::Medium => counts[1] += 1,
                Difficulty::Hard => counts[2] += 1,
            }
        }
        let (idx, _) = counts
            .iter()
            .enumerate()
            .max_by_key(|(i, c)| (**c, std::cmp::Reverse(*i)))
            .unwrap_or((1, &0));
        Difficulty::ALL[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(order: usize, answered: bool, correct: Option<bool>, topic: &str) -> AssessmentQuestion {
        AssessmentQuestion {
            question_id: format!("q{}", order),
            order,
            time_spent: 0.0,
            is_answered: answered,
            selected_answer: if answered { Some(0) } else { None },
            is_correct: correct,
            difficulty: Some(Difficulty::Medium),
            topic: Some(topic.to_string()),
            adaptive_reason: None,
        }
    }

    fn assessment(questions: Vec<AssessmentQuestion>) -> Assessment {
        Assessment::new(
            "u1",
            AssessmentType::PreAssessment,
            "Computer Science",
            vec!["OOP".to_string()],
            AssessmentConfig {
                total_questions: questions.len(),
                time_limit: 600,
                passing_score: 60.0,
                adaptive_enabled: false,
                question_selection_strategy: QuestionSelectionStrategy::Random,
            },
            questions,
        )
    }

    #[test]
    fn test_title_from_type() {
        let a = assessment(vec![]);
        assert_eq!(a.title, "Pre Assessment - Computer Science");
        assert_eq!(AssessmentType::TopicWise.title_case(), "Topic Wise");
    }

    #[test]
    fn test_calculate_score_counts_all_questions() {
        let mut a = assessment(vec![
            question(1, true, Some(true), "OOP"),
            question(2, true, Some(true), "OOP"),
            question(3, true, Some(false), "OOP"),
            question(4, false, None, "OOP"),
        ]);
        let results = a.calculate_score().clone();
        assert_eq!(results.total_questions, 4);
        assert_eq!(results.correct_answers, 2);
        assert_eq!(results.incorrect_answers, 1);
        assert_eq!(results.skipped_questions, 1);
        assert_eq!(results.percentage, 50.0);
        assert_eq!(results.grade, Some(Grade::D));
        assert!(!results.passed);
    }

    #[test]
    fn test_auto_submit_scores_answered_only() {
        let mut a = assessment(vec![
            question(1, true, Some(true), "OOP"),
            question(2, true, Some(true), "OOP"),
            question(3, true, Some(false), "OOP"),
            question(4, false, None, "OOP"),
        ]);
        let now = Utc::now();
        a.auto_submit(now, CompletionReason::AutoSubmitted);
        assert!((a.results.percentage - 200.0 / 3.0).abs() < 1e-9);
        assert!(a.results.passed);
        assert_eq!(a.status, AssessmentStatus::Completed);
        assert!(a.auto_submitted);
        assert_eq!(a.completion_reason, CompletionReason::AutoSubmitted);
        assert_eq!(a.end_time, Some(now));
    }

    #[test]
    fn test_auto_submit_with_nothing_answered() {
        let mut a = assessment(vec![question(1, false, None, "OOP")]);
        a.auto_submit(Utc::now(), CompletionReason::TimeExpired);
        assert_eq!(a.results.percentage, 0.0);
        assert_eq!(a.results.skipped_questions, 1);
        assert_eq!(a.results.grade, Some(Grade::F));
    }

    #[test]
    fn test_expiry_and_staleness() {
        let mut a = assessment(vec![]);
        let now = Utc::now();
        assert!(!a.is_expired(now));
        a.start_time = Some(now - Duration::seconds(601));
        assert!(a.is_expired(now));

        a.last_accessed_at = now - Duration::hours(25);
        assert!(a.is_stale(now, 24));
        a.status = AssessmentStatus::Completed;
        assert!(!a.is_stale(now, 24));
    }

    #[test]
    fn test_progress_and_topic_accuracy() {
        let a = assessment(vec![
            question(1, true, Some(true), "OOP"),
            question(2, true, Some(false), "SQL"),
            question(3, true, Some(true), "SQL"),
            question(4, false, None, "SQL"),
        ]);
        assert_eq!(a.progress(), 75.0);
        assert_eq!(
            a.topic_accuracy(),
            vec![("OOP".to_string(), 100.0), ("SQL".to_string(), 50.0)]
        );
    }

    #[test]
    fn test_ability_tracking() {
        let mut a = assessment(vec![]);
        a.adaptive_data.initial_ability = 0.2;
        assert_eq!(a.current_ability(), 0.2);
        a.record_ability(0, 0.7, Utc::now());
        assert_eq!(a.current_ability(), 0.7);
        assert_eq!(a.adaptive_data.ability_history.len(), 1);
    }
}
