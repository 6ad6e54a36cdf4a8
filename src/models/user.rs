use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::new_object_id;

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Instructor,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Student, UserRole::Instructor, UserRole::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Instructor => "instructor",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(UserRole::Student),
            "instructor" => Some(UserRole::Instructor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AcademicLevel {
    #[default]
    Undergraduate,
    Postgraduate,
    Phd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
}

/// 学生画像
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(default)]
    pub academic_level: AcademicLevel,
    pub specialization: Option<String>,
    pub gpa: Option<f64>,
    /// 已完成的测评 ID
    #[serde(default)]
    pub previous_assessments: Vec<String>,
    /// 技能领域 → 熟练度 (0-100)
    #[serde(default)]
    pub skill_level: HashMap<String, f64>,
    pub learning_style: Option<LearningStyle>,
}

/// 成绩指标
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(default)]
    pub total_assessments: u32,
    #[serde(default)]
    pub average_score: f64,
    #[serde(default)]
    pub improvement_rate: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommended_topics: Vec<String>,
}

/// 能力测试中的单次作答
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AptitudeAnswer {
    pub question_id: String,
    pub answer: usize,
    pub time_spent: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// 正在进行的能力测试
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAptitudeTest {
    pub test_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub answers: Vec<AptitudeAnswer>,
}

/// 能力测试历史记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AptitudeHistory {
    pub test_id: String,
    pub test_title: String,
    pub test_type: String,
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub correct_answers: usize,
    #[serde(default)]
    pub total_questions: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub completed_at: DateTime<Utc>,
    pub time_spent: f64,
    #[serde(default)]
    pub answers: Vec<AptitudeAnswer>,
}

/// 用户文档（`users` 集合）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    /// bcrypt 哈希
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: UserRole,
    pub institution: String,
    pub department: Option<String>,
    pub year: Option<String>,
    pub roll_number: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub profile_picture: Option<String>,

    pub student_profile: Option<StudentProfile>,
    #[serde(default)]
    pub performance_metrics: PerformanceMetrics,

    /// 负责的教师 ID
    pub assigned_instructor: Option<String>,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub section: String,

    /// 能力测试 ID → 已用次数
    #[serde(default)]
    pub aptitude_attempts: HashMap<String, u32>,
    pub current_aptitude_test: Option<CurrentAptitudeTest>,
    #[serde(default)]
    pub aptitude_history: Vec<AptitudeHistory>,
}

fn default_true() -> bool {
    true
}

/// 注册时提供的用户信息
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub institution: String,
    pub department: Option<String>,
    pub year: Option<String>,
    pub roll_number: Option<String>,
}

impl User {
    /// 由注册信息创建新用户
    pub fn new(new_user: NewUser) -> Self {
        let student_profile = match new_user.role {
            UserRole::Student => Some(StudentProfile::default()),
            _ => None,
        };
        Self {
            id: new_object_id(),
            email: new_user.email.to_lowercase(),
            password: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            institution: new_user.institution,
            department: new_user.department,
            year: new_user.year,
            roll_number: new_user.roll_number,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
            profile_picture: None,
            student_profile,
            performance_metrics: PerformanceMetrics::default(),
            assigned_instructor: None,
            batch: String::new(),
            section: String::new(),
            aptitude_attempts: HashMap::new(),
            current_aptitude_test: None,
            aptitude_history: Vec::new(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Instructor | UserRole::Admin)
    }

    /// 某技能领域的熟练度，未记录时为 0
    pub fn skill_level(&self, skill_area: &str) -> f64 {
        self.student_profile
            .as_ref()
            .and_then(|p| p.skill_level.get(skill_area).copied())
            .unwrap_or(0.0)
    }

    /// 按表现更新技能熟练度，结果限制在 [0, 100]
    ///
    /// `performance` 为 0-1 的正确率，`difficulty` 为难度系数
    pub fn update_skill_level(&mut self, skill_area: &str, performance: f64, difficulty: f64) -> f64 {
        let current = self.skill_level(skill_area);
        let adjustment = (performance - 0.5) * difficulty * 10.0;
        let new_level = (current + adjustment).clamp(0.0, 100.0);

        self.student_profile
            .get_or_insert_with(StudentProfile::default)
            .skill_level
            .insert(skill_area.to_string(), new_level);
        new_level
    }

    /// 全部技能的平均熟练度
    pub fn overall_proficiency(&self) -> f64 {
        match &self.student_profile {
            Some(profile) if !profile.skill_level.is_empty() => {
                profile.skill_level.values().sum::<f64>() / profile.skill_level.len() as f64
            }
            _ => 0.0,
        }
    }

    /// 记录一次完成的测评，更新成绩指标
    ///
    /// `topic_scores` 为各知识点的正确率（0-100）
    pub fn record_assessment(
        &mut self,
        assessment_id: &str,
        score: f64,
        topic_scores: &[(String, f64)],
    ) {
        let metrics = &mut self.performance_metrics;
        let previous_total = metrics.total_assessments as f64;
        let previous_average = metrics.average_score;

        metrics.total_assessments += 1;
        metrics.average_score =
            (previous_average * previous_total + score) / metrics.total_assessments as f64;
        metrics.improvement_rate = if previous_total > 0.0 {
            score - previous_average
        } else {
            0.0
        };

        for (topic, topic_score) in topic_scores {
            if *topic_score >= STRENGTH_THRESHOLD {
                push_unique(&mut metrics.strengths, topic);
                metrics.weaknesses.retain(|t| t != topic);
                metrics.recommended_topics.retain(|t| t != topic);
            } else if *topic_score < WEAKNESS_THRESHOLD {
                push_unique(&mut metrics.weaknesses, topic);
                push_unique(&mut metrics.recommended_topics, topic);
                metrics.strengths.retain(|t| t != topic);
            }
        }

        let profile = self.student_profile.get_or_insert_with(StudentProfile::default);
        push_unique(&mut profile.previous_assessments, assessment_id);
    }
}

/// 知识点正确率不低于该值记为优势
pub const STRENGTH_THRESHOLD: f64 = 70.0;
/// 知识点正确率低于该值记为薄弱
pub const WEAKNESS_THRESHOLD: f64 = 50.0;

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
