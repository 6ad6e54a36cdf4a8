use crate::error::{AppError, AppResult, ConfigError};
use crate::models::aptitude::{
    AptitudeQuestion, AptitudeTest, AptitudeTestConfig, AptitudeTestType, TestSection,
};
use crate::models::question::Difficulty;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

const FALLBACK_QUESTIONS: &str = include_str!("../../../data/fallback_questions.toml");
const APTITUDE_QUESTIONS: &str = include_str!("../../../data/aptitude_questions.toml");

/// 兜底题目模板
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackTemplate {
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question: String,
    pub options: Vec<String>,
    pub correct: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FallbackBank {
    #[serde(default)]
    pub templates: Vec<FallbackTemplate>,
}

impl FallbackBank {
    /// 按科目和知识点查找模板，缺少对应难度时退回 medium
    pub fn find(&self, subject: &str, topic: &str, difficulty: Difficulty) -> Option<&FallbackTemplate> {
        let mut candidates = self
            .templates
            .iter()
            .filter(|t| t.subject == subject && t.topic == topic);
        let exact = candidates.clone().find(|t| t.difficulty == difficulty);
        exact.or_else(|| candidates.find(|t| t.difficulty == Difficulty::Medium))
    }
}

/// 种子中的一套能力测试
#[derive(Debug, Clone, Deserialize)]
pub struct SeedTest {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub test_type: AptitudeTestType,
    pub time_limit: i64,
    pub question_sets: Vec<String>,
    #[serde(default)]
    pub sections: Vec<TestSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AptitudeSeed {
    pub tests: Vec<SeedTest>,
    #[serde(default)]
    pub questions: HashMap<String, Vec<AptitudeQuestion>>,
}

impl AptitudeSeed {
    /// 组装能力测试文档，题组按 `question_sets` 顺序拼接
    pub fn build_tests(&self) -> AppResult<Vec<AptitudeTest>> {
        self.tests
            .iter()
            .map(|seed| {
                let mut questions = Vec::new();
                for set in &seed.question_sets {
                    let bank = self.questions.get(set).ok_or_else(|| {
                        AppError::Other(format!("种子题组不存在: {} (测试: {})", set, seed.title))
                    })?;
                    questions.extend(bank.iter().cloned());
                }
                let config = AptitudeTestConfig {
                    total_questions: questions.len(),
                    time_limit: seed.time_limit,
                    passing_score: 60.0,
                    max_attempts: 3,
                    sections: seed.sections.clone(),
                };
                Ok(AptitudeTest::new(
                    seed.title.clone(),
                    seed.description.clone(),
                    seed.test_type,
                    questions,
                    config,
                    "system",
                ))
            })
            .collect()
    }
}

/// 解析 TOML 文本
pub fn parse_toml<T: DeserializeOwned>(name: &str, content: &str) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::SeedParseFailed {
        name: name.to_string(),
        source,
    })
}

/// 加载内置的兜底题目模板
pub fn load_fallback_bank() -> AppResult<FallbackBank> {
    let bank: FallbackBank = parse_toml("fallback_questions.toml", FALLBACK_QUESTIONS)?;
    tracing::debug!("成功加载 {} 个兜底模板", bank.templates.len());
    Ok(bank)
}

/// 加载内置的能力测试种子
pub fn load_aptitude_seed() -> AppResult<AptitudeSeed> {
    let seed: AptitudeSeed = parse_toml("aptitude_questions.toml", APTITUDE_QUESTIONS)?;
    let question_count: usize = seed.questions.values().map(Vec::len).sum();
    tracing::debug!(
        "成功加载 {} 套能力测试，{} 道题目",
        seed.tests.len(),
        question_count
    );
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_bank_parses() {
        let bank = load_fallback_bank().unwrap();
        assert_eq!(bank.templates.len(), 6);
        for t in &bank.templates {
            assert_eq!(t.options.len(), 4);
            assert!(t.correct < 4);
        }
    }

    #[test]
    fn test_fallback_lookup() {
        let bank = load_fallback_bank().unwrap();
        let t = bank
            .find("Computer Science", "Database Fundamentals", Difficulty::Easy)
            .unwrap();
        assert_eq!(t.question, "What does SQL stand for?");
        assert!(bank.find("Biology", "Cells", Difficulty::Easy).is_none());
    }

    #[test]
    fn test_aptitude_seed_builds_four_tests() {
        let tests = load_aptitude_seed().unwrap().build_tests().unwrap();
        assert_eq!(tests.len(), 4);

        let limits: Vec<i64> = tests.iter().map(|t| t.config.time_limit).collect();
        assert_eq!(limits, vec![1800, 1200, 900, 3600]);

        let comprehensive = &tests[3];
        assert!(comprehensive.is_comprehensive());
        assert_eq!(comprehensive.questions.len(), 7);
        assert_eq!(comprehensive.config.total_questions, 7);
        assert_eq!(comprehensive.total_sections(), 3);
        assert!(tests.iter().all(|t| t.config.max_attempts == 3 && t.is_active));
    }

    #[test]
    fn test_unknown_question_set_is_an_error() {
        let seed: AptitudeSeed = parse_toml(
            "inline",
            r#"
[[tests]]
title = "X"
type = "verbal"
time_limit = 60
question_sets = ["missing"]
"#,
        )
        .unwrap();
        assert!(seed.build_tests().is_err());
    }

    #[test]
    fn test_parse_error_names_the_source() {
        let err = parse_toml::<FallbackBank>("broken.toml", "templates = 3").unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
