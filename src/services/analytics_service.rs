//! 成绩分析 - 业务能力层
//!
//! 对已完成的测评做汇总统计，纯计算

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::assessment::{Assessment, AssessmentType};

/// 单科汇总
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SubjectBreakdown {
    pub total: usize,
    pub scores: Vec<f64>,
    pub average: f64,
    pub best: f64,
}

/// 测评摘要
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentSummary {
    pub id: String,
    pub title: String,
    pub assessment_type: AssessmentType,
    pub subject: String,
    pub score: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent: f64,
}

impl From<&Assessment> for AssessmentSummary {
    fn from(a: &Assessment) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            assessment_type: a.assessment_type,
            subject: a.subject.clone(),
            score: a.results.score,
            completed_at: a.end_time,
            time_spent: a.time_spent,
        }
    }
}

/// 趋势中的一个点
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendPoint {
    pub completed_at: DateTime<Utc>,
    pub subject: String,
    pub score: f64,
}

/// 一段时间内的统计
#[derive(Debug, Clone, Serialize)]
pub struct PeriodAnalytics {
    pub period: String,
    pub assessments_completed: usize,
    pub average_score: f64,
    pub best_score: f64,
    pub pass_rate: f64,
    /// 总用时（秒）
    pub total_time_spent: f64,
    /// 按完成时间从早到晚
    pub trend: Vec<TrendPoint>,
}

/// 按完成时间倒序
pub fn sort_by_completion(assessments: &mut [Assessment]) {
    assessments.sort_by(|a, b| {
        b.end_time
            .unwrap_or(b.created_at)
            .cmp(&a.end_time.unwrap_or(a.created_at))
    });
}

pub fn average_score(assessments: &[Assessment]) -> f64 {
    if assessments.is_empty() {
        return 0.0;
    }
    assessments.iter().map(|a| a.results.score).sum::<f64>() / assessments.len() as f64
}

/// 按科目分组统计
pub fn subject_breakdown(assessments: &[Assessment]) -> BTreeMap<String, SubjectBreakdown> {
    let mut breakdown: BTreeMap<String, SubjectBreakdown> = BTreeMap::new();
    for a in assessments {
        let entry = breakdown.entry(a.subject.clone()).or_default();
        entry.total += 1;
        entry.scores.push(a.results.score);
    }
    for entry in breakdown.values_mut() {
        if !entry.scores.is_empty() {
            entry.average = entry.scores.iter().sum::<f64>() / entry.scores.len() as f64;
            entry.best = entry.scores.iter().copied().fold(f64::MIN, f64::max);
        }
    }
    breakdown
}

/// 解析统计周期，如 `7d`、`30d`、`12w`、`6m`、`1y`；`all` 返回 `Some(None)`
pub fn parse_period(period: &str) -> Option<Option<Duration>> {
    let period = period.trim().to_ascii_lowercase();
    if period == "all" {
        return Some(None);
    }
    let unit = period.chars().last()?;
    let number = &period[..period.len() - unit.len_utf8()];
    let n: i64 = number.parse().ok().filter(|n| *n > 0)?;
    let days = match unit {
        'd' => n,
        'w' => n * 7,
        'm' => n * 30,
        'y' => n * 365,
        _ => return None,
    };
    Some(Some(Duration::days(days)))
}

/// 统计某周期内完成的测评
pub fn period_analytics(
    assessments: &[Assessment],
    period: &str,
    window: Option<Duration>,
    now: DateTime<Utc>,
) -> PeriodAnalytics {
    let cutoff = window.map(|w| now - w);
    let mut in_period: Vec<&Assessment> = assessments
        .iter()
        .filter(|a| match (cutoff, a.end_time) {
            (Some(cutoff), Some(end)) => end >= cutoff,
            (Some(_), None) => false,
            (None, _) => true,
        })
        .collect();
    in_period.sort_by_key(|a| a.end_time.unwrap_or(a.created_at));

    let count = in_period.len();
    let scores: Vec<f64> = in_period.iter().map(|a| a.results.score).collect();
    let average_score = if count > 0 {
        scores.iter().sum::<f64>() / count as f64
    } else {
        0.0
    };
    let best_score = scores.iter().copied().fold(0.0, f64::max);
    let pass_rate = if count > 0 {
        in_period.iter().filter(|a| a.results.passed).count() as f64 / count as f64 * 100.0
    } else {
        0.0
    };

    PeriodAnalytics {
        period: period.to_string(),
        assessments_completed: count,
        average_score,
        best_score,
        pass_rate,
        total_time_spent: in_period.iter().map(|a| a.time_spent).sum(),
        trend: in_period
            .iter()
            .map(|a| TrendPoint {
                completed_at: a.end_time.unwrap_or(a.created_at),
                subject: a.subject.clone(),
                score: a.results.score,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::{AssessmentConfig, AssessmentStatus};

    fn completed(subject: &str, score: f64, days_ago: i64, now: DateTime<Utc>) -> Assessment {
        let config = AssessmentConfig {
            total_questions: 10,
            time_limit: 600,
            passing_score: 60.0,
            adaptive_enabled: false,
            question_selection_strategy: Default::default(),
        };
        let mut a = Assessment::new("u1", AssessmentType::Practice, subject, vec![], config, vec![]);
        a.status = AssessmentStatus::Completed;
        a.results.score = score;
        a.results.percentage = score;
        a.results.passed = score >= 60.0;
        a.end_time = Some(now - Duration::days(days_ago));
        a.time_spent = 100.0;
        a
    }

    #[test]
    fn test_subject_breakdown() {
        let now = Utc::now();
        let list = vec![
            completed("Math", 80.0, 1, now),
            completed("Math", 60.0, 2, now),
            completed("Physics", 50.0, 3, now),
        ];
        let breakdown = subject_breakdown(&list);
        assert_eq!(breakdown["Math"].total, 2);
        assert_eq!(breakdown["Math"].average, 70.0);
        assert_eq!(breakdown["Math"].best, 80.0);
        assert_eq!(breakdown["Physics"].scores, vec![50.0]);
        assert!((average_score(&list) - 190.0 / 3.0).abs() < 1e-9);
        assert_eq!(average_score(&[]), 0.0);
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period("30d"), Some(Some(Duration::days(30))));
        assert_eq!(parse_period("2w"), Some(Some(Duration::days(14))));
        assert_eq!(parse_period("1y"), Some(Some(Duration::days(365))));
        assert_eq!(parse_period("all"), Some(None));
        assert_eq!(parse_period("0d"), None);
        assert_eq!(parse_period("abc"), None);
        assert_eq!(parse_period("3日"), None);
        assert_eq!(parse_period(""), None);
    }

    #[test]
    fn test_period_window() {
        let now = Utc::now();
        let list = vec![
            completed("Math", 90.0, 2, now),
            completed("Math", 40.0, 10, now),
            completed("Math", 70.0, 45, now),
        ];
        let stats = period_analytics(&list, "30d", Some(Duration::days(30)), now);
        assert_eq!(stats.assessments_completed, 2);
        assert_eq!(stats.average_score, 65.0);
        assert_eq!(stats.best_score, 90.0);
        assert_eq!(stats.pass_rate, 50.0);
        assert_eq!(stats.total_time_spent, 200.0);
        // 从早到晚
        assert_eq!(stats.trend[0].score, 40.0);

        let all = period_analytics(&list, "all", None, now);
        assert_eq!(all.assessments_completed, 3);
    }

    #[test]
    fn test_sort_by_completion() {
        let now = Utc::now();
        let mut list = vec![completed("A", 1.0, 5, now), completed("B", 2.0, 1, now)];
        sort_by_completion(&mut list);
        assert_eq!(list[0].subject, "B");
    }
}
