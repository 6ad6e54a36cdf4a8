//! 自适应引擎 - 业务能力层
//!
//! 基于四参数 logistic 模型（4PL）的项目反应理论：
//! - 能力估计：Fisher scoring 求极大似然
//! - 选题：最大信息量 / 难度最接近 / 随机
//! - 终止判定：题量上限或测量精度达标
//!
//! 纯计算，不访问存储

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;

/// 能力值取值范围
pub const THETA_MIN: f64 = -4.0;
pub const THETA_MAX: f64 = 4.0;

const PROBABILITY_EPSILON: f64 = 1e-9;
const CONVERGENCE_TOLERANCE: f64 = 0.001;
const MIN_INFORMATION: f64 = 0.001;
const MAX_ITERATIONS: usize = 50;

/// 题目的 IRT 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemParameters {
    /// 区分度 a
    pub discrimination: f64,
    /// 难度 b
    pub difficulty: f64,
    /// 猜测参数 c
    pub guessing: f64,
    /// 上渐近线 d
    pub upper_asymptote: f64,
}

impl Default for ItemParameters {
    fn default() -> Self {
        Self {
            discrimination: 0.5,
            difficulty: 0.5,
            guessing: 0.25,
            upper_asymptote: 1.0,
        }
    }
}

impl ItemParameters {
    /// 能力为 `theta` 时答对的概率
    pub fn probability(&self, theta: f64) -> f64 {
        let Self { discrimination: a, difficulty: b, guessing: c, upper_asymptote: d } = *self;
        let p = c + (d - c) / (1.0 + (-a * (theta - b)).exp());
        p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON)
    }

    /// Fisher 信息量
    pub fn information(&self, theta: f64) -> f64 {
        let Self { discrimination: a, guessing: c, upper_asymptote: d, .. } = *self;
        if d <= c {
            return 0.0;
        }
        let p = self.probability(theta);
        let numerator = a * a * (p - c).powi(2) * (d - p).powi(2);
        let denominator = (d - c).powi(2) * p * (1.0 - p);
        numerator / denominator
    }

    /// 对数似然对 theta 的一阶导数中本题的贡献
    fn score(&self, theta: f64, correct: bool) -> f64 {
        let Self { discrimination: a, guessing: c, upper_asymptote: d, .. } = *self;
        if d <= c {
            return 0.0;
        }
        let p = self.probability(theta);
        let u = if correct { 1.0 } else { 0.0 };
        a * (u - p) * (p - c) * (d - p) / ((d - c) * p * (1.0 - p))
    }
}

/// 一次作答
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemResponse {
    pub params: ItemParameters,
    pub correct: bool,
}

/// 选题策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    MaximumInformation,
    ClosestDifficulty,
    Random,
}

impl SelectionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionStrategy::MaximumInformation => "maximum_information",
            SelectionStrategy::ClosestDifficulty => "closest_difficulty",
            SelectionStrategy::Random => "random",
        }
    }
}

/// 候选题目
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub params: ItemParameters,
    /// 0-100 的难度分
    pub difficulty_score: f64,
}

/// 选题结果
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub id: String,
    /// 在候选列表中的下标
    pub index: usize,
    pub information: f64,
    pub strategy: SelectionStrategy,
}

impl Selection {
    /// 写入选题日志的说明
    pub fn reason(&self) -> String {
        format!("{} (information {:.3})", self.strategy.as_str(), self.information)
    }
}

/// 终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MaxQuestionsReached,
    SufficientPrecision,
}

/// 终止判定结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminationVerdict {
    pub should_terminate: bool,
    pub reasons: Vec<TerminationReason>,
    pub num_questions: usize,
    pub standard_error: f64,
    pub ability_estimate: f64,
}

/// 自适应测评引擎
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveEngine {
    pub max_questions: usize,
    pub min_questions: usize,
    pub se_threshold: f64,
}

impl Default for AdaptiveEngine {
    fn default() -> Self {
        Self {
            max_questions: 50,
            min_questions: 10,
            se_threshold: 0.3,
        }
    }
}

impl AdaptiveEngine {
    /// 极大似然估计能力值
    ///
    /// 没有作答时返回 0；结果限制在 [-4, 4]
    pub fn estimate_ability(&self, responses: &[ItemResponse]) -> f64 {
        if responses.is_empty() {
            return 0.0;
        }

        let mut theta = 0.0_f64;
        for _ in 0..MAX_ITERATIONS {
            let score: f64 = responses.iter().map(|r| r.params.score(theta, r.correct)).sum();
            let information = test_information(responses, theta);
            if information < MIN_INFORMATION {
                break;
            }

            let step = score / information;
            theta = (theta + step).clamp(THETA_MIN, THETA_MAX);
            if step.abs() < CONVERGENCE_TOLERANCE {
                break;
            }
        }
        theta
    }

    /// 能力估计的标准误
    pub fn standard_error(&self, responses: &[ItemResponse]) -> f64 {
        let theta = self.estimate_ability(responses);
        standard_error_at(responses, theta)
    }

    /// 从候选题中选出下一题，已作答的题目会被排除
    pub fn select_next<R: Rng + ?Sized>(
        &self,
        theta: f64,
        candidates: &[Candidate],
        answered_ids: &HashSet<String>,
        strategy: SelectionStrategy,
        rng: &mut R,
    ) -> Option<Selection> {
        let available: Vec<(usize, &Candidate)> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| !answered_ids.contains(&c.id))
            .collect();

        let (index, candidate) = match strategy {
            SelectionStrategy::MaximumInformation => {
                // 信息量相同时取靠前的
                let mut best: Option<(usize, &Candidate, f64)> = None;
                for (i, c) in &available {
                    let info = c.params.information(theta);
                    if best.map_or(true, |(_, _, b)| info > b) {
                        best = Some((*i, *c, info));
                    }
                }
                best.map(|(i, c, _)| (i, c))?
            }
            SelectionStrategy::ClosestDifficulty => {
                let target = scaled_theta(theta);
                let mut best: Option<(usize, &Candidate, f64)> = None;
                for (i, c) in &available {
                    let distance = (c.difficulty_score - target).abs();
                    if best.map_or(true, |(_, _, b)| distance < b) {
                        best = Some((*i, *c, distance));
                    }
                }
                best.map(|(i, c, _)| (i, c))?
            }
            SelectionStrategy::Random => *available.choose(rng)?,
        };

        Some(Selection {
            id: candidate.id.clone(),
            index,
            information: candidate.params.information(theta),
            strategy,
        })
    }

    /// 判断测评是否可以结束
    pub fn should_terminate(
        &self,
        responses: &[ItemResponse],
        max_questions: Option<usize>,
    ) -> TerminationVerdict {
        let max_questions = max_questions.unwrap_or(self.max_questions);
        let num_questions = responses.len();
        let ability_estimate = self.estimate_ability(responses);
        let standard_error = standard_error_at(responses, ability_estimate);

        let mut reasons = Vec::new();
        if num_questions >= max_questions {
            reasons.push(TerminationReason::MaxQuestionsReached);
        }
        if num_questions >= self.min_questions && standard_error <= self.se_threshold {
            reasons.push(TerminationReason::SufficientPrecision);
        }

        TerminationVerdict {
            should_terminate: !reasons.is_empty(),
            reasons,
            num_questions,
            standard_error,
            ability_estimate,
        }
    }
}

/// 全部作答在 `theta` 处的信息量之和
pub fn test_information(responses: &[ItemResponse], theta: f64) -> f64 {
    responses.iter().map(|r| r.params.information(theta)).sum()
}

/// 在给定能力值处的标准误，无作答或信息量为 0 时为 1
pub fn standard_error_at(responses: &[ItemResponse], theta: f64) -> f64 {
    if responses.is_empty() {
        return 1.0;
    }
    let information = test_information(responses, theta);
    if information <= 0.0 {
        return 1.0;
    }
    1.0 / information.sqrt()
}

/// 95% 置信区间
pub fn confidence_interval(theta: f64, standard_error: f64) -> (f64, f64) {
    (theta - 1.96 * standard_error, theta + 1.96 * standard_error)
}

/// 把 [-4, 4] 的能力值映射到 0-100 的难度分
pub fn scaled_theta(theta: f64) -> f64 {
    50.0 + theta * 12.5
}

/// `scaled_theta` 的逆映射：0-100 的难度分换算成能力量表上的难度
pub fn theta_for_score(score: f64) -> f64 {
    ((score - 50.0) / 12.5).clamp(THETA_MIN, THETA_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(a: f64, b: f64, c: f64) -> ItemParameters {
        ItemParameters {
            discrimination: a,
            difficulty: b,
            guessing: c,
            upper_asymptote: 1.0,
        }
    }

    fn responses(params: ItemParameters, pattern: &[bool]) -> Vec<ItemResponse> {
        pattern
            .iter()
            .map(|&correct| ItemResponse { params, correct })
            .collect()
    }

    fn candidate(id: &str, params: ItemParameters, difficulty_score: f64) -> Candidate {
        Candidate {
            id: id.to_string(),
            params,
            difficulty_score,
        }
    }

    #[test]
    fn test_probability_bounds() {
        let p = item(1.0, 0.0, 0.25);
        assert!((p.probability(0.0) - 0.625).abs() < 1e-9);
        assert!(p.probability(-50.0) >= 0.25);
        assert!(p.probability(50.0) <= 1.0 - PROBABILITY_EPSILON);

        let no_guess = item(1.0, 0.0, 0.0);
        assert!(no_guess.probability(-1000.0) >= PROBABILITY_EPSILON);
    }

    #[test]
    fn test_information_peaks_near_difficulty() {
        let p = item(1.5, 0.5, 0.0);
        let at_b = p.information(0.5);
        assert!(at_b > p.information(-1.5));
        assert!(at_b > p.information(2.5));
        // 2PL 在 b 处信息量为 a²/4
        assert!((at_b - 1.5 * 1.5 / 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_information_zero_when_asymptotes_collapse() {
        let mut p = item(1.0, 0.0, 0.5);
        p.upper_asymptote = 0.5;
        assert_eq!(p.information(0.0), 0.0);
    }

    #[test]
    fn test_no_responses() {
        let engine = AdaptiveEngine::default();
        assert_eq!(engine.estimate_ability(&[]), 0.0);
        assert_eq!(engine.standard_error(&[]), 1.0);
    }

    #[test]
    fn test_ability_grows_with_correct_answers() {
        let engine = AdaptiveEngine::default();
        let params = item(1.2, 0.0, 0.2);
        let low = engine.estimate_ability(&responses(params, &[true, false, false, false, false]));
        let mid = engine.estimate_ability(&responses(params, &[true, true, true, false, false]));
        let high = engine.estimate_ability(&responses(params, &[true, true, true, true, false]));
        assert!(low < mid && mid < high, "{} {} {}", low, mid, high);
    }

    #[test]
    fn test_ability_is_clamped() {
        let engine = AdaptiveEngine::default();
        let params = item(1.0, 0.0, 0.0);
        let all_right = engine.estimate_ability(&responses(params, &[true; 8]));
        let all_wrong = engine.estimate_ability(&responses(params, &[false; 8]));
        assert!(all_right <= THETA_MAX && all_right > 3.0);
        assert!(all_wrong >= THETA_MIN && all_wrong < -3.0);
    }

    #[test]
    fn test_standard_error_shrinks_with_more_items() {
        let engine = AdaptiveEngine::default();
        let params = item(1.5, 0.0, 0.0);
        let few: Vec<bool> = (0..4).map(|i| i % 2 == 0).collect();
        let many: Vec<bool> = (0..20).map(|i| i % 2 == 0).collect();
        let se_few = engine.standard_error(&responses(params, &few));
        let se_many = engine.standard_error(&responses(params, &many));
        assert!(se_many < se_few);
    }

    #[test]
    fn test_select_maximum_information_skips_answered() {
        let engine = AdaptiveEngine::default();
        let candidates = vec![
            candidate("far", item(1.0, 3.0, 0.0), 90.0),
            candidate("near", item(1.0, 0.0, 0.0), 50.0),
            candidate("near_twin", item(1.0, 0.0, 0.0), 50.0),
        ];
        let mut rng = StdRng::seed_from_u64(7);

        let pick = engine
            .select_next(0.0, &candidates, &HashSet::new(), SelectionStrategy::MaximumInformation, &mut rng)
            .unwrap();
        assert_eq!(pick.id, "near");
        assert_eq!(pick.index, 1);

        let answered: HashSet<String> = ["near".to_string()].into_iter().collect();
        let pick = engine
            .select_next(0.0, &candidates, &answered, SelectionStrategy::MaximumInformation, &mut rng)
            .unwrap();
        assert_eq!(pick.id, "near_twin");
    }

    #[test]
    fn test_select_closest_difficulty() {
        let engine = AdaptiveEngine::default();
        let candidates = vec![
            candidate("easy", ItemParameters::default(), 30.0),
            candidate("hard", ItemParameters::default(), 85.0),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        // theta = 2 → 75
        let pick = engine
            .select_next(2.0, &candidates, &HashSet::new(), SelectionStrategy::ClosestDifficulty, &mut rng)
            .unwrap();
        assert_eq!(pick.id, "hard");
    }

    #[test]
    fn test_select_returns_none_when_exhausted() {
        let engine = AdaptiveEngine::default();
        let candidates = vec![candidate("only", ItemParameters::default(), 50.0)];
        let answered: HashSet<String> = ["only".to_string()].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(3);
        for strategy in [
            SelectionStrategy::MaximumInformation,
            SelectionStrategy::ClosestDifficulty,
            SelectionStrategy::Random,
        ] {
            assert!(engine
                .select_next(0.0, &candidates, &answered, strategy, &mut rng)
                .is_none());
        }
    }

    #[test]
    fn test_termination_reasons() {
        let engine = AdaptiveEngine::default();
        let sharp = item(4.0, 0.0, 0.0);
        let alternating = |n: usize| -> Vec<bool> { (0..n).map(|i| i % 2 == 0).collect() };

        // 题量不足
        let verdict = engine.should_terminate(&responses(sharp, &alternating(9)), None);
        assert!(!verdict.should_terminate);
        assert_eq!(verdict.num_questions, 9);

        // 精度达标
        let verdict = engine.should_terminate(&responses(sharp, &alternating(10)), None);
        assert_eq!(verdict.reasons, vec![TerminationReason::SufficientPrecision]);
        assert!(verdict.standard_error <= 0.3);
        assert!(verdict.ability_estimate.abs() < 1e-6);

        // 题量上限
        let verdict = engine.should_terminate(&responses(sharp, &alternating(12)), Some(12));
        assert_eq!(
            verdict.reasons,
            vec![
                TerminationReason::MaxQuestionsReached,
                TerminationReason::SufficientPrecision
            ]
        );
    }

    #[test]
    fn test_confidence_interval_and_scale() {
        let (lo, hi) = confidence_interval(1.0, 0.5);
        assert!((lo - 0.02).abs() < 1e-9);
        assert!((hi - 1.98).abs() < 1e-9);
        assert_eq!(scaled_theta(-4.0), 0.0);
        assert_eq!(scaled_theta(4.0), 100.0);
        assert_eq!(theta_for_score(scaled_theta(1.5)), 1.5);
        assert_eq!(theta_for_score(150.0), THETA_MAX);
    }
}
