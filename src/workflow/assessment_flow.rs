//! 测评流程 - 流程层
//!
//! 核心职责：定义"一次测评"的完整生命周期
//!
//! 流程顺序：
//! 1. create：自动提交过期未完成的测评 → 出题并入库 → 创建测评
//! 2. start：进入作答状态
//! 3. next_question / answer：自适应选题、判分、更新能力估计
//! 4. complete：计分、心理测量分析、更新用户画像

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::{AssessmentFilter, Page, Store};
use crate::models::assessment::{
    Assessment, AssessmentConfig, AssessmentQuestion, AssessmentStatus, AssessmentType,
    CompletionReason, ConfidenceInterval, PerformanceAnalysis, PsychometricAnalysis,
    QuestionSelectionLog, QuestionSelectionStrategy,
};
use crate::models::question::{Difficulty, Question, ResponseRecord};
use crate::models::user::{User, UserRole, STRENGTH_THRESHOLD, WEAKNESS_THRESHOLD};
use crate::services::adaptive_engine::{self, Candidate, TerminationVerdict};
use crate::services::{AdaptiveEngine, DifficultyDistribution, ItemResponse, QuestionGenerator, SelectionStrategy};

/// 单次测评的题量上限
pub const MAX_QUESTIONS_PER_ASSESSMENT: usize = 100;
/// 学生视图中最近测评的条数
pub const RECENT_ASSESSMENTS: i64 = 10;

const OPEN_STATUSES: [AssessmentStatus; 2] = [AssessmentStatus::NotStarted, AssessmentStatus::InProgress];

/// 创建测评的请求
#[derive(Debug, Clone)]
pub struct CreateAssessment {
    pub assessment_type: AssessmentType,
    pub subject: String,
    pub topics: Vec<String>,
    pub config: AssessmentConfig,
    pub distribution: Option<DifficultyDistribution>,
}

impl CreateAssessment {
    fn validate(&self) -> AppResult<()> {
        if self.subject.trim().is_empty() {
            return Err(AppError::validation("subject must not be empty"));
        }
        let total = self.config.total_questions;
        if total == 0 || total > MAX_QUESTIONS_PER_ASSESSMENT {
            return Err(AppError::validation(format!(
                "totalQuestions must be between 1 and {}",
                MAX_QUESTIONS_PER_ASSESSMENT
            )));
        }
        if self.config.time_limit <= 0 {
            return Err(AppError::validation("timeLimit must be positive"));
        }
        if !(0.0..=100.0).contains(&self.config.passing_score) {
            return Err(AppError::validation("passingScore must be within 0-100"));
        }
        Ok(())
    }
}

/// 新建的测评及其题目（顺序与测评一致）
#[derive(Debug, Clone)]
pub struct CreatedAssessment {
    pub assessment: Assessment,
    pub questions: Vec<Question>,
}

/// 学生的测评列表
#[derive(Debug, Clone)]
pub struct AssessmentOverview {
    pub recent: Vec<Assessment>,
    pub incomplete: Vec<Assessment>,
}

/// 下一题
#[derive(Debug, Clone)]
pub struct NextQuestion {
    /// 没有可作答的题目或已满足终止条件时为 `None`
    pub question: Option<Question>,
    pub order: Option<usize>,
    pub progress: f64,
    pub reason: Option<String>,
    /// 仅自适应测评
    pub verdict: Option<TerminationVerdict>,
}

/// 提交的答案
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub question_id: String,
    pub selected_answer: usize,
    /// 秒
    pub time_spent: f64,
}

/// 判分结果
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_answer: usize,
    pub explanation: Option<String>,
    pub progress: f64,
    pub answered_questions: usize,
    pub total_questions: usize,
    /// 仅自适应测评
    pub ability: Option<f64>,
}

/// 测评流程
///
/// - 编排出题、选题、判分、计分
/// - 只依赖存储接口和业务能力（services）
pub struct AssessmentFlow {
    store: Arc<dyn Store>,
    generator: Arc<QuestionGenerator>,
    engine: AdaptiveEngine,
    stale_hours: i64,
}

impl AssessmentFlow {
    pub fn new(store: Arc<dyn Store>, generator: Arc<QuestionGenerator>, stale_hours: i64) -> Self {
        Self {
            store,
            generator,
            engine: AdaptiveEngine::default(),
            stale_hours,
        }
    }

    // ========== 创建与查询 ==========

    /// 创建测评：出题、入库并按顺序引用题目 ID
    pub async fn create(&self, user: &User, request: CreateAssessment) -> AppResult<CreatedAssessment> {
        if user.role != UserRole::Student {
            return Err(AppError::forbidden("Only students can create assessments"));
        }
        request.validate()?;

        let now = Utc::now();
        let submitted = self.auto_submit_stale(&user.id, now).await?;
        if submitted > 0 {
            info!("[{}] ⏰ 自动提交了 {} 个长时间未访问的测评", user.id, submitted);
        }

        let CreateAssessment { assessment_type, subject, topics, config, distribution } = request;
        let generated = self
            .generator
            .generate_many(&subject, &topics, config.total_questions, distribution)
            .await;
        let questions: Vec<Question> = generated
            .into_iter()
            .map(|g| g.into_question(&user.id))
            .collect();
        self.store.insert_questions(&questions).await?;

        let items = questions
            .iter()
            .enumerate()
            .map(|(i, q)| AssessmentQuestion {
                question_id: q.id.clone(),
                order: i + 1,
                time_spent: 0.0,
                is_answered: false,
                selected_answer: None,
                is_correct: None,
                difficulty: Some(q.difficulty),
                topic: Some(q.topic.clone()),
                adaptive_reason: Some(format!("Generated for {} - {}", subject, q.topic)),
            })
            .collect();

        let assessment = Assessment::new(&user.id, assessment_type, subject, topics, config, items);
        self.store.insert_assessment(&assessment).await?;

        info!(
            "[{}] 📝 创建测评 {} ({}，{} 题)",
            user.id,
            assessment.id,
            assessment.title,
            questions.len()
        );
        Ok(CreatedAssessment { assessment, questions })
    }

    /// 最近的测评和未完成的测评
    pub async fn list(&self, user: &User) -> AppResult<AssessmentOverview> {
        if user.role != UserRole::Student {
            return Err(AppError::forbidden("Only students can view assessments"));
        }
        let recent = self
            .store
            .list_assessments(&AssessmentFilter::for_user(&user.id), Page::first(RECENT_ASSESSMENTS))
            .await?;
        let incomplete = self
            .store
            .list_assessments(
                &AssessmentFilter::for_user(&user.id).with_statuses(&OPEN_STATUSES),
                Page::all(),
            )
            .await?;
        debug!(
            "[{}] 测评列表: {} 个最近, {} 个未完成",
            user.id,
            recent.len(),
            incomplete.len()
        );
        Ok(AssessmentOverview { recent, incomplete })
    }

    /// 读取自己的测评
    pub async fn get(&self, user: &User, assessment_id: &str) -> AppResult<Assessment> {
        self.load_owned(user, assessment_id).await
    }

    /// 测评引用的题目，按测评中的顺序
    pub async fn questions_of(&self, assessment: &Assessment) -> AppResult<Vec<Question>> {
        let ids: Vec<String> = assessment.questions.iter().map(|q| q.question_id.clone()).collect();
        let mut bank: HashMap<String, Question> = self
            .store
            .find_questions(&ids)
            .await?
            .into_iter()
            .map(|q| (q.id.clone(), q))
            .collect();
        let mut ordered: Vec<&AssessmentQuestion> = assessment.questions.iter().collect();
        ordered.sort_by_key(|q| q.order);
        Ok(ordered
            .into_iter()
            .filter_map(|q| bank.remove(&q.question_id))
            .collect())
    }

    // ========== 作答 ==========

    /// 开始测评；已在作答中的测评直接继续
    pub async fn start(&self, user: &User, assessment_id: &str) -> AppResult<Assessment> {
        let mut assessment = self.load_owned(user, assessment_id).await?;
        let now = Utc::now();

        match assessment.status {
            AssessmentStatus::NotStarted => {
                assessment.status = AssessmentStatus::InProgress;
                assessment.start_time = Some(now);
                assessment.adaptive_data.initial_ability = 0.0;
                info!("[{}] ▶️ 开始测评 {}", user.id, assessment.id);
            }
            AssessmentStatus::InProgress => {
                if self.expire_if_needed(&mut assessment, now).await? {
                    return Err(time_expired());
                }
                debug!("[{}] 继续测评 {}", user.id, assessment.id);
            }
            _ => return Err(already_completed()),
        }

        assessment.last_accessed_at = now;
        self.store.update_assessment(&assessment).await?;
        Ok(assessment)
    }

    /// 选出下一题
    pub async fn next_question(&self, user: &User, assessment_id: &str) -> AppResult<NextQuestion> {
        let mut assessment = self.load_active(user, assessment_id).await?;
        let now = Utc::now();

        let adaptive = assessment.config.adaptive_enabled;
        let mut bank = self.bank_of(&assessment).await?;

        let verdict = if adaptive {
            let responses = responses_of(&assessment, &bank);
            Some(
                self.engine
                    .should_terminate(&responses, Some(assessment.questions.len())),
            )
        } else {
            None
        };

        let finished = verdict.as_ref().is_some_and(|v| v.should_terminate);
        let pick = if finished {
            None
        } else {
            self.pick_next(&assessment, &bank)
        };

        let Some((question_id, reason)) = pick else {
            assessment.last_accessed_at = now;
            self.store.update_assessment(&assessment).await?;
            debug!("[{}] 测评 {} 没有更多题目", user.id, assessment.id);
            return Ok(NextQuestion {
                question: None,
                order: None,
                progress: assessment.progress(),
                reason: None,
                verdict,
            });
        };

        let question = bank
            .remove(&question_id)
            .ok_or_else(|| AppError::not_found("Question not found"))?;
        let order = assessment
            .questions
            .iter()
            .find(|q| q.question_id == question_id)
            .map(|q| q.order);

        if adaptive {
            assessment.adaptive_data.question_selection_log.push(QuestionSelectionLog {
                question_id: question_id.clone(),
                reason: reason.clone(),
                difficulty: question.difficulty.as_str().to_string(),
                timestamp: now,
            });
        }
        assessment.last_accessed_at = now;
        self.store.update_assessment(&assessment).await?;

        debug!("[{}] 🎯 下一题 {} ({})", user.id, question_id, reason);
        Ok(NextQuestion {
            question: Some(question),
            order,
            progress: assessment.progress(),
            reason: Some(reason),
            verdict,
        })
    }

    /// 提交一道题的答案
    pub async fn answer(
        &self,
        user: &User,
        assessment_id: &str,
        submission: AnswerSubmission,
    ) -> AppResult<AnswerOutcome> {
        let mut assessment = self.load_active(user, assessment_id).await?;
        let now = Utc::now();

        if !submission.time_spent.is_finite() || submission.time_spent < 0.0 {
            return Err(AppError::validation("timeSpent must be a non-negative number"));
        }

        let position = assessment
            .questions
            .iter()
            .position(|q| q.question_id == submission.question_id)
            .ok_or_else(|| AppError::not_found("Question not found in this assessment"))?;
        if assessment.questions[position].is_answered {
            return Err(AppError::bad_request("Question already answered"));
        }

        let mut question = self
            .store
            .find_question(&submission.question_id)
            .await?
            .ok_or_else(|| AppError::not_found("Question not found"))?;
        if submission.selected_answer >= question.options.len() {
            return Err(AppError::bad_request(format!(
                "selectedAnswer must be between 0 and {}",
                question.options.len().saturating_sub(1)
            )));
        }

        let is_correct = submission.selected_answer == question.correct_answer;
        {
            let item = &mut assessment.questions[position];
            item.is_answered = true;
            item.selected_answer = Some(submission.selected_answer);
            item.is_correct = Some(is_correct);
            item.time_spent = submission.time_spent;
        }
        assessment.time_spent += submission.time_spent;

        question.record_usage(is_correct, submission.time_spent);
        self.store.update_question(&question).await?;

        let ability = if assessment.config.adaptive_enabled {
            let mut bank = self.bank_of(&assessment).await?;
            bank.insert(question.id.clone(), question.clone());
            let theta = self.engine.estimate_ability(&responses_of(&assessment, &bank));
            assessment.record_ability(position, theta, now);
            Some(theta)
        } else {
            None
        };

        assessment.last_accessed_at = now;
        self.store.update_assessment(&assessment).await?;

        let answered = assessment.questions.iter().filter(|q| q.is_answered).count();
        debug!(
            "[{}] ✍️ 测评 {} 第 {} 题: {}",
            user.id,
            assessment.id,
            position + 1,
            if is_correct { "正确" } else { "错误" }
        );

        Ok(AnswerOutcome {
            is_correct,
            correct_answer: question.correct_answer,
            explanation: question.explanation,
            progress: assessment.progress(),
            answered_questions: answered,
            total_questions: assessment.questions.len(),
            ability,
        })
    }

    /// 完成测评：计分、分析，并更新用户画像
    pub async fn complete(&self, user: &User, assessment_id: &str) -> AppResult<Assessment> {
        let mut assessment = self.load_owned(user, assessment_id).await?;
        if !assessment.status.is_open() {
            return Err(already_completed());
        }

        let now = Utc::now();
        if assessment.is_expired(now) {
            // 与作答时触发的超时提交一致，只按已答题计分
            assessment.auto_submit(now, CompletionReason::TimeExpired);
        } else {
            assessment.calculate_score();
            assessment.status = AssessmentStatus::Completed;
            assessment.end_time = Some(now);
            assessment.completion_reason = CompletionReason::UserCompleted;
        }
        self.finalize(&mut assessment, now).await?;

        info!(
            "[{}] ✅ 完成测评 {}: {:.1}% ({})",
            user.id,
            assessment.id,
            assessment.results.percentage,
            if assessment.results.passed { "通过" } else { "未通过" }
        );
        Ok(assessment)
    }

    /// 自动提交长时间未访问的未完成测评，返回提交数量
    pub async fn auto_submit_stale(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<usize> {
        let filter = AssessmentFilter {
            last_accessed_before: Some(now - Duration::hours(self.stale_hours)),
            ..AssessmentFilter::for_user(user_id).with_statuses(&OPEN_STATUSES)
        };
        let stale = self.store.list_assessments(&filter, Page::all()).await?;
        let mut submitted = 0;
        for mut assessment in stale.into_iter().filter(|a| a.is_stale(now, self.stale_hours)) {
            assessment.auto_submit(now, CompletionReason::AutoSubmitted);
            self.finalize(&mut assessment, now).await?;
            debug!("[{}] 自动提交测评 {}", user_id, assessment.id);
            submitted += 1;
        }
        Ok(submitted)
    }

    // ========== 内部方法 ==========

    async fn load_owned(&self, user: &User, assessment_id: &str) -> AppResult<Assessment> {
        let assessment = self
            .store
            .find_assessment(assessment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Assessment not found"))?;
        if assessment.user_id != user.id {
            warn!("[{}] ⚠️ 尝试访问他人的测评 {}", user.id, assessment_id);
            return Err(AppError::forbidden("Access denied"));
        }
        Ok(assessment)
    }

    /// 读取正在作答的测评，超时的测评会被自动提交
    async fn load_active(&self, user: &User, assessment_id: &str) -> AppResult<Assessment> {
        let mut assessment = self.load_owned(user, assessment_id).await?;
        match assessment.status {
            AssessmentStatus::InProgress => {}
            AssessmentStatus::NotStarted => {
                return Err(AppError::bad_request("Assessment has not been started"))
            }
            _ => return Err(already_completed()),
        }
        if self.expire_if_needed(&mut assessment, Utc::now()).await? {
            return Err(time_expired());
        }
        Ok(assessment)
    }

    async fn expire_if_needed(&self, assessment: &mut Assessment, now: DateTime<Utc>) -> AppResult<bool> {
        if !assessment.is_expired(now) {
            return Ok(false);
        }
        assessment.auto_submit(now, CompletionReason::TimeExpired);
        self.finalize(assessment, now).await?;
        info!("⏰ 测评 {} 已超时，自动提交", assessment.id);
        Ok(true)
    }

    /// 已计分测评的收尾：能力与表现分析、题目参数校准、用户画像
    ///
    /// 没有答过题的自动提交不计入用户画像
    async fn finalize(&self, assessment: &mut Assessment, now: DateTime<Utc>) -> AppResult<()> {
        assessment.last_accessed_at = now;

        let bank = self.bank_of(assessment).await?;
        let responses = responses_of(assessment, &bank);
        let theta = self.engine.estimate_ability(&responses);
        if assessment.config.adaptive_enabled {
            assessment.adaptive_data.final_ability = theta;
            assessment.psychometric_analysis = psychometric_analysis(&responses, theta);
        }

        let topic_scores = assessment.topic_accuracy();
        assessment.performance_analysis =
            performance_analysis(&assessment.subject, &topic_scores, assessment.results.passed);
        self.store.update_assessment(assessment).await?;

        self.calibrate_items(assessment, bank, theta).await?;

        if assessment.results.answered_questions > 0 {
            self.update_user_profile(&assessment.user_id, assessment, &topic_scores)
                .await?;
        } else {
            debug!("[{}] 测评 {} 未作答，跳过画像更新", assessment.user_id, assessment.id);
        }
        Ok(())
    }

    /// 以本次测评的能力估计为作答者能力，重新校准已答题目
    async fn calibrate_items(
        &self,
        assessment: &Assessment,
        mut bank: HashMap<String, Question>,
        theta: f64,
    ) -> AppResult<()> {
        for item in assessment.questions.iter().filter(|q| q.is_answered) {
            let Some(mut question) = bank.remove(&item.question_id) else {
                continue;
            };
            question.calibrate(ResponseRecord {
                is_correct: item.is_correct == Some(true),
                user_ability: theta,
            });
            self.store.update_question(&question).await?;
        }
        Ok(())
    }

    async fn bank_of(&self, assessment: &Assessment) -> AppResult<HashMap<String, Question>> {
        let ids: Vec<String> = assessment.questions.iter().map(|q| q.question_id.clone()).collect();
        Ok(self
            .store
            .find_questions(&ids)
            .await?
            .into_iter()
            .map(|q| (q.id.clone(), q))
            .collect())
    }

    /// 按测评的选题策略挑出下一题，返回题目 ID 和原因
    fn pick_next(&self, assessment: &Assessment, bank: &HashMap<String, Question>) -> Option<(String, String)> {
        let mut unanswered: Vec<&AssessmentQuestion> =
            assessment.questions.iter().filter(|q| !q.is_answered).collect();
        unanswered.sort_by_key(|q| q.order);
        let first = unanswered.first()?;

        let strategy = match (assessment.config.adaptive_enabled, assessment.config.question_selection_strategy) {
            (_, QuestionSelectionStrategy::TopicBased) => {
                return least_covered_topic(assessment, &unanswered)
                    .map(|q| (q.question_id.clone(), "topic_based".to_string()));
            }
            (false, _) => return Some((first.question_id.clone(), "sequential".to_string())),
            (true, QuestionSelectionStrategy::Adaptive) => SelectionStrategy::MaximumInformation,
            (true, QuestionSelectionStrategy::DifficultyBased) => SelectionStrategy::ClosestDifficulty,
            (true, QuestionSelectionStrategy::Random) => SelectionStrategy::Random,
        };

        let candidates: Vec<Candidate> = unanswered
            .iter()
            .filter_map(|q| bank.get(&q.question_id))
            .map(|q| Candidate {
                id: q.id.clone(),
                params: q.item_parameters(),
                difficulty_score: q.difficulty_score,
            })
            .collect();
        let answered: HashSet<String> = assessment
            .questions
            .iter()
            .filter(|q| q.is_answered)
            .map(|q| q.question_id.clone())
            .collect();

        let mut rng = rand::thread_rng();
        self.engine
            .select_next(assessment.current_ability(), &candidates, &answered, strategy, &mut rng)
            .map(|selection| {
                let reason = selection.reason();
                (selection.id, reason)
            })
    }

    async fn update_user_profile(
        &self,
        user_id: &str,
        assessment: &Assessment,
        topic_scores: &[(String, f64)],
    ) -> AppResult<()> {
        let Some(mut user) = self.store.find_user(user_id).await? else {
            warn!("[{}] ⚠️ 用户不存在，跳过画像更新", user_id);
            return Ok(());
        };

        let weights = topic_difficulty_weights(assessment);
        for (topic, accuracy) in topic_scores {
            let weight = weights
                .get(topic)
                .copied()
                .unwrap_or_else(|| assessment.dominant_difficulty().weight());
            user.update_skill_level(topic, accuracy / 100.0, weight);
        }
        user.record_assessment(&assessment.id, assessment.results.score, topic_scores);
        self.store.update_user(&user).await
    }
}

fn already_completed() -> AppError {
    AppError::bad_request("Assessment is already completed")
}

fn time_expired() -> AppError {
    AppError::bad_request("Assessment time limit exceeded; it has been submitted automatically")
}

/// 已答题目对应的 IRT 作答记录
fn responses_of(assessment: &Assessment, bank: &HashMap<String, Question>) -> Vec<ItemResponse> {
    assessment
        .questions
        .iter()
        .filter(|q| q.is_answered)
        .filter_map(|q| {
            bank.get(&q.question_id).map(|question| ItemResponse {
                params: question.item_parameters(),
                correct: q.is_correct == Some(true),
            })
        })
        .collect()
}

/// 已答题数最少的知识点中，顺序最靠前的未答题
fn least_covered_topic<'a>(
    assessment: &Assessment,
    unanswered: &[&'a AssessmentQuestion],
) -> Option<&'a AssessmentQuestion> {
    let mut covered: HashMap<&str, usize> = HashMap::new();
    for q in assessment.questions.iter().filter(|q| q.is_answered) {
        *covered.entry(q.topic.as_deref().unwrap_or("")).or_default() += 1;
    }
    unanswered
        .iter()
        .min_by_key(|q| (covered.get(q.topic.as_deref().unwrap_or("")).copied().unwrap_or(0), q.order))
        .copied()
}

/// 每个知识点已答题目的平均难度系数
fn topic_difficulty_weights(assessment: &Assessment) -> HashMap<String, f64> {
    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
    for q in assessment.questions.iter().filter(|q| q.is_answered) {
        let topic = q.topic.clone().unwrap_or_else(|| assessment.subject.clone());
        let entry = sums.entry(topic).or_default();
        entry.0 += q.difficulty.unwrap_or(Difficulty::Medium).weight();
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(topic, (sum, n))| (topic, sum / n as f64))
        .collect()
}

/// 自适应测评的测量精度
pub fn psychometric_analysis(responses: &[ItemResponse], theta: f64) -> PsychometricAnalysis {
    let standard_error = adaptive_engine::standard_error_at(responses, theta);
    let (lower, upper) = adaptive_engine::confidence_interval(theta, standard_error);
    PsychometricAnalysis {
        // 能力方差取 1 时的边际信度
        reliability: Some((1.0 - standard_error.powi(2)).clamp(0.0, 1.0)),
        validity: None,
        standard_error: Some(standard_error),
        confidence_interval: Some(ConfidenceInterval { lower, upper }),
    }
}

/// 按知识点正确率归纳优势和薄弱项
pub fn performance_analysis(subject: &str, topic_scores: &[(String, f64)], passed: bool) -> PerformanceAnalysis {
    let mut by_band: BTreeMap<u8, Vec<String>> = BTreeMap::new();
    for (topic, score) in topic_scores {
        let band = if *score >= STRENGTH_THRESHOLD {
            0
        } else if *score < WEAKNESS_THRESHOLD {
            2
        } else {
            1
        };
        by_band.entry(band).or_default().push(topic.clone());
    }
    let strengths = by_band.remove(&0).unwrap_or_default();
    let improvement_areas = by_band.remove(&1).unwrap_or_default();
    let weaknesses = by_band.remove(&2).unwrap_or_default();

    let mut next_steps: Vec<String> = weaknesses.iter().map(|t| format!("Review {}", t)).collect();
    next_steps.extend(improvement_areas.iter().map(|t| format!("Practice more {} questions", t)));
    next_steps.push(if passed {
        format!("Attempt a harder assessment in {}", subject)
    } else {
        format!("Retake a practice assessment in {}", subject)
    });

    PerformanceAnalysis {
        recommended_topics: weaknesses.clone(),
        skill_gaps: weaknesses.clone(),
        strengths,
        weaknesses,
        improvement_areas,
        next_steps,
    }
}
