//! The adaptive question controller.
//!
//! A state machine over one interview session: it owns the session state,
//! scores submitted answers through the oracle (with a bounded timeout and
//! the deterministic local fallback), updates the performance aggregator,
//! and decides whether the next question is a feedback probe, a follow-up,
//! a new main question, or the end of the session. Side effects (speaking,
//! the final summary hand-off) leave through the command channel so the
//! runtime stays decoupled from the decisions.

use crate::Command;
use crate::oracle::{
    AnswerRequest, ContextEntry, LocalOracle, QuestionOracle, QuestionRequest, truncate,
};
use crate::performance::PerformanceAggregator;
use crate::profile::CandidateProfile;
use crate::scorer::{self, ScoreResult};
use crate::speech::Emotion;
use crate::summary::SessionSummary;
use crate::metrics::AnalysisSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;

/// Main questions counted against the budget before the session ends.
pub const DEFAULT_QUESTION_BUDGET: u32 = 8;
/// Bounded sliding window of recent question/answer pairs.
pub const CONTEXT_WINDOW: usize = 5;
/// Answers are excerpted to this many chars inside the context window.
const ANSWER_EXCERPT_CHARS: usize = 120;

/// Bounded waits on the external oracle; past these the local fallback
/// answers instead, so the session never hangs on a slow service.
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(3);
pub const ANALYZE_TIMEOUT: Duration = Duration::from_secs(4);

const LAST_RESORT_QUESTION: &str = "Tell me about a recent project you are proud of.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingAnswer,
    Analyzing,
    Terminated,
}

/// What kind of question the candidate is currently answering. Only `Main`
/// questions count against the session budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Main,
    FollowUp,
    Feedback,
}

/// One scored answer, appended in submission order and never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub source: QuestionSource,
    pub result: ScoreResult,
    pub answered_at: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Empty or whitespace-only answer; the caller should re-prompt.
    EmptyAnswer,
    /// A previous submission is still being scored.
    AnalysisInProgress,
    /// The question budget has been spent.
    SessionOver,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// No state transition happened.
    Rejected(RejectReason),
    /// The answer was scored and the session moved on to a new question.
    Asked {
        question: String,
        source: QuestionSource,
        result: ScoreResult,
    },
    /// The answer was scored and it was the last one.
    Terminated {
        result: ScoreResult,
        summary: SessionSummary,
    },
}

pub struct QuestionController {
    oracle: Arc<dyn QuestionOracle + Send + Sync>,
    fallback: LocalOracle,
    profile: CandidateProfile,
    command_tx: mpsc::Sender<Command>,
    performance: PerformanceAggregator,
    phase: Phase,
    current_question: String,
    current_source: QuestionSource,
    questions_asked: u32,
    question_budget: u32,
    conversation_context: VecDeque<ContextEntry>,
    previous_questions: Vec<String>,
    answers: Vec<AnswerRecord>,
}

impl QuestionController {
    pub fn new(
        oracle: Arc<dyn QuestionOracle + Send + Sync>,
        profile: CandidateProfile,
        question_budget: u32,
        command_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            oracle,
            fallback: LocalOracle::new(),
            profile,
            command_tx,
            performance: PerformanceAggregator::new(),
            phase: Phase::AwaitingAnswer,
            current_question: String::new(),
            current_source: QuestionSource::Main,
            questions_asked: 0,
            question_budget,
            conversation_context: VecDeque::with_capacity(CONTEXT_WINDOW),
            previous_questions: Vec::new(),
            answers: Vec::new(),
        }
    }

    /// Asks the opening main question.
    pub async fn start(&mut self) -> String {
        let question = self.generate_with_fallback(false, None).await;
        self.set_current(question.clone(), QuestionSource::Main);
        self.speak(&question, Emotion::Neutral).await;
        question
    }

    /// Processes one submitted answer against the given snapshot.
    ///
    /// Empty answers and reentrant submissions are rejected without any
    /// state transition. Everything else is scored exactly once.
    pub async fn submit_answer(
        &mut self,
        answer: &str,
        snapshot: &AnalysisSnapshot,
    ) -> SubmitOutcome {
        match self.phase {
            Phase::Terminated => return SubmitOutcome::Rejected(RejectReason::SessionOver),
            Phase::Analyzing => {
                return SubmitOutcome::Rejected(RejectReason::AnalysisInProgress);
            }
            Phase::AwaitingAnswer => {}
        }
        let answer = answer.trim();
        if answer.is_empty() {
            self.speak("Take your time — I'd like to hear your answer when you're ready.", Emotion::Encouraging)
                .await;
            return SubmitOutcome::Rejected(RejectReason::EmptyAnswer);
        }

        self.phase = Phase::Analyzing;
        let answered_question = self.current_question.clone();
        let answered_source = self.current_source;

        let result = self.analyze_with_fallback(answer, snapshot).await;

        // Exactly-once bookkeeping for this answer.
        self.performance.record_score(result.score);
        if self.conversation_context.len() == CONTEXT_WINDOW {
            self.conversation_context.pop_front();
        }
        self.conversation_context.push_back(ContextEntry {
            question: answered_question.clone(),
            answer_excerpt: truncate(answer, ANSWER_EXCERPT_CHARS),
        });
        self.answers.push(AnswerRecord {
            question: answered_question,
            source: answered_source,
            result: result.clone(),
            answered_at: SystemTime::now(),
        });
        if answered_source == QuestionSource::Main {
            self.questions_asked += 1;
        }

        self.speak(&result.detailed_feedback, Emotion::from_score(result.score))
            .await;

        // The budget wins over any pending follow-up.
        if self.questions_asked >= self.question_budget {
            self.phase = Phase::Terminated;
            let summary = self.summary();
            self.speak(
                "That was the last question — thank you. Your summary is ready.",
                Emotion::Happy,
            )
            .await;
            if let Err(e) = self
                .command_tx
                .send(Command::SessionComplete(Box::new(summary.clone())))
                .await
            {
                tracing::warn!("failed to deliver session summary: {e}");
            }
            return SubmitOutcome::Terminated { result, summary };
        }

        // A probe embedded in the feedback outranks a separately suggested
        // follow-up; with neither, move on to a fresh main question.
        let (question, source) = if let Some(probe) = result.feedback_probe.clone() {
            (probe, QuestionSource::Feedback)
        } else if let Some(follow_up) = result
            .follow_up_question
            .clone()
            .filter(|_| result.has_follow_up)
        {
            (follow_up, QuestionSource::FollowUp)
        } else {
            let next = self
                .generate_with_fallback(false, Some(answer.to_string()))
                .await;
            (next, QuestionSource::Main)
        };

        self.set_current(question.clone(), source);
        self.phase = Phase::AwaitingAnswer;
        self.speak(&question, Emotion::Neutral).await;

        SubmitOutcome::Asked {
            question,
            source,
            result,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_question(&self) -> &str {
        &self.current_question
    }

    pub fn current_source(&self) -> QuestionSource {
        self.current_source
    }

    pub fn questions_asked(&self) -> u32 {
        self.questions_asked
    }

    pub fn performance_score(&self) -> u32 {
        self.performance.performance_score()
    }

    pub fn conversation_context(&self) -> &VecDeque<ContextEntry> {
        &self.conversation_context
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            profile: self.profile.clone(),
            performance_score: self.performance.performance_score(),
            best_score: self.performance.best_score(),
            questions_asked: self.questions_asked,
            question_budget: self.question_budget,
            completed: self.phase == Phase::Terminated,
            answers: SessionSummary::answer_summaries(&self.answers),
        }
    }

    fn set_current(&mut self, question: String, source: QuestionSource) {
        self.previous_questions.push(question.clone());
        self.current_question = question;
        self.current_source = source;
    }

    fn question_request(&self, is_follow_up: bool, last_answer: Option<String>) -> QuestionRequest {
        QuestionRequest {
            profile: self.profile.clone(),
            performance_score: self.performance.performance_score(),
            previous_questions: self.previous_questions.clone(),
            main_questions_asked: self.questions_asked,
            context: self.conversation_context.iter().cloned().collect(),
            is_follow_up,
            last_answer,
        }
    }

    async fn generate_with_fallback(
        &self,
        is_follow_up: bool,
        last_answer: Option<String>,
    ) -> String {
        let request = self.question_request(is_follow_up, last_answer);
        match tokio::time::timeout(GENERATE_TIMEOUT, self.oracle.generate_question(&request)).await
        {
            Ok(Ok(question)) if !question.trim().is_empty() => question,
            Ok(Ok(_)) => {
                tracing::warn!("oracle returned an empty question, using local fallback");
                self.local_question(&request).await
            }
            Ok(Err(e)) => {
                tracing::warn!("oracle question generation failed: {e}, using local fallback");
                self.local_question(&request).await
            }
            Err(_) => {
                tracing::warn!(
                    "oracle question generation exceeded {GENERATE_TIMEOUT:?}, using local fallback"
                );
                self.local_question(&request).await
            }
        }
    }

    async fn local_question(&self, request: &QuestionRequest) -> String {
        match self.fallback.generate_question(request).await {
            Ok(question) => question,
            Err(_) => LAST_RESORT_QUESTION.to_string(),
        }
    }

    async fn analyze_with_fallback(
        &self,
        answer: &str,
        snapshot: &AnalysisSnapshot,
    ) -> ScoreResult {
        let request = AnswerRequest {
            question: self.current_question.clone(),
            answer: answer.to_string(),
            performance_score: self.performance.performance_score(),
            context: self.conversation_context.iter().cloned().collect(),
            profile: self.profile.clone(),
            snapshot: snapshot.clone(),
        };
        match tokio::time::timeout(ANALYZE_TIMEOUT, self.oracle.analyze_answer(&request)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!("oracle answer analysis failed: {e}, using heuristic scorer");
                scorer::score_answer(
                    &request.question,
                    answer,
                    snapshot,
                    request.performance_score,
                )
            }
            Err(_) => {
                tracing::warn!(
                    "oracle answer analysis exceeded {ANALYZE_TIMEOUT:?}, using heuristic scorer"
                );
                scorer::score_answer(
                    &request.question,
                    answer,
                    snapshot,
                    request.performance_score,
                )
            }
        }
    }

    // Speech is fire-and-forget: a full or closed channel is logged, never
    // allowed to stall the session.
    async fn speak(&self, text: &str, emotion: Emotion) {
        if let Err(e) = self
            .command_tx
            .send(Command::Speak {
                text: text.to_string(),
                emotion,
            })
            .await
        {
            tracing::warn!("failed to send speak command: {e}");
        }
    }
}
