//! The final session view handed to the result sink at termination.

use crate::controller::{AnswerRecord, QuestionSource};
use crate::profile::CandidateProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSummary {
    pub question: String,
    pub source: QuestionSource,
    pub score: u32,
    pub detailed_feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub profile: CandidateProfile,
    pub performance_score: u32,
    pub best_score: u32,
    pub questions_asked: u32,
    pub question_budget: u32,
    pub completed: bool,
    pub answers: Vec<AnswerSummary>,
}

impl SessionSummary {
    pub fn answer_summaries(records: &[AnswerRecord]) -> Vec<AnswerSummary> {
        records
            .iter()
            .map(|r| AnswerSummary {
                question: r.question.clone(),
                source: r.source,
                score: r.result.score,
                detailed_feedback: r.result.detailed_feedback.clone(),
            })
            .collect()
    }
}
