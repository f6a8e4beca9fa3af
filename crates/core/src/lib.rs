pub mod aggregator;
pub mod behavior;
pub mod controller;
pub mod grammar;
pub mod metrics;
pub mod oracle;
pub mod performance;
pub mod pipeline;
pub mod profile;
pub mod scorer;
pub mod speech;
pub mod summary;
pub mod vocal;

pub use controller::{Phase, QuestionController, QuestionSource, RejectReason, SubmitOutcome};
pub use metrics::{AnalysisSnapshot, AudioFrame, LandmarkFrame};
pub use oracle::{LocalOracle, OpenAiOracle, QuestionOracle};
pub use pipeline::{Pipeline, PipelineConfig, TranscriptUpdate};
pub use profile::CandidateProfile;
pub use speech::{Emotion, SpeechSink};
pub use summary::SessionSummary;

use serde::{Deserialize, Serialize};

/// Represents commands that the core logic (`QuestionController`) issues to
/// the runtime.
///
/// This enum is the primary API for decoupling the session's decision-making
/// from the runtime's execution of side effects (like speaking text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Command the runtime to speak the given text with a delivery emotion.
    Speak { text: String, emotion: Emotion },
    /// Command indicating the session is complete, with the final summary.
    SessionComplete(Box<SessionSummary>),
}
