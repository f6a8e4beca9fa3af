//! The speech-synthesis boundary.
//!
//! The core hands final question/feedback text plus an emotion tag to a
//! `SpeechSink` and moves on: delivery is fire-and-forget and nothing in
//! the session waits on it.

use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Tag the avatar layer uses to color its delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Encouraging,
    Neutral,
    Concerned,
}

impl Emotion {
    /// Maps a 0-100 answer score onto a delivery emotion.
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Emotion::Happy,
            60..=79 => Emotion::Encouraging,
            40..=59 => Emotion::Neutral,
            _ => Emotion::Concerned,
        }
    }
}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait SpeechSink {
    async fn speak(&self, text: &str, emotion: Emotion) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_bands_cover_all_scores() {
        assert_eq!(Emotion::from_score(95), Emotion::Happy);
        assert_eq!(Emotion::from_score(80), Emotion::Happy);
        assert_eq!(Emotion::from_score(79), Emotion::Encouraging);
        assert_eq!(Emotion::from_score(60), Emotion::Encouraging);
        assert_eq!(Emotion::from_score(40), Emotion::Neutral);
        assert_eq!(Emotion::from_score(39), Emotion::Concerned);
        assert_eq!(Emotion::from_score(0), Emotion::Concerned);
    }
}
