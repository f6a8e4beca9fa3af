//! Console-backed speech sink.
//!
//! The runtime stands in for a TTS avatar: utterances are printed to the
//! terminal and logged with their delivery emotion. Swapping in a real
//! synthesis backend means implementing `SpeechSink` somewhere else and
//! changing nothing in the core.

use anyhow::Result;
use async_trait::async_trait;
use interview_core::{Emotion, SpeechSink};

pub struct ConsoleSpeechSink;

#[async_trait]
impl SpeechSink for ConsoleSpeechSink {
    async fn speak(&self, text: &str, emotion: Emotion) -> Result<()> {
        tracing::info!(?emotion, "interviewer speaking");
        println!("\nInterviewer: {text}\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn console_sink_never_fails() {
        let sink = ConsoleSpeechSink;
        sink.speak("Hello there.", Emotion::Neutral).await.unwrap();
        sink.speak("Well done!", Emotion::Happy).await.unwrap();
    }
}
