//! Environment-backed runtime settings.
//!
//! Everything the binary takes from its environment is read once at startup
//! into a `Config`; nothing else in the service touches `std::env`. Session
//! parameters (profile, budget, input sources) come from the CLI instead,
//! since they vary per run rather than per deployment.

use std::env;
use tracing::Level;

/// Fixed buffer size requested for the microphone input stream.
pub const INPUT_CHUNK_SIZE: usize = 1024;
/// How often buffered microphone samples are flushed into the pipeline.
pub const AUDIO_FLUSH_INTERVAL_MS: u64 = 100;
/// Replay cadence for recorded landmark frames.
pub const LANDMARK_REPLAY_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the session runs on the local question bank alone.
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Reads the environment, after loading a `.env` file if one exists.
    ///
    /// Recognized variables, all optional:
    /// * `OPENAI_API_KEY` - enables the LLM-backed oracle.
    /// * `CHAT_MODEL` - model for question generation and answer analysis,
    ///   default "gpt-4o".
    /// * `RUST_LOG` - log level, default "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let openai_api_key = env::var("OPENAI_API_KEY").ok();
        let chat_model = env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            openai_api_key,
            chat_model,
            log_level,
        })
    }
}
