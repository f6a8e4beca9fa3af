mod config;
mod speech;

use crate::config::{
    AUDIO_FLUSH_INTERVAL_MS, Config, INPUT_CHUNK_SIZE, LANDMARK_REPLAY_INTERVAL_MS,
};
use crate::speech::ConsoleSpeechSink;
use anyhow::{Context, Result, bail};
use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use interview_core::profile::{AssessmentType, Difficulty, FieldCategory};
use interview_core::{
    AudioFrame, CandidateProfile, Command, LandmarkFrame, LocalOracle, OpenAiOracle, Pipeline,
    PipelineConfig, QuestionController, QuestionOracle, SpeechSink, SubmitOutcome,
    TranscriptUpdate,
};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
struct Cli {
    /// Job title the candidate is interviewing for
    #[arg(default_value = "Software Engineer")]
    title: String,
    /// Question category: general, technical, behavioral, or leadership
    #[arg(long, default_value = "general")]
    category: String,
    /// Difficulty: beginner, intermediate, or advanced
    #[arg(long, default_value = "intermediate")]
    difficulty: String,
    /// Assessment type: mock, screening, or practice
    #[arg(long, default_value = "mock")]
    assessment: String,
    /// Years of experience the questions should assume
    #[arg(long, default_value_t = 3)]
    experience_years: u32,
    /// Comma-separated skills to steer question generation
    #[arg(long, value_delimiter = ',')]
    skills: Vec<String>,
    /// Main questions asked before the session ends
    #[arg(long, default_value_t = 8)]
    budget: u32,
    /// Run without microphone capture (vocal metrics stay at rest)
    #[arg(long)]
    no_mic: bool,
    /// JSONL file of recorded facial landmark frames to replay
    #[arg(long)]
    landmarks: Option<PathBuf>,
    /// Where the final session summary is written
    #[arg(long, default_value = "interview_summary.json")]
    out: PathBuf,
}

fn parse_category(s: &str) -> Result<FieldCategory> {
    Ok(match s.to_lowercase().as_str() {
        "general" => FieldCategory::General,
        "technical" => FieldCategory::Technical,
        "behavioral" => FieldCategory::Behavioral,
        "leadership" => FieldCategory::Leadership,
        other => bail!("Unknown category '{other}'"),
    })
}

fn parse_difficulty(s: &str) -> Result<Difficulty> {
    Ok(match s.to_lowercase().as_str() {
        "beginner" => Difficulty::Beginner,
        "intermediate" => Difficulty::Intermediate,
        "advanced" => Difficulty::Advanced,
        other => bail!("Unknown difficulty '{other}'"),
    })
}

fn parse_assessment(s: &str) -> Result<AssessmentType> {
    Ok(match s.to_lowercase().as_str() {
        "mock" => AssessmentType::Mock,
        "screening" => AssessmentType::Screening,
        "practice" => AssessmentType::Practice,
        other => bail!("Unknown assessment type '{other}'"),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting interviewer service...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    let profile = CandidateProfile {
        title: args.title.clone(),
        field_category: parse_category(&args.category)?,
        skills: args.skills.clone(),
        experience_years: args.experience_years,
        difficulty: parse_difficulty(&args.difficulty)?,
        assessment_type: parse_assessment(&args.assessment)?,
    };

    // --- 4. Pick the Oracle ---
    let oracle: Arc<dyn QuestionOracle + Send + Sync> = match config.openai_api_key.clone() {
        Some(key) => {
            tracing::info!("Using OpenAI oracle with model '{}'", config.chat_model);
            Arc::new(OpenAiOracle::new(key, config.chat_model.clone()))
        }
        None => {
            tracing::info!("OPENAI_API_KEY not set, using the local question bank");
            Arc::new(LocalOracle::new())
        }
    };

    // --- 5. Application Setup ---

    // Command channel decoupling core decisions from runtime side effects.
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);

    // Analysis pipeline: one per session.
    let mut pipeline = Pipeline::spawn(PipelineConfig::default());

    // Microphone capture, unless disabled. The stream must stay alive for
    // the duration of the session, hence the binding.
    let _input_stream = if args.no_mic {
        tracing::info!("Microphone capture disabled (--no-mic)");
        None
    } else {
        match start_microphone(pipeline.audio_sender()) {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::warn!("Microphone unavailable, continuing without audio: {e:?}");
                None
            }
        }
    };

    // Optional replay of recorded landmark frames.
    if let Some(path) = args.landmarks.clone() {
        spawn_landmark_replay(path, pipeline.landmark_sender()).await?;
    }

    // This task handles commands from the core logic, executing side effects.
    let out_path = args.out.clone();
    let command_handler = tokio::spawn(async move {
        let sink = ConsoleSpeechSink;
        while let Some(command) = command_rx.recv().await {
            match command {
                Command::Speak { text, emotion } => {
                    if let Err(e) = sink.speak(&text, emotion).await {
                        tracing::warn!("Failed to speak: {e:?}");
                    }
                }
                Command::SessionComplete(summary) => {
                    tracing::info!(
                        performance_score = summary.performance_score,
                        best_score = summary.best_score,
                        "Session complete"
                    );
                    if let Err(e) = write_summary(&out_path, &summary).await {
                        tracing::error!("Failed to write session summary: {e:?}");
                    } else {
                        tracing::info!("Summary written to {}", out_path.display());
                    }
                    break;
                }
            }
        }
    });

    // --- 6. Run the Session ---
    let mut controller = QuestionController::new(oracle, profile, args.budget, command_tx);

    let session = async {
        controller.start().await;
        let mut asked_at = Instant::now();
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        while let Some(line) = lines.next_line().await? {
            let answer = line.trim().to_string();
            if !answer.is_empty() {
                // Feed the transcript path so pace/filler/grammar metrics
                // reflect this answer before it is scored.
                let update = TranscriptUpdate {
                    text: answer.clone(),
                    elapsed_secs: asked_at.elapsed().as_secs_f64(),
                };
                if let Err(e) = pipeline.transcript_sender().send(update).await {
                    tracing::warn!("Failed to feed transcript to pipeline: {e}");
                }
            }

            let snapshot = pipeline.snapshot();
            match controller.submit_answer(&answer, &snapshot).await {
                SubmitOutcome::Terminated { .. } => break,
                SubmitOutcome::Asked { .. } => asked_at = Instant::now(),
                SubmitOutcome::Rejected(reason) => {
                    tracing::debug!(?reason, "answer rejected");
                }
            }
        }
        anyhow::Ok(())
    };

    tokio::select! {
        result = session => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }

    pipeline.stop().await;
    // Give the handler a chance to flush the summary before exit.
    let _ = tokio::time::timeout(Duration::from_secs(2), command_handler).await;
    tracing::info!("Shutting down...");
    Ok(())
}

/// Builds the cpal input stream and the pump task that drains captured
/// samples into the pipeline as unsigned 8-bit amplitude frames.
fn start_microphone(audio_tx: mpsc::Sender<AudioFrame>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let input = host
        .default_input_device()
        .context("Failed to get default audio input device")?;

    tracing::info!("Using input device: {:?}", input.name()?);
    let input_config = input
        .default_input_config()
        .context("Failed to get default input config")?;
    let input_config = StreamConfig {
        channels: input_config.channels(),
        sample_rate: input_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
    };
    let channel_count = input_config.channels as usize;
    tracing::info!("Input stream config: {:?}", &input_config);

    let buffer = HeapRb::<u8>::new(INPUT_CHUNK_SIZE * 32);
    let (mut producer, mut consumer) = buffer.split();

    // Downmix to mono and encode each sample as unsigned 8-bit PCM, the
    // format the vocal extractor consumes.
    let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        for frame in data.chunks(channel_count) {
            let mono = frame.iter().sum::<f32>() / channel_count as f32;
            let byte = ((mono.clamp(-1.0, 1.0) * 127.0) + 128.0) as u8;
            if producer.try_push(byte).is_err() {
                // Pump is behind; dropping samples beats blocking the
                // audio callback.
                break;
            }
        }
    };

    let stream = input.build_input_stream(
        &input_config,
        input_data_fn,
        move |err| tracing::error!("An error occurred on input stream: {}", err),
        None,
    )?;
    stream.play()?;

    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_millis(AUDIO_FLUSH_INTERVAL_MS));
        loop {
            ticker.tick().await;
            let samples: Vec<u8> = consumer.pop_iter().collect();
            if samples.is_empty() {
                continue;
            }
            if audio_tx.send(AudioFrame::new(samples)).await.is_err() {
                tracing::debug!("audio channel closed, stopping microphone pump");
                break;
            }
        }
    });

    Ok(stream)
}

/// Replays a JSONL recording of landmark frames into the pipeline at a
/// fixed cadence, as if a camera tracker were producing them live.
async fn spawn_landmark_replay(
    path: PathBuf,
    landmark_tx: mpsc::Sender<LandmarkFrame>,
) -> Result<()> {
    let contents = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read landmark file {}", path.display()))?;
    let frames: Vec<LandmarkFrame> = contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .filter_map(|(i, line)| match serde_json::from_str(line) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!("Skipping malformed landmark frame on line {}: {e}", i + 1);
                None
            }
        })
        .collect();
    tracing::info!("Replaying {} landmark frames from {}", frames.len(), path.display());

    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_millis(LANDMARK_REPLAY_INTERVAL_MS));
        for frame in frames {
            ticker.tick().await;
            if landmark_tx.send(frame).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

async fn write_summary(path: &Path, summary: &interview_core::SessionSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    Ok(())
}
