//! Task wiring for the analysis pipeline.
//!
//! One task per extractor, each owning its extractor outright and fed by an
//! mpsc frame channel, plus the aggregator task on its own coarser tick.
//! Every task publishes through a `watch` channel, so producers are never
//! blocked by a slow reader and readers always get the latest value with a
//! short borrow.

use crate::aggregator::{DEFAULT_MERGE_INTERVAL, SessionAggregator};
use crate::behavior::BehavioralFeatureExtractor;
use crate::metrics::{AnalysisSnapshot, AudioFrame, BehaviorMetrics, LandmarkFrame, VoiceMetrics};
use crate::vocal::VocalFeatureExtractor;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const AUDIO_CHANNEL_CAPACITY: usize = 256;
const LANDMARK_CHANNEL_CAPACITY: usize = 64;
const TRANSCRIPT_CHANNEL_CAPACITY: usize = 32;

/// Transcript text so far plus the elapsed speaking time behind it.
#[derive(Debug, Clone)]
pub struct TranscriptUpdate {
    pub text: String,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub merge_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            merge_interval: DEFAULT_MERGE_INTERVAL,
        }
    }
}

/// Handle to the running extractor/aggregator tasks for one session.
///
/// One pipeline per active interview session; `stop` is idempotent and
/// tears down all timers and tasks.
pub struct Pipeline {
    audio_tx: mpsc::Sender<AudioFrame>,
    transcript_tx: mpsc::Sender<TranscriptUpdate>,
    landmark_tx: mpsc::Sender<LandmarkFrame>,
    snapshot_rx: watch::Receiver<AnalysisSnapshot>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawns the vocal, behavioral, and aggregator tasks.
    pub fn spawn(config: PipelineConfig) -> Self {
        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);
        let (transcript_tx, transcript_rx) = mpsc::channel(TRANSCRIPT_CHANNEL_CAPACITY);
        let (landmark_tx, landmark_rx) = mpsc::channel(LANDMARK_CHANNEL_CAPACITY);

        let (voice_tx, voice_rx) = watch::channel(VoiceMetrics::default());
        let (behavior_tx, behavior_rx) = watch::channel(BehaviorMetrics::default());
        let (snapshot_tx, snapshot_rx) = watch::channel(AnalysisSnapshot::zeroed());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let vocal_task = tokio::spawn(run_vocal(
            audio_rx,
            transcript_rx,
            voice_tx,
            shutdown_rx.clone(),
        ));
        let behavior_task = tokio::spawn(run_behavior(
            landmark_rx,
            behavior_tx,
            shutdown_rx.clone(),
        ));
        let aggregator =
            SessionAggregator::new(voice_rx, behavior_rx, snapshot_tx, config.merge_interval);
        let aggregator_task = tokio::spawn(aggregator.run(shutdown_rx));

        Self {
            audio_tx,
            transcript_tx,
            landmark_tx,
            snapshot_rx,
            shutdown_tx,
            tasks: vec![vocal_task, behavior_task, aggregator_task],
        }
    }

    pub fn audio_sender(&self) -> mpsc::Sender<AudioFrame> {
        self.audio_tx.clone()
    }

    pub fn transcript_sender(&self) -> mpsc::Sender<TranscriptUpdate> {
        self.transcript_tx.clone()
    }

    pub fn landmark_sender(&self) -> mpsc::Sender<LandmarkFrame> {
        self.landmark_tx.clone()
    }

    /// The most recent merged snapshot. Cheap clone of the watch value.
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn snapshot_receiver(&self) -> watch::Receiver<AnalysisSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stops all tasks and waits for them to finish. Safe to call more
    /// than once; subsequent calls are no-ops.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!("pipeline task ended abnormally: {e:?}");
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

async fn run_vocal(
    mut audio_rx: mpsc::Receiver<AudioFrame>,
    mut transcript_rx: mpsc::Receiver<TranscriptUpdate>,
    voice_tx: watch::Sender<VoiceMetrics>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut extractor = VocalFeatureExtractor::new();
    loop {
        tokio::select! {
            frame = audio_rx.recv() => {
                match frame {
                    Some(frame) => extractor.ingest_audio_frame(&frame),
                    None => break,
                }
            }
            update = transcript_rx.recv() => {
                match update {
                    Some(update) => {
                        extractor.ingest_transcript(&update.text, update.elapsed_secs)
                    }
                    None => break,
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        if voice_tx.send(extractor.snapshot()).is_err() {
            break;
        }
    }
    tracing::debug!("vocal extractor task stopped");
}

async fn run_behavior(
    mut landmark_rx: mpsc::Receiver<LandmarkFrame>,
    behavior_tx: watch::Sender<BehaviorMetrics>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut extractor = BehavioralFeatureExtractor::new();
    loop {
        tokio::select! {
            frame = landmark_rx.recv() => {
                match frame {
                    Some(frame) => extractor.ingest_landmarks(&frame),
                    None => break,
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        if behavior_tx.send(extractor.snapshot()).is_err() {
            break;
        }
    }
    tracing::debug!("behavior extractor task stopped");
}
