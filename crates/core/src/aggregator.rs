//! Fixed-tick merge of the two extractors' latest snapshots.
//!
//! The aggregator exists so the scorer and controller never read the
//! extractors directly: on every tick it takes whatever each extractor last
//! published and stamps the pair into one immutable `AnalysisSnapshot`.
//! Consumers therefore see internally-consistent metrics regardless of how
//! fast either extractor (or the UI) ticks.

use crate::metrics::{AnalysisSnapshot, BehaviorMetrics, VoiceMetrics};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;

/// Reference merge cadence.
pub const DEFAULT_MERGE_INTERVAL: Duration = Duration::from_secs(2);

/// Stamps the given metric pair into a snapshot.
pub fn merge(voice: &VoiceMetrics, behavior: &BehaviorMetrics) -> AnalysisSnapshot {
    AnalysisSnapshot {
        voice: voice.clone(),
        behavior: *behavior,
        captured_at: SystemTime::now(),
    }
}

/// Periodically merges the extractors' watch channels into a snapshot
/// channel. Run as its own task by the pipeline.
pub struct SessionAggregator {
    voice_rx: watch::Receiver<VoiceMetrics>,
    behavior_rx: watch::Receiver<BehaviorMetrics>,
    snapshot_tx: watch::Sender<AnalysisSnapshot>,
    interval: Duration,
}

impl SessionAggregator {
    pub fn new(
        voice_rx: watch::Receiver<VoiceMetrics>,
        behavior_rx: watch::Receiver<BehaviorMetrics>,
        snapshot_tx: watch::Sender<AnalysisSnapshot>,
        interval: Duration,
    ) -> Self {
        Self {
            voice_rx,
            behavior_rx,
            snapshot_tx,
            interval,
        }
    }

    /// Ticks until the shutdown flag flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut tick = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let snapshot = merge(&self.voice_rx.borrow(), &self.behavior_rx.borrow());
                    if self.snapshot_tx.send(snapshot).is_err() {
                        // All readers are gone; nothing left to publish for.
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("session aggregator stopped");
    }
}
