use crate::grammar::GrammarFinding;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Lower bound for the words-per-minute pace estimate.
pub const PACE_MIN_WPM: f64 = 50.0;
/// Upper bound for the words-per-minute pace estimate.
pub const PACE_MAX_WPM: f64 = 300.0;

/// Clamps a percentage-like metric into [0, 100].
///
/// Every write to a percentage field goes through this. Non-finite values
/// (the usual symptom of a divide-by-zero in a ratio) collapse to 0 rather
/// than poisoning downstream averages.
pub fn clamp_pct(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Clamps a words-per-minute estimate into [50, 300].
pub fn clamp_pace(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(PACE_MIN_WPM, PACE_MAX_WPM)
    } else {
        PACE_MIN_WPM
    }
}

/// A single captured buffer of unsigned 8-bit amplitude samples.
///
/// Frames are ephemeral: produced by the audio capture layer, consumed by
/// the vocal extractor, never persisted.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<u8>,
    pub captured_at: SystemTime,
}

impl AudioFrame {
    pub fn new(samples: Vec<u8>) -> Self {
        Self {
            samples,
            captured_at: SystemTime::now(),
        }
    }
}

/// A named 2D/3D point in normalized face coordinates ([0, 1] per axis).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn distance(&self, other: &Landmark) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

fn now() -> SystemTime {
    SystemTime::now()
}

/// One snapshot of facial landmarks from the (external) landmark source.
///
/// Any landmark may be absent in a given frame; the behavioral extractor
/// skips frames that are missing a point it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub left_eye: Option<Landmark>,
    pub right_eye: Option<Landmark>,
    pub nose_tip: Option<Landmark>,
    pub forehead: Option<Landmark>,
    pub upper_lip: Option<Landmark>,
    pub lower_lip: Option<Landmark>,
    pub lip_left: Option<Landmark>,
    pub lip_right: Option<Landmark>,
    pub left_ear: Option<Landmark>,
    pub right_ear: Option<Landmark>,
    #[serde(default = "now")]
    pub captured_at: SystemTime,
}

impl Default for LandmarkFrame {
    fn default() -> Self {
        Self {
            left_eye: None,
            right_eye: None,
            nose_tip: None,
            forehead: None,
            upper_lip: None,
            lower_lip: None,
            lip_left: None,
            lip_right: None,
            left_ear: None,
            right_ear: None,
            captured_at: SystemTime::now(),
        }
    }
}

/// Vocal metrics derived from audio frames and the rolling transcript.
///
/// Owned exclusively by the vocal extractor and replaced wholesale on each
/// tick. All fields except `pace` (WPM, [50, 300] once estimated) and the
/// two counts are percentages in [0, 100].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceMetrics {
    pub volume: f64,
    pub clarity: f64,
    pub pace: f64,
    pub tone: f64,
    pub filler_words: u32,
    pub pauses: u32,
    pub confidence: f64,
    pub grammatical_mistakes: Vec<GrammarFinding>,
    pub sentence_complexity: f64,
    pub vocabulary_score: f64,
    pub fluency_score: f64,
}

/// Behavioral metrics derived from landmark frames, all in [0, 100].
///
/// Owned exclusively by the behavioral extractor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorMetrics {
    pub eye_contact: f64,
    pub posture: f64,
    pub head_movement: f64,
    pub smiling: f64,
    pub attention: f64,
    pub gestures: f64,
}

/// An immutable merged view of both extractors, published on a fixed tick.
///
/// The scorer and controller only ever read these, never an extractor
/// directly, so they always see a pair of metrics captured together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub voice: VoiceMetrics,
    pub behavior: BehaviorMetrics,
    pub captured_at: SystemTime,
}

impl AnalysisSnapshot {
    /// The snapshot published before any extractor has produced data.
    pub fn zeroed() -> Self {
        Self {
            voice: VoiceMetrics::default(),
            behavior: BehaviorMetrics::default(),
            captured_at: SystemTime::UNIX_EPOCH,
        }
    }
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_pct_bounds_and_non_finite() {
        assert_eq!(clamp_pct(-5.0), 0.0);
        assert_eq!(clamp_pct(250.0), 100.0);
        assert_eq!(clamp_pct(42.5), 42.5);
        assert_eq!(clamp_pct(f64::NAN), 0.0);
        assert_eq!(clamp_pct(f64::INFINITY), 0.0);
    }

    #[test]
    fn clamp_pace_bounds() {
        assert_eq!(clamp_pace(10.0), 50.0);
        assert_eq!(clamp_pace(1000.0), 300.0);
        assert_eq!(clamp_pace(140.0), 140.0);
        assert_eq!(clamp_pace(f64::NAN), 50.0);
    }

    #[test]
    fn zeroed_snapshot_has_zero_metrics() {
        let snap = AnalysisSnapshot::zeroed();
        assert_eq!(snap.voice, VoiceMetrics::default());
        assert_eq!(snap.behavior, BehaviorMetrics::default());
        assert_eq!(snap.captured_at, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn landmark_frame_deserializes_without_timestamp() {
        let json = r#"{"nose_tip": {"x": 0.5, "y": 0.55}}"#;
        let frame: LandmarkFrame = serde_json::from_str(json).unwrap();
        let nose = frame.nose_tip.unwrap();
        assert_eq!(nose.x, 0.5);
        assert_eq!(nose.z, 0.0);
        assert!(frame.left_eye.is_none());
    }
}
