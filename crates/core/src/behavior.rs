//! Behavioral metrics from facial landmark frames.
//!
//! The landmark source is external; all this module does is turn named
//! points into bounded proxies for eye contact, smiling, head movement,
//! posture, attention, and gesture rate. Frames missing any required point
//! are skipped entirely so a partial detection never produces a garbage
//! update.

use crate::metrics::{BehaviorMetrics, Landmark, LandmarkFrame, clamp_pct};
use std::collections::VecDeque;

/// Horizontal gaze deviation scale: eye contact = 100 - |gaze.x| * 200.
const GAZE_SCALE: f64 = 200.0;
/// Lip width/height ratio at rest; anything wider reads as a smile.
const SMILE_NEUTRAL_RATIO: f64 = 1.5;
const SMILE_SCALE: f64 = 40.0;
/// Yaw proxy scale on the nose offset from the ear midpoint.
const YAW_SCALE: f64 = 400.0;
/// Nominal vertical forehead-to-nose drop in normalized coordinates.
const NOMINAL_FACE_DROP: f64 = 0.2;
const PITCH_SCALE: f64 = 400.0;
const ROLL_SCALE: f64 = 300.0;
/// Nominal eye line height in the frame; drifting below reads as slouching.
const NOMINAL_EYE_LINE: f64 = 0.4;
const SLOUCH_SCALE: f64 = 150.0;
/// Inter-frame nose displacements kept for the gesture-rate window.
const MOVEMENT_WINDOW: usize = 30;
const GESTURE_SCALE: f64 = 2000.0;

struct FacePoints {
    left_eye: Landmark,
    right_eye: Landmark,
    nose_tip: Landmark,
    forehead: Landmark,
    upper_lip: Landmark,
    lower_lip: Landmark,
    lip_left: Landmark,
    lip_right: Landmark,
    left_ear: Landmark,
    right_ear: Landmark,
}

impl FacePoints {
    fn from_frame(frame: &LandmarkFrame) -> Option<Self> {
        Some(Self {
            left_eye: frame.left_eye?,
            right_eye: frame.right_eye?,
            nose_tip: frame.nose_tip?,
            forehead: frame.forehead?,
            upper_lip: frame.upper_lip?,
            lower_lip: frame.lower_lip?,
            lip_left: frame.lip_left?,
            lip_right: frame.lip_right?,
            left_ear: frame.left_ear?,
            right_ear: frame.right_ear?,
        })
    }
}

/// Turns landmark frames into `BehaviorMetrics`.
#[derive(Default)]
pub struct BehavioralFeatureExtractor {
    metrics: BehaviorMetrics,
    last_nose: Option<Landmark>,
    movement_window: VecDeque<f64>,
}

impl BehavioralFeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates all behavioral proxies from one frame.
    ///
    /// If any required landmark is absent the frame is dropped and the
    /// previous metrics are retained.
    pub fn ingest_landmarks(&mut self, frame: &LandmarkFrame) {
        let Some(points) = FacePoints::from_frame(frame) else {
            return;
        };

        let eye_center = midpoint(&points.left_eye, &points.right_eye);
        let gaze_x = points.nose_tip.x - eye_center.x;
        self.metrics.eye_contact = clamp_pct(100.0 - (gaze_x.abs() * GAZE_SCALE).min(100.0));

        let lip_width = (points.lip_right.x - points.lip_left.x).abs();
        let lip_height = (points.lower_lip.y - points.upper_lip.y).abs().max(1e-6);
        let ratio = lip_width / lip_height;
        self.metrics.smiling = clamp_pct((ratio - SMILE_NEUTRAL_RATIO) * SMILE_SCALE);

        let ear_mid_x = (points.left_ear.x + points.right_ear.x) / 2.0;
        let yaw = ((points.nose_tip.x - ear_mid_x).abs() * YAW_SCALE).min(100.0);
        let face_drop = (points.nose_tip.y - points.forehead.y).abs();
        let pitch = ((face_drop - NOMINAL_FACE_DROP).abs() * PITCH_SCALE).min(100.0);
        self.metrics.head_movement = clamp_pct(0.5 * yaw + 0.5 * pitch);

        let roll = (points.left_ear.y - points.right_ear.y).abs() * ROLL_SCALE;
        let slouch = ((eye_center.y - NOMINAL_EYE_LINE).max(0.0)) * SLOUCH_SCALE;
        self.metrics.posture = clamp_pct(100.0 - roll - slouch);

        self.metrics.attention = clamp_pct(
            (self.metrics.eye_contact + (100.0 - self.metrics.head_movement)
                + self.metrics.smiling)
                / 3.0,
        );

        if let Some(last) = self.last_nose {
            let displacement = points.nose_tip.distance(&last);
            if self.movement_window.len() == MOVEMENT_WINDOW {
                self.movement_window.pop_front();
            }
            self.movement_window.push_back(displacement);
            let mean = self.movement_window.iter().sum::<f64>()
                / self.movement_window.len().max(1) as f64;
            self.metrics.gestures = clamp_pct(mean * GESTURE_SCALE);
        }
        self.last_nose = Some(points.nose_tip);
    }

    pub fn snapshot(&self) -> BehaviorMetrics {
        self.metrics
    }
}

fn midpoint(a: &Landmark, b: &Landmark) -> Landmark {
    Landmark {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
        z: (a.z + b.z) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Option<Landmark> {
        Some(Landmark { x, y, z: 0.0 })
    }

    /// A face looking straight at the camera, centered in the frame.
    fn centered_face() -> LandmarkFrame {
        LandmarkFrame {
            left_eye: pt(0.42, 0.40),
            right_eye: pt(0.58, 0.40),
            nose_tip: pt(0.50, 0.52),
            forehead: pt(0.50, 0.32),
            upper_lip: pt(0.50, 0.60),
            lower_lip: pt(0.50, 0.64),
            lip_left: pt(0.44, 0.62),
            lip_right: pt(0.56, 0.62),
            left_ear: pt(0.32, 0.45),
            right_ear: pt(0.68, 0.45),
            ..LandmarkFrame::default()
        }
    }

    #[test]
    fn snapshot_before_ingest_is_zeroed() {
        let extractor = BehavioralFeatureExtractor::new();
        assert_eq!(extractor.snapshot(), BehaviorMetrics::default());
    }

    #[test]
    fn centered_face_scores_high_eye_contact() {
        let mut extractor = BehavioralFeatureExtractor::new();
        extractor.ingest_landmarks(&centered_face());
        let m = extractor.snapshot();
        assert!(m.eye_contact > 90.0, "eye_contact = {}", m.eye_contact);
        assert!(m.posture > 80.0, "posture = {}", m.posture);
        assert!(m.head_movement < 30.0, "head_movement = {}", m.head_movement);
    }

    #[test]
    fn averted_gaze_lowers_eye_contact() {
        let mut extractor = BehavioralFeatureExtractor::new();
        let mut frame = centered_face();
        // Nose swung well off the eye midline: looking away.
        frame.nose_tip = pt(0.70, 0.52);
        extractor.ingest_landmarks(&frame);
        let averted = extractor.snapshot().eye_contact;

        let mut straight = BehavioralFeatureExtractor::new();
        straight.ingest_landmarks(&centered_face());
        assert!(averted < straight.snapshot().eye_contact);
    }

    #[test]
    fn wide_lips_read_as_smiling() {
        let mut extractor = BehavioralFeatureExtractor::new();
        let mut frame = centered_face();
        frame.lip_left = pt(0.38, 0.62);
        frame.lip_right = pt(0.62, 0.62);
        frame.upper_lip = pt(0.50, 0.61);
        frame.lower_lip = pt(0.50, 0.63);
        extractor.ingest_landmarks(&frame);
        assert!(extractor.snapshot().smiling > 50.0);
    }

    #[test]
    fn missing_landmark_skips_update() {
        let mut extractor = BehavioralFeatureExtractor::new();
        extractor.ingest_landmarks(&centered_face());
        let before = extractor.snapshot();

        let mut partial = centered_face();
        partial.left_ear = None;
        partial.nose_tip = pt(0.9, 0.9);
        extractor.ingest_landmarks(&partial);
        assert_eq!(extractor.snapshot(), before);
    }

    #[test]
    fn attention_is_mean_of_its_components() {
        let mut extractor = BehavioralFeatureExtractor::new();
        extractor.ingest_landmarks(&centered_face());
        let m = extractor.snapshot();
        let expected = (m.eye_contact + (100.0 - m.head_movement) + m.smiling) / 3.0;
        assert!((m.attention - expected).abs() < 1e-9);
    }

    #[test]
    fn gestures_track_inter_frame_movement() {
        let mut still = BehavioralFeatureExtractor::new();
        for _ in 0..10 {
            still.ingest_landmarks(&centered_face());
        }
        assert_eq!(still.snapshot().gestures, 0.0);

        let mut mover = BehavioralFeatureExtractor::new();
        for i in 0..10 {
            let mut frame = centered_face();
            let wobble = if i % 2 == 0 { 0.02 } else { -0.02 };
            frame.nose_tip = pt(0.50 + wobble, 0.52);
            mover.ingest_landmarks(&frame);
        }
        assert!(mover.snapshot().gestures > 0.0);
    }

    #[test]
    fn all_fields_bounded_for_degenerate_geometry() {
        let mut extractor = BehavioralFeatureExtractor::new();
        let mut frame = centered_face();
        // Collapsed lips and wildly offset points.
        frame.upper_lip = pt(0.5, 0.62);
        frame.lower_lip = pt(0.5, 0.62);
        frame.nose_tip = pt(5.0, -3.0);
        frame.left_ear = pt(-2.0, 9.0);
        extractor.ingest_landmarks(&frame);
        let m = extractor.snapshot();
        for value in [
            m.eye_contact,
            m.posture,
            m.head_movement,
            m.smiling,
            m.attention,
            m.gestures,
        ] {
            assert!((0.0..=100.0).contains(&value), "out of range: {value}");
        }
    }
}
