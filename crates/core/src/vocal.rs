//! Streaming extraction of vocal metrics from audio frames and transcript
//! text.
//!
//! Audio frames update the rolling volume / clarity / tone estimators; the
//! transcript path recomputes pace, filler and pause counts, grammar
//! findings, and the derived complexity / vocabulary / fluency scores from
//! the whole transcript-so-far on every call. Recomputing wholesale means
//! the caller may deliver either incremental deltas appended into a growing
//! transcript or the full text each time without double counting.
//!
//! The coefficients below are design parameters, not precision targets;
//! tests assert bounds and monotonicity rather than exact values.

use crate::grammar;
use crate::metrics::{AudioFrame, VoiceMetrics, clamp_pace, clamp_pct};

/// Amplitude midpoint of the unsigned 8-bit sample stream.
const SAMPLE_CENTER: f64 = 128.0;
/// Centered magnitude above which a sample counts as voiced activity.
const ACTIVITY_THRESHOLD: f64 = 20.0;
/// Scale applied to the zero-crossing ratio for the tone proxy.
const TONE_ZCR_SCALE: f64 = 300.0;
/// Pace is too noisy to estimate below this many words.
const PACE_MIN_WORDS: usize = 5;

/// Filler vocabulary, matched over the lowercased transcript. Multi-word
/// entries are matched as substrings, single words as whole tokens.
const FILLER_WORDS: &[&str] = &["um", "uh", "er", "ah", "like", "you know", "kind of", "sort of"];

const SUBORDINATING_CONJUNCTIONS: &[&str] = &[
    "although", "because", "while", "since", "whereas", "unless", "though",
];

const CLAUSE_MARKERS: &[&str] = &["which", "that", "who", "where", "when"];

/// Turns raw audio frames and rolling transcript text into `VoiceMetrics`.
///
/// The extractor is a plain single-owner struct; the pipeline runs it on a
/// dedicated task and publishes `snapshot()` over a watch channel so readers
/// never contend with ingestion.
#[derive(Debug, Default)]
pub struct VocalFeatureExtractor {
    metrics: VoiceMetrics,
    has_spoken: bool,
}

impl VocalFeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the audio-derived estimators from one amplitude buffer.
    ///
    /// Empty frames (an inactive or unavailable source) are skipped and the
    /// previous metrics are retained; this path never fails.
    pub fn ingest_audio_frame(&mut self, frame: &AudioFrame) {
        let samples = &frame.samples;
        if samples.is_empty() {
            return;
        }
        let len = samples.len() as f64;

        let mut sum = 0.0;
        let mut active = 0usize;
        let mut crossings = 0usize;
        let mut prev_positive = (samples[0] as f64 - SAMPLE_CENTER) >= 0.0;
        for &sample in samples.iter() {
            let value = sample as f64;
            sum += value;
            let centered = value - SAMPLE_CENTER;
            if centered.abs() > ACTIVITY_THRESHOLD {
                active += 1;
            }
            let positive = centered >= 0.0;
            if positive != prev_positive {
                crossings += 1;
            }
            prev_positive = positive;
        }

        let mean = sum / len;
        self.metrics.volume = clamp_pct(mean / 255.0 * 100.0);

        // Zero-crossing rate of the centered signal: a cheap voiced/unvoiced
        // proxy that stands in for a real pitch tracker.
        let zcr = crossings as f64 / (len - 1.0).max(1.0);
        self.metrics.tone = clamp_pct(zcr * TONE_ZCR_SCALE);

        let active_fraction = active as f64 / len;
        self.metrics.clarity = clamp_pct(0.4 * active_fraction * 100.0 + 0.6 * self.metrics.volume);

        self.update_confidence();
    }

    /// Recomputes all transcript-derived metrics from `text`, the transcript
    /// accumulated so far, with `elapsed_secs` of speaking time behind it.
    pub fn ingest_transcript(&mut self, text: &str, elapsed_secs: f64) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.has_spoken = true;
        }
        let lowered = trimmed.to_lowercase();
        let words: Vec<&str> = trimmed.split_whitespace().collect();
        let word_count = words.len();

        if word_count > PACE_MIN_WORDS && elapsed_secs > 0.0 {
            self.metrics.pace = clamp_pace(word_count as f64 / elapsed_secs * 60.0);
        }

        // Counts are replaced, not incremented: the same transcript ingested
        // twice yields the same counts.
        self.metrics.filler_words = count_fillers(&lowered);
        self.metrics.pauses = count_pauses(trimmed);
        self.metrics.grammatical_mistakes = grammar::check(trimmed);

        let sentences: Vec<&str> = trimmed
            .split(['.', '?', '!'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        self.metrics.sentence_complexity = sentence_complexity(&sentences, &lowered);
        self.metrics.vocabulary_score = vocabulary_score(&words);
        self.metrics.fluency_score = clamp_pct(
            100.0 - 5.0 * self.metrics.filler_words as f64 - 3.0 * self.metrics.pauses as f64,
        );

        self.update_confidence();
    }

    /// Returns the latest computed metrics.
    pub fn snapshot(&self) -> VoiceMetrics {
        self.metrics.clone()
    }

    // Confidence is forced to 0 until the candidate has actually said
    // something, so silence never reads as composure.
    fn update_confidence(&mut self) {
        self.metrics.confidence = if self.has_spoken {
            clamp_pct(
                0.35 * self.metrics.clarity
                    + 0.35 * self.metrics.volume
                    + 0.3 * self.metrics.fluency_score,
            )
        } else {
            0.0
        };
    }
}

fn count_fillers(lowered: &str) -> u32 {
    let mut count = 0u32;
    for filler in FILLER_WORDS {
        if filler.contains(' ') {
            count += lowered.matches(filler).count() as u32;
        } else {
            count += lowered
                .split_whitespace()
                .filter(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == *filler)
                .count() as u32;
        }
    }
    count
}

// Transcription services render audible pauses as ellipses; counting them
// is the closest we get without raw timing data.
fn count_pauses(text: &str) -> u32 {
    (text.matches("...").count() + text.matches('\u{2026}').count()) as u32
}

fn sentence_complexity(sentences: &[&str], lowered: &str) -> f64 {
    if sentences.is_empty() {
        return 0.0;
    }
    let total_words: usize = sentences
        .iter()
        .map(|s| s.split_whitespace().count())
        .sum();
    let avg_len = total_words as f64 / sentences.len() as f64;
    let base = if avg_len < 8.0 {
        30.0
    } else if avg_len < 15.0 {
        55.0
    } else if avg_len < 22.0 {
        75.0
    } else {
        90.0
    };
    let subordination = if SUBORDINATING_CONJUNCTIONS
        .iter()
        .any(|c| lowered.split_whitespace().any(|w| w == *c))
    {
        10.0
    } else {
        0.0
    };
    let clause_markers = CLAUSE_MARKERS
        .iter()
        .map(|m| lowered.split_whitespace().filter(|w| w == m).count())
        .sum::<usize>()
        .min(5) as f64;
    clamp_pct(base + subordination + 2.0 * clause_markers)
}

fn vocabulary_score(words: &[&str]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let long_words = words
        .iter()
        .filter(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).len() > 6)
        .count();
    clamp_pct(long_words as f64 / words.len() as f64 * 250.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_before_ingest_is_zeroed() {
        let extractor = VocalFeatureExtractor::new();
        let metrics = extractor.snapshot();
        assert_eq!(metrics, VoiceMetrics::default());
        assert_eq!(metrics.confidence, 0.0);
    }

    #[test]
    fn empty_frame_retains_previous_metrics() {
        let mut extractor = VocalFeatureExtractor::new();
        extractor.ingest_audio_frame(&AudioFrame::new(vec![200; 512]));
        let before = extractor.snapshot();
        assert!(before.volume > 0.0);
        extractor.ingest_audio_frame(&AudioFrame::new(vec![]));
        assert_eq!(extractor.snapshot(), before);
    }

    #[test]
    fn audio_metrics_stay_in_range_for_extreme_inputs() {
        let mut extractor = VocalFeatureExtractor::new();
        for samples in [
            vec![0u8; 256],
            vec![255u8; 256],
            (0..=255).collect::<Vec<u8>>(),
            vec![128u8; 1],
        ] {
            extractor.ingest_audio_frame(&AudioFrame::new(samples));
            let m = extractor.snapshot();
            assert!((0.0..=100.0).contains(&m.volume));
            assert!((0.0..=100.0).contains(&m.clarity));
            assert!((0.0..=100.0).contains(&m.tone));
        }
    }

    #[test]
    fn confidence_is_zero_until_candidate_speaks() {
        let mut extractor = VocalFeatureExtractor::new();
        extractor.ingest_audio_frame(&AudioFrame::new(vec![220; 256]));
        assert_eq!(extractor.snapshot().confidence, 0.0);

        extractor.ingest_transcript("   ", 1.0);
        assert_eq!(extractor.snapshot().confidence, 0.0);

        extractor.ingest_transcript("I can talk about that.", 2.0);
        assert!(extractor.snapshot().confidence > 0.0);
    }

    #[test]
    fn pace_requires_enough_words() {
        let mut extractor = VocalFeatureExtractor::new();
        extractor.ingest_transcript("too short", 10.0);
        assert_eq!(extractor.snapshot().pace, 0.0);

        extractor.ingest_transcript("this sentence has quite a few more words now", 3.0);
        let pace = extractor.snapshot().pace;
        assert!((50.0..=300.0).contains(&pace));
    }

    #[test]
    fn pace_is_clamped() {
        let mut extractor = VocalFeatureExtractor::new();
        // 9 words in 100 seconds: 5.4 WPM raw, clamped up to 50.
        extractor.ingest_transcript("one two three four five six seven eight nine", 100.0);
        assert_eq!(extractor.snapshot().pace, 50.0);
        // Same words in a fifth of a second: clamped down to 300.
        extractor.ingest_transcript("one two three four five six seven eight nine", 0.2);
        assert_eq!(extractor.snapshot().pace, 300.0);
    }

    #[test]
    fn filler_counts_are_replaced_not_accumulated() {
        let mut extractor = VocalFeatureExtractor::new();
        extractor.ingest_transcript("um so um I think", 2.0);
        assert_eq!(extractor.snapshot().filler_words, 2);
        // Re-ingesting the same transcript must not double the count.
        extractor.ingest_transcript("um so um I think", 3.0);
        assert_eq!(extractor.snapshot().filler_words, 2);
    }

    #[test]
    fn multiword_fillers_are_counted() {
        let mut extractor = VocalFeatureExtractor::new();
        extractor.ingest_transcript("you know it was kind of hard you know", 3.0);
        assert_eq!(extractor.snapshot().filler_words, 3);
    }

    #[test]
    fn more_fillers_never_increase_fluency() {
        let mut clean = VocalFeatureExtractor::new();
        clean.ingest_transcript("I solved the problem quickly and shipped the fix.", 5.0);
        let fluent = clean.snapshot().fluency_score;

        let mut noisy = VocalFeatureExtractor::new();
        noisy.ingest_transcript(
            "um I um solved the um problem um quickly and um shipped the fix.",
            5.0,
        );
        let disfluent = noisy.snapshot().fluency_score;
        assert!(disfluent < fluent);
    }

    #[test]
    fn pauses_counted_from_ellipses() {
        let mut extractor = VocalFeatureExtractor::new();
        extractor.ingest_transcript("I worked on... the billing system... mostly", 4.0);
        assert_eq!(extractor.snapshot().pauses, 2);
    }

    #[test]
    fn grammar_findings_flow_into_metrics() {
        let mut extractor = VocalFeatureExtractor::new();
        extractor.ingest_transcript("He are responsible for the deploys.", 3.0);
        assert!(!extractor.snapshot().grammatical_mistakes.is_empty());
    }

    #[test]
    fn derived_scores_stay_in_range_for_hostile_text() {
        let mut extractor = VocalFeatureExtractor::new();
        let hostile = "um ".repeat(200) + &"... ".repeat(100);
        extractor.ingest_transcript(&hostile, 0.0001);
        let m = extractor.snapshot();
        assert!((0.0..=100.0).contains(&m.fluency_score));
        assert!((0.0..=100.0).contains(&m.sentence_complexity));
        assert!((0.0..=100.0).contains(&m.vocabulary_score));
        assert!((0.0..=100.0).contains(&m.confidence));
        assert!((50.0..=300.0).contains(&m.pace));
    }
}
