use serde::{Deserialize, Serialize};

/// Running session-level score aggregation.
///
/// The running average is a cumulative weighted mean that is integer-rounded
/// after every update, `round((prev * (n - 1) + new) / n)`, never recomputed
/// from the full history. `best_score` is the max over everything recorded.
/// Both are derived only; there is no setter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceAggregator {
    performance_score: u32,
    best_score: u32,
    answers_recorded: u32,
}

impl PerformanceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one answer score and returns the updated running average.
    pub fn record_score(&mut self, new_score: u32) -> u32 {
        self.answers_recorded += 1;
        let n = self.answers_recorded as f64;
        let prev = self.performance_score as f64;
        self.performance_score = ((prev * (n - 1.0) + new_score as f64) / n).round() as u32;
        self.best_score = self.best_score.max(new_score);
        self.performance_score
    }

    pub fn performance_score(&self) -> u32 {
        self.performance_score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn answers_recorded(&self) -> u32 {
        self.answers_recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_average_matches_integer_cumulative_mean() {
        let mut agg = PerformanceAggregator::new();
        let scores = [90, 85, 70, 60, 50, 40, 30, 95];
        let expected = [90, 88, 82, 77, 72, 67, 62, 66];
        for (score, want) in scores.iter().zip(expected.iter()) {
            assert_eq!(agg.record_score(*score), *want);
        }
        assert_eq!(agg.answers_recorded(), 8);
        assert_eq!(agg.best_score(), 95);
    }

    #[test]
    fn best_score_equals_rederived_max() {
        let history = [55u32, 81, 43, 81, 62, 20, 95, 34];
        let mut agg = PerformanceAggregator::new();
        for s in history {
            agg.record_score(s);
        }
        assert_eq!(agg.best_score(), history.iter().copied().max().unwrap());
    }

    #[test]
    fn first_score_is_the_average() {
        let mut agg = PerformanceAggregator::new();
        assert_eq!(agg.record_score(73), 73);
        assert_eq!(agg.performance_score(), 73);
        assert_eq!(agg.best_score(), 73);
    }
}
