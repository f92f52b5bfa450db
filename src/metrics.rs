use crate::models::{
    PredictionAttempt, ReliabilityReport, ReliabilityRow, VariantReport,
};
use crate::prompts::PromptVariant;

/// Incremental fold over prediction attempts for one variant.
///
/// Counts and error sums only, so `merge` is associative and commutative:
/// folding attempts in any order, or across accumulators, yields the same
/// finalized report.
#[derive(Debug, Clone)]
pub struct VariantAccumulator {
    variant: PromptVariant,
    attempts: usize,
    valid: usize,
    /// Valid attempts with ground truth; the denominator for accuracy,
    /// MAE, RMSE, and the error distribution
    scored: usize,
    exact: usize,
    off_by_1: usize,
    off_by_2_plus: usize,
    abs_error_sum: f64,
    sq_error_sum: f64,
}

impl VariantAccumulator {
    pub fn new(variant: PromptVariant) -> Self {
        Self {
            variant,
            attempts: 0,
            valid: 0,
            scored: 0,
            exact: 0,
            off_by_1: 0,
            off_by_2_plus: 0,
            abs_error_sum: 0.0,
            sq_error_sum: 0.0,
        }
    }

    /// Fold one attempt in. Every attempt counts exactly once: invalid
    /// attempts only move the validity denominator, valid-but-unlabeled
    /// attempts additionally move the validity numerator, and only valid
    /// labeled attempts enter the error metrics.
    pub fn record(&mut self, attempt: &PredictionAttempt) {
        self.attempts += 1;

        let prediction = match attempt.outcome.prediction() {
            Some(p) => p,
            None => return,
        };
        self.valid += 1;

        let truth = match attempt.ground_truth {
            Some(t) => t,
            None => return,
        };
        self.scored += 1;

        let error = (i16::from(prediction.predicted_stars) - i16::from(truth)).unsigned_abs();
        match error {
            0 => self.exact += 1,
            1 => self.off_by_1 += 1,
            _ => self.off_by_2_plus += 1,
        }
        self.abs_error_sum += f64::from(error);
        self.sq_error_sum += f64::from(error) * f64::from(error);
    }

    /// Combine two accumulators for the same variant.
    pub fn merge(mut self, other: Self) -> Self {
        self.attempts += other.attempts;
        self.valid += other.valid;
        self.scored += other.scored;
        self.exact += other.exact;
        self.off_by_1 += other.off_by_1;
        self.off_by_2_plus += other.off_by_2_plus;
        self.abs_error_sum += other.abs_error_sum;
        self.sq_error_sum += other.sq_error_sum;
        self
    }

    /// Finalize into a report. Ratios over an empty denominator come out as
    /// 0.0, matching an all-invalid run.
    pub fn finalize(&self) -> VariantReport {
        let scored = self.scored as f64;
        let ratio = |n: usize| if self.scored == 0 { 0.0 } else { n as f64 / scored };

        VariantReport {
            variant: self.variant,
            attempts: self.attempts,
            valid: self.valid,
            scored: self.scored,
            accuracy: ratio(self.exact),
            mae: if self.scored == 0 {
                0.0
            } else {
                self.abs_error_sum / scored
            },
            rmse: if self.scored == 0 {
                0.0
            } else {
                (self.sq_error_sum / scored).sqrt()
            },
            validity_rate: if self.attempts == 0 {
                0.0
            } else {
                self.valid as f64 / self.attempts as f64
            },
            exact_fraction: ratio(self.exact),
            off_by_1_fraction: ratio(self.off_by_1),
            off_by_2_plus_fraction: ratio(self.off_by_2_plus),
        }
    }
}

/// Assemble the reliability report from per-review observation rows.
///
/// `agreement` on a row requires every repeat to have produced a valid,
/// identical rating; dropped (invalid) repeats can never count as
/// deterministic.
pub fn build_reliability_report(
    variant: PromptVariant,
    repeats: usize,
    observations: Vec<(usize, Vec<u8>)>,
) -> ReliabilityReport {
    let rows: Vec<ReliabilityRow> = observations
        .into_iter()
        .map(|(review_index, observed_ratings)| {
            let agreement = observed_ratings.len() == repeats
                && observed_ratings.windows(2).all(|w| w[0] == w[1]);
            ReliabilityRow {
                review_index,
                observed_ratings,
                agreement,
            }
        })
        .collect();

    let agreement_rate = if rows.is_empty() {
        0.0
    } else {
        rows.iter().filter(|r| r.agreement).count() as f64 / rows.len() as f64
    };

    ReliabilityReport {
        variant,
        repeats,
        rows,
        agreement_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttemptOutcome, StructuredPrediction};

    fn valid_attempt(predicted: u8, truth: Option<u8>) -> PredictionAttempt {
        PredictionAttempt {
            review_index: 0,
            variant: PromptVariant::Direct,
            ground_truth: truth,
            raw_response: String::new(),
            outcome: AttemptOutcome::Valid(StructuredPrediction {
                predicted_stars: predicted,
                explanation: "test".to_string(),
                sentiment: None,
            }),
            calls: 1,
        }
    }

    fn invalid_attempt(truth: Option<u8>) -> PredictionAttempt {
        PredictionAttempt {
            review_index: 0,
            variant: PromptVariant::Direct,
            ground_truth: truth,
            raw_response: "not json".to_string(),
            outcome: AttemptOutcome::Invalid {
                reason: "no JSON object found in response".to_string(),
            },
            calls: 2,
        }
    }

    #[test]
    fn test_metrics_over_valid_attempts_only() {
        let mut acc = VariantAccumulator::new(PromptVariant::Direct);
        acc.record(&valid_attempt(4, Some(4))); // exact
        acc.record(&valid_attempt(3, Some(4))); // off by 1
        acc.record(&valid_attempt(1, Some(4))); // off by 3
        acc.record(&invalid_attempt(Some(5)));

        let report = acc.finalize();
        assert_eq!(report.attempts, 4);
        assert_eq!(report.valid, 3);
        assert_eq!(report.scored, 3);
        assert!((report.accuracy - 1.0 / 3.0).abs() < 1e-9);
        assert!((report.mae - (0.0 + 1.0 + 3.0) / 3.0).abs() < 1e-9);
        assert!((report.rmse - ((0.0 + 1.0 + 9.0) / 3.0_f64).sqrt()).abs() < 1e-9);
        assert!((report.validity_rate - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_error_distribution_sums_to_one() {
        let mut acc = VariantAccumulator::new(PromptVariant::Criteria);
        for (predicted, truth) in [(5, 5), (4, 5), (2, 5), (1, 1), (3, 1)] {
            acc.record(&valid_attempt(predicted, Some(truth)));
        }

        let report = acc.finalize();
        let total =
            report.exact_fraction + report.off_by_1_fraction + report.off_by_2_plus_fraction;
        assert!((total - 1.0).abs() < 1e-9);
        assert!((report.exact_fraction - 0.4).abs() < 1e-9);
        assert!((report.off_by_1_fraction - 0.2).abs() < 1e-9);
        assert!((report.off_by_2_plus_fraction - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_unlabeled_counts_toward_validity_only() {
        let mut acc = VariantAccumulator::new(PromptVariant::Staged);
        acc.record(&valid_attempt(4, None));
        acc.record(&valid_attempt(5, Some(5)));

        let report = acc.finalize();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.valid, 2);
        assert_eq!(report.scored, 1);
        assert!((report.validity_rate - 1.0).abs() < 1e-9);
        assert!((report.accuracy - 1.0).abs() < 1e-9);
        assert!((report.mae - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_validity_rate_in_unit_interval() {
        let mut acc = VariantAccumulator::new(PromptVariant::Direct);
        for _ in 0..7 {
            acc.record(&invalid_attempt(Some(3)));
        }
        acc.record(&valid_attempt(3, Some(3)));

        let report = acc.finalize();
        assert!(report.validity_rate >= 0.0 && report.validity_rate <= 1.0);
        assert!((report.validity_rate - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_empty_accumulator_finalizes_to_zeros() {
        let report = VariantAccumulator::new(PromptVariant::Direct).finalize();
        assert_eq!(report.attempts, 0);
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.mae, 0.0);
        assert_eq!(report.rmse, 0.0);
        assert_eq!(report.validity_rate, 0.0);
    }

    #[test]
    fn test_merge_matches_sequential_fold() {
        let attempts: Vec<PredictionAttempt> = vec![
            valid_attempt(5, Some(5)),
            valid_attempt(2, Some(4)),
            invalid_attempt(Some(3)),
            valid_attempt(3, None),
            valid_attempt(1, Some(2)),
        ];

        let mut sequential = VariantAccumulator::new(PromptVariant::Direct);
        for attempt in &attempts {
            sequential.record(attempt);
        }

        let mut left = VariantAccumulator::new(PromptVariant::Direct);
        let mut right = VariantAccumulator::new(PromptVariant::Direct);
        for (i, attempt) in attempts.iter().enumerate() {
            if i % 2 == 0 {
                left.record(attempt);
            } else {
                right.record(attempt);
            }
        }
        let merged = left.merge(right).finalize();
        let sequential = sequential.finalize();

        assert_eq!(merged.attempts, sequential.attempts);
        assert_eq!(merged.valid, sequential.valid);
        assert_eq!(merged.scored, sequential.scored);
        assert!((merged.accuracy - sequential.accuracy).abs() < 1e-9);
        assert!((merged.mae - sequential.mae).abs() < 1e-9);
        assert!((merged.rmse - sequential.rmse).abs() < 1e-9);
    }

    #[test]
    fn test_reliability_divergent_repeats() {
        let report = build_reliability_report(
            PromptVariant::Staged,
            5,
            vec![(0, vec![4, 4, 4, 5, 4])],
        );

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].observed_ratings, vec![4, 4, 4, 5, 4]);
        assert!(!report.rows[0].agreement);
        assert_eq!(report.agreement_rate, 0.0);
    }

    #[test]
    fn test_reliability_full_agreement() {
        let report = build_reliability_report(
            PromptVariant::Staged,
            3,
            vec![(0, vec![5, 5, 5]), (1, vec![2, 2, 2]), (2, vec![2, 3, 2])],
        );

        assert!(report.rows[0].agreement);
        assert!(report.rows[1].agreement);
        assert!(!report.rows[2].agreement);
        assert!((report.agreement_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_reliability_dropped_repeat_is_not_deterministic() {
        // Only 4 of 5 repeats produced a valid rating; identical values
        // still must not count as agreement.
        let report =
            build_reliability_report(PromptVariant::Direct, 5, vec![(0, vec![4, 4, 4, 4])]);
        assert!(!report.rows[0].agreement);
    }

    #[test]
    fn test_reliability_empty_subset() {
        let report = build_reliability_report(PromptVariant::Direct, 5, vec![]);
        assert!(report.rows.is_empty());
        assert_eq!(report.agreement_rate, 0.0);
    }
}
