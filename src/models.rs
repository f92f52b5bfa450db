use crate::prompts::PromptVariant;
use serde::{Deserialize, Serialize};

/// A labeled (or unlabeled) review from the corpus. Read-only input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Free-text review body
    pub text: String,
    /// Ground-truth star rating, 1-5; absent for unlabeled submissions
    pub stars: Option<u8>,
}

impl Review {
    pub fn labeled(text: impl Into<String>, stars: u8) -> Self {
        Self {
            text: text.into(),
            stars: Some(stars),
        }
    }

    pub fn unlabeled(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stars: None,
        }
    }
}

/// Closed sentiment set returned by the insight pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
}

impl Sentiment {
    /// Parse against the closed set. Anything else is a validation failure,
    /// not a value to coerce.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Positive" => Some(Self::Positive),
            "Negative" => Some(Self::Negative),
            "Mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

/// Structured prediction parsed out of a raw predictor response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredPrediction {
    /// Predicted star rating, validated to be in 1-5
    pub predicted_stars: u8,
    /// Short model-provided justification
    pub explanation: String,
    /// Sentiment label, when the response carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

/// Summary and recommendations generated for a single review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInsight {
    pub summary: String,
    /// At most three recommended actions
    pub actions: Vec<String>,
    pub sentiment: Sentiment,
}

/// Outcome of validating one predictor response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Valid(StructuredPrediction),
    Invalid { reason: String },
}

impl AttemptOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, AttemptOutcome::Valid(_))
    }

    pub fn prediction(&self) -> Option<&StructuredPrediction> {
        match self {
            AttemptOutcome::Valid(p) => Some(p),
            AttemptOutcome::Invalid { .. } => None,
        }
    }
}

/// One (review, variant) prediction attempt, after retries resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionAttempt {
    /// Index of the review within the sample
    pub review_index: usize,
    pub variant: PromptVariant,
    /// Ground truth carried along for metric folding
    pub ground_truth: Option<u8>,
    /// Raw text of the last predictor response, empty if no response arrived
    pub raw_response: String,
    pub outcome: AttemptOutcome,
    /// Total predictor calls spent on this attempt (1 or 2)
    pub calls: usize,
}

/// Finalized per-variant aggregate metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReport {
    pub variant: PromptVariant,
    pub attempts: usize,
    pub valid: usize,
    /// Valid attempts with ground truth, the metric denominator
    pub scored: usize,
    pub accuracy: f64,
    pub mae: f64,
    pub rmse: f64,
    pub validity_rate: f64,
    pub exact_fraction: f64,
    pub off_by_1_fraction: f64,
    pub off_by_2_plus_fraction: f64,
}

/// Repeated-call consistency for one review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityRow {
    pub review_index: usize,
    /// Every valid predicted rating, in call order
    pub observed_ratings: Vec<u8>,
    /// True only when all repeats were valid and identical
    pub agreement: bool,
}

/// Reliability analysis across the probed subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityReport {
    pub variant: PromptVariant,
    pub repeats: usize,
    pub rows: Vec<ReliabilityRow>,
    /// Fraction of probed reviews with full agreement
    pub agreement_rate: f64,
}

/// Shortfall for a star class the corpus could not fully supply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassShortfall {
    pub stars: u8,
    pub requested: usize,
    pub available: usize,
}

/// Insight generated for one sampled review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightResult {
    pub review_index: usize,
    /// None when the insight response stayed invalid after the retry
    pub insight: Option<ReviewInsight>,
}

/// Full output of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReport {
    pub sample_size: usize,
    pub shortfalls: Vec<ClassShortfall>,
    pub variants: Vec<VariantReport>,
    pub reliability: ReliabilityReport,
    pub insights: Vec<InsightResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_closed_set() {
        assert_eq!(Sentiment::parse("Positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse(" Mixed "), Some(Sentiment::Mixed));
        assert_eq!(Sentiment::parse("positive"), None);
        assert_eq!(Sentiment::parse("Neutral"), None);
        assert_eq!(Sentiment::parse(""), None);
    }

    #[test]
    fn test_attempt_outcome_accessors() {
        let valid = AttemptOutcome::Valid(StructuredPrediction {
            predicted_stars: 4,
            explanation: "Mostly positive".to_string(),
            sentiment: None,
        });
        assert!(valid.is_valid());
        assert_eq!(valid.prediction().unwrap().predicted_stars, 4);

        let invalid = AttemptOutcome::Invalid {
            reason: "rating out of range".to_string(),
        };
        assert!(!invalid.is_valid());
        assert!(invalid.prediction().is_none());
    }

    #[test]
    fn test_review_constructors() {
        let labeled = Review::labeled("Great food", 5);
        assert_eq!(labeled.stars, Some(5));
        let unlabeled = Review::unlabeled("No rating given");
        assert!(unlabeled.stars.is_none());
    }
}
