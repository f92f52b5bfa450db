use crate::config::RunConfig;
use crate::corpus;
use crate::error::PredictorError;
use crate::metrics::{build_reliability_report, VariantAccumulator};
use crate::models::{
    AttemptOutcome, FinalReport, InsightResult, PredictionAttempt, ReliabilityReport, Review,
    VariantReport,
};
use crate::parse::{parse_insight, parse_prediction};
use crate::predictor::{bounded_retry, Predictor};
use crate::prompts::{build_insight_prompt, with_strictness, PromptVariant};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

/// One initial call plus one stricter retry per attempt.
const MAX_CALL_ATTEMPTS: usize = 2;

/// What the last failed call left behind, kept so the recorded attempt
/// carries the raw response and the validation reason.
struct AttemptFailure {
    raw: String,
    reason: String,
}

/// Orchestrates a full evaluation run: sample, evaluate each variant,
/// probe reliability, optionally generate insights, store the report.
pub struct Runner<P: Predictor> {
    config: RunConfig,
    predictor: P,
    verbose: bool,
}

impl<P: Predictor> Runner<P> {
    /// Create a runner over an explicit configuration and predictor; no
    /// process-global client state.
    pub fn new(config: RunConfig, predictor: P, verbose: bool) -> Self {
        Self {
            config,
            predictor,
            verbose,
        }
    }

    /// Run the whole evaluation. Corpus and sampling failures abort before
    /// any predictor call; predictor failures never abort the run.
    pub async fn run(&self) -> Result<FinalReport> {
        let corpus_path = Path::new(&self.config.sampling.corpus_path);
        let corpus = corpus::load_corpus(corpus_path)
            .with_context(|| format!("Failed to load corpus from {}", corpus_path.display()))?;

        let sample = corpus::balanced_sample(
            &corpus,
            self.config.sampling.per_class,
            self.config.sampling.seed,
        )?;

        if self.verbose {
            println!(
                "Sampled {} reviews ({} per class target, seed {})",
                sample.reviews.len(),
                self.config.sampling.per_class,
                self.config.sampling.seed
            );
        }
        for shortfall in &sample.shortfalls {
            warn!(
                stars = shortfall.stars,
                requested = shortfall.requested,
                available = shortfall.available,
                "star class under-represented in corpus"
            );
        }

        let mut variants = Vec::new();
        for variant in PromptVariant::all() {
            if self.verbose {
                println!("Evaluating variant {variant}");
            }
            variants.push(self.evaluate_variant(variant, &sample.reviews).await);
        }

        let reliability = self.run_reliability(&sample.reviews).await;
        let insights = self.run_insights(&sample.reviews).await;

        let report = FinalReport {
            sample_size: sample.reviews.len(),
            shortfalls: sample.shortfalls,
            variants,
            reliability,
            insights,
        };

        if let Some(storage_path) = &self.config.storage_path {
            self.store_report(&report, storage_path)?;
        }

        Ok(report)
    }

    /// Fold every sampled review through one variant.
    async fn evaluate_variant(&self, variant: PromptVariant, reviews: &[Review]) -> VariantReport {
        let mut accumulator = VariantAccumulator::new(variant);
        let total = reviews.len();

        for (review_index, review) in reviews.iter().enumerate() {
            if self.verbose {
                println!(
                    "  → {} review {}/{}",
                    variant,
                    review_index + 1,
                    total
                );
            }
            let attempt = self.attempt_prediction(review_index, review, variant).await;
            accumulator.record(&attempt);
        }

        accumulator.finalize()
    }

    /// One (review, variant) attempt: call, validate, retry once with the
    /// stricter instruction, then record whatever the dust settled on.
    /// Transient and content failures end up identical for validity; they
    /// are logged apart.
    async fn attempt_prediction(
        &self,
        review_index: usize,
        review: &Review,
        variant: PromptVariant,
    ) -> PredictionAttempt {
        let base_prompt = variant.build_prompt(&review.text);

        let result = bounded_retry(MAX_CALL_ATTEMPTS, |attempt| {
            let prompt = with_strictness(&base_prompt, attempt);
            async move {
                let raw = match self.predictor.complete(&prompt).await {
                    Ok(raw) => raw,
                    Err(err) => {
                        match &err {
                            PredictorError::Transient(_) => warn!(
                                target: "predictor::transient",
                                %variant, review_index, attempt, error = %err,
                                "predictor call failed"
                            ),
                            PredictorError::Content(_) => warn!(
                                target: "predictor::content",
                                %variant, review_index, attempt, error = %err,
                                "predictor response unusable"
                            ),
                        }
                        return Err(AttemptFailure {
                            raw: String::new(),
                            reason: err.to_string(),
                        });
                    }
                };

                match parse_prediction(&raw) {
                    AttemptOutcome::Valid(prediction) => Ok((attempt, raw, prediction)),
                    AttemptOutcome::Invalid { reason } => {
                        warn!(
                            target: "predictor::content",
                            %variant, review_index, attempt, %reason,
                            "response failed validation"
                        );
                        Err(AttemptFailure { raw, reason })
                    }
                }
            }
        })
        .await;

        match result {
            Ok((attempt, raw, prediction)) => PredictionAttempt {
                review_index,
                variant,
                ground_truth: review.stars,
                raw_response: raw,
                outcome: AttemptOutcome::Valid(prediction),
                calls: attempt + 1,
            },
            Err(failure) => PredictionAttempt {
                review_index,
                variant,
                ground_truth: review.stars,
                raw_response: failure.raw,
                outcome: AttemptOutcome::Invalid {
                    reason: failure.reason,
                },
                calls: MAX_CALL_ATTEMPTS,
            },
        }
    }

    /// Repeat single-shot predictions over a fixed subset to estimate
    /// non-determinism. No retries here: a retry would mask exactly the
    /// inconsistency being measured, so invalid repeats are dropped.
    async fn run_reliability(&self, reviews: &[Review]) -> ReliabilityReport {
        let config = &self.config.reliability;
        let mut observations = Vec::new();

        for (review_index, review) in reviews.iter().take(config.review_count).enumerate() {
            if self.verbose {
                println!(
                    "Reliability probe {}/{} ({} repeats)",
                    review_index + 1,
                    config.review_count.min(reviews.len()),
                    config.repeats
                );
            }

            let prompt = config.variant.build_prompt(&review.text);
            let mut observed = Vec::new();

            for repeat in 0..config.repeats {
                match self.predictor.complete(&prompt).await {
                    Ok(raw) => match parse_prediction(&raw) {
                        AttemptOutcome::Valid(prediction) => {
                            observed.push(prediction.predicted_stars)
                        }
                        AttemptOutcome::Invalid { reason } => warn!(
                            target: "predictor::content",
                            review_index, repeat, %reason,
                            "reliability repeat failed validation"
                        ),
                    },
                    Err(err) => warn!(
                        target: "predictor::transient",
                        review_index, repeat, error = %err,
                        "reliability repeat failed"
                    ),
                }
            }

            observations.push((review_index, observed));
        }

        build_reliability_report(config.variant, config.repeats, observations)
    }

    /// Generate summary / actions / sentiment for the first few sampled
    /// reviews, live-service style. Disabled when review_count is 0.
    async fn run_insights(&self, reviews: &[Review]) -> Vec<InsightResult> {
        let count = self.config.insight.review_count;
        let mut results = Vec::new();

        for (review_index, review) in reviews.iter().take(count).enumerate() {
            let user_rating = match review.stars {
                Some(stars) => stars,
                None => continue,
            };

            if self.verbose {
                println!("Generating insight {}/{}", review_index + 1, count);
            }

            let base_prompt = build_insight_prompt(&review.text, user_rating);
            let insight = bounded_retry(MAX_CALL_ATTEMPTS, |attempt| {
                let prompt = with_strictness(&base_prompt, attempt);
                async move {
                    let raw = self
                        .predictor
                        .complete(&prompt)
                        .await
                        .map_err(|e| e.to_string())?;
                    parse_insight(&raw)
                }
            })
            .await;

            if let Err(reason) = &insight {
                warn!(target: "predictor::content", review_index, %reason, "insight generation failed");
            }

            results.push(InsightResult {
                review_index,
                insight: insight.ok(),
            });
        }

        results
    }

    /// Store the report as pretty JSON, creating parent directories.
    fn store_report(&self, report: &FinalReport, path: &str) -> Result<()> {
        let json_content =
            serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, json_content)
            .with_context(|| format!("Failed to write report to: {}", path))?;

        println!("Report stored to: {}", path);
        Ok(())
    }
}
