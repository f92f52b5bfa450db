use crate::prompts::PromptVariant;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Predictor (LLM endpoint) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictorConfig {
    /// OpenAI-compatible API endpoint (e.g. the Groq endpoint)
    pub api_endpoint: String,
    /// Environment variable name containing the API key
    pub env_var_api_key: String,
    /// Model to use for rating predictions
    pub model: String,
    /// Sampling temperature (0.0 for rating prediction)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Client-side rate limit in requests per second
    #[serde(default = "default_rate_limit")]
    pub rate_limit_rps: f64,
    /// Per-call timeout in seconds; a timed-out call is an invalid attempt
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Balanced sampling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingConfig {
    /// Path to the labeled corpus (JSON array or JSONL)
    pub corpus_path: String,
    /// Target review count per star class
    #[serde(default = "default_per_class")]
    pub per_class: usize,
    /// RNG seed for reproducible sampling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Repeated-call reliability analysis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReliabilityConfig {
    /// Variant to probe for consistency
    #[serde(default = "default_reliability_variant")]
    pub variant: PromptVariant,
    /// Number of sampled reviews to probe
    #[serde(default = "default_reliability_reviews")]
    pub review_count: usize,
    /// Repeated predictions per review
    #[serde(default = "default_repeats")]
    pub repeats: usize,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            variant: default_reliability_variant(),
            review_count: default_reliability_reviews(),
            repeats: default_repeats(),
        }
    }
}

/// Summary / recommended-actions / sentiment pass configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InsightConfig {
    /// Number of sampled reviews to generate insights for (0 disables the pass)
    #[serde(default)]
    pub review_count: usize,
}

fn default_temperature() -> f64 {
    0.0
}

fn default_max_tokens() -> u32 {
    500
}

fn default_rate_limit() -> f64 {
    10.0
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_per_class() -> usize {
    10
}

fn default_seed() -> u64 {
    42
}

fn default_reliability_variant() -> PromptVariant {
    PromptVariant::Staged
}

fn default_reliability_reviews() -> usize {
    5
}

fn default_repeats() -> usize {
    5
}

/// Root configuration for one evaluation run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    pub predictor: PredictorConfig,
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
    #[serde(default)]
    pub insight: InsightConfig,
    /// Optional local path to store the full report as JSON
    #[serde(default)]
    pub storage_path: Option<String>,
}

impl RunConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML run file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parsing() {
        let toml_content = r#"
storage_path = "/tmp/report.json"

[predictor]
api_endpoint = "https://api.groq.com/openai/v1"
env_var_api_key = "GROQ_API_KEY"
model = "llama-3.1-8b-instant"
temperature = 0.2
max_tokens = 400
rate_limit_rps = 5.0
timeout_secs = 20

[sampling]
corpus_path = "data/reviews.jsonl"
per_class = 8
seed = 7

[reliability]
variant = "v1"
review_count = 3
repeats = 4

[insight]
review_count = 2
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = RunConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.predictor.model, "llama-3.1-8b-instant");
        assert_eq!(config.predictor.temperature, 0.2);
        assert_eq!(config.predictor.max_tokens, 400);
        assert_eq!(config.predictor.timeout_secs, 20);
        assert_eq!(config.sampling.per_class, 8);
        assert_eq!(config.sampling.seed, 7);
        assert_eq!(config.reliability.variant, PromptVariant::Direct);
        assert_eq!(config.reliability.review_count, 3);
        assert_eq!(config.reliability.repeats, 4);
        assert_eq!(config.insight.review_count, 2);
        assert_eq!(config.storage_path.as_deref(), Some("/tmp/report.json"));
    }

    #[test]
    fn test_config_defaults() {
        let toml_content = r#"
[predictor]
api_endpoint = "https://api.groq.com/openai/v1"
env_var_api_key = "GROQ_API_KEY"
model = "llama-3.1-8b-instant"

[sampling]
corpus_path = "data/reviews.jsonl"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = RunConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.predictor.temperature, 0.0);
        assert_eq!(config.predictor.max_tokens, 500);
        assert_eq!(config.predictor.rate_limit_rps, 10.0);
        assert_eq!(config.predictor.timeout_secs, 30);
        assert_eq!(config.sampling.per_class, 10);
        assert_eq!(config.sampling.seed, 42);
        assert_eq!(config.reliability.variant, PromptVariant::Staged);
        assert_eq!(config.reliability.review_count, 5);
        assert_eq!(config.reliability.repeats, 5);
        assert_eq!(config.insight.review_count, 0);
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn test_config_missing_predictor_section() {
        let toml_content = r#"
[sampling]
corpus_path = "data/reviews.jsonl"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let result = RunConfig::from_file(temp_file.path());
        assert!(result.is_err());
    }
}
