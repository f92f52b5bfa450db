use crate::config::PredictorConfig;
use crate::error::PredictorError;
use anyhow::{Context, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

/// External predictor: prompt text in, raw completion text out.
///
/// The trait is the seam the runner is generic over, so tests drive the
/// evaluation loop with scripted predictors instead of a live endpoint.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, PredictorError>;
}

/// Chat-completions predictor for any OpenAI-compatible endpoint, with
/// client-side rate limiting and a bounded per-call timeout.
#[derive(Debug)]
pub struct ChatPredictor {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    rate_limit_rps: f64,
    call_timeout: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl ChatPredictor {
    /// Build a predictor from run configuration. The API key is read from
    /// the configured environment variable once, here, not per call.
    pub fn new(config: &PredictorConfig) -> Result<Self> {
        let api_key = std::env::var(&config.env_var_api_key).with_context(|| {
            format!("Environment variable {} not found", config.env_var_api_key)
        })?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.api_endpoint);

        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature as f32,
            max_tokens: config.max_tokens,
            rate_limit_rps: config.rate_limit_rps,
            call_timeout: Duration::from_secs(config.timeout_secs),
            last_request: Mutex::new(None),
        })
    }

    /// Sleep until the minimum inter-request interval has passed.
    async fn enforce_rate_limit(&self) {
        if self.rate_limit_rps <= 0.0 {
            return;
        }

        let min_interval = Duration::from_secs_f64(1.0 / self.rate_limit_rps);
        let mut last_request = self.last_request.lock().await;

        if let Some(last_time) = *last_request {
            let elapsed = last_time.elapsed();
            if elapsed < min_interval {
                sleep(min_interval - elapsed).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

#[async_trait]
impl Predictor for ChatPredictor {
    async fn complete(&self, prompt: &str) -> Result<String, PredictorError> {
        self.enforce_rate_limit().await;

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| PredictorError::Content(format!("failed to build message: {e}")))?
            .into();

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([user_message])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| PredictorError::Content(format!("failed to build request: {e}")))?;

        let response = timeout(self.call_timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                PredictorError::Transient(format!(
                    "request timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })?
            .map_err(|e| PredictorError::Transient(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(PredictorError::Content(
                "completion carried no content".to_string(),
            ));
        }

        Ok(content)
    }
}

/// Bounded retry: run `op` up to `max_attempts` times, returning the first
/// success or the last failure. No backoff. The attempt index is passed in
/// so a second attempt can use a stricter prompt.
pub async fn bounded_retry<T, E, F, Fut>(max_attempts: usize, mut op: F) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let limit = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= limit => return Err(err),
            Err(_) => attempt += 1,
        }
    }
}
