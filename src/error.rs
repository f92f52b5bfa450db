use thiserror::Error;

/// Fatal corpus/sampling failures. These abort the run before any
/// predictor call is made.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("corpus is empty: {0}")]
    EmptyCorpus(String),

    #[error("no reviews with a {stars}-star rating in the corpus")]
    MissingClass { stars: u8 },

    #[error("malformed corpus record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("rating {value} is not an integer in 1-5 (line {line})")]
    InvalidRating { line: usize, value: f64 },

    #[error("failed to read corpus file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Predictor call failures. Neither kind is fatal for the run: after the
/// bounded retry both are recorded as an invalid attempt and counted in
/// the validity-rate denominator only.
#[derive(Debug, Error)]
pub enum PredictorError {
    /// Timeout, rate limit, or network failure.
    #[error("transient predictor failure: {0}")]
    Transient(String),

    /// The predictor answered, but the content is unusable.
    #[error("predictor content failure: {0}")]
    Content(String),
}
