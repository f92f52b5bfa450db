use crate::error::DataError;
use crate::models::{ClassShortfall, Review};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use std::path::Path;

/// Corpus record as it appears on disk. Yelp-style exports carry float
/// star values and varying field names.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(alias = "review_text")]
    text: String,
    #[serde(default, alias = "rating", alias = "user_rating")]
    stars: Option<f64>,
}

/// A balanced sample drawn from the corpus.
#[derive(Debug, Clone)]
pub struct Sample {
    pub reviews: Vec<Review>,
    /// Classes the corpus could not fully supply. Never silent: a shortfall
    /// is either reported here or the sample is exactly balanced.
    pub shortfalls: Vec<ClassShortfall>,
}

/// Load reviews from a JSON array file or JSONL (one object per line).
pub fn load_corpus(path: &Path) -> Result<Vec<Review>, DataError> {
    let content = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        parse_json_array(trimmed)
    } else {
        parse_jsonl(&content)
    }
}

fn parse_json_array(content: &str) -> Result<Vec<Review>, DataError> {
    let records: Vec<RawRecord> =
        serde_json::from_str(content).map_err(|e| DataError::MalformedRecord {
            line: e.line(),
            reason: e.to_string(),
        })?;

    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| validate_record(r, i + 1))
        .collect()
}

fn parse_jsonl(content: &str) -> Result<Vec<Review>, DataError> {
    let mut reviews = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_num = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let record: RawRecord =
            serde_json::from_str(line).map_err(|e| DataError::MalformedRecord {
                line: line_num,
                reason: e.to_string(),
            })?;
        reviews.push(validate_record(record, line_num)?);
    }
    Ok(reviews)
}

/// Star values must be integral and in 1-5; unlabeled records pass through.
fn validate_record(record: RawRecord, line: usize) -> Result<Review, DataError> {
    let stars = match record.stars {
        None => None,
        Some(value) => {
            if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
                return Err(DataError::InvalidRating { line, value });
            }
            Some(value as u8)
        }
    };

    Ok(Review {
        text: record.text,
        stars,
    })
}

/// Draw a balanced sample: `per_class` labeled reviews for each star class,
/// uniform-random within a class, reproducible for a fixed seed.
///
/// An under-represented class contributes everything it has and is reported
/// as a shortfall; an entirely absent class is fatal.
pub fn balanced_sample(
    corpus: &[Review],
    per_class: usize,
    seed: u64,
) -> Result<Sample, DataError> {
    if corpus.is_empty() {
        return Err(DataError::EmptyCorpus("no records loaded".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut reviews = Vec::new();
    let mut shortfalls = Vec::new();

    for stars in 1..=5u8 {
        let class: Vec<&Review> = corpus
            .iter()
            .filter(|r| r.stars == Some(stars))
            .collect();

        if class.is_empty() {
            return Err(DataError::MissingClass { stars });
        }

        if class.len() < per_class {
            shortfalls.push(ClassShortfall {
                stars,
                requested: per_class,
                available: class.len(),
            });
        }

        let picked: Vec<&&Review> = class.choose_multiple(&mut rng, per_class).collect();
        reviews.extend(picked.into_iter().map(|r| (**r).clone()));
    }

    Ok(Sample {
        reviews,
        shortfalls,
    })
}
