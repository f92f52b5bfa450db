use crate::models::{AttemptOutcome, ReviewInsight, Sentiment, StructuredPrediction};
use serde_json::Value;

/// Parse a raw predictor response into a validated prediction.
///
/// Validation rules: `predicted_stars` (or `rating`) must be an integer in
/// 1-5, an explanation must be present, and a sentiment field, when given,
/// must come from the closed set. Any violation yields `Invalid` with the
/// reason recorded.
pub fn parse_prediction(raw: &str) -> AttemptOutcome {
    let parsed = match extract_json(raw) {
        Some(value) => value,
        None => {
            return AttemptOutcome::Invalid {
                reason: "no JSON object found in response".to_string(),
            }
        }
    };

    let predicted_stars = match extract_rating(&parsed) {
        Ok(stars) => stars,
        Err(reason) => return AttemptOutcome::Invalid { reason },
    };

    let explanation = match parsed.get("explanation").and_then(Value::as_str) {
        Some(text) => text.to_string(),
        None => {
            return AttemptOutcome::Invalid {
                reason: "explanation field missing".to_string(),
            }
        }
    };

    let sentiment = match parsed.get("sentiment") {
        None => None,
        Some(value) => match value.as_str().and_then(Sentiment::parse) {
            Some(sentiment) => Some(sentiment),
            None => {
                return AttemptOutcome::Invalid {
                    reason: format!("sentiment {value} not in {{Positive, Negative, Mixed}}"),
                }
            }
        },
    };

    AttemptOutcome::Valid(StructuredPrediction {
        predicted_stars,
        explanation,
        sentiment,
    })
}

/// Parse a raw insight response. Summary, actions, and a closed-set
/// sentiment are all required; actions are capped at three.
pub fn parse_insight(raw: &str) -> Result<ReviewInsight, String> {
    let parsed = extract_json(raw).ok_or("no JSON object found in response")?;

    let summary = parsed
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("summary field missing or empty")?
        .to_string();

    let actions: Vec<String> = parsed
        .get("actions")
        .and_then(Value::as_array)
        .ok_or("actions field missing")?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .take(3)
        .collect();
    if actions.is_empty() {
        return Err("actions list is empty".to_string());
    }

    let sentiment = parsed
        .get("sentiment")
        .and_then(Value::as_str)
        .and_then(Sentiment::parse)
        .ok_or("sentiment missing or not in {Positive, Negative, Mixed}")?;

    Ok(ReviewInsight {
        summary,
        actions,
        sentiment,
    })
}

/// Parse JSON out of free text: try the whole response first, then the
/// outermost brace span (models often wrap the payload in prose or
/// markdown fences).
fn extract_json(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

/// The rating must be numeric, integral, and within 1-5. Both the harness
/// key (`predicted_stars`) and the live-service key (`rating`) are accepted.
fn extract_rating(parsed: &Value) -> Result<u8, String> {
    let value = parsed
        .get("predicted_stars")
        .or_else(|| parsed.get("rating"))
        .ok_or("rating field missing")?;

    let rating = match value.as_i64() {
        Some(n) => n,
        None => match value.as_f64() {
            Some(f) if f.fract() == 0.0 => f as i64,
            _ => return Err(format!("rating {value} is not an integer")),
        },
    };

    if !(1..=5).contains(&rating) {
        return Err(format!("rating {rating} out of range 1-5"));
    }

    Ok(rating as u8)
}
