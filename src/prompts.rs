use serde::{Deserialize, Serialize};

/// One of the three prompting strategies under comparison.
///
/// Wire names (`v1`/`v2`/`v3`) are kept stable so run files and stored
/// reports stay comparable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptVariant {
    /// Direct instruction to output a star rating
    #[serde(rename = "v1")]
    Direct,
    /// Explicit per-star criteria with few-shot examples
    #[serde(rename = "v2")]
    Criteria,
    /// Staged reasoning (positives, negatives, tone) before committing
    #[serde(rename = "v3")]
    Staged,
}

impl PromptVariant {
    /// All variants, in comparison order
    pub fn all() -> [PromptVariant; 3] {
        [Self::Direct, Self::Criteria, Self::Staged]
    }

    /// Stable identifier used in run files and reports
    pub fn id(&self) -> &'static str {
        match self {
            Self::Direct => "v1",
            Self::Criteria => "v2",
            Self::Staged => "v3",
        }
    }

    /// Build the rating-prediction prompt for a review.
    ///
    /// Every variant instructs the same output shape so one parser covers
    /// all three.
    pub fn build_prompt(&self, review_text: &str) -> String {
        match self {
            Self::Direct => format!(
                r#"Classify this restaurant review on a scale of 1-5 stars.

Review: "{review_text}"

Respond with valid JSON only:
{{"predicted_stars": <1-5>, "explanation": "<brief reason>"}}"#
            ),
            Self::Criteria => format!(
                r#"Rate this restaurant review (1-5 stars):

1 star: very negative; major failures; strong dissatisfaction
2 stars: mostly negative; significant issues; few positives
3 stars: mixed; clear positives and negatives; neutral tone
4 stars: mostly positive; minor issues only; satisfied
5 stars: very positive; enthusiastic praise; no real complaints

EXAMPLES:
"Food was cold, long wait, rude server." -> {{"predicted_stars": 1, "explanation": "Severe complaints"}}
"Decent burger, soggy fries, friendly service." -> {{"predicted_stars": 3, "explanation": "Mixed"}}
"Loved the pasta, slow check." -> {{"predicted_stars": 4, "explanation": "Mostly positive"}}

Review: "{review_text}"

Respond with valid JSON only:
{{"predicted_stars": <1-5>, "explanation": "<brief reason>"}}"#
            ),
            Self::Staged => format!(
                r#"Rate this restaurant review (1-5 stars) by analyzing it systematically.

Review: "{review_text}"

Think through:
1. What specific positive aspects are mentioned?
2. What specific negative aspects are mentioned?
3. What is the overall emotional tone?
4. Are there any strong keywords (love, hate, terrible, amazing)?

Respond with valid JSON only:
{{"predicted_stars": <1-5>, "explanation": "<brief reason>"}}"#
            ),
        }
    }
}

impl std::fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Suffix appended on the single validation-failure retry.
pub const STRICT_RETRY_SUFFIX: &str =
    "\n\nReturn ONLY the JSON object described above, with no surrounding text.";

/// Apply the stricter instruction when the first attempt failed validation.
pub fn with_strictness(prompt: &str, attempt: usize) -> String {
    if attempt == 0 {
        prompt.to_string()
    } else {
        format!("{prompt}{STRICT_RETRY_SUFFIX}")
    }
}

/// Prompt for the summary / recommended-actions / sentiment pass run by the
/// live service for each submission.
pub fn build_insight_prompt(review_text: &str, user_rating: u8) -> String {
    format!(
        r#"Analyze this restaurant review and provide actionable insights.

Review: "{review_text}"
User Rating: {user_rating} stars

Provide a JSON response with:
1. A brief 2-sentence summary of the customer's experience
2. Exactly 3 specific, actionable recommendations for the restaurant owner
3. Overall sentiment (must be exactly one of: Positive, Negative, or Mixed)

Example format:
{{
  "summary": "Customer enjoyed the food quality and ambiance. Service speed could be improved.",
  "actions": [
    "Train staff on faster order processing",
    "Maintain current food quality standards",
    "Improve table turnover during peak hours"
  ],
  "sentiment": "Positive"
}}

Respond ONLY with valid JSON matching this format:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_ids_are_stable() {
        assert_eq!(PromptVariant::Direct.id(), "v1");
        assert_eq!(PromptVariant::Criteria.id(), "v2");
        assert_eq!(PromptVariant::Staged.id(), "v3");
    }

    #[test]
    fn test_all_variants_in_order() {
        let all = PromptVariant::all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], PromptVariant::Direct);
        assert_eq!(all[2], PromptVariant::Staged);
    }

    #[test]
    fn test_every_variant_embeds_review_and_shape() {
        let review = "Great tacos, slow service.";
        for variant in PromptVariant::all() {
            let prompt = variant.build_prompt(review);
            assert!(prompt.contains(review), "{variant} prompt missing review");
            assert!(
                prompt.contains("predicted_stars"),
                "{variant} prompt missing output shape"
            );
            assert!(
                prompt.contains("explanation"),
                "{variant} prompt missing explanation field"
            );
        }
    }

    #[test]
    fn test_criteria_variant_carries_examples() {
        let prompt = PromptVariant::Criteria.build_prompt("ok");
        assert!(prompt.contains("EXAMPLES"));
        assert!(prompt.contains("5 stars"));
    }

    #[test]
    fn test_strictness_only_on_retry() {
        let base = PromptVariant::Direct.build_prompt("fine");
        assert_eq!(with_strictness(&base, 0), base);
        assert!(with_strictness(&base, 1).ends_with(STRICT_RETRY_SUFFIX));
    }

    #[test]
    fn test_insight_prompt_mentions_closed_sentiment_set() {
        let prompt = build_insight_prompt("Loved it", 5);
        assert!(prompt.contains("Positive, Negative, or Mixed"));
        assert!(prompt.contains("User Rating: 5 stars"));
    }

    #[test]
    fn test_variant_serde_round_trip() {
        let json = serde_json::to_string(&PromptVariant::Criteria).unwrap();
        assert_eq!(json, "\"v2\"");
        let back: PromptVariant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PromptVariant::Criteria);
    }
}
