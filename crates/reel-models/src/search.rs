//! Search hits, scored results and variant candidates.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::scoring::{composite_score, normalize_rating, normalize_review_count};

/// A single hit returned by the search provider.
///
/// Rating and review count are kept as raw JSON because providers send
/// either numbers or formatted text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchHit {
    #[schemars(with = "String")]
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,

    #[serde(
        default,
        alias = "reviews",
        alias = "ratings_total",
        skip_serializing_if = "Option::is_none"
    )]
    pub reviews_count: Option<Value>,

    #[schemars(with = "Option<String>")]
    #[serde(
        default,
        alias = "thumbnail",
        deserialize_with = "lenient_link",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,

    #[schemars(with = "Option<String>")]
    #[serde(
        default,
        alias = "asin",
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
}

/// Text from a string or number. Anything else, `null` included, reads as
/// empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_text).unwrap_or_default())
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_text))
}

/// A URL given either as a string or as an object with a `link` or `url`.
fn lenient_link<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(obj)) => obj
            .get("link")
            .or_else(|| obj.get("url"))
            .and_then(value_text),
        other => other.as_ref().and_then(value_text),
    })
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl SearchHit {
    pub fn review_count(&self) -> u64 {
        normalize_review_count(self.reviews_count.as_ref())
    }

    pub fn normalized_rating(&self) -> f64 {
        normalize_rating(self.rating.as_ref())
    }

    /// Price rendered as display text, if present.
    pub fn price_text(&self) -> Option<String> {
        match self.price.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(obj) => obj
                .get("raw")
                .or_else(|| obj.get("value"))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }),
            _ => None,
        }
    }
}

/// A search hit with normalized rating, review count and composite score.
///
/// Used only for ranking; never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredResult {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub rating: f64,
    pub reviews: u64,
    pub score: f64,
}

impl ScoredResult {
    pub fn from_hit(hit: &SearchHit) -> Self {
        let rating = hit.normalized_rating();
        let reviews = hit.review_count();
        Self {
            title: hit.title.trim().to_string(),
            product_id: hit.id.clone(),
            image: hit.image.clone(),
            price: hit.price_text(),
            rating,
            reviews,
            score: composite_score(rating, reviews),
        }
    }
}

/// Sort scored results by composite score, highest first.
///
/// Ties keep provider order.
pub fn sort_by_score(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// An alternative search string and the outcome of checking it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Candidate {
    pub query: String,
    /// Whether the search provider was queried for this candidate.
    pub attempted: bool,
    pub qualifying_count: usize,
    pub total_count: usize,
    #[serde(default)]
    pub sample_results: Vec<ScoredResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Candidate {
    /// A candidate that has not been checked yet.
    pub fn pending(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            attempted: false,
            qualifying_count: 0,
            total_count: 0,
            sample_results: Vec::new(),
            error: None,
        }
    }

    /// Record a failed check. The candidate counts as zero qualifying.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.attempted = true;
        self.qualifying_count = 0;
        self.error = Some(error.into());
        self
    }

    pub fn qualifies(&self, min_qualifying: usize) -> bool {
        self.attempted && self.error.is_none() && self.qualifying_count >= min_qualifying
    }
}
