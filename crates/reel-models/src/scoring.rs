//! Scoring and parsing helpers for search results.
//!
//! Providers return ratings and review counts as numbers or loosely
//! formatted text ("4.5 out of 5", "1,234", "5.2K"). Everything here is
//! total: malformed input normalizes to zero instead of failing.

use serde_json::Value;

/// Upper bound of the rating scale.
pub const MAX_RATING: f64 = 5.0;

/// Normalize a provider review count into an integer.
///
/// Accepts JSON numbers and text with thousands separators or a
/// `K`/`M`/`B` suffix. Missing, empty, negative or unparseable values
/// yield `0`.
pub fn normalize_review_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(|v| v.round() as u64)
            .unwrap_or(0),
        Some(Value::String(s)) => parse_review_count(s),
        _ => 0,
    }
}

/// Parse a textual review count such as `"1,234"`, `"5.2K"` or `"2M"`.
pub fn parse_review_count(text: &str) -> u64 {
    let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '_').collect();

    let Some((number, rest)) = first_number(&cleaned) else {
        return 0;
    };
    if number <= 0.0 {
        return 0;
    }

    let mut suffix = rest.trim_start().chars();
    let multiplier = match (suffix.next(), suffix.next()) {
        (Some(c), next) if next.map_or(true, |n| !n.is_alphabetic()) => {
            match c.to_ascii_uppercase() {
                'K' => 1_000.0,
                'M' => 1_000_000.0,
                'B' => 1_000_000_000.0,
                _ => 1.0,
            }
        }
        _ => 1.0,
    };

    (number * multiplier).round() as u64
}

/// Normalize a provider rating into the `[0, 5]` range.
pub fn normalize_rating(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => first_number(s).map(|(n, _)| n).unwrap_or(0.0),
        _ => 0.0,
    };
    clamp_rating(raw)
}

fn clamp_rating(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, MAX_RATING)
    } else {
        0.0
    }
}

/// Composite ranking score: `rating * ln(reviews + 1)`.
///
/// Non-decreasing in both arguments; zero reviews always scores zero.
pub fn composite_score(rating: f64, reviews: u64) -> f64 {
    clamp_rating(rating) * (reviews as f64).ln_1p()
}

/// Find the first decimal number in `text`.
///
/// Returns the value (negative when directly preceded by `-`) and the
/// text following it.
fn first_number(text: &str) -> Option<(f64, &str)> {
    let bytes = text.as_bytes();
    let start = (0..bytes.len()).find(|&i| {
        bytes[i].is_ascii_digit()
            || (bytes[i] == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    })?;

    let mut end = start;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    let value: f64 = text[start..end].parse().ok()?;
    let negative = start > 0 && bytes[start - 1] == b'-';
    Some((if negative { -value } else { value }, &text[end..]))
}
