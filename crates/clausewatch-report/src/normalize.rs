use once_cell::sync::Lazy;
use regex::Regex;

use crate::summary::Score;

static FRACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*/\s*([0-9]+(?:\.[0-9]+)?)").unwrap());

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Explicit signs that a score is on a ten-point scale.
static TEN_POINT_SCALE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:/\s*10(?:[^0-9.]|$)|out\s+of\s+10(?:[^0-9]|$)|滿分\s*10(?:[^0-9]|$)|(?:^|[^0-9])10\s*分制|十分制)",
    )
    .unwrap()
});

/// Fold full-width digits and punctuation to ASCII.
fn fold_width(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            '／' => '/',
            '．' => '.',
            _ => c,
        })
        .collect()
}

fn first_digit_run(s: &str) -> Option<u64> {
    DIGIT_RUN
        .find(s)
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
}

fn has_ten_point_evidence(s: &str) -> bool {
    TEN_POINT_SCALE.is_match(s)
}

/// Normalize a score field on its own.
///
/// Equivalent to [`normalize_score_in`] with no surrounding context.
#[must_use]
pub fn normalize_score(field: &str) -> Score {
    normalize_score_in(field, "")
}

/// Normalize a score field into `0..=100`.
///
/// - `a/b` becomes `floor(a / b * 100)`, clamped. A zero denominator gives 0.
/// - Otherwise the first run of digits is the score (`"85分"` is 85).
/// - A value of 10 or less is multiplied by 10 when `field` or `context` marks a
///   ten-point scale (`/10`, `out of 10`, `滿分10`, `10分制`, `十分制`).
/// - Anything without digits is 0.
///
/// `context` is typically the whole data line the field came from.
#[must_use]
pub fn normalize_score_in(field: &str, context: &str) -> Score {
    let field = fold_width(field);

    if let Some(caps) = FRACTION.captures(&field) {
        let numerator: f64 = caps[1].parse().unwrap_or(0.0);
        let denominator: f64 = caps[2].parse().unwrap_or(0.0);
        if denominator == 0.0 {
            return Score::default();
        }
        let percent = (numerator / denominator * 100.0).floor();
        if !percent.is_finite() || percent <= 0.0 {
            return Score::default();
        }
        return Score::saturating(percent as u64);
    }

    let Some(value) = first_digit_run(&field) else {
        return Score::default();
    };

    if value <= 10 && (has_ten_point_evidence(&field) || has_ten_point_evidence(&fold_width(context)))
    {
        return Score::saturating(value * 10);
    }
    Score::saturating(value)
}

/// Normalize a count field: the first run of digits, else 0.
#[must_use]
pub fn normalize_count(field: &str) -> u32 {
    first_digit_run(&fold_width(field))
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(0)
}
