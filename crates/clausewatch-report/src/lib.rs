//! Parsing of model answers into a risk report.
//!
//! The model is asked for three marker blocks but nothing guarantees it
//! complies. Everything here is total: [`parse`] and the normalizers accept any
//! string and degrade to defaults or placeholders instead of failing.

mod normalize;
mod parse;
mod summary;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixture;

pub use normalize::{normalize_count, normalize_score, normalize_score_in};
pub use parse::{MISSING_TIPS_PLACEHOLDER, ParsedResponse, parse, parse_with_placeholder};
pub use summary::{DEFAULT_RISK_TIER, RiskSummary, Score};
