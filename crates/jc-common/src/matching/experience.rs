use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::normalize_text;

/// Mid-level assumption when a description states no level
pub const DEFAULT_REQUIRED_YEARS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeniorityTier {
    Entry,
    Senior,
    FivePlus,
    ThreePlus,
    Unstated,
}

impl SeniorityTier {
    pub fn required_years(self) -> f64 {
        match self {
            SeniorityTier::Entry => 1.0,
            SeniorityTier::Senior => 10.0,
            SeniorityTier::FivePlus => 5.0,
            SeniorityTier::ThreePlus => 3.0,
            SeniorityTier::Unstated => DEFAULT_REQUIRED_YEARS,
        }
    }
}

struct TierMarkers {
    tier: SeniorityTier,
    /// substrings of the normalized description, not preceded by a digit
    words: &'static [&'static str],
    /// punctuation-bearing markers, matched on the lowercased raw description
    raw: &'static Lazy<Regex>,
}

static RE_ENTRY_RAW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^0-9])0\s*-\s*2(?:[^0-9]|$)").unwrap());
static RE_SENIOR_RAW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^0-9])10\s*\+").unwrap());
static RE_FIVE_RAW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^0-9])5\s*\+").unwrap());
static RE_THREE_RAW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^0-9])3\s*\+").unwrap());

// First match wins, in this order.
static TIERS: [TierMarkers; 4] = [
    TierMarkers {
        tier: SeniorityTier::Entry,
        words: &["entry level", "junior", "0 to 2"],
        raw: &RE_ENTRY_RAW,
    },
    TierMarkers {
        tier: SeniorityTier::Senior,
        words: &["senior", "lead", "10 or more"],
        raw: &RE_SENIOR_RAW,
    },
    TierMarkers {
        tier: SeniorityTier::FivePlus,
        words: &["5 or more", "5 years"],
        raw: &RE_FIVE_RAW,
    },
    TierMarkers {
        tier: SeniorityTier::ThreePlus,
        words: &["3 or more", "3 years"],
        raw: &RE_THREE_RAW,
    },
];

/// Infers the seniority a job description asks for from keyword presence.
pub fn infer_seniority(description: Option<&str>) -> SeniorityTier {
    let Some(description) = description else {
        return SeniorityTier::Unstated;
    };
    let raw = description.to_lowercase();
    let normalized = normalize_text(description);

    TIERS
        .iter()
        .find(|markers| {
            markers
                .words
                .iter()
                .any(|word| contains_marker(&normalized, word))
                || markers.raw.is_match(&raw)
        })
        .map(|markers| markers.tier)
        .unwrap_or(SeniorityTier::Unstated)
}

/// `marker` occurs in `haystack` somewhere other than right after a digit, so "15 years"
/// does not count as "5 years".
fn contains_marker(haystack: &str, marker: &str) -> bool {
    haystack.match_indices(marker).any(|(start, _)| {
        !haystack[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit())
    })
}

pub fn required_years(description: Option<&str>) -> f64 {
    infer_seniority(description).required_years()
}

/// Experience fit (0.0 to 1.0) of a candidate's years against what the description implies.
///
/// Absent or negative years score 0.
pub fn calculate_experience_match(description: Option<&str>, candidate_years: Option<f64>) -> f64 {
    let Some(years) = candidate_years.filter(|y| y.is_finite() && *y >= 0.0) else {
        return 0.0;
    };

    let required = required_years(description);
    if years >= required {
        1.0
    } else if years >= required * 0.7 {
        0.7
    } else if years >= required * 0.5 {
        0.5
    } else {
        (years / required).max(0.0)
    }
}
