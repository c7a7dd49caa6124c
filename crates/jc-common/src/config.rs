//! Matcher configuration from `JC_*` environment variables.
//!
//! | variable                 | default | meaning                                        |
//! |--------------------------|---------|------------------------------------------------|
//! | `JC_CANDIDATE_POOL_CAP`  | 2000    | candidates fetched per job (`0` = unbounded)    |
//! | `JC_JOB_POOL_CAP`        | unset   | jobs fetched per candidate (`0` = unbounded)    |
//! | `JC_PREFILTER_MODE`      | none    | `none` or `derived` relevance keywords          |
//! | `JC_PREFILTER_KEYWORDS`  | unset   | comma-separated keywords, overrides the mode    |
//! | `JC_PROGRESS_INTERVAL`   | 200     | entries between progress log lines              |
//! | `JC_TFIDF_MAX_FEATURES`  | 1000    | text-similarity vocabulary bound                |
//! | `JC_DEFAULT_LIMIT`       | 10      | result count when the caller gives none         |
//! | `JC_DEFAULT_MIN_SCORE`   | 0.0     | threshold when the caller gives none            |
//!
//! Unparseable values fall back to the default with a warning.

use std::str::FromStr;

use tracing::warn;

use crate::matching::{
    prefilter::{DEFAULT_CANDIDATE_POOL_CAP, PreFilterConfig, PrefilterMode},
    scoring::ScoringConfig,
    similarity::DEFAULT_MAX_FEATURES,
};

pub const DEFAULT_PROGRESS_INTERVAL: usize = 200;
pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_MIN_SCORE: f64 = 0.0;

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub prefilter: PreFilterConfig,
    /// Jobs fetched for one candidate; `None` scans every job
    pub max_jobs: Option<usize>,
    pub progress_interval: usize,
    pub scoring: ScoringConfig,
    pub default_limit: usize,
    pub default_min_score: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            prefilter: PreFilterConfig::default(),
            max_jobs: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            scoring: ScoringConfig::default(),
            default_limit: DEFAULT_LIMIT,
            default_min_score: DEFAULT_MIN_SCORE,
        }
    }
}

impl MatcherConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the environment, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let max_candidates = match parse_var::<usize>(&lookup, "JC_CANDIDATE_POOL_CAP") {
            Some(0) => None,
            Some(cap) => Some(cap),
            None => Some(DEFAULT_CANDIDATE_POOL_CAP),
        };
        let max_jobs = parse_var::<usize>(&lookup, "JC_JOB_POOL_CAP").filter(|cap| *cap > 0);

        let mode = match lookup("JC_PREFILTER_KEYWORDS")
            .as_deref()
            .and_then(PrefilterMode::keywords_from_list)
        {
            Some(keywords) => keywords,
            None => match lookup("JC_PREFILTER_MODE") {
                Some(raw) => PrefilterMode::parse(&raw).unwrap_or_else(|| {
                    warn!(value = %raw, "unknown JC_PREFILTER_MODE; prefilter disabled");
                    PrefilterMode::None
                }),
                None => PrefilterMode::None,
            },
        };

        let progress_interval = parse_var::<usize>(&lookup, "JC_PROGRESS_INTERVAL")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.progress_interval);
        let max_features = parse_var::<usize>(&lookup, "JC_TFIDF_MAX_FEATURES")
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_FEATURES);
        let default_limit =
            parse_var::<usize>(&lookup, "JC_DEFAULT_LIMIT").unwrap_or(defaults.default_limit);
        let default_min_score = parse_var::<f64>(&lookup, "JC_DEFAULT_MIN_SCORE")
            .filter(|score| score.is_finite())
            .unwrap_or(defaults.default_min_score);

        Self {
            prefilter: PreFilterConfig {
                mode,
                max_candidates,
            },
            max_jobs,
            progress_interval,
            scoring: ScoringConfig {
                max_features,
                ..defaults.scoring
            },
            default_limit,
            default_min_score,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}
