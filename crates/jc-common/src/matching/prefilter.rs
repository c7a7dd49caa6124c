use std::collections::HashSet;

use super::{skills::extract_skills, stop_words::is_stop_word};
use crate::{
    Candidate, Job,
    normalize::normalize_opt,
    store::{Filter, FindQuery},
};

pub const DEFAULT_CANDIDATE_POOL_CAP: usize = 2000;

/// How the candidates-for-job pool is narrowed beyond eligibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PrefilterMode {
    /// Every eligible candidate, up to the pool cap
    #[default]
    None,
    /// Keywords taken from the job's skills and title
    Derived,
    /// A fixed keyword list
    Keywords(Vec<String>),
}

impl PrefilterMode {
    /// `none` or `derived`, case-insensitive. Unrecognised input gives `Option::None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Some(PrefilterMode::None),
            "derived" | "auto" => Some(PrefilterMode::Derived),
            _ => None,
        }
    }

    /// Comma-separated keyword list; blank entries are dropped.
    pub fn keywords_from_list(raw: &str) -> Option<Self> {
        let keywords: Vec<String> = raw
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        (!keywords.is_empty()).then_some(PrefilterMode::Keywords(keywords))
    }
}

#[derive(Debug, Clone)]
pub struct PreFilterConfig {
    pub mode: PrefilterMode,
    /// Pool size cap; `None` is unbounded
    pub max_candidates: Option<usize>,
}

impl Default for PreFilterConfig {
    fn default() -> Self {
        Self {
            mode: PrefilterMode::None,
            max_candidates: Some(DEFAULT_CANDIDATE_POOL_CAP),
        }
    }
}

/// Job-seeking and not rejected.
///
/// `is_job_seeking` is accepted as a boolean or as a `"true"` string in any casing, the
/// same values [`Candidate`] parsing reads as seeking.
pub fn eligible_candidates_filter() -> Filter {
    Filter::and([
        Filter::or([
            Filter::eq("is_job_seeking", true),
            Filter::regex("is_job_seeking", "^true$"),
        ]),
        Filter::ne("approval_status", "rejected"),
    ])
}

/// The same rule applied to an already parsed candidate.
pub fn is_eligible(candidate: &Candidate) -> bool {
    candidate.is_job_seeking && !candidate.approval_status.is_rejected()
}

/// Relevance keywords for a job: its skill tokens followed by its title words.
///
/// Stop words and one-character tokens are dropped; first occurrence wins.
pub fn derive_relevance_keywords(job: &Job) -> Vec<String> {
    let title = normalize_opt(job.title.as_deref());
    let mut seen = HashSet::new();

    extract_skills(job.skills.as_deref())
        .into_iter()
        .chain(title.split_whitespace().map(str::to_string))
        .filter(|token| token.chars().count() > 1 && !is_stop_word(token))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

/// Case-insensitive "skills or job_role mentions any keyword" filter.
pub fn relevance_filter(keywords: &[String]) -> Option<Filter> {
    if keywords.is_empty() {
        return None;
    }

    let pattern = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");

    Some(Filter::or([
        Filter::regex("skills", pattern.clone()),
        Filter::regex("job_role", pattern),
    ]))
}

pub struct CandidatePool {
    config: PreFilterConfig,
}

impl CandidatePool {
    pub fn new(config: PreFilterConfig) -> Self {
        Self { config }
    }

    pub fn keywords_for(&self, job: &Job) -> Vec<String> {
        match &self.config.mode {
            PrefilterMode::None => vec![],
            PrefilterMode::Derived => derive_relevance_keywords(job),
            PrefilterMode::Keywords(keywords) => keywords.clone(),
        }
    }

    /// Store query for the candidates scored against `job`.
    pub fn query_for(&self, job: &Job) -> FindQuery {
        let eligible = eligible_candidates_filter();
        let filter = match relevance_filter(&self.keywords_for(job)) {
            Some(relevance) => Filter::and([eligible, relevance]),
            None => eligible,
        };

        FindQuery::new(filter).with_optional_limit(self.config.max_candidates)
    }
}

/// Store query for the jobs scored against a candidate.
pub fn job_pool_query(max_jobs: Option<usize>) -> FindQuery {
    FindQuery::all().with_optional_limit(max_jobs)
}
