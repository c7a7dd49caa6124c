//! Candidate-first, detail-second field resolution.
//!
//! Each resolver lists its sources in precedence order; the first present value wins.

use crate::{Candidate, CandidateDetail};

/// First `Some` among the sources, in order.
pub fn resolve_first<T, I>(sources: I) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
{
    sources.into_iter().flatten().next()
}

pub fn candidate_skills<'a>(
    candidate: &'a Candidate,
    detail: Option<&'a CandidateDetail>,
) -> Option<&'a str> {
    resolve_first([
        candidate.skills.as_deref(),
        detail.and_then(|d| d.skills.as_deref()),
    ])
}

pub fn candidate_role<'a>(
    candidate: &'a Candidate,
    detail: Option<&'a CandidateDetail>,
) -> Option<&'a str> {
    resolve_first([
        candidate.job_role.as_deref(),
        detail.and_then(|d| d.job_role.as_deref()),
    ])
}

pub fn candidate_years(candidate: &Candidate, detail: Option<&CandidateDetail>) -> Option<f64> {
    resolve_first([
        candidate.years_of_experience,
        detail.and_then(|d| d.years_experience),
    ])
}
