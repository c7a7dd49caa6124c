use std::collections::HashSet;

use crate::normalize::normalize_opt;

const CONTAINMENT_SCORE: f64 = 0.8;

/// Job title vs. the candidate's declared role.
///
/// - equal after normalization → 1.0
/// - one contains the other → 0.8
/// - otherwise Jaccard overlap of the word sets
pub fn calculate_job_role_match(job_title: Option<&str>, candidate_role: Option<&str>) -> f64 {
    let title = normalize_opt(job_title);
    let role = normalize_opt(candidate_role);

    if title.is_empty() || role.is_empty() {
        return 0.0;
    }

    if title == role {
        return 1.0;
    }

    if title.contains(&role) || role.contains(&title) {
        return CONTAINMENT_SCORE;
    }

    let title_words: HashSet<&str> = title.split_whitespace().collect();
    let role_words: HashSet<&str> = role.split_whitespace().collect();
    let union = title_words.union(&role_words).count();
    if union == 0 {
        return 0.0;
    }

    title_words.intersection(&role_words).count() as f64 / union as f64
}
