use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::normalize::normalize_text;

static RE_SKILL_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;]|\s+").unwrap());

/// Bonus per candidate skill the job did not ask for
const BREADTH_BONUS_PER_SKILL: f64 = 0.01;
const BREADTH_BONUS_CAP: f64 = 0.1;

/// Splits a free-text skills field on commas, semicolons and whitespace runs.
///
/// Tokens are normalized and empty ones dropped. Discovery order is kept and duplicates
/// survive; deduplication happens when the lists are compared.
pub fn extract_skills(skills_text: Option<&str>) -> Vec<String> {
    let Some(text) = skills_text else {
        return vec![];
    };

    RE_SKILL_DELIMITER
        .split(text)
        .filter(|token| !token.trim().is_empty())
        .map(normalize_text)
        .filter(|token| !token.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillMatchResult {
    pub score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    /// Candidate skills outside the job's list (these earn the breadth bonus)
    pub extra_skills: Vec<String>,
}

impl SkillMatchResult {
    fn empty() -> Self {
        Self {
            score: 0.0,
            matched_skills: vec![],
            missing_skills: vec![],
            extra_skills: vec![],
        }
    }
}

/// Skill overlap measured as recall against the job's skills.
///
/// Extra candidate skills never dilute the score. When the candidate lists more
/// distinct skills than the job, 0.01 per extra skill is added (at most 0.1), and the
/// total is capped at 1.0.
pub fn check_skills(job_skills: &[String], candidate_skills: &[String]) -> SkillMatchResult {
    let job_set: HashSet<&str> = job_skills.iter().map(String::as_str).collect();
    let candidate_set: HashSet<&str> = candidate_skills.iter().map(String::as_str).collect();

    if job_set.is_empty() || candidate_set.is_empty() {
        return SkillMatchResult::empty();
    }

    let matched_skills = sorted(job_set.intersection(&candidate_set));
    let missing_skills = sorted(job_set.difference(&candidate_set));
    let extra_skills = sorted(candidate_set.difference(&job_set));

    let mut score = matched_skills.len() as f64 / job_set.len() as f64;
    if candidate_set.len() > job_set.len() {
        let bonus = (extra_skills.len() as f64 * BREADTH_BONUS_PER_SKILL).min(BREADTH_BONUS_CAP);
        score = (score + bonus).min(1.0);
    }

    SkillMatchResult {
        score,
        matched_skills,
        missing_skills,
        extra_skills,
    }
}

pub fn calculate_skills_match(job_skills: &[String], candidate_skills: &[String]) -> f64 {
    check_skills(job_skills, candidate_skills).score
}

fn sorted<'a, 'b: 'a>(skills: impl Iterator<Item = &'a &'b str>) -> Vec<String> {
    let mut out: Vec<String> = skills.map(|s| s.to_string()).collect();
    out.sort();
    out
}
