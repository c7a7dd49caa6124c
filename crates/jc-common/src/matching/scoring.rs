use serde::Serialize;
use thiserror::Error;

use super::{
    experience::calculate_experience_match,
    profile::{build_candidate_profile_text, build_job_text},
    resolve::{candidate_role, candidate_skills, candidate_years},
    role::calculate_job_role_match,
    similarity::{DEFAULT_MAX_FEATURES, calculate_text_similarity},
    skills::{SkillMatchResult, check_skills, extract_skills},
    weights::{DEFAULT_WEIGHTS, Weights},
};
use crate::{Candidate, CandidateDetail, Job};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ScoringError {
    #[error("{component} score is not a finite number ({value})")]
    NonFinite { component: &'static str, value: f64 },
}

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub weights: Weights,
    /// Vocabulary bound of the text-similarity vectorizer
    pub max_features: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            max_features: DEFAULT_MAX_FEATURES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub skills_match: f64,
    pub experience_match: f64,
    pub job_role_match: f64,
    pub text_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    pub overall: f64,
    pub breakdown: ScoreBreakdown,
    pub weights: Weights,
    /// Matched, missing and extra skills behind `breakdown.skills_match`
    pub skill_detail: SkillMatchResult,
}

/// Aggregate score with the default weights.
pub fn calculate_match_score(
    job: &Job,
    candidate: &Candidate,
    detail: Option<&CandidateDetail>,
) -> Result<MatchScore, ScoringError> {
    ScoringEngine::default().calculate_match_score(job, candidate, detail)
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Four component scores and their weighted sum for one (job, candidate) pair.
    ///
    /// Skills, role and years resolve candidate first, then detail.
    pub fn calculate_match_score(
        &self,
        job: &Job,
        candidate: &Candidate,
        detail: Option<&CandidateDetail>,
    ) -> Result<MatchScore, ScoringError> {
        let job_skills = extract_skills(job.skills.as_deref());
        let candidate_skill_tokens = extract_skills(candidate_skills(candidate, detail));
        let skill_detail = check_skills(&job_skills, &candidate_skill_tokens);

        let experience_match = calculate_experience_match(
            job.description.as_deref(),
            candidate_years(candidate, detail),
        );
        let job_role_match =
            calculate_job_role_match(job.title.as_deref(), candidate_role(candidate, detail));

        let job_text = build_job_text(job.title.as_deref(), job.description.as_deref());
        let profile_text = build_candidate_profile_text(candidate, detail);
        let text_similarity =
            calculate_text_similarity(&job_text, &profile_text, self.config.max_features);

        let breakdown = ScoreBreakdown {
            skills_match: finite("skills", skill_detail.score)?,
            experience_match: finite("experience", experience_match)?,
            job_role_match: finite("job_role", job_role_match)?,
            text_similarity: finite("text_similarity", text_similarity)?,
        };

        let weights = self.config.weights;
        let overall = breakdown.skills_match * weights.skills
            + breakdown.experience_match * weights.experience
            + breakdown.job_role_match * weights.job_role
            + breakdown.text_similarity * weights.text_similarity;

        Ok(MatchScore {
            overall: finite("overall", overall)?,
            breakdown,
            weights,
            skill_detail,
        })
    }
}

fn finite(component: &'static str, value: f64) -> Result<f64, ScoringError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScoringError::NonFinite { component, value })
    }
}
