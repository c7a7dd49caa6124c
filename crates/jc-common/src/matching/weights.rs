use serde::Serialize;

/// Ranking weights; they sum to 1.0
pub const DEFAULT_WEIGHTS: Weights = Weights {
    skills: 0.30,
    experience: 0.20,
    job_role: 0.25,
    text_similarity: 0.25,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub skills: f64,
    pub experience: f64,
    pub job_role: f64,
    pub text_similarity: f64,
}

impl Default for Weights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.skills + self.experience + self.job_role + self.text_similarity
    }
}
