pub mod config;
pub mod document;
pub mod logging;
pub mod matching;
pub mod normalize;
pub mod run_id;
pub mod store;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

// Commonly used data models for matching functions.
// Built from raw store documents by `document::FromDocument`; the scoring core never
// sees untyped documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Job {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills: Option<String>,
    pub location: Option<String>,
    /// `companies._id` of the employer
    pub company_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Company {
    pub id: String,
    pub employer_name: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ApprovalStatus {
    Approved,
    #[default]
    Pending,
    Rejected,
    /// Any status value this crate does not know about
    Other,
}

impl ApprovalStatus {
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Other)
    }

    pub fn is_rejected(self) -> bool {
        self == Self::Rejected
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub skills: Option<String>,
    pub job_role: Option<String>,
    pub years_of_experience: Option<f64>,
    pub is_job_seeking: bool,
    pub approval_status: ApprovalStatus,
    pub about: Option<String>,
    pub biggest_achievement: Option<String>,
    pub job_expectations: Option<String>,
}

impl Candidate {
    /// "first last", or `None` when neither part is present.
    pub fn display_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EducationEntry {
    pub summary: Option<String>,
    pub major: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmploymentEntry {
    pub summary: Option<String>,
    pub job_title: Option<String>,
}

/// Optional 1:1 extension of a candidate (`candidatedatas` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateDetail {
    pub id: Option<String>,
    pub candidate_id: Option<String>,
    pub skills: Option<String>,
    pub job_role: Option<String>,
    pub years_experience: Option<f64>,
    pub education: Vec<EducationEntry>,
    pub employment: Vec<EmploymentEntry>,
}
