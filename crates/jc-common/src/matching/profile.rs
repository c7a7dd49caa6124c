use crate::{Candidate, CandidateDetail};

/// One text blob describing a candidate, fed to the text-similarity scorer.
///
/// Field order: candidate about, skills, job_role, biggest_achievement,
/// job_expectations; then detail skills and job_role; then every education entry's
/// summary and major; then every employment entry's summary and job_title.
/// Absent or blank fields contribute nothing.
pub fn build_candidate_profile_text(
    candidate: &Candidate,
    detail: Option<&CandidateDetail>,
) -> String {
    let mut parts: Vec<&str> = [
        candidate.about.as_deref(),
        candidate.skills.as_deref(),
        candidate.job_role.as_deref(),
        candidate.biggest_achievement.as_deref(),
        candidate.job_expectations.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();

    if let Some(detail) = detail {
        parts.extend(
            [detail.skills.as_deref(), detail.job_role.as_deref()]
                .into_iter()
                .flatten(),
        );
        for entry in &detail.education {
            parts.extend([entry.summary.as_deref(), entry.major.as_deref()].into_iter().flatten());
        }
        for entry in &detail.employment {
            parts.extend(
                [entry.summary.as_deref(), entry.job_title.as_deref()]
                    .into_iter()
                    .flatten(),
            );
        }
    }

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title followed by description, the job side of the text-similarity scorer.
pub fn build_job_text(title: Option<&str>, description: Option<&str>) -> String {
    [title, description]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EducationEntry, EmploymentEntry};

    #[test]
    fn concatenates_fields_in_fixed_order() {
        let candidate = Candidate {
            about: Some("Curious analyst".into()),
            skills: Some("SQL, Python".into()),
            job_role: Some("Data Analyst".into()),
            biggest_achievement: None,
            job_expectations: Some("Remote".into()),
            ..Candidate::default()
        };
        let detail = CandidateDetail {
            skills: Some("Tableau".into()),
            job_role: None,
            education: vec![EducationEntry {
                summary: Some("BSc".into()),
                major: Some("Statistics".into()),
            }],
            employment: vec![
                EmploymentEntry {
                    summary: Some("Built reports".into()),
                    job_title: Some("BI Intern".into()),
                },
                EmploymentEntry {
                    summary: None,
                    job_title: Some("Analyst".into()),
                },
            ],
            ..CandidateDetail::default()
        };

        assert_eq!(
            build_candidate_profile_text(&candidate, Some(&detail)),
            "Curious analyst SQL, Python Data Analyst Remote Tableau BSc Statistics \
             Built reports BI Intern Analyst"
        );
    }

    #[test]
    fn missing_fields_leave_no_placeholders() {
        let candidate = Candidate {
            skills: Some("  ".into()),
            job_role: Some("Engineer".into()),
            ..Candidate::default()
        };
        assert_eq!(build_candidate_profile_text(&candidate, None), "Engineer");
        assert_eq!(build_candidate_profile_text(&Candidate::default(), None), "");
    }

    #[test]
    fn job_text_joins_title_and_description() {
        assert_eq!(
            build_job_text(Some("Data Analyst"), Some("Own the dashboards.")),
            "Data Analyst Own the dashboards."
        );
        assert_eq!(build_job_text(None, Some("Only a description")), "Only a description");
        assert_eq!(build_job_text(None, None), "");
    }
}
