use jc_common::config::MatcherConfig;
use jc_common::matching::{MatchLookup, Matcher};
use jc_common::store::{CANDIDATE_DETAILS, CANDIDATES, JOBS, MemoryStore};
use serde_json::{Value, json};

fn job(id: &str, title: &str, skills: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "description": format!("{title} working with {skills}. 3+ years of experience."),
        "skills": skills,
    })
}

fn data_engineer() -> Value {
    json!({
        "_id": {"$oid": "cand-data"},
        "skills": "python, sql, spark",
        "job_role": "Data Engineer",
        "years_of_experience": "4",
        "is_job_seeking": true,
        "about": "I build data pipelines with Python and Spark"
    })
}

fn store_with_jobs(jobs: impl IntoIterator<Item = Value>) -> MemoryStore {
    MemoryStore::new()
        .with_documents(CANDIDATES, [data_engineer()])
        .with_documents(JOBS, jobs)
}

fn ids(matches: &[jc_common::matching::JobMatch]) -> Vec<&str> {
    matches.iter().map(|m| m.job_id.as_str()).collect()
}

#[tokio::test]
async fn closest_job_ranks_first() {
    let matcher = Matcher::with_defaults(store_with_jobs([
        job("job-chef", "Head Chef", "cooking"),
        job("job-data", "Data Engineer", "python,sql,spark"),
        job("job-analyst", "Data Analyst", "sql,excel"),
    ]));

    let matches = matcher
        .find_jobs_for_candidate("cand-data", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].job_id, "job-data");
    assert_eq!(matches[0].breakdown.skills_match, 1.0);
    assert_eq!(matches[0].breakdown.job_role_match, 1.0);
    assert_eq!(matches[0].breakdown.experience_match, 1.0);
    assert_eq!(matches.last().map(|m| m.job_id.as_str()), Some("job-chef"));
    assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn threshold_drops_weak_jobs() {
    let matcher = Matcher::with_defaults(store_with_jobs([
        job("job-chef", "Head Chef", "cooking"),
        job("job-data", "Data Engineer", "python,sql,spark"),
    ]));

    let matches = matcher
        .find_jobs_for_candidate("cand-data", 10, 0.5)
        .await
        .unwrap();

    assert_eq!(ids(&matches), vec!["job-data"]);
    assert!(matches.iter().all(|m| m.score >= 0.5));
}

#[tokio::test]
async fn unknown_candidate_is_empty_or_tagged() {
    let matcher = Matcher::with_defaults(store_with_jobs([job(
        "job-data",
        "Data Engineer",
        "python",
    )]));

    assert!(
        matcher
            .find_jobs_for_candidate("nobody", 10, 0.0)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        matcher
            .lookup_jobs_for_candidate("nobody", 10, 0.0)
            .await
            .unwrap(),
        MatchLookup::UnknownId
    );
}

#[tokio::test]
async fn identical_jobs_keep_store_order() {
    let matcher = Matcher::with_defaults(store_with_jobs(
        ["job-3", "job-1", "job-2"].map(|id| job(id, "Data Engineer", "python,sql")),
    ));

    let matches = matcher
        .find_jobs_for_candidate("cand-data", 2, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches), vec!["job-3", "job-1"]);
}

#[tokio::test]
async fn unidentified_jobs_are_skipped_and_bad_fields_read_as_absent() {
    let matcher = Matcher::with_defaults(store_with_jobs([
        json!({"_id": "job-odd", "title": ["Data", "Engineer"], "skills": {"python": true}}),
        json!({"title": "No id at all"}),
        job("job-ok", "Data Engineer", "python"),
    ]));

    let matches = matcher
        .find_jobs_for_candidate("cand-data", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches), vec!["job-ok", "job-odd"]);
    assert_eq!(matches[1].breakdown.skills_match, 0.0);
    assert_eq!(matches[1].breakdown.job_role_match, 1.0);
}

#[tokio::test]
async fn malformed_requested_candidate_and_detail_still_match() {
    let store = MemoryStore::new()
        .with_documents(
            CANDIDATES,
            [json!({
                "_id": "cand-odd",
                "skills": "python, sql",
                "job_role": "Data Engineer",
                "years_of_experience": "a decade"
            })],
        )
        .with_documents(
            CANDIDATE_DETAILS,
            [json!({
                "candidate": "cand-odd",
                "years_experience": "a decade",
                "job_role": {"title": "Engineer"}
            })],
        )
        .with_documents(JOBS, [job("job-data", "Data Engineer", "python,sql,spark")]);
    let matcher = Matcher::with_defaults(store);

    let matches = matcher
        .find_jobs_for_candidate("cand-odd", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches), vec!["job-data"]);
    assert_eq!(matches[0].breakdown.experience_match, 0.0);
    assert_eq!(matches[0].breakdown.job_role_match, 1.0);
    assert!((matches[0].breakdown.skills_match - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn wrong_typed_detail_fields_change_nothing() {
    let store = store_with_jobs([job("job-data", "Data Engineer", "python,sql,spark")])
        .with_documents(
            CANDIDATE_DETAILS,
            [json!({"candidate": {"$oid": "cand-data"}, "skills": {"python": 1}})],
        );
    let with_bad_detail = Matcher::with_defaults(store)
        .find_jobs_for_candidate("cand-data", 10, 0.0)
        .await
        .unwrap();

    let without_detail = Matcher::with_defaults(store_with_jobs([job(
        "job-data",
        "Data Engineer",
        "python,sql,spark",
    )]))
    .find_jobs_for_candidate("cand-data", 10, 0.0)
    .await
    .unwrap();

    assert_eq!(with_bad_detail[0].breakdown, without_detail[0].breakdown);
}

#[tokio::test]
async fn job_pool_cap_limits_the_scan() {
    let config = MatcherConfig {
        max_jobs: Some(1),
        ..MatcherConfig::default()
    };
    let matcher = Matcher::new(
        store_with_jobs([
            job("job-chef", "Head Chef", "cooking"),
            job("job-data", "Data Engineer", "python,sql,spark"),
        ]),
        config,
    );

    let matches = matcher
        .find_jobs_for_candidate("cand-data", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches), vec!["job-chef"]);
}

#[tokio::test]
async fn candidate_detail_is_used_for_every_job() {
    let store = MemoryStore::new()
        .with_documents(
            CANDIDATES,
            [json!({"_id": "cand-sparse", "is_job_seeking": true})],
        )
        .with_documents(
            CANDIDATE_DETAILS,
            [json!({
                "candidate": "cand-sparse",
                "skills": ["Python", "SQL", "Spark"],
                "job_role": "Data Engineer",
                "years_experience": 4
            })],
        )
        .with_documents(JOBS, [job("job-data", "Data Engineer", "python,sql,spark")]);
    let matcher = Matcher::with_defaults(store);

    let matches = matcher
        .find_jobs_for_candidate("cand-sparse", 10, 0.0)
        .await
        .unwrap();

    let only = &matches[0];
    assert_eq!(only.breakdown.skills_match, 1.0);
    assert_eq!(only.breakdown.job_role_match, 1.0);
    assert_eq!(only.breakdown.experience_match, 1.0);
}

#[tokio::test]
async fn ineligible_candidates_still_get_job_suggestions() {
    let mut idle = data_engineer();
    idle["is_job_seeking"] = json!(false);
    let store = MemoryStore::new()
        .with_documents(CANDIDATES, [idle])
        .with_documents(JOBS, [job("job-data", "Data Engineer", "python")]);

    let matches = Matcher::with_defaults(store)
        .find_jobs_for_candidate("cand-data", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches), vec!["job-data"]);
}
