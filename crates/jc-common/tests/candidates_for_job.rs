use jc_common::config::MatcherConfig;
use jc_common::matching::prefilter::PrefilterMode;
use jc_common::matching::{MatchError, MatchLookup, Matcher};
use jc_common::store::{
    CANDIDATE_DETAILS, CANDIDATES, COMPANIES, DocumentStore, Filter, FindQuery, JOBS, MemoryStore,
    StoreError,
};
use serde_json::{Value, json};

fn engineer_job() -> Value {
    json!({
        "_id": "job-eng",
        "title": "Senior Software Engineer",
        "description": "Build backend services in Python and Go. 5+ years of experience.",
        "skills": "python,go",
        "location": "Palo Alto",
        "company": {"$oid": "company-1"}
    })
}

fn engineer_candidate(id: &str) -> Value {
    json!({
        "_id": id,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "skills": "python,go,rust",
        "job_role": "Software Engineer",
        "years_of_experience": 6,
        "is_job_seeking": true,
        "approval_status": "approved",
        "about": "Backend engineer building Python and Go services"
    })
}

fn store_with(candidates: impl IntoIterator<Item = Value>) -> MemoryStore {
    MemoryStore::new()
        .with_documents(JOBS, [engineer_job()])
        .with_documents(
            COMPANIES,
            [json!({"_id": {"$oid": "company-1"}, "employer_name": "Variance"})],
        )
        .with_documents(CANDIDATES, candidates)
}

fn ids<T>(matches: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    matches.iter().map(|m| id(m).to_string()).collect()
}

#[tokio::test]
async fn strong_engineer_scores_at_least_seventy_percent() {
    let matcher = Matcher::with_defaults(store_with([engineer_candidate("cand-1")]));

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    let top = &matches[0];
    assert_eq!(top.candidate_id, "cand-1");
    assert_eq!(top.breakdown.skills_match, 1.0);
    assert_eq!(top.breakdown.experience_match, 1.0);
    assert_eq!(top.breakdown.job_role_match, 0.8);
    assert!((0.0..=1.0).contains(&top.breakdown.text_similarity));
    assert!(top.score >= 0.70, "score was {}", top.score);
    assert_eq!(top.candidate.display_name().as_deref(), Some("Ada Lovelace"));
}

#[tokio::test]
async fn empty_profile_scores_only_on_text_similarity() {
    let matcher = Matcher::with_defaults(store_with([json!({
        "_id": "cand-bare",
        "skills": "",
        "job_role": "",
        "is_job_seeking": true,
        "about": "I enjoy building backend services"
    })]));

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();

    let only = &matches[0];
    assert_eq!(only.breakdown.skills_match, 0.0);
    assert_eq!(only.breakdown.experience_match, 0.0);
    assert_eq!(only.breakdown.job_role_match, 0.0);
    assert!((only.score - 0.25 * only.breakdown.text_similarity).abs() < 1e-12);
}

#[tokio::test]
async fn rejected_and_idle_candidates_never_appear() {
    let mut rejected = engineer_candidate("cand-rejected");
    rejected["approval_status"] = json!("rejected");
    let mut shouting = engineer_candidate("cand-rejected-upper");
    shouting["approval_status"] = json!("REJECTED");
    let mut idle = engineer_candidate("cand-idle");
    idle["is_job_seeking"] = json!(false);

    let matcher = Matcher::with_defaults(store_with([
        rejected,
        shouting,
        idle,
        engineer_candidate("cand-ok"),
    ]));

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches, |m| m.candidate_id.as_str()), vec!["cand-ok"]);
}

#[tokio::test]
async fn unknown_job_is_empty_or_tagged() {
    let matcher = Matcher::with_defaults(store_with([engineer_candidate("cand-1")]));

    let plain = matcher
        .find_candidates_for_job("no-such-job", 10, 0.0)
        .await
        .unwrap();
    assert!(plain.is_empty());

    let lookup = matcher
        .lookup_candidates_for_job("no-such-job", 10, 0.0)
        .await
        .unwrap();
    assert_eq!(lookup, MatchLookup::UnknownId);

    let found_but_filtered = matcher
        .lookup_candidates_for_job("job-eng", 10, 1.01)
        .await
        .unwrap();
    assert_eq!(found_but_filtered, MatchLookup::Found(vec![]));
}

#[tokio::test]
async fn repeated_runs_return_identical_rankings() {
    let candidates = (0..6).map(|i| {
        let mut doc = engineer_candidate(&format!("cand-{i}"));
        doc["years_of_experience"] = json!(i);
        doc
    });
    let matcher = Matcher::with_defaults(store_with(candidates));

    let first = matcher.find_candidates_for_job("job-eng", 10, 0.0).await.unwrap();
    let second = matcher.find_candidates_for_job("job-eng", 10, 0.0).await.unwrap();

    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn threshold_and_limit_only_shrink_results() {
    let candidates = (0..8).map(|i| {
        let mut doc = engineer_candidate(&format!("cand-{i}"));
        doc["years_of_experience"] = json!(i);
        if i % 2 == 0 {
            doc["job_role"] = json!("Gardener");
        }
        doc
    });
    let matcher = Matcher::with_defaults(store_with(candidates));

    let mut previous = usize::MAX;
    for min_score in [0.0, 0.3, 0.5, 0.7, 0.9, 1.0] {
        let count = matcher
            .find_candidates_for_job("job-eng", 100, min_score)
            .await
            .unwrap()
            .len();
        assert!(count <= previous, "count grew at threshold {min_score}");
        previous = count;
    }

    let all = matcher.find_candidates_for_job("job-eng", 100, 0.0).await.unwrap();
    for limit in [8, 5, 1, 0] {
        let limited = matcher
            .find_candidates_for_job("job-eng", limit, 0.0)
            .await
            .unwrap();
        assert!(limited.len() <= limit);
        assert_eq!(limited[..], all[..limited.len()]);
    }
}

#[tokio::test]
async fn equal_scores_keep_retrieval_order() {
    let matcher = Matcher::with_defaults(store_with(
        ["cand-b", "cand-a", "cand-c"].map(engineer_candidate),
    ));

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(
        ids(&matches, |m| m.candidate_id.as_str()),
        vec!["cand-b", "cand-a", "cand-c"]
    );
}

#[tokio::test]
async fn malformed_candidates_are_skipped() {
    let mut broken = engineer_candidate("cand-broken");
    broken["years_of_experience"] = json!("a decade");
    let no_id = json!({"skills": "python", "is_job_seeking": true});

    let matcher = Matcher::with_defaults(store_with([
        broken,
        no_id,
        engineer_candidate("cand-ok"),
    ]));

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches, |m| m.candidate_id.as_str()), vec!["cand-ok"]);
}

#[tokio::test]
async fn detail_records_fill_missing_candidate_fields() {
    let store = store_with([json!({
        "_id": {"$oid": "cand-detail"},
        "is_job_seeking": true
    })])
    .with_documents(
        CANDIDATE_DETAILS,
        [json!({
            "_id": "detail-1",
            "candidate": {"$oid": "cand-detail"},
            "skills": "Python; Go",
            "job_role": "Software Engineer",
            "years_experience": 8,
            "education": [{"summary": "BSc Computer Science", "major": "Computer Science"}],
            "employment": [{"summary": "Built Go services", "job_title": "Backend Engineer"}]
        })],
    );
    let matcher = Matcher::with_defaults(store);

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();

    let only = &matches[0];
    assert_eq!(only.candidate_id, "cand-detail");
    assert!(only.detail.is_some());
    assert_eq!(only.breakdown.skills_match, 1.0);
    assert_eq!(only.breakdown.experience_match, 1.0);
    assert_eq!(only.breakdown.job_role_match, 0.8);
    assert!(only.breakdown.text_similarity > 0.0);
}

#[tokio::test]
async fn pool_cap_bounds_the_scan() {
    let mut config = MatcherConfig::default();
    config.prefilter.max_candidates = Some(2);
    let matcher = Matcher::new(
        store_with((0..5).map(|i| engineer_candidate(&format!("cand-{i}")))),
        config,
    );

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches, |m| m.candidate_id.as_str()), vec!["cand-0", "cand-1"]);
}

#[tokio::test]
async fn derived_prefilter_drops_unrelated_profiles() {
    let chef = json!({
        "_id": "cand-chef",
        "skills": "cooking, plating",
        "job_role": "Chef",
        "is_job_seeking": true,
        "about": "I build menus"
    });
    let mut config = MatcherConfig::default();
    config.prefilter.mode = PrefilterMode::Derived;
    let matcher = Matcher::new(store_with([chef.clone(), engineer_candidate("cand-eng")]), config);

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();
    assert_eq!(ids(&matches, |m| m.candidate_id.as_str()), vec!["cand-eng"]);

    let unfiltered = Matcher::with_defaults(store_with([chef, engineer_candidate("cand-eng")]))
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();
    assert_eq!(unfiltered.len(), 2);
}

#[tokio::test]
async fn employer_is_resolved_from_the_job_reference() {
    let matcher = Matcher::with_defaults(store_with(Vec::new()));

    let job = matcher.job("job-eng").await.unwrap().unwrap();
    let company = matcher.employer_for_job(&job).await.unwrap().unwrap();
    assert_eq!(company.employer_name.as_deref(), Some("Variance"));

    let mut orphan = job.clone();
    orphan.company_id = None;
    assert!(matcher.employer_for_job(&orphan).await.unwrap().is_none());
}

/// Serves the job but fails every pool query.
struct FailingPoolStore {
    inner: MemoryStore,
}

impl DocumentStore for FailingPoolStore {
    async fn find_one_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.find_one_by_id(collection, id).await
    }

    async fn find(&self, _collection: &str, _query: &FindQuery) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::InvalidConfig("connection refused".into()))
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        self.inner.find_one(collection, filter).await
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn pool_fetch_failures_propagate() {
    let matcher = Matcher::with_defaults(FailingPoolStore {
        inner: store_with([engineer_candidate("cand-1")]),
    });

    let err = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchError::Store(StoreError::InvalidConfig(_))));
}

#[tokio::test]
async fn wrong_typed_job_fields_contribute_nothing() {
    let store = MemoryStore::new()
        .with_documents(
            JOBS,
            [json!({
                "_id": "job-odd",
                "title": {"nested": true},
                "description": "Backend services in Python and Go",
                "skills": {"python": true}
            })],
        )
        .with_documents(CANDIDATES, [engineer_candidate("cand-1")]);
    let matcher = Matcher::with_defaults(store);

    let matches = matcher
        .find_candidates_for_job("job-odd", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches, |m| m.candidate_id.as_str()), vec!["cand-1"]);
    assert_eq!(matches[0].breakdown.skills_match, 0.0);
    assert_eq!(matches[0].breakdown.job_role_match, 0.0);
    assert_eq!(matches[0].breakdown.experience_match, 1.0);

    let job = matcher.job("job-odd").await.unwrap().unwrap();
    assert_eq!(job.skills, None);
}

#[tokio::test]
async fn string_flag_seekers_reach_the_pool() {
    let mut seeker = engineer_candidate("cand-string-flag");
    seeker["is_job_seeking"] = json!("true");
    let mut not_seeking = engineer_candidate("cand-string-false");
    not_seeking["is_job_seeking"] = json!("false");

    let matcher = Matcher::with_defaults(store_with([seeker, not_seeking]));

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches, |m| m.candidate_id.as_str()), vec!["cand-string-flag"]);
}

/// Fails the detail lookup of one candidate.
struct FailingDetailStore {
    inner: MemoryStore,
    unreachable_candidate: &'static str,
}

impl DocumentStore for FailingDetailStore {
    async fn find_one_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.find_one_by_id(collection, id).await
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Value>, StoreError> {
        self.inner.find(collection, query).await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let unreachable = Filter::eq("candidate", self.unreachable_candidate);
        if collection == CANDIDATE_DETAILS && *filter == unreachable {
            return Err(StoreError::InvalidConfig("detail shard offline".into()));
        }
        self.inner.find_one(collection, filter).await
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn detail_failures_drop_only_that_candidate() {
    let candidates = ["cand-a", "cand-offline", "cand-bad-detail", "cand-b"].map(engineer_candidate);
    let inner = store_with(candidates).with_documents(
        CANDIDATE_DETAILS,
        [
            json!({"_id": "d-bad", "candidate": "cand-bad-detail", "years_experience": "a decade"}),
            json!({"_id": "d-b", "candidate": "cand-b", "years_experience": 9}),
        ],
    );
    let matcher = Matcher::with_defaults(FailingDetailStore {
        inner,
        unreachable_candidate: "cand-offline",
    });

    let matches = matcher
        .find_candidates_for_job("job-eng", 10, 0.0)
        .await
        .unwrap();

    assert_eq!(ids(&matches, |m| m.candidate_id.as_str()), vec!["cand-a", "cand-b"]);
    assert!(matches[1].detail.is_some());
}
