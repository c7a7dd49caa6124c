use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    prefilter::{CandidatePool, is_eligible, job_pool_query},
    scoring::{ScoreBreakdown, ScoringEngine, ScoringError},
};
use crate::{
    Candidate, CandidateDetail, Company, Job,
    config::MatcherConfig,
    document::{DocumentError, FromDocument, document_id},
    run_id,
    store::{
        CANDIDATE_DETAILS, CANDIDATES, COMPANIES, DETAIL_CANDIDATE_FIELD, DocumentStore, Filter,
        JOBS, StoreError,
    },
};

const CANDIDATES_FOR_JOB: &str = "candidates_for_job";
const JOBS_FOR_CANDIDATE: &str = "jobs_for_candidate";

/// Failures that end a match run. Only the store can fail a run; document shape
/// problems are skipped per entry or read as absent fields.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Why a single pool entry was dropped.
#[derive(Debug, Error)]
enum EntryError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("detail lookup failed: {0}")]
    Detail(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateMatch {
    pub candidate_id: String,
    pub candidate: Candidate,
    pub detail: Option<CandidateDetail>,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobMatch {
    pub job_id: String,
    pub job: Job,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Result of a lookup that tells an unknown identifier apart from "no qualifying matches".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "matches", rename_all = "snake_case")]
pub enum MatchLookup<T> {
    UnknownId,
    Found(Vec<T>),
}

impl<T> MatchLookup<T> {
    pub fn is_unknown(&self) -> bool {
        matches!(self, MatchLookup::UnknownId)
    }

    /// Matches, with an unknown identifier read as an empty list.
    pub fn into_matches(self) -> Vec<T> {
        match self {
            MatchLookup::UnknownId => vec![],
            MatchLookup::Found(matches) => matches,
        }
    }
}

fn usable<T>(parsed: Result<T, DocumentError>, collection: &str, id: &str) -> Option<T> {
    parsed
        .inspect_err(|err| warn!(collection, id, error = %err, "ignoring unusable document"))
        .ok()
}

trait Scored {
    fn score(&self) -> f64;
}

impl Scored for CandidateMatch {
    fn score(&self) -> f64 {
        self.score
    }
}

impl Scored for JobMatch {
    fn score(&self) -> f64 {
        self.score
    }
}

/// Descending by score and stable, so retrieval order breaks ties.
fn rank<T: Scored>(mut matches: Vec<T>, limit: usize) -> Vec<T> {
    matches.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal));
    matches.truncate(limit);
    matches
}

fn record_scored(direction: &'static str) {
    metrics::counter!("jc_entries_scored_total", "direction" => direction).increment(1);
}

fn record_skipped(direction: &'static str) {
    metrics::counter!("jc_entries_skipped_total", "direction" => direction).increment(1);
}

/// A pool that filled its cap may have left entries unscored.
fn pool_truncated(pool_size: usize, cap: Option<usize>) -> bool {
    cap.is_some_and(|cap| pool_size >= cap)
}

fn record_returned(direction: &'static str, count: usize) {
    metrics::counter!("jc_matches_returned_total", "direction" => direction)
        .increment(count as u64);
}

/// Ranks candidates for a job and jobs for a candidate over a [`DocumentStore`].
///
/// Owns its store handle; call [`Matcher::close`] when done.
pub struct Matcher<S: DocumentStore> {
    store: S,
    config: MatcherConfig,
    engine: ScoringEngine,
    pool: CandidatePool,
}

impl<S: DocumentStore> Matcher<S> {
    pub fn new(store: S, config: MatcherConfig) -> Self {
        let engine = ScoringEngine::new(config.scoring.clone());
        let pool = CandidatePool::new(config.prefilter.clone());
        Self {
            store,
            config,
            engine,
            pool,
        }
    }

    pub fn with_defaults(store: S) -> Self {
        Self::new(store, MatcherConfig::default())
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Top candidates for a job; an unknown job gives an empty list.
    pub async fn find_candidates_for_job(
        &self,
        job_id: &str,
        limit: usize,
        min_score: f64,
    ) -> Result<Vec<CandidateMatch>, MatchError> {
        Ok(self
            .lookup_candidates_for_job(job_id, limit, min_score)
            .await?
            .into_matches())
    }

    /// Top jobs for a candidate; an unknown candidate gives an empty list.
    pub async fn find_jobs_for_candidate(
        &self,
        candidate_id: &str,
        limit: usize,
        min_score: f64,
    ) -> Result<Vec<JobMatch>, MatchError> {
        Ok(self
            .lookup_jobs_for_candidate(candidate_id, limit, min_score)
            .await?
            .into_matches())
    }

    pub async fn lookup_candidates_for_job(
        &self,
        job_id: &str,
        limit: usize,
        min_score: f64,
    ) -> Result<MatchLookup<CandidateMatch>, MatchError> {
        let run_id = run_id::get();
        let Some(doc) = self.store.find_one_by_id(JOBS, job_id).await? else {
            info!(run_id, job_id, "job not found");
            return Ok(MatchLookup::UnknownId);
        };
        let job = match Job::from_document_lenient(&doc) {
            Ok(job) => job,
            Err(err) => {
                warn!(run_id, job_id, error = %err, "job document unusable, treating id as unknown");
                return Ok(MatchLookup::UnknownId);
            }
        };

        let query = self.pool.query_for(&job);
        let pool = self.store.find(CANDIDATES, &query).await?;
        let total = pool.len();
        let keywords = self.pool.keywords_for(&job);
        info!(
            run_id,
            job_id,
            pool_size = total,
            pool_cap = ?query.limit,
            ?keywords,
            "scoring candidate pool"
        );
        if pool_truncated(total, query.limit) {
            warn!(
                run_id,
                job_id,
                pool_cap = ?query.limit,
                "candidate pool reached its cap; candidates past it are not scored"
            );
        }

        let mut matches = Vec::new();
        let mut skipped = 0usize;
        for (index, candidate_doc) in pool.iter().enumerate() {
            match self.score_candidate(&job, candidate_doc).await {
                Ok(Some(candidate_match)) => {
                    record_scored(CANDIDATES_FOR_JOB);
                    if candidate_match.score >= min_score {
                        matches.push(candidate_match);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    skipped += 1;
                    record_skipped(CANDIDATES_FOR_JOB);
                    let entry_id = document_id(candidate_doc);
                    warn!(
                        run_id,
                        job_id,
                        candidate_id = entry_id.as_deref().unwrap_or("unknown"),
                        error = %err,
                        "skipping candidate"
                    );
                }
            }

            let processed = index + 1;
            if processed % self.config.progress_interval.max(1) == 0 {
                info!(
                    run_id,
                    job_id,
                    processed,
                    total,
                    matches_so_far = matches.len(),
                    "processed {processed}/{total} candidates"
                );
            }
        }

        let qualifying = matches.len();
        let ranked = rank(matches, limit);
        record_returned(CANDIDATES_FOR_JOB, ranked.len());
        info!(
            run_id,
            job_id,
            scanned = total,
            skipped,
            qualifying,
            returned = ranked.len(),
            "candidate matching finished"
        );

        Ok(MatchLookup::Found(ranked))
    }

    /// `Ok(None)` for candidates outside the eligible pool.
    ///
    /// Pool entries are parsed strictly: a malformed candidate or detail record, or a
    /// failed detail lookup, drops just this candidate.
    async fn score_candidate(
        &self,
        job: &Job,
        doc: &Value,
    ) -> Result<Option<CandidateMatch>, EntryError> {
        let candidate = Candidate::from_document(doc)?;
        if !is_eligible(&candidate) {
            debug!(candidate_id = %candidate.id, "candidate not eligible");
            return Ok(None);
        }

        let detail = self.fetch_detail(&candidate.id).await?;
        let score = self
            .engine
            .calculate_match_score(job, &candidate, detail.as_ref())?;

        Ok(Some(CandidateMatch {
            candidate_id: candidate.id.clone(),
            candidate,
            detail,
            score: score.overall,
            breakdown: score.breakdown,
        }))
    }

    async fn fetch_detail(&self, candidate_id: &str) -> Result<Option<CandidateDetail>, EntryError> {
        let filter = Filter::eq(DETAIL_CANDIDATE_FIELD, candidate_id);
        match self.store.find_one(CANDIDATE_DETAILS, &filter).await? {
            Some(doc) => Ok(Some(CandidateDetail::from_document(&doc)?)),
            None => Ok(None),
        }
    }

    pub async fn lookup_jobs_for_candidate(
        &self,
        candidate_id: &str,
        limit: usize,
        min_score: f64,
    ) -> Result<MatchLookup<JobMatch>, MatchError> {
        let run_id = run_id::get();
        let Some(doc) = self.store.find_one_by_id(CANDIDATES, candidate_id).await? else {
            info!(run_id, candidate_id, "candidate not found");
            return Ok(MatchLookup::UnknownId);
        };
        let candidate = match Candidate::from_document_lenient(&doc) {
            Ok(candidate) => candidate,
            Err(err) => {
                warn!(
                    run_id,
                    candidate_id,
                    error = %err,
                    "candidate document unusable, treating id as unknown"
                );
                return Ok(MatchLookup::UnknownId);
            }
        };

        let filter = Filter::eq(DETAIL_CANDIDATE_FIELD, candidate.id.as_str());
        let detail = self
            .store
            .find_one(CANDIDATE_DETAILS, &filter)
            .await?
            .and_then(|doc| match CandidateDetail::from_document_lenient(&doc) {
                Ok(detail) => Some(detail),
                Err(err) => {
                    warn!(run_id, candidate_id, error = %err, "ignoring unusable candidate detail");
                    None
                }
            });

        let query = job_pool_query(self.config.max_jobs);
        let pool = self.store.find(JOBS, &query).await?;
        let total = pool.len();
        info!(
            run_id,
            candidate_id,
            pool_size = total,
            pool_cap = ?query.limit,
            has_detail = detail.is_some(),
            "scoring job pool"
        );
        if pool_truncated(total, query.limit) {
            warn!(
                run_id,
                candidate_id,
                pool_cap = ?query.limit,
                "job pool reached its cap; jobs past it are not scored"
            );
        }

        let mut matches = Vec::new();
        let mut skipped = 0usize;
        for (index, job_doc) in pool.iter().enumerate() {
            let scored = Job::from_document_lenient(job_doc)
                .map_err(EntryError::from)
                .and_then(|job| {
                    let score = self
                        .engine
                        .calculate_match_score(&job, &candidate, detail.as_ref())?;
                    Ok(JobMatch {
                        job_id: job.id.clone(),
                        job,
                        score: score.overall,
                        breakdown: score.breakdown,
                    })
                });

            match scored {
                Ok(job_match) => {
                    record_scored(JOBS_FOR_CANDIDATE);
                    if job_match.score >= min_score {
                        matches.push(job_match);
                    }
                }
                Err(err) => {
                    skipped += 1;
                    record_skipped(JOBS_FOR_CANDIDATE);
                    let entry_id = document_id(job_doc);
                    warn!(
                        run_id,
                        candidate_id,
                        job_id = entry_id.as_deref().unwrap_or("unknown"),
                        error = %err,
                        "skipping job"
                    );
                }
            }

            let processed = index + 1;
            if processed % self.config.progress_interval.max(1) == 0 {
                info!(
                    run_id,
                    candidate_id,
                    processed,
                    total,
                    matches_so_far = matches.len(),
                    "processed {processed}/{total} jobs"
                );
            }
        }

        let qualifying = matches.len();
        let ranked = rank(matches, limit);
        record_returned(JOBS_FOR_CANDIDATE, ranked.len());
        info!(
            run_id,
            candidate_id,
            scanned = total,
            skipped,
            qualifying,
            returned = ranked.len(),
            "job matching finished"
        );

        Ok(MatchLookup::Found(ranked))
    }

    /// Employer of a job, via its `company` reference.
    pub async fn employer_for_job(&self, job: &Job) -> Result<Option<Company>, MatchError> {
        let Some(company_id) = job.company_id.as_deref() else {
            return Ok(None);
        };
        let doc = self.store.find_one_by_id(COMPANIES, company_id).await?;
        Ok(doc.and_then(|doc| usable(Company::from_document_lenient(&doc), COMPANIES, company_id)))
    }

    /// Loads a job by id; an unusable document reads as missing.
    pub async fn job(&self, job_id: &str) -> Result<Option<Job>, MatchError> {
        let doc = self.store.find_one_by_id(JOBS, job_id).await?;
        Ok(doc.and_then(|doc| usable(Job::from_document_lenient(&doc), JOBS, job_id)))
    }

    /// Releases the store handle.
    pub async fn close(self) {
        self.store.close().await;
    }
}
