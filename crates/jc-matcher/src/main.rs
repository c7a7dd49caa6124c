use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use jc_common::config::MatcherConfig;
use jc_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use jc_common::matching::{Matcher, MatchLookup};
use jc_common::run_id;
use jc_common::store::PgDocumentStore;
use jc_common::store::migrations::run_migrations;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

const APP_NAME: &str = "jc-matcher";

#[derive(Debug, Parser)]
#[command(name = "jc-matcher", about = "Rank candidates for a job, or jobs for a candidate")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Schema holding the document tables
    #[arg(long, env = "JC_DB_SCHEMA", default_value = "jc")]
    schema: String,

    /// Serve Prometheus metrics on JC_METRICS_PORT while running
    #[arg(long, env = "JC_METRICS_ENABLED", default_value_t = false)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Top candidates for a job
    Candidates {
        #[arg(long)]
        job_id: String,
        /// Maximum number of results (default JC_DEFAULT_LIMIT)
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum overall score in [0, 1] (default JC_DEFAULT_MIN_SCORE)
        #[arg(long)]
        min_score: Option<f64>,
    },
    /// Top jobs for a candidate
    Jobs {
        #[arg(long)]
        candidate_id: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        min_score: Option<f64>,
    },
    /// Employer of a job
    Company {
        #[arg(long)]
        job_id: String,
    },
    /// Create the document tables
    Migrate,
}

#[derive(Debug, Serialize)]
struct Report<T: Serialize> {
    run_id: &'static str,
    generated_at: DateTime<Utc>,
    query: &'static str,
    id: String,
    limit: usize,
    min_score: f64,
    result: MatchLookup<T>,
}

fn resolve_limit(limit: Option<usize>, config: &MatcherConfig) -> usize {
    limit.unwrap_or(config.default_limit)
}

fn resolve_min_score(min_score: Option<f64>, config: &MatcherConfig) -> anyhow::Result<f64> {
    let min_score = min_score.unwrap_or(config.default_min_score);
    if !min_score.is_finite() {
        bail!("--min-score must be a finite number");
    }
    if !(0.0..=1.0).contains(&min_score) {
        warn!(min_score, "min score outside [0, 1]");
    }
    Ok(min_score)
}

async fn execute(matcher: &Matcher<PgDocumentStore>, command: Command) -> anyhow::Result<Value> {
    let config = matcher.config();

    let value = match command {
        Command::Candidates {
            job_id,
            limit,
            min_score,
        } => {
            let limit = resolve_limit(limit, config);
            let min_score = resolve_min_score(min_score, config)?;
            let result = matcher
                .lookup_candidates_for_job(&job_id, limit, min_score)
                .await
                .with_context(|| format!("matching candidates for job {job_id}"))?;
            if result.is_unknown() {
                warn!(job_id = %job_id, "unknown job id");
            }
            serde_json::to_value(Report {
                run_id: run_id::get(),
                generated_at: Utc::now(),
                query: "candidates_for_job",
                id: job_id,
                limit,
                min_score,
                result,
            })?
        }
        Command::Jobs {
            candidate_id,
            limit,
            min_score,
        } => {
            let limit = resolve_limit(limit, config);
            let min_score = resolve_min_score(min_score, config)?;
            let result = matcher
                .lookup_jobs_for_candidate(&candidate_id, limit, min_score)
                .await
                .with_context(|| format!("matching jobs for candidate {candidate_id}"))?;
            if result.is_unknown() {
                warn!(candidate_id = %candidate_id, "unknown candidate id");
            }
            serde_json::to_value(Report {
                run_id: run_id::get(),
                generated_at: Utc::now(),
                query: "jobs_for_candidate",
                id: candidate_id,
                limit,
                min_score,
                result,
            })?
        }
        Command::Company { job_id } => {
            let job = matcher
                .job(&job_id)
                .await
                .with_context(|| format!("loading job {job_id}"))?;
            let Some(job) = job else {
                bail!("job {job_id} not found");
            };
            let company = matcher.employer_for_job(&job).await?;
            serde_json::json!({
                "run_id": run_id::get(),
                "job_id": job.id,
                "title": job.title,
                "company": company,
            })
        }
        Command::Migrate => {
            let store = matcher.store();
            run_migrations(store.pool(), store.schema()).await?;
            serde_json::json!({ "run_id": run_id::get(), "migrated": store.schema() })
        }
    };

    Ok(value)
}

async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing_subscriber(APP_NAME);
    install_tracing_panic_hook(APP_NAME);

    let cli = Cli::parse();
    if cli.metrics {
        jc_metrics::init_metrics(jc_metrics::METRICS_PORT_ENV, jc_metrics::DEFAULT_METRICS_PORT);
    }

    let config = MatcherConfig::from_env();
    let store = PgDocumentStore::from_url(&cli.database_url, cli.schema.clone())
        .context("configuring document store")?;
    info!(run_id = run_id::get(), schema = %cli.schema, command = ?cli.command, "jc-matcher starting");

    let matcher = Matcher::new(store, config);
    let outcome = execute(&matcher, cli.command).await;
    matcher.close().await;

    let value = outcome?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %format!("{err:#}"), "jc-matcher failed");
        std::process::exit(1);
    }
}
