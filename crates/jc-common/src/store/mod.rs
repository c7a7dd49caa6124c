#![allow(async_fn_in_trait)]

//! Document-store access used by the matcher.
//!
//! The matcher only needs three lookups (`find_one_by_id`, `find`, `find_one`) over four
//! collections. Filters are a small predicate language that every store evaluates with
//! the same semantics as a document database: `Ne` matches documents where the field is
//! absent, while `Eq`, `In` and `Regex` never do. An array field matches when any of its
//! elements does.

pub mod filter;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;

use serde_json::Value;
use thiserror::Error;

pub use filter::{CompiledFilter, Filter, FindQuery};
pub use memory::MemoryStore;
pub use pool::{PgPool, create_pool_from_url};
pub use postgres::PgDocumentStore;

pub const JOBS: &str = "jobs";
pub const COMPANIES: &str = "companies";
pub const CANDIDATES: &str = "candidates";
/// Candidate detail records, keyed by [`DETAIL_CANDIDATE_FIELD`]
pub const CANDIDATE_DETAILS: &str = "candidatedatas";
pub const COLLECTIONS: [&str; 4] = [JOBS, COMPANIES, CANDIDATES, CANDIDATE_DETAILS];

/// Field of a detail record holding the owning candidate's id
pub const DETAIL_CANDIDATE_FIELD: &str = "candidate";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

/// Read access to stored documents.
///
/// Calls are made one at a time by a single owner; `close` releases the underlying
/// handle and is safe to call more than once.
pub trait DocumentStore {
    async fn find_one_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Matching documents in retrieval order, at most `query.limit` of them.
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Value>, StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let query = FindQuery::new(filter.clone()).with_limit(1);
        Ok(self.find(collection, &query).await?.into_iter().next())
    }

    async fn close(&self);
}
