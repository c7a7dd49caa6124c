//! JSONB-backed document store.
//!
//! Each collection is a table `<schema>.<collection>(id TEXT PRIMARY KEY, doc JSONB, seq
//! BIGSERIAL)`. Retrieval order is `seq`. Filters are translated to SQL that keeps the
//! in-memory semantics of [`Filter`]; regex patterns are validated with the `regex` crate
//! and evaluated by PostgreSQL (`~` / `~*`), so only the common subset of both dialects
//! behaves identically.

use std::sync::OnceLock;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use tokio_postgres::types::ToSql;
use tracing::{instrument, warn};

use super::filter::{compile_regex, field_path};
use super::{DocumentStore, Filter, FindQuery, PgPool, StoreError, create_pool_from_url};
use crate::document::id_from_value;

static RE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub(crate) fn quote_ident(name: &str) -> Result<String, StoreError> {
    if RE_IDENTIFIER.is_match(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(StoreError::InvalidConfig(format!("`{name}` is not a valid identifier")))
    }
}

pub(crate) fn qualified_table(schema: &str, collection: &str) -> Result<String, StoreError> {
    Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(collection)?))
}

fn slow_query_threshold_ms() -> Option<u64> {
    static CACHE: OnceLock<Option<u64>> = OnceLock::new();

    *CACHE.get_or_init(|| {
        std::env::var("JC_DB_LOG_MIN_DURATION_MS")
            .ok()
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(|v| v.max(0) as u64)
            .filter(|v| *v > 0)
    })
}

fn maybe_log_slow_query(label: &str, started_at: Instant) {
    if let Some(threshold_ms) = slow_query_threshold_ms() {
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        if elapsed_ms >= threshold_ms {
            warn!(query = label, elapsed_ms, "slow_query_detected");
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlParam {
    Text(String),
    TextArray(Vec<String>),
    Json(Value),
    Limit(i64),
}

impl SqlParam {
    fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlParam::Text(value) => value,
            SqlParam::TextArray(value) => value,
            SqlParam::Json(value) => value,
            SqlParam::Limit(value) => value,
        }
    }
}

/// Accumulates positional parameters while a filter is translated.
#[derive(Debug, Default)]
pub(crate) struct SqlBuilder {
    params: Vec<SqlParam>,
}

impl SqlBuilder {
    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    fn bind_path(&mut self, path: Vec<String>) -> String {
        format!("{}::text[]", self.bind(SqlParam::TextArray(path)))
    }

    pub(crate) fn where_clause(&mut self, filter: &Filter) -> Result<String, StoreError> {
        match filter {
            Filter::All => Ok("TRUE".to_string()),
            Filter::Eq { field, value } => self.equals(field, value),
            Filter::Ne { field, value } => Ok(format!("NOT COALESCE({}, FALSE)", self.equals(field, value)?)),
            Filter::In { field, values } if field == "_id" => {
                let ids = values
                    .iter()
                    .map(|value| id_param(field, value))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("id = ANY({}::text[])", self.bind(SqlParam::TextArray(ids))))
            }
            Filter::In { field, values } => {
                if values.is_empty() {
                    return Ok("FALSE".to_string());
                }
                let clauses = values
                    .iter()
                    .map(|value| self.equals(field, value))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", clauses.join(" OR ")))
            }
            Filter::Regex {
                field,
                pattern,
                case_insensitive,
            } => {
                compile_regex(pattern, *case_insensitive)?;
                let op = if *case_insensitive { "~*" } else { "~" };
                let path = self.bind_path(field_path(field)?);
                let pattern = self.bind(SqlParam::Text(pattern.clone()));
                Ok(format!(
                    "(CASE \
                     WHEN jsonb_typeof(doc #> {path}) = 'array' THEN EXISTS (\
                     SELECT 1 FROM jsonb_array_elements_text(doc #> {path}) AS e(v) \
                     WHERE e.v {op} {pattern}::text) \
                     WHEN jsonb_typeof(doc #> {path}) IN ('string', 'number') \
                     THEN (doc #>> {path}) {op} {pattern}::text \
                     ELSE FALSE END)"
                ))
            }
            Filter::And(filters) => self.combine(filters, " AND ", "TRUE"),
            Filter::Or(filters) => self.combine(filters, " OR ", "FALSE"),
        }
    }

    fn combine(
        &mut self,
        filters: &[Filter],
        separator: &str,
        empty: &str,
    ) -> Result<String, StoreError> {
        if filters.is_empty() {
            return Ok(empty.to_string());
        }
        let clauses = filters
            .iter()
            .map(|filter| self.where_clause(filter))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("({})", clauses.join(separator)))
    }

    /// May evaluate to NULL when the field is absent; callers that negate wrap it.
    fn equals(&mut self, field: &str, value: &Value) -> Result<String, StoreError> {
        if field == "_id" {
            let id = self.bind(SqlParam::Text(id_param(field, value)?));
            return Ok(format!("(id = {id}::text)"));
        }

        let segments = field_path(field)?;
        let path = self.bind_path(segments.clone());

        match value {
            Value::Null => Ok(format!("(doc #> {path} IS NULL OR doc #> {path} = 'null'::jsonb)")),
            Value::String(text) => {
                let mut oid_segments = segments;
                oid_segments.push("$oid".to_string());
                let oid_path = self.bind_path(oid_segments);
                let text_param = self.bind(SqlParam::Text(text.clone()));
                let element = self.bind(SqlParam::Json(json!([text])));
                Ok(format!(
                    "((doc #>> {path}) = {text_param}::text \
                     OR (doc #>> {oid_path}) = {text_param}::text \
                     OR (jsonb_typeof(doc #> {path}) = 'array' AND doc #> {path} @> {element}::jsonb))"
                ))
            }
            other => {
                let scalar = self.bind(SqlParam::Json(other.clone()));
                let element = self.bind(SqlParam::Json(json!([other])));
                Ok(format!(
                    "(doc #> {path} = {scalar}::jsonb \
                     OR (jsonb_typeof(doc #> {path}) = 'array' AND doc #> {path} @> {element}::jsonb))"
                ))
            }
        }
    }
}

fn id_param(field: &str, value: &Value) -> Result<String, StoreError> {
    id_from_value(value).ok_or_else(|| {
        StoreError::InvalidFilter(format!("`{field}` must be compared with an identifier"))
    })
}

/// Full `SELECT` for a query, with its parameters in binding order.
pub(crate) fn build_find_sql(
    schema: &str,
    collection: &str,
    query: &FindQuery,
) -> Result<(String, Vec<SqlParam>), StoreError> {
    let table = qualified_table(schema, collection)?;
    let mut builder = SqlBuilder::default();
    let clause = builder.where_clause(&query.filter)?;

    let mut sql = format!("SELECT doc FROM {table} WHERE {clause} ORDER BY seq");
    if let Some(limit) = query.limit {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sql.push_str(&format!(" LIMIT {}", builder.bind(SqlParam::Limit(limit))));
    }

    Ok((sql, builder.params))
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    schema: String,
}

impl std::fmt::Debug for PgDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDocumentStore")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Result<Self, StoreError> {
        let schema = schema.into();
        quote_ident(&schema)?;
        Ok(Self { pool, schema })
    }

    pub fn from_url(db_url: &str, schema: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(create_pool_from_url(db_url)?, schema)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

impl DocumentStore for PgDocumentStore {
    #[instrument(skip(self), fields(schema = %self.schema))]
    async fn find_one_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let table = qualified_table(&self.schema, collection)?;
        let sql = format!("SELECT doc FROM {table} WHERE id = $1");

        let client = self.pool.get().await?;
        let started = Instant::now();
        let row = client.query_opt(&sql, &[&id]).await;
        maybe_log_slow_query("find_one_by_id", started);

        Ok(row?.map(|row| row.get::<_, Value>(0)))
    }

    #[instrument(skip(self, query), fields(schema = %self.schema, limit = ?query.limit))]
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Value>, StoreError> {
        let (sql, params) = build_find_sql(&self.schema, collection, query)?;
        let params: Vec<&(dyn ToSql + Sync)> = params.iter().map(SqlParam::as_sql).collect();

        let client = self.pool.get().await?;
        let started = Instant::now();
        let rows = client.query(&sql, &params).await;
        maybe_log_slow_query("find", started);

        Ok(rows?.iter().map(|row| row.get::<_, Value>(0)).collect())
    }

    async fn close(&self) {
        self.pool.close();
    }
}
