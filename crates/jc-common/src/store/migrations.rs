use tracing::{info, instrument};

use super::postgres::{qualified_table, quote_ident};
use super::{COLLECTIONS, PgPool, StoreError};

struct Migration {
    id: i32,
    description: &'static str,
    sql: fn(&str) -> Result<String, StoreError>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "document collections",
        sql: collection_tables_sql,
    },
    Migration {
        id: 2,
        description: "containment indexes for pool and detail lookups",
        sql: containment_indexes_sql,
    },
];

fn collection_tables_sql(schema: &str) -> Result<String, StoreError> {
    COLLECTIONS
        .iter()
        .map(|collection| {
            Ok(format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    doc JSONB NOT NULL,
                    seq BIGSERIAL NOT NULL
                );",
                qualified_table(schema, collection)?
            ))
        })
        .collect::<Result<Vec<_>, StoreError>>()
        .map(|statements| statements.join("\n"))
}

fn containment_indexes_sql(schema: &str) -> Result<String, StoreError> {
    COLLECTIONS
        .iter()
        .map(|collection| {
            Ok(format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} USING GIN (doc jsonb_path_ops);
                 CREATE INDEX IF NOT EXISTS {} ON {} (seq);",
                quote_ident(&format!("{collection}_doc_gin"))?,
                qualified_table(schema, collection)?,
                quote_ident(&format!("{collection}_seq_idx"))?,
                qualified_table(schema, collection)?,
            ))
        })
        .collect::<Result<Vec<_>, StoreError>>()
        .map(|statements| statements.join("\n"))
}

fn bootstrap_sql(schema: &str) -> Result<String, StoreError> {
    let schema_ident = quote_ident(schema)?;
    Ok(format!(
        "CREATE SCHEMA IF NOT EXISTS {schema_ident};
         CREATE TABLE IF NOT EXISTS {schema_ident}.schema_migrations (
            id INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
         );"
    ))
}

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool, schema: &str) -> Result<(), StoreError> {
    let bootstrap = bootstrap_sql(schema)?;
    let migrations_table = format!("{}.schema_migrations", quote_ident(schema)?);

    let mut client = pool.get().await?;
    client.batch_execute(&bootstrap).await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                &format!("SELECT EXISTS (SELECT 1 FROM {migrations_table} WHERE id = $1)"),
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let sql = (migration.sql)(schema)?;
        let tx = client.transaction().await?;
        tx.batch_execute(&sql).await?;
        tx.execute(
            &format!("INSERT INTO {migrations_table} (id, description) VALUES ($1, $2)"),
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            migration_id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
