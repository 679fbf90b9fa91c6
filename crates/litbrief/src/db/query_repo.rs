//! Search query repository for the `search_queries` table.
//!
//! Every status transition the executor makes is written here so a run's
//! per-query outcome survives the process.

use rusqlite::{params, Row};
use serde::Serialize;

use super::{now_rfc3339, Database, DatabaseError};
use crate::models::{QueryStatus, SearchQuery};

/// A search query as stored for one run of a brief.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredQuery {
    pub brief_id: String,
    pub run_id: String,
    pub position: u32,
    pub query: SearchQuery,
    pub created_at: String,
    pub updated_at: String,
}

impl StoredQuery {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status: String = row.get("status")?;
        let status = QueryStatus::parse(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown query status '{status}'").into(),
            )
        })?;

        Ok(Self {
            brief_id: row.get("brief_id")?,
            run_id: row.get("run_id")?,
            position: row.get("position")?,
            query: SearchQuery {
                id: row.get("id")?,
                query: row.get("query")?,
                is_selected: row.get("is_selected")?,
                status,
                error: row.get("error")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Records a query for a run. Re-inserting the same id is a no-op.
pub fn insert(
    db: &Database,
    brief_id: &str,
    run_id: &str,
    position: u32,
    query: &SearchQuery,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let now = now_rfc3339();
        conn.execute(
            "INSERT INTO search_queries (id, brief_id, run_id, position, query, is_selected,
             status, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(id) DO NOTHING",
            params![
                query.id,
                brief_id,
                run_id,
                position,
                query.query,
                query.is_selected,
                query.status.as_str(),
                query.error,
                now,
            ],
        )?;
        Ok(())
    })
}

/// Writes a status transition. Returns false if the query id is unknown.
pub fn update_status(
    db: &Database,
    query_id: &str,
    status: QueryStatus,
    error: Option<&str>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE search_queries SET status = ?2, error = ?3, updated_at = ?4 WHERE id = ?1",
            params![query_id, status.as_str(), error, now_rfc3339()],
        )?;
        Ok(updated == 1)
    })
}

/// Lists the queries of one run in execution order.
pub fn list_for_run(db: &Database, run_id: &str) -> Result<Vec<StoredQuery>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM search_queries WHERE run_id = ?1 ORDER BY position ASC")?;
        let rows = stmt
            .query_map(params![run_id], StoredQuery::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists every query recorded for a brief, oldest run first.
pub fn list_for_brief(db: &Database, brief_id: &str) -> Result<Vec<StoredQuery>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM search_queries WHERE brief_id = ?1
             ORDER BY created_at ASC, run_id ASC, position ASC",
        )?;
        let rows = stmt
            .query_map(params![brief_id], StoredQuery::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
