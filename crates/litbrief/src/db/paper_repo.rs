//! Paper repository for the `papers` table.
//!
//! Papers are insert-if-absent by `external_id`; an existing row is never
//! overwritten by a later discovery of the same identifier.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::models::{CandidatePaper, Paper};

pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    column: &str,
) -> Result<T, rusqlite::Error> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        let idx = row.as_ref().column_index(column).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

pub(crate) fn to_json<T: serde::Serialize>(
    value: &T,
    column: &'static str,
) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Json { column, source: e })
}

impl Paper {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            external_id: row.get("external_id")?,
            title: row.get("title")?,
            abstract_text: row.get("abstract")?,
            authors: json_column(row, "authors")?,
            year: row.get("year")?,
            links: json_column(row, "links")?,
            doi: row.get("doi")?,
            bibtex: row.get("bibtex")?,
            source: row.get("source")?,
            submitted_at: row.get("submitted_at")?,
            enriched_at: row.get("enriched_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a paper for `candidate` unless one with the same external id exists.
///
/// Takes a bare connection so callers can run it inside their own transaction.
/// Returns the paper id and whether a row was created.
pub fn insert_if_absent(
    conn: &Connection,
    candidate: &CandidatePaper,
    now: &str,
) -> Result<(i64, bool), DatabaseError> {
    let authors = to_json(&candidate.authors, "authors")?;
    let links = to_json(&candidate.links, "links")?;
    let submitted_at = candidate.submitted_at.map(|d| d.to_rfc3339());

    let inserted = conn.execute(
        "INSERT INTO papers (external_id, title, abstract, authors, year, links, doi, bibtex,
         source, submitted_at, enriched_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, ?11)
         ON CONFLICT(external_id) DO NOTHING",
        params![
            candidate.external_id,
            candidate.title,
            candidate.abstract_text,
            authors,
            candidate.year,
            links,
            candidate.doi,
            candidate.bibtex,
            candidate.source,
            submitted_at,
            now,
        ],
    )?;

    let id: i64 = conn.query_row(
        "SELECT id FROM papers WHERE external_id = ?1",
        params![candidate.external_id],
        |r| r.get(0),
    )?;

    Ok((id, inserted == 1))
}

/// Finds a paper by its internal ID.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<Paper>, DatabaseError> {
    db.with_conn(|conn| {
        let paper = conn
            .query_row(
                "SELECT * FROM papers WHERE id = ?1",
                params![id],
                Paper::from_row,
            )
            .optional()?;
        Ok(paper)
    })
}

/// Finds a paper by the search service's identifier.
pub fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<Paper>, DatabaseError> {
    db.with_conn(|conn| {
        let paper = conn
            .query_row(
                "SELECT * FROM papers WHERE external_id = ?1",
                params![external_id],
                Paper::from_row,
            )
            .optional()?;
        Ok(paper)
    })
}

/// Counts all stored papers.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM papers", [], |r| r.get(0))?;
        Ok(count)
    })
}
