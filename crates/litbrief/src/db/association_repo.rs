//! Association repository for the `paper_brief_associations` table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::paper_repo::{json_column, to_json};
use super::{now_rfc3339, Database, DatabaseError};
use crate::models::{Association, Paper, MAX_SCORE};

impl Association {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let score: Option<i64> = row.get("relevancy_score")?;
        Ok(Self {
            id: row.get("id")?,
            brief_id: row.get("brief_id")?,
            paper_id: row.get("paper_id")?,
            query_texts: json_column(row, "query_texts")?,
            is_selected: row.get("is_selected")?,
            relevancy_score: score.map(|s| s.clamp(0, MAX_SCORE as i64) as u8),
            relevancy_justification: row.get("relevancy_justification")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts an association unless one exists for `(brief_id, paper_id)`.
///
/// New associations start unselected. Returns the association id and whether
/// a row was created; an existing row is left untouched.
pub fn insert_if_absent(
    conn: &Connection,
    brief_id: &str,
    paper_id: i64,
    query_texts: &[String],
    relevancy_score: Option<u8>,
    now: &str,
) -> Result<(i64, bool), DatabaseError> {
    let query_texts = to_json(&query_texts, "query_texts")?;

    let inserted = conn.execute(
        "INSERT INTO paper_brief_associations (brief_id, paper_id, query_texts, is_selected,
         relevancy_score, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)
         ON CONFLICT(brief_id, paper_id) DO NOTHING",
        params![brief_id, paper_id, query_texts, relevancy_score, now],
    )?;

    let id: i64 = conn.query_row(
        "SELECT id FROM paper_brief_associations WHERE brief_id = ?1 AND paper_id = ?2",
        params![brief_id, paper_id],
        |r| r.get(0),
    )?;

    Ok((id, inserted == 1))
}

/// Finds the association for a brief/paper pair.
pub fn find(
    db: &Database,
    brief_id: &str,
    paper_id: i64,
) -> Result<Option<Association>, DatabaseError> {
    db.with_conn(|conn| {
        let association = conn
            .query_row(
                "SELECT * FROM paper_brief_associations WHERE brief_id = ?1 AND paper_id = ?2",
                params![brief_id, paper_id],
                Association::from_row,
            )
            .optional()?;
        Ok(association)
    })
}

/// Lists all associations of a brief, oldest first.
pub fn list_for_brief(db: &Database, brief_id: &str) -> Result<Vec<Association>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM paper_brief_associations WHERE brief_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![brief_id], Association::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists a brief's papers joined with their association, oldest association first.
pub fn list_papers_for_brief(
    db: &Database,
    brief_id: &str,
) -> Result<Vec<(Paper, Association)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT a.id AS a_id, a.brief_id, a.paper_id, a.query_texts, a.is_selected,
                    a.relevancy_score, a.relevancy_justification,
                    a.created_at AS a_created_at, a.updated_at AS a_updated_at,
                    p.*
             FROM paper_brief_associations a
             JOIN papers p ON p.id = a.paper_id
             WHERE a.brief_id = ?1
             ORDER BY a.id ASC",
        )?;
        let rows = stmt
            .query_map(params![brief_id], |row| {
                let paper = Paper::from_row(row)?;
                let score: Option<i64> = row.get("relevancy_score")?;
                let association = Association {
                    id: row.get("a_id")?,
                    brief_id: row.get("brief_id")?,
                    paper_id: row.get("paper_id")?,
                    query_texts: json_column(row, "query_texts")?,
                    is_selected: row.get("is_selected")?,
                    relevancy_score: score.map(|s| s.clamp(0, MAX_SCORE as i64) as u8),
                    relevancy_justification: row.get("relevancy_justification")?,
                    created_at: row.get("a_created_at")?,
                    updated_at: row.get("a_updated_at")?,
                };
                Ok((paper, association))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Sets the relevancy score and justification. Returns false if no association matched.
pub fn update_relevancy(
    db: &Database,
    brief_id: &str,
    paper_id: i64,
    score: u8,
    justification: &str,
) -> Result<bool, DatabaseError> {
    if score > MAX_SCORE {
        return Err(DatabaseError::InvalidValue {
            column: "relevancy_score",
            value: score.to_string(),
        });
    }
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE paper_brief_associations
             SET relevancy_score = ?3, relevancy_justification = ?4, updated_at = ?5
             WHERE brief_id = ?1 AND paper_id = ?2",
            params![brief_id, paper_id, score, justification, now_rfc3339()],
        )?;
        Ok(updated == 1)
    })
}

/// Sets the user-controlled selection flag. Returns false if no association matched.
pub fn set_selected(
    db: &Database,
    brief_id: &str,
    paper_id: i64,
    selected: bool,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE paper_brief_associations SET is_selected = ?3, updated_at = ?4
             WHERE brief_id = ?1 AND paper_id = ?2",
            params![brief_id, paper_id, selected, now_rfc3339()],
        )?;
        Ok(updated == 1)
    })
}

/// Counts the associations of a brief.
pub fn count_for_brief(db: &Database, brief_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM paper_brief_associations WHERE brief_id = ?1",
            params![brief_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::paper_repo;
    use crate::models::paper::sample_candidate;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn seed_paper(db: &Database, external_id: &str) -> i64 {
        db.with_conn(|conn| {
            paper_repo::insert_if_absent(
                conn,
                &sample_candidate(external_id, "ti:test"),
                "2026-01-01T00:00:00Z",
            )
        })
        .unwrap()
        .0
    }

    fn associate(db: &Database, brief_id: &str, paper_id: i64) -> (i64, bool) {
        db.with_conn(|conn| {
            insert_if_absent(
                conn,
                brief_id,
                paper_id,
                &["ti:test".to_string()],
                None,
                "2026-01-01T00:00:00Z",
            )
        })
        .unwrap()
    }

    #[test]
    fn test_insert_if_absent_is_unique_per_pair() {
        let db = test_db();
        let paper_id = seed_paper(&db, "1706.03762");

        let (first, created_first) = associate(&db, "brief-1", paper_id);
        let (second, created_second) = associate(&db, "brief-1", paper_id);
        let (_, created_other_brief) = associate(&db, "brief-2", paper_id);

        assert!(created_first);
        assert!(!created_second);
        assert!(created_other_brief);
        assert_eq!(first, second);
        assert_eq!(count_for_brief(&db, "brief-1").unwrap(), 1);
        assert_eq!(count_for_brief(&db, "brief-2").unwrap(), 1);
    }

    #[test]
    fn test_new_association_defaults() {
        let db = test_db();
        let paper_id = seed_paper(&db, "1706.03762");
        associate(&db, "brief-1", paper_id);

        let found = find(&db, "brief-1", paper_id).unwrap().unwrap();
        assert!(!found.is_selected);
        assert!(found.relevancy_score.is_none());
        assert!(found.relevancy_justification.is_none());
        assert_eq!(found.query_texts, vec!["ti:test".to_string()]);
    }

    #[test]
    fn test_update_relevancy() {
        let db = test_db();
        let paper_id = seed_paper(&db, "1706.03762");
        associate(&db, "brief-1", paper_id);

        assert!(update_relevancy(&db, "brief-1", paper_id, 87, "Directly on topic").unwrap());
        assert!(!update_relevancy(&db, "brief-1", paper_id + 1, 50, "missing").unwrap());

        let found = find(&db, "brief-1", paper_id).unwrap().unwrap();
        assert_eq!(found.relevancy_score, Some(87));
        assert_eq!(
            found.relevancy_justification.as_deref(),
            Some("Directly on topic")
        );
    }

    #[test]
    fn test_update_relevancy_rejects_out_of_range() {
        let db = test_db();
        let paper_id = seed_paper(&db, "1706.03762");
        associate(&db, "brief-1", paper_id);

        let result = update_relevancy(&db, "brief-1", paper_id, 150, "too high");
        assert!(matches!(result, Err(DatabaseError::InvalidValue { .. })));
    }

    #[test]
    fn test_set_selected_survives_rescoring_and_reinsert() {
        let db = test_db();
        let paper_id = seed_paper(&db, "1706.03762");
        associate(&db, "brief-1", paper_id);

        assert!(set_selected(&db, "brief-1", paper_id, true).unwrap());
        update_relevancy(&db, "brief-1", paper_id, 40, "ok").unwrap();
        associate(&db, "brief-1", paper_id);

        let found = find(&db, "brief-1", paper_id).unwrap().unwrap();
        assert!(found.is_selected);
        assert_eq!(found.relevancy_score, Some(40));
    }

    #[test]
    fn test_list_papers_for_brief_joins() {
        let db = test_db();
        let a = seed_paper(&db, "1111.11111");
        let b = seed_paper(&db, "2222.22222");
        seed_paper(&db, "3333.33333");
        associate(&db, "brief-1", a);
        associate(&db, "brief-1", b);

        let rows = list_papers_for_brief(&db, "brief-1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0.external_id, "1111.11111");
        assert_eq!(rows[0].1.paper_id, a);
        assert_eq!(rows[1].0.external_id, "2222.22222");
        assert_eq!(list_for_brief(&db, "brief-1").unwrap().len(), 2);
    }
}
