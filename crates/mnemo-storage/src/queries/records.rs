// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory record operations: upserts, merges, lookups, candidate queries,
//! and erasure.

use mnemo_core::types::{
    blob_to_vec, cosine_similarity, vec_to_blob, MemoryRecord, RetrievalFilters,
    ScoredCandidate,
};
use mnemo_core::MnemoError;
use rusqlite::params;

use crate::database::Database;

const RECORD_COLUMNS: &str = "id, owner_id, session_id, redacted_text, embedding, \
     provider_id, occurrences, metadata, created_at, last_seen_at, source_turn_id";

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let blob: Vec<u8> = row.get(4)?;
    let metadata: Option<String> = row.get(7)?;
    Ok(MemoryRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        session_id: row.get(2)?,
        redacted_text: row.get(3)?,
        embedding: blob_to_vec(&blob),
        provider_id: row.get(5)?,
        occurrences: row.get(6)?,
        metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.get(8)?,
        last_seen_at: row.get(9)?,
        source_turn_id: row.get(10)?,
    })
}

/// Insert or update a record by id. The update path keeps the rowid stable
/// so the FTS triggers fire as an update rather than a delete and insert.
pub async fn persist(db: &Database, record: &MemoryRecord) -> Result<(), MnemoError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO records (id, owner_id, session_id, redacted_text, embedding,
                                      provider_id, occurrences, metadata, created_at,
                                      last_seen_at, source_turn_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                     redacted_text = excluded.redacted_text,
                     embedding = excluded.embedding,
                     provider_id = excluded.provider_id,
                     occurrences = excluded.occurrences,
                     metadata = excluded.metadata,
                     last_seen_at = excluded.last_seen_at",
                params![
                    record.id,
                    record.owner_id,
                    record.session_id,
                    record.redacted_text,
                    vec_to_blob(&record.embedding),
                    record.provider_id,
                    record.occurrences,
                    record.metadata.as_ref().map(|m| m.to_string()),
                    record.created_at,
                    record.last_seen_at,
                    record.source_turn_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bump a record's occurrence count and extend its `last_seen_at`.
pub async fn merge_occurrence(
    db: &Database,
    record_id: &str,
    last_seen_at: &str,
) -> Result<(), MnemoError> {
    let record_id = record_id.to_string();
    let last_seen_at = last_seen_at.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE records SET occurrences = occurrences + 1, last_seen_at = ?2
                 WHERE id = ?1",
                params![record_id, last_seen_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one record by id.
pub async fn get(db: &Database, record_id: &str) -> Result<Option<MemoryRecord>, MnemoError> {
    let record_id = record_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<MemoryRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![record_id], row_to_record);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Batch fetch by id, preserving input order. Missing ids are skipped.
pub async fn get_many(
    db: &Database,
    record_ids: &[String],
) -> Result<Vec<MemoryRecord>, MnemoError> {
    let record_ids = record_ids.to_vec();
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"
            ))?;
            let mut records = Vec::with_capacity(record_ids.len());
            for id in &record_ids {
                match stmt.query_row(params![id], row_to_record) {
                    Ok(record) => records.push(record),
                    Err(rusqlite::Error::QueryReturnedNoRows) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The owner's most recent records, newest first.
pub async fn recent(
    db: &Database,
    owner_id: &str,
    limit: usize,
) -> Result<Vec<MemoryRecord>, MnemoError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM records WHERE owner_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
            ))?;
            let rows = stmt.query_map(params![owner_id], row_to_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Owner-scoped hybrid candidate query.
///
/// Two passes over the same connection: a vector pass scanning the owner's
/// embeddings with cosine scoring in process, and a bm25 pass over the FTS5
/// index. The owner filter is part of every SQL statement; rows outside the
/// owner scope never leave the database layer.
pub async fn hybrid_candidates(
    db: &Database,
    owner_id: &str,
    vector: &[f32],
    lexical_query: &str,
    k: usize,
    filters: &RetrievalFilters,
) -> Result<Vec<ScoredCandidate>, MnemoError> {
    let owner_id = owner_id.to_string();
    let vector = vector.to_vec();
    let match_expr = fts_match_expr(lexical_query);
    let session_id = filters.session_id.clone();
    let since = filters.since.clone();

    db.connection()
        .call(move |conn| -> Result<Vec<ScoredCandidate>, rusqlite::Error> {
            // Vector pass: cosine over the owner's stored embeddings.
            let mut sql = String::from(
                "SELECT id, embedding, created_at FROM records WHERE owner_id = ?",
            );
            let mut args: Vec<String> = vec![owner_id.clone()];
            if let Some(s) = &session_id {
                sql.push_str(" AND session_id = ?");
                args.push(s.clone());
            }
            if let Some(s) = &since {
                sql.push_str(" AND created_at >= ?");
                args.push(s.clone());
            }

            let mut scored: Vec<(String, f32, String)> = Vec::new();
            {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), |row| {
                    let id: String = row.get(0)?;
                    let blob: Vec<u8> = row.get(1)?;
                    let created_at: String = row.get(2)?;
                    Ok((id, blob, created_at))
                })?;
                for row in rows {
                    let (id, blob, created_at) = row?;
                    let score = cosine_similarity(&vector, &blob_to_vec(&blob));
                    scored.push((id, score, created_at));
                }
            }
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

            let mut candidates: Vec<ScoredCandidate> = scored
                .iter()
                .take(k)
                .map(|(id, score, created_at)| ScoredCandidate {
                    id: id.clone(),
                    vector_score: *score,
                    lexical_score: None,
                    created_at: created_at.clone(),
                })
                .collect();

            // Lexical pass: bm25 over the FTS5 index (more negative is more
            // relevant), same owner scope and filters.
            if let Some(expr) = match_expr {
                let mut sql = String::from(
                    "SELECT r.id, bm25(records_fts) FROM records_fts
                     JOIN records r ON r.rowid = records_fts.rowid
                     WHERE records_fts MATCH ? AND r.owner_id = ?",
                );
                let mut args: Vec<String> = vec![expr, owner_id.clone()];
                if let Some(s) = &session_id {
                    sql.push_str(" AND r.session_id = ?");
                    args.push(s.clone());
                }
                if let Some(s) = &since {
                    sql.push_str(" AND r.created_at >= ?");
                    args.push(s.clone());
                }
                sql.push_str(&format!(" ORDER BY bm25(records_fts) LIMIT {k}"));

                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), |row| {
                    let id: String = row.get(0)?;
                    let score: f64 = row.get(1)?;
                    Ok((id, score))
                })?;
                for row in rows {
                    let (id, lexical) = row?;
                    if let Some(existing) = candidates.iter_mut().find(|c| c.id == id) {
                        existing.lexical_score = Some(lexical);
                    } else if let Some((_, vector_score, created_at)) =
                        scored.iter().find(|(sid, _, _)| sid == &id)
                    {
                        candidates.push(ScoredCandidate {
                            id,
                            vector_score: *vector_score,
                            lexical_score: Some(lexical),
                            created_at: created_at.clone(),
                        });
                    }
                }
            }

            Ok(candidates)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Records created within `range` for one session, oldest first.
pub async fn records_for_session(
    db: &Database,
    session_id: &str,
    since: Option<String>,
    until: Option<String>,
) -> Result<Vec<MemoryRecord>, MnemoError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryRecord>, rusqlite::Error> {
            let mut sql = format!(
                "SELECT {RECORD_COLUMNS} FROM records WHERE session_id = ?"
            );
            let mut args: Vec<String> = vec![session_id];
            if let Some(s) = since {
                sql.push_str(" AND created_at >= ?");
                args.push(s);
            }
            if let Some(u) = until {
                sql.push_str(" AND created_at < ?");
                args.push(u);
            }
            sql.push_str(" ORDER BY created_at ASC, rowid ASC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), row_to_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Rewrite a record's text, embedding, and provider identity in place.
pub async fn update_embedding(
    db: &Database,
    record_id: &str,
    redacted_text: &str,
    embedding: &[f32],
    provider_id: &str,
) -> Result<(), MnemoError> {
    let record_id = record_id.to_string();
    let redacted_text = redacted_text.to_string();
    let blob = vec_to_blob(embedding);
    let provider_id = provider_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE records SET redacted_text = ?2, embedding = ?3, provider_id = ?4
                 WHERE id = ?1",
                params![record_id, redacted_text, blob, provider_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete one record. Absent ids are a no-op.
pub async fn delete(db: &Database, record_id: &str) -> Result<(), MnemoError> {
    let record_id = record_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM records WHERE id = ?1", params![record_id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every record belonging to an owner. Returns the number removed.
pub async fn delete_owner(db: &Database, owner_id: &str) -> Result<u64, MnemoError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let n = conn.execute("DELETE FROM records WHERE owner_id = ?1", params![owner_id])?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete records created before `cutoff`. Returns the number removed.
pub async fn delete_older_than(db: &Database, cutoff: &str) -> Result<u64, MnemoError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM records WHERE created_at < ?1",
                params![cutoff],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Turn free text into a safe FTS5 MATCH expression: quoted alphanumeric
/// tokens OR-joined. Returns `None` when no tokens survive.
pub(crate) fn fts_match_expr(input: &str) -> Option<String> {
    let tokens: Vec<String> = input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" OR "))
    }
}
