// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD operations.

use mnemo_core::types::Session;
use mnemo_core::MnemoError;
use rusqlite::params;

use crate::database::Database;

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: row.get(2)?,
        created_at: row.get(3)?,
        last_active_at: row.get(4)?,
    })
}

/// The active (not ended) session for `(owner_id, kind)`, if any.
pub async fn active_session(
    db: &Database,
    owner_id: &str,
    kind: &str,
) -> Result<Option<Session>, MnemoError> {
    let owner_id = owner_id.to_string();
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Session>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, kind, created_at, last_active_at
                 FROM sessions WHERE owner_id = ?1 AND kind = ?2 AND ended_at IS NULL",
            )?;
            let result = stmt.query_row(params![owner_id, kind], row_to_session);
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session by id, active or ended.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, MnemoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Session>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, kind, created_at, last_active_at
                 FROM sessions WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], row_to_session);
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Create a new session row.
///
/// The partial unique index on `(owner_id, kind) WHERE ended_at IS NULL`
/// rejects a second active session for the same pair; callers hold the
/// session lease when creating, so a constraint hit means a lost race.
pub async fn create_session(db: &Database, session: &Session) -> Result<(), MnemoError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO sessions (id, owner_id, kind, created_at, last_active_at, ended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
                params![
                    session.id,
                    session.owner_id,
                    session.kind,
                    session.created_at,
                    session.last_active_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bump a session's `last_active_at`.
pub async fn touch_session(
    db: &Database,
    id: &str,
    last_active_at: &str,
) -> Result<(), MnemoError> {
    let id = id.to_string();
    let last_active_at = last_active_at.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE sessions SET last_active_at = ?2 WHERE id = ?1",
                params![id, last_active_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// End a session. Ending an already-ended session is a no-op.
pub async fn end_session(db: &Database, id: &str) -> Result<(), MnemoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE sessions
                 SET ended_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND ended_at IS NULL",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove all sessions for an owner. Returns the number removed.
pub async fn delete_owner_sessions(db: &Database, owner_id: &str) -> Result<u64, MnemoError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM sessions WHERE owner_id = ?1",
                params![owner_id],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove sessions whose `last_active_at` predates `cutoff`.
pub async fn delete_sessions_idle_before(
    db: &Database,
    cutoff: &str,
) -> Result<u64, MnemoError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM sessions WHERE last_active_at < ?1",
                params![cutoff],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
