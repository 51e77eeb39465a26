// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lease table operations backing the SQLite lock.
//!
//! A lease row is `(key, token, expires_at)`. Acquisition is a single
//! upsert whose conflict arm only fires when the existing lease has
//! expired, so the whole acquire is atomic under SQLite's single-writer
//! model.

use mnemo_core::MnemoError;
use rusqlite::params;

use crate::database::Database;

/// Try to write a lease for `key`. Returns `true` when the lease was
/// acquired (fresh insert or takeover of an expired lease).
pub async fn try_acquire(
    db: &Database,
    key: &str,
    token: &str,
    ttl_secs: u64,
) -> Result<bool, MnemoError> {
    let key = key.to_string();
    let token = token.to_string();
    let ttl_modifier = format!("+{ttl_secs} seconds");
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT INTO leases (key, token, expires_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3))
                 ON CONFLICT(key) DO UPDATE SET
                     token = excluded.token,
                     expires_at = excluded.expires_at
                 WHERE leases.expires_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![key, token, ttl_modifier],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete the lease if it is still held under `token`. A stolen or expired
/// lease deletes nothing, which is fine.
pub async fn release(db: &Database, key: &str, token: &str) -> Result<(), MnemoError> {
    let key = key.to_string();
    let token = token.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM leases WHERE key = ?1 AND token = ?2",
                params![key, token],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
