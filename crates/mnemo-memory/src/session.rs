// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lock-guarded session reuse.
//!
//! `get_or_create` holds a short TTL lease around its read-check-create
//! sequence so concurrent calls for the same `(owner, kind)` converge on
//! one session. When the lock stays contended past the retry budget the
//! manager falls back to a read-only lookup; only if that also finds
//! nothing does the caller see `LockContended`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use mnemo_config::model::SessionConfig;
use mnemo_core::types::Session;
use mnemo_core::{DistributedLock, MnemoError, SessionStore};

use crate::now_rfc3339;

/// Session lifecycle manager.
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    lock: Arc<dyn DistributedLock>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        lock: Arc<dyn DistributedLock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            lock,
            config,
        }
    }

    /// Return the active session for `(owner_id, kind)`, creating one if
    /// none exists. Reuse touches `last_active_at`.
    pub async fn get_or_create(&self, owner_id: &str, kind: &str) -> Result<Session, MnemoError> {
        // Fast path: an active session needs no lock.
        if let Some(session) = self.sessions.active_session(owner_id, kind).await? {
            return self.touch(session).await;
        }

        let key = lock_key(owner_id, kind);
        let ttl = Duration::from_secs(self.config.lock_ttl_secs);
        let delay = Duration::from_millis(self.config.lock_retry_delay_ms);

        for attempt in 1..=self.config.lock_retry_attempts {
            if let Some(lease) = self.lock.try_acquire(&key, ttl).await? {
                let result = self.create_or_reuse(owner_id, kind).await;
                if let Err(err) = self.lock.release(lease).await {
                    warn!(key, error = %err, "failed to release session lease");
                }
                return result;
            }
            debug!(key, attempt, "session lease contended, retrying");
            tokio::time::sleep(delay).await;
        }

        // Retry budget spent. The holder probably created the session;
        // serve it read-only rather than failing the conversation.
        if let Some(session) = self.sessions.active_session(owner_id, kind).await? {
            return Ok(session);
        }
        Err(MnemoError::LockContended { key })
    }

    /// End the active session for the pair, if any. Returns the ended id.
    pub async fn reset(&self, owner_id: &str, kind: &str) -> Result<Option<String>, MnemoError> {
        match self.sessions.active_session(owner_id, kind).await? {
            Some(session) => {
                self.sessions.end_session(&session.id).await?;
                debug!(session_id = %session.id, owner_id, kind, "session reset");
                Ok(Some(session.id))
            }
            None => Ok(None),
        }
    }

    async fn create_or_reuse(&self, owner_id: &str, kind: &str) -> Result<Session, MnemoError> {
        // Re-check under the lease: a previous holder may have created it.
        if let Some(session) = self.sessions.active_session(owner_id, kind).await? {
            return self.touch(session).await;
        }

        let now = now_rfc3339();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            kind: kind.to_string(),
            created_at: now.clone(),
            last_active_at: now,
        };
        self.sessions.create_session(&session).await?;
        debug!(session_id = %session.id, owner_id, kind, "session created");
        Ok(session)
    }

    async fn touch(&self, mut session: Session) -> Result<Session, MnemoError> {
        let now = now_rfc3339();
        self.sessions.touch_session(&session.id, &now).await?;
        session.last_active_at = now;
        Ok(session)
    }
}

fn lock_key(owner_id: &str, kind: &str) -> String {
    format!("session:{owner_id}:{kind}")
}
