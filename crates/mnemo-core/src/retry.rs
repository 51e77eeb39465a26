// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry with exponential backoff for transient provider errors.
//!
//! Used by ingestion paths only. Interactive retrieval never retries: it
//! falls back immediately so no latency is added to the conversation.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::MnemoError;

/// Run `op` up to `attempts` times, sleeping `base_delay * 2^n` between
/// tries. Non-transient errors (see [`MnemoError::is_transient`]) abort
/// immediately without further attempts.
pub async fn retry_with_backoff<T, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, MnemoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MnemoError>>,
{
    let mut delay = base_delay;
    let mut last_err: Option<MnemoError> = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                if attempt < attempts {
                    warn!(attempt, error = %err, "transient failure, backing off");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| MnemoError::Internal("retry budget of zero".to_string())))
}
