// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PII detection and redaction for the Mnemo memory engine.
//!
//! Every piece of conversational text passes through [`redact::PiiRedactor`]
//! before it is embedded, persisted, or logged. Redaction is deterministic
//! and idempotent, so re-running a stored record through the redactor is a
//! no-op.

pub mod redact;

pub use redact::{PiiKind, PiiRedactor, Redaction};
