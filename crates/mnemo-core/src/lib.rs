// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mnemo memory engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Mnemo workspace. Storage backends,
//! embedding providers, rerankers, locks, and caches all implement traits
//! defined here.

pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MnemoError;
pub use types::{AdapterType, HealthStatus};

// Re-export all adapter traits at crate root.
pub use traits::{
    DistributedLock, EmbeddingProvider, EphemeralCache, MemoryStoreAdapter, PluginAdapter,
    RerankProvider, SessionStore,
};
