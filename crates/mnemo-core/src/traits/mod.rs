// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Mnemo plugin architecture.
//!
//! Storage and embedding adapters extend the [`PluginAdapter`] base trait;
//! the lighter consumed interfaces (lock, cache, rerank) stand alone. All
//! use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod cache;
pub mod embedding;
pub mod lock;
pub mod rerank;
pub mod store;

// Re-export all traits at the traits module level for convenience.
pub use adapter::PluginAdapter;
pub use cache::EphemeralCache;
pub use embedding::EmbeddingProvider;
pub use lock::DistributedLock;
pub use rerank::RerankProvider;
pub use store::{MemoryStoreAdapter, SessionStore};
