// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles for the engine crates.
//!
//! Everything here is deterministic: the mock embedder derives vectors
//! from text content alone, so equal texts always land on identical
//! vectors and similarity assertions are stable across runs.

pub mod failing_store;
pub mod mock_embedder;
pub mod mock_rerank;

pub use failing_store::FailingStore;
pub use mock_embedder::{FlakyEmbeddingProvider, MockEmbeddingProvider};
pub use mock_rerank::{MockRerankProvider, RerankBehavior};
