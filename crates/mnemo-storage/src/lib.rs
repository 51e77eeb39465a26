// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapters for the Mnemo memory engine.
//!
//! The canonical backend is SQLite ([`SqliteStore`]): durable records with
//! an FTS5 keyword index, sessions, and the lease table backing
//! [`SqliteLeaseLock`]. [`EphemeralStore`] is an in-memory mirror adapter
//! with the same record interface but vector-only querying, and
//! [`InMemoryCache`] backs the short-TTL result cache.

pub mod adapter;
pub mod cache;
pub mod database;
pub mod ephemeral;
pub mod lock;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use cache::InMemoryCache;
pub use database::Database;
pub use ephemeral::EphemeralStore;
pub use lock::SqliteLeaseLock;
