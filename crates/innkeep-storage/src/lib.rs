// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Innkeep reservation engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed queries for the room
//! catalog, bookings, the append-only audit log, and a durable work queue.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{Database, flatten_call_err, is_overlap_violation, map_tr_err, sql_err};
pub use models::*;
