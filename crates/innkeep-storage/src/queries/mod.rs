// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the storage entities.
//!
//! Functions taking `&rusqlite::Connection` run inside a caller-owned
//! transaction; the async functions taking `&Database` are standalone reads
//! and writes.

pub mod audit;
pub mod bookings;
pub mod catalog;
pub mod queue;
