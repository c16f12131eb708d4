// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The booking engine handle and its transaction plumbing.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::clock::local_date;
use innkeep_core::{BookingError, Clock, LoyaltyLedger};
use innkeep_storage::{Database, flatten_call_err, sql_err};
use rusqlite::{Transaction, TransactionBehavior};
use tokio::sync::Notify;

/// Entry point for all booking operations.
///
/// Cheap to clone; clones share the database writer, collaborators, and the
/// verification wakeup signal.
#[derive(Clone)]
pub struct BookingEngine {
    pub(crate) db: Database,
    pub(crate) ledger: Arc<dyn LoyaltyLedger>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) policy: crate::BookingPolicy,
    pub(crate) verification_ready: Arc<Notify>,
}

impl BookingEngine {
    pub fn new(
        db: Database,
        ledger: Arc<dyn LoyaltyLedger>,
        clock: Arc<dyn Clock>,
        policy: crate::BookingPolicy,
    ) -> Self {
        Self {
            db,
            ledger,
            clock,
            policy,
            verification_ready: Arc::new(Notify::new()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn policy(&self) -> &crate::BookingPolicy {
        &self.policy
    }

    /// Signalled whenever a verification job is enqueued.
    pub fn verification_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.verification_ready)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today's date in the hotel's timezone.
    pub fn today(&self) -> NaiveDate {
        local_date(self.clock.now(), self.policy.utc_offset_minutes)
    }

    /// Run `f` inside one immediate transaction. Any error rolls back.
    pub(crate) async fn write<T, F>(&self, f: F) -> Result<T, BookingError>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T, BookingError> + Send + 'static,
    {
        self.db
            .connection()
            .call(move |conn| -> Result<T, BookingError> {
                let tx = conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .map_err(sql_err)?;
                let value = f(&tx)?;
                tx.commit().map_err(sql_err)?;
                Ok(value)
            })
            .await
            .map_err(flatten_call_err)
    }

    /// Run a read-only closure on the storage thread.
    pub(crate) async fn read<T, F>(&self, f: F) -> Result<T, BookingError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, BookingError> + Send + 'static,
    {
        self.db
            .connection()
            .call(move |conn| -> Result<T, BookingError> { f(conn) })
            .await
            .map_err(flatten_call_err)
    }
}
