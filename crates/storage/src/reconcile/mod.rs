#![forbid(unsafe_code)]

mod dedup;

use crate::session::{DbError, Session, insert_tx, run_bounded, select_tx, update_tx};
use recon_core::{Filter, JoinKey, TableName, UpsertOutcome, ValueMap};
use rusqlite::{Connection, TransactionBehavior};
use tracing::{info, warn};

/// Insert-or-update-or-report over a borrowed [`Session`]. Holds no state of
/// its own; every call is a fresh read-then-act cycle.
#[derive(Debug)]
pub struct Reconciler<'s> {
    session: &'s mut Session,
}

impl<'s> Reconciler<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    /// Writes `values` as one logical record of `table`, identified by the
    /// `join_key` columns:
    ///
    /// * no matching row: the row is inserted,
    /// * exactly one: that row is updated with every column in `values`,
    /// * two or more: nothing is written and the matches are returned.
    ///
    /// The match and the write run in one `BEGIN IMMEDIATE` transaction, so
    /// writers on other connections cannot slip in between them.
    pub fn upsert(
        &mut self,
        table: &TableName,
        join_key: &JoinKey,
        values: &ValueMap,
    ) -> Result<UpsertOutcome, DbError> {
        let filter = join_key.equality_filter(values)?;
        let timeout = self.session.statement_timeout();

        let tx = self
            .session
            .conn_mut()?
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = run_bounded(&tx, timeout, |conn| {
            decide_and_apply(conn, table, values, &filter)
        })?;
        tx.commit()?;

        match &outcome {
            UpsertOutcome::Ambiguous(candidates) => warn!(
                %table,
                candidates = candidates.len(),
                "join key matched several rows; nothing written"
            ),
            other => info!(%table, outcome = other.as_str(), "upsert applied"),
        }
        Ok(outcome)
    }
}

fn decide_and_apply(
    conn: &Connection,
    table: &TableName,
    values: &ValueMap,
    filter: &Filter,
) -> Result<UpsertOutcome, DbError> {
    let mut candidates = select_tx(conn, table, filter)?;
    if candidates.len() > 1 {
        return Ok(UpsertOutcome::Ambiguous(candidates));
    }

    match candidates.pop() {
        None => {
            let row_id = insert_tx(conn, table, values)?;
            Ok(UpsertOutcome::Inserted { row_id })
        }
        Some(previous) => {
            let changed = update_tx(conn, table, values, filter)?;
            if changed != 1 {
                return Err(DbError::UnexpectedRowCount {
                    expected: 1,
                    actual: changed,
                });
            }
            Ok(UpsertOutcome::Updated { previous })
        }
    }
}
