#![forbid(unsafe_code)]

use super::Reconciler;
use crate::session::{DbError, run_bounded, sql};
use recon_core::{DedupPolicy, DedupReport, JoinKey, Row, TableName, Value};
use rusqlite::TransactionBehavior;
use tracing::info;

impl Reconciler<'_> {
    /// Collapses every group of rows sharing the `join_key` values down to one
    /// survivor chosen by `policy`. NULL key values group together.
    pub fn remove_duplicates(
        &mut self,
        table: &TableName,
        join_key: &JoinKey,
        policy: DedupPolicy,
    ) -> Result<DedupReport, DbError> {
        let count = sql::duplicate_group_count(table, join_key);
        let delete = sql::delete_duplicates(table, join_key, policy == DedupPolicy::KeepLast);
        let timeout = self.session.statement_timeout();

        let tx = self
            .session
            .conn_mut()?
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let report = run_bounded(&tx, timeout, |conn| {
            let groups = conn.query_row(&count.text, [], |row| row.get::<_, i64>(0))?;
            if groups == 0 {
                return Ok(DedupReport::default());
            }
            let removed = conn.execute(&delete.text, [])?;
            Ok(DedupReport {
                duplicate_groups: usize::try_from(groups).unwrap_or_default(),
                rows_removed: removed,
            })
        })?;
        tx.commit()?;

        info!(
            %table,
            policy = policy.as_str(),
            groups = report.duplicate_groups,
            removed = report.rows_removed,
            "duplicates removed"
        );
        Ok(report)
    }

    /// Groups of rows that share their `join_key` values, ordered by key and
    /// then rowid. Read-only.
    pub fn find_duplicates(
        &self,
        table: &TableName,
        join_key: &JoinKey,
    ) -> Result<Vec<Vec<Row>>, DbError> {
        let statement = sql::select_duplicates(table, join_key);
        let rows = self.session.query_raw(&statement)?;

        let width = join_key.len();
        let mut groups: Vec<Vec<Row>> = Vec::new();
        let mut current: Option<Vec<Value>> = None;
        for row in rows {
            let mut key = row.into_values();
            let rest = key.split_off(width.min(key.len()));
            if current.as_ref() != Some(&key) {
                groups.push(Vec::new());
                current = Some(key);
            }
            if let Some(group) = groups.last_mut() {
                group.push(Row::new(rest));
            }
        }
        Ok(groups)
    }
}
