#![forbid(unsafe_code)]

use super::{DbError, Session, execute_sql, query_sql, run_bounded, sql};
use recon_core::{Filter, Row, TableName, ValueMap};
use rusqlite::{Connection, params_from_iter};
use tracing::debug;

impl Session {
    /// Inserts one row and returns its rowid. Committed before returning.
    pub fn insert_record(&mut self, table: &TableName, values: &ValueMap) -> Result<i64, DbError> {
        let timeout = self.statement_timeout();
        run_bounded(self.conn()?, timeout, |conn| insert_tx(conn, table, values))
    }

    /// Overwrites the given columns on every row matching `filter` and returns
    /// how many rows changed. An empty filter matches the whole table.
    pub fn update_record(
        &mut self,
        table: &TableName,
        values: &ValueMap,
        filter: &Filter,
    ) -> Result<usize, DbError> {
        let timeout = self.statement_timeout();
        run_bounded(self.conn()?, timeout, |conn| {
            update_tx(conn, table, values, filter)
        })
    }

    /// All rows matching `filter`, in rowid order, fully materialized.
    pub fn select(&self, table: &TableName, filter: &Filter) -> Result<Vec<Row>, DbError> {
        run_bounded(self.conn()?, self.statement_timeout(), |conn| {
            select_tx(conn, table, filter)
        })
    }

    pub fn count(&self, table: &TableName, filter: &Filter) -> Result<usize, DbError> {
        let statement = sql::count(table, filter)?;
        run_bounded(self.conn()?, self.statement_timeout(), |conn| {
            let count = conn.query_row(
                &statement.text,
                params_from_iter(statement.params.iter()),
                |row| row.get::<_, i64>(0),
            )?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
    }
}

pub(crate) fn insert_tx(
    conn: &Connection,
    table: &TableName,
    values: &ValueMap,
) -> Result<i64, DbError> {
    let statement = sql::insert(table, values)?;
    execute_sql(conn, &statement.text, &statement.params)?;
    let row_id = conn.last_insert_rowid();
    debug!(%table, row_id, "row inserted");
    Ok(row_id)
}

pub(crate) fn update_tx(
    conn: &Connection,
    table: &TableName,
    values: &ValueMap,
    filter: &Filter,
) -> Result<usize, DbError> {
    let statement = sql::update(table, values, filter)?;
    let changed = execute_sql(conn, &statement.text, &statement.params)?;
    debug!(%table, changed, "rows updated");
    Ok(changed)
}

pub(crate) fn select_tx(
    conn: &Connection,
    table: &TableName,
    filter: &Filter,
) -> Result<Vec<Row>, DbError> {
    let statement = sql::select(table, filter)?;
    query_sql(conn, &statement.text, &statement.params)
}
