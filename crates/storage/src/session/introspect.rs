#![forbid(unsafe_code)]

use super::{DbError, Session, execute_sql, run_bounded, sql};
use recon_core::{ColumnDef, ColumnInfo, ColumnName, Filter, Row, TableName};
use rusqlite::params;
use tracing::debug;

impl Session {
    /// Creates `table` with an auto-incrementing integer surrogate key named
    /// `primary_key`, followed by `columns`. Fails if the table exists.
    pub fn create_table(
        &mut self,
        table: &TableName,
        columns: &[ColumnDef],
        primary_key: &ColumnName,
    ) -> Result<(), DbError> {
        let statement = sql::create_table(table, columns, primary_key)?;
        run_bounded(self.conn()?, self.statement_timeout(), |conn| {
            execute_sql(conn, &statement.text, &statement.params)
        })?;
        debug!(%table, columns = columns.len(), "table created");
        Ok(())
    }

    /// Creates an empty `target` with the columns, affinities, not-null flags
    /// and primary key of `source`.
    pub fn copy_table(&mut self, source: &TableName, target: &TableName) -> Result<(), DbError> {
        let columns = self.columns(source)?;
        if columns.is_empty() {
            return Err(DbError::invalid(format!("unknown table: {source}")));
        }
        let statement = sql::create_table_like(target, &columns)?;
        run_bounded(self.conn()?, self.statement_timeout(), |conn| {
            execute_sql(conn, &statement.text, &statement.params)
        })?;
        debug!(%source, %target, "table copied");
        Ok(())
    }

    /// User tables, sorted by name.
    pub fn get_tables(&self) -> Result<Vec<String>, DbError> {
        run_bounded(self.conn()?, self.statement_timeout(), |conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type='table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row.get::<_, String>(0)?);
            }
            Ok(out)
        })
    }

    pub fn table_exists(&self, table: &TableName) -> Result<bool, DbError> {
        let found = run_bounded(self.conn()?, self.statement_timeout(), |conn| {
            Ok(conn.query_row(
                "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?1",
                params![table.as_str()],
                |row| row.get::<_, i64>(0),
            )?)
        })?;
        Ok(found > 0)
    }

    /// Every row of `table`. Meant for small tables: nothing is streamed.
    pub fn get_records(&self, table: &TableName) -> Result<Vec<Row>, DbError> {
        self.select(table, &Filter::new())
    }

    pub fn get_version(&self) -> Result<String, DbError> {
        let version = run_bounded(self.conn()?, self.statement_timeout(), |conn| {
            Ok(conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0))?)
        })?;
        Ok(format!("SQLite {version}"))
    }

    /// Column metadata in table order. Empty when the table does not exist.
    pub fn columns(&self, table: &TableName) -> Result<Vec<ColumnInfo>, DbError> {
        run_bounded(self.conn()?, self.statement_timeout(), |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid ASC",
            )?;
            let mut rows = stmt.query(params![table.as_str()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(ColumnInfo {
                    name: row.get::<_, String>(0)?,
                    declared_type: row.get::<_, String>(1)?,
                    not_null: row.get::<_, i64>(2)? != 0,
                    primary_key_position: u32::try_from(row.get::<_, i64>(3)?)
                        .unwrap_or_default(),
                });
            }
            Ok(out)
        })
    }
}
