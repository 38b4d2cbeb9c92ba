#![forbid(unsafe_code)]

mod config;
mod error;
mod introspect;
mod records;
pub(crate) mod sql;

pub use config::{Location, SessionConfig};
pub use error::{DbError, ErrorKind};
pub(crate) use records::{insert_tx, select_tx, update_tx};

use error::is_interrupted;
use recon_core::{Row, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::config::DbConfig;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use sql::{from_sql_value, to_sql_value};
use std::time::{Duration, Instant};
use tracing::debug;

// Virtual machine steps between deadline checks.
const PROGRESS_STEPS: i32 = 1_000;

/// An open session to one database. The handle is released by [`Session::close`]
/// or, failing that, when the session is dropped.
#[derive(Debug)]
pub struct Session {
    conn: Option<Connection>,
    config: SessionConfig,
}

impl Session {
    pub fn connect(config: SessionConfig) -> Result<Self, DbError> {
        let location = config.location.to_string();
        let connect_err = |source: rusqlite::Error| DbError::Connect {
            location: location.clone(),
            source,
        };

        let conn = match &config.location {
            Location::Memory => Connection::open_in_memory(),
            Location::File(path) => {
                let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
                if config.create_if_missing {
                    flags |= OpenFlags::SQLITE_OPEN_CREATE;
                }
                Connection::open_with_flags(path, flags)
            }
        }
        .map_err(&connect_err)?;

        conn.busy_timeout(config.busy_timeout)
            .map_err(&connect_err)?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)
            .map_err(&connect_err)?;
        // Quoted identifiers must never fall back to string literals, or an
        // unknown column in a filter or key compares against a constant.
        for flag in [DbConfig::SQLITE_DBCONFIG_DQS_DML, DbConfig::SQLITE_DBCONFIG_DQS_DDL] {
            conn.set_db_config(flag, false).map_err(&connect_err)?;
        }
        // A file that is not a database opens fine and only fails on first read.
        conn.query_row("SELECT COUNT(1) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(&connect_err)?;

        debug!(%location, "session opened");
        Ok(Self {
            conn: Some(conn),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Releases the handle. Every later call, including a second `close`,
    /// fails with [`DbError::Closed`].
    pub fn close(&mut self) -> Result<(), DbError> {
        let Some(conn) = self.conn.take() else {
            return Err(DbError::Closed);
        };
        conn.close()
            .map_err(|(_conn, source)| DbError::Close { source })?;
        debug!(location = %self.config.location, "session closed");
        Ok(())
    }

    /// Runs an arbitrary statement with positional parameters (`?1`, `?2`, ...)
    /// and returns the number of affected rows.
    pub fn execute(&mut self, statement: &str, params: &[Value]) -> Result<usize, DbError> {
        let params: Vec<SqlValue> = params.iter().map(to_sql_value).collect();
        let timeout = self.config.statement_timeout;
        debug!(statement, "execute");
        run_bounded(self.conn()?, timeout, |conn| execute_sql(conn, statement, &params))
    }

    /// Runs an arbitrary read and materializes every returned row.
    pub fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        let params: Vec<SqlValue> = params.iter().map(to_sql_value).collect();
        debug!(statement, "query");
        run_bounded(self.conn()?, self.config.statement_timeout, |conn| {
            query_sql(conn, statement, &params)
        })
    }

    pub(crate) fn query_raw(&self, statement: &sql::Sql) -> Result<Vec<Row>, DbError> {
        run_bounded(self.conn()?, self.config.statement_timeout, |conn| {
            query_sql(conn, &statement.text, &statement.params)
        })
    }

    pub(crate) fn conn(&self) -> Result<&Connection, DbError> {
        self.conn.as_ref().ok_or(DbError::Closed)
    }

    pub(crate) fn conn_mut(&mut self) -> Result<&mut Connection, DbError> {
        self.conn.as_mut().ok_or(DbError::Closed)
    }

    pub(crate) fn statement_timeout(&self) -> Option<Duration> {
        self.config.statement_timeout
    }
}

/// Runs `f` under the configured wall-clock budget. SQLite interrupts the
/// running statement once the deadline passes.
pub(crate) fn run_bounded<T>(
    conn: &Connection,
    timeout: Option<Duration>,
    f: impl FnOnce(&Connection) -> Result<T, DbError>,
) -> Result<T, DbError> {
    let Some(timeout) = timeout else {
        return f(conn);
    };

    let started = Instant::now();
    let deadline = started + timeout;
    conn.progress_handler(PROGRESS_STEPS, Some(move || Instant::now() >= deadline));
    let out = f(conn);
    conn.progress_handler(PROGRESS_STEPS, None::<fn() -> bool>);

    match out {
        Err(DbError::Query(err)) if is_interrupted(&err) => Err(DbError::Timeout {
            elapsed: started.elapsed(),
        }),
        other => other,
    }
}

pub(crate) fn execute_sql(
    conn: &Connection,
    statement: &str,
    params: &[SqlValue],
) -> Result<usize, DbError> {
    Ok(conn.execute(statement, params_from_iter(params.iter()))?)
}

pub(crate) fn query_sql(
    conn: &Connection,
    statement: &str,
    params: &[SqlValue],
) -> Result<Vec<Row>, DbError> {
    let mut stmt = conn.prepare(statement)?;
    let width = stmt.column_count();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for index in 0..width {
            values.push(from_sql_value(row.get::<_, SqlValue>(index)?));
        }
        out.push(Row::new(values));
    }

    Ok(out)
}
