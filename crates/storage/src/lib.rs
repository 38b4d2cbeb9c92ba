#![forbid(unsafe_code)]

//! Session over an embedded SQLite store plus record reconciliation
//! (insert, update, or report ambiguous matches) on top of it.

mod reconcile;
mod session;

pub use reconcile::Reconciler;
pub use session::{DbError, ErrorKind, Location, Session, SessionConfig};

pub use recon_core::{
    ColumnDef, ColumnInfo, ColumnName, ColumnType, CompareOp, Condition, DedupPolicy, DedupReport,
    Filter, JoinKey, Row, TableName, UpsertOutcome, Value, ValueMap,
};
