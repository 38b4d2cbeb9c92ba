#![forbid(unsafe_code)]

use crate::json::{filter_from_json, parse_column_spec, row_to_json, value_map_from_json};
use anyhow::{Context, anyhow};
use clap::Subcommand;
use recon_core::{ColumnDef, ColumnName, DedupPolicy, Filter, JoinKey, Row, TableName, UpsertOutcome};
use recon_storage::{Reconciler, Session};
use serde::Serialize;
use serde_json::Value as Json;
use std::io::Write;

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print the database engine version
    Version,

    /// List user tables
    Tables,

    /// Show column metadata of a table
    Columns { table: String },

    /// Dump every row of a table
    Records { table: String },

    /// Create a table with an auto-incrementing surrogate key
    CreateTable {
        table: String,

        /// Column as name:type[:not-null]; repeat for more columns
        #[arg(long = "column", value_parser = parse_column_spec)]
        columns: Vec<ColumnDef>,

        #[arg(long, default_value = "pkey")]
        primary_key: String,
    },

    /// Create an empty table with the structure of another
    CopyTable { source: String, target: String },

    /// Insert one row
    Insert {
        table: String,

        /// JSON object of column -> value
        #[arg(long)]
        values: String,
    },

    /// Update every row matching --where
    Update {
        table: String,

        #[arg(long)]
        values: String,

        /// JSON object of column -> value, combined with AND
        #[arg(long = "where")]
        filter: String,
    },

    /// Print rows matching --where (all rows when omitted)
    Select {
        table: String,

        #[arg(long = "where")]
        filter: Option<String>,
    },

    /// Insert, update, or report ambiguous matches for one record
    Upsert {
        table: String,

        /// Comma separated join key columns
        #[arg(long)]
        key: String,

        #[arg(long)]
        values: String,
    },

    /// Collapse rows sharing the join key to a single survivor
    Dedup {
        table: String,

        #[arg(long)]
        key: String,

        /// Which row survives: first (oldest) or last (newest)
        #[arg(long, default_value = "first")]
        keep: String,

        /// Only list the duplicate groups
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Serialize)]
struct UpsertReport {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous: Option<Json>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    candidates: Vec<Json>,
}

impl From<&UpsertOutcome> for UpsertReport {
    fn from(outcome: &UpsertOutcome) -> Self {
        let mut report = Self {
            outcome: outcome.as_str(),
            row_id: None,
            previous: None,
            candidates: Vec::new(),
        };
        match outcome {
            UpsertOutcome::Inserted { row_id } => report.row_id = Some(*row_id),
            UpsertOutcome::Updated { previous } => report.previous = Some(row_to_json(previous)),
            UpsertOutcome::Ambiguous(rows) => report.candidates = rows.iter().map(row_to_json).collect(),
        }
        report
    }
}

#[derive(Serialize)]
struct DedupOutput {
    policy: &'static str,
    dry_run: bool,
    duplicate_groups: usize,
    rows_removed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    groups: Vec<Vec<Json>>,
}

#[derive(Serialize)]
struct ColumnOutput<'a> {
    name: &'a str,
    declared_type: &'a str,
    not_null: bool,
    primary_key_position: u32,
}

fn table_name(raw: &str) -> anyhow::Result<TableName> {
    TableName::try_new(raw.trim()).with_context(|| format!("table {raw:?}"))
}

fn join_key(raw: &str) -> anyhow::Result<JoinKey> {
    JoinKey::parse(raw).with_context(|| format!("join key {raw:?}"))
}

fn emit(out: &mut impl Write, doc: &impl Serialize) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string(doc)?)?;
    Ok(())
}

fn emit_rows(out: &mut impl Write, rows: &[Row]) -> anyhow::Result<()> {
    for row in rows {
        emit(out, &row_to_json(row))?;
    }
    Ok(())
}

pub(crate) fn run(session: &mut Session, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Version => emit(out, &session.get_version()?),
        Command::Tables => emit(out, &session.get_tables()?),
        Command::Columns { table } => {
            let columns = session.columns(&table_name(&table)?)?;
            for column in &columns {
                emit(
                    out,
                    &ColumnOutput {
                        name: &column.name,
                        declared_type: &column.declared_type,
                        not_null: column.not_null,
                        primary_key_position: column.primary_key_position,
                    },
                )?;
            }
            Ok(())
        }
        Command::Records { table } => {
            let rows = session.get_records(&table_name(&table)?)?;
            emit_rows(out, &rows)
        }
        Command::CreateTable {
            table,
            columns,
            primary_key,
        } => {
            let primary_key = ColumnName::try_new(primary_key.trim())
                .with_context(|| format!("primary key {primary_key:?}"))?;
            session.create_table(&table_name(&table)?, &columns, &primary_key)?;
            emit(out, &serde_json::json!({ "created": table }))
        }
        Command::CopyTable { source, target } => {
            session.copy_table(&table_name(&source)?, &table_name(&target)?)?;
            emit(out, &serde_json::json!({ "created": target, "like": source }))
        }
        Command::Insert { table, values } => {
            let row_id = session.insert_record(&table_name(&table)?, &value_map_from_json(&values)?)?;
            emit(out, &serde_json::json!({ "row_id": row_id }))
        }
        Command::Update {
            table,
            values,
            filter,
        } => {
            let changed = session.update_record(
                &table_name(&table)?,
                &value_map_from_json(&values)?,
                &filter_from_json(&filter)?,
            )?;
            emit(out, &serde_json::json!({ "rows_updated": changed }))
        }
        Command::Select { table, filter } => {
            let filter = match filter {
                Some(raw) => filter_from_json(&raw)?,
                None => Filter::new(),
            };
            let rows = session.select(&table_name(&table)?, &filter)?;
            emit_rows(out, &rows)
        }
        Command::Upsert { table, key, values } => {
            let outcome = Reconciler::new(session).upsert(
                &table_name(&table)?,
                &join_key(&key)?,
                &value_map_from_json(&values)?,
            )?;
            emit(out, &UpsertReport::from(&outcome))
        }
        Command::Dedup {
            table,
            key,
            keep,
            dry_run,
        } => {
            let policy = DedupPolicy::parse(&keep)
                .ok_or_else(|| anyhow!("--keep must be first or last, got {keep:?}"))?;
            let table = table_name(&table)?;
            let key = join_key(&key)?;
            let mut reconciler = Reconciler::new(session);

            let output = if dry_run {
                let groups = reconciler.find_duplicates(&table, &key)?;
                DedupOutput {
                    policy: policy.as_str(),
                    dry_run,
                    duplicate_groups: groups.len(),
                    rows_removed: 0,
                    groups: groups
                        .iter()
                        .map(|group| group.iter().map(row_to_json).collect())
                        .collect(),
                }
            } else {
                let report = reconciler.remove_duplicates(&table, &key, policy)?;
                DedupOutput {
                    policy: policy.as_str(),
                    dry_run,
                    duplicate_groups: report.duplicate_groups,
                    rows_removed: report.rows_removed,
                    groups: Vec::new(),
                }
            };
            emit(out, &output)
        }
    }
}
