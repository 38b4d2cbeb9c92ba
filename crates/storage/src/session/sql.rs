#![forbid(unsafe_code)]

use super::error::DbError;
use recon_core::{
    ColumnDef, ColumnInfo, ColumnName, ColumnType, CompareOp, Filter, JoinKey, TableName, Value,
    ValueMap,
};
use rusqlite::types::Value as SqlValue;
use std::collections::BTreeSet;

/// Statement text plus its positional parameters.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Sql {
    pub text: String,
    pub params: Vec<SqlValue>,
}

pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Blob(v) => SqlValue::Blob(v.clone()),
    }
}

pub(crate) fn from_sql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Integer(v),
        SqlValue::Real(v) => Value::Real(v),
        SqlValue::Text(v) => Value::Text(v),
        SqlValue::Blob(v) => Value::Blob(v),
    }
}

fn bind(params: &mut Vec<SqlValue>, value: &Value) -> String {
    params.push(to_sql_value(value));
    format!("?{}", params.len())
}

fn render_filter(filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String, DbError> {
    filter.validate()?;
    let mut clauses = Vec::with_capacity(filter.conditions().len());
    for condition in filter.conditions() {
        let column = condition.column.quoted();
        let clause = match (condition.op, &condition.value) {
            (CompareOp::Eq, Value::Null) => format!("{column} IS NULL"),
            (CompareOp::NotEq, Value::Null) => format!("{column} IS NOT NULL"),
            (op, value) => format!("{column} {} {}", op.as_sql(), bind(params, value)),
        };
        clauses.push(clause);
    }
    Ok(clauses.join(" AND "))
}

fn where_clause(filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String, DbError> {
    let rendered = render_filter(filter, params)?;
    if rendered.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {rendered}"))
    }
}

fn column_list<'a>(columns: impl Iterator<Item = &'a ColumnName>) -> String {
    columns
        .map(ColumnName::quoted)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn insert(table: &TableName, values: &ValueMap) -> Result<Sql, DbError> {
    if values.is_empty() {
        return Err(DbError::invalid("value map must not be empty"));
    }
    let mut params = Vec::with_capacity(values.len());
    let placeholders = values
        .values()
        .map(|value| bind(&mut params, value))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(Sql {
        text: format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            table.quoted(),
            column_list(values.columns()),
        ),
        params,
    })
}

pub(crate) fn update(table: &TableName, values: &ValueMap, filter: &Filter) -> Result<Sql, DbError> {
    if values.is_empty() {
        return Err(DbError::invalid("value map must not be empty"));
    }
    let mut params = Vec::with_capacity(values.len() + filter.conditions().len());
    let assignments = values
        .iter()
        .map(|(column, value)| format!("{} = {}", column.quoted(), bind(&mut params, value)))
        .collect::<Vec<_>>()
        .join(", ");
    let where_sql = where_clause(filter, &mut params)?;
    Ok(Sql {
        text: format!("UPDATE {} SET {assignments}{where_sql}", table.quoted()),
        params,
    })
}

pub(crate) fn select(table: &TableName, filter: &Filter) -> Result<Sql, DbError> {
    let mut params = Vec::with_capacity(filter.conditions().len());
    let where_sql = where_clause(filter, &mut params)?;
    Ok(Sql {
        text: format!("SELECT * FROM {}{where_sql} ORDER BY rowid", table.quoted()),
        params,
    })
}

pub(crate) fn count(table: &TableName, filter: &Filter) -> Result<Sql, DbError> {
    let mut params = Vec::with_capacity(filter.conditions().len());
    let where_sql = where_clause(filter, &mut params)?;
    Ok(Sql {
        text: format!("SELECT COUNT(1) FROM {}{where_sql}", table.quoted()),
        params,
    })
}

pub(crate) fn create_table(
    table: &TableName,
    columns: &[ColumnDef],
    primary_key: &ColumnName,
) -> Result<Sql, DbError> {
    let mut seen = BTreeSet::new();
    seen.insert(primary_key.as_str().to_ascii_lowercase());

    let mut parts = vec![format!(
        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
        primary_key.quoted()
    )];
    for column in columns {
        if !seen.insert(column.name.as_str().to_ascii_lowercase()) {
            return Err(DbError::invalid(format!(
                "duplicate column name: {}",
                column.name
            )));
        }
        parts.push(column_def(&column.name, column.ty, column.not_null));
    }

    Ok(Sql {
        text: format!("CREATE TABLE {} ({})", table.quoted(), parts.join(", ")),
        params: Vec::new(),
    })
}

fn column_def(name: &ColumnName, ty: ColumnType, not_null: bool) -> String {
    let mut out = format!("{} {}", name.quoted(), ty.as_sql());
    if not_null {
        out.push_str(" NOT NULL");
    }
    out
}

/// Rebuilds a table definition from introspected column metadata. Declared
/// types are normalized to their affinity, never copied verbatim.
pub(crate) fn create_table_like(target: &TableName, columns: &[ColumnInfo]) -> Result<Sql, DbError> {
    if columns.is_empty() {
        return Err(DbError::invalid("source table has no columns"));
    }

    let mut key: Vec<(u32, ColumnName, ColumnType)> = Vec::new();
    let mut parts = Vec::with_capacity(columns.len() + 1);
    for info in columns {
        let name = ColumnName::try_new(info.name.as_str())?;
        let ty = ColumnType::from_declared(&info.declared_type);
        if info.primary_key_position > 0 {
            key.push((info.primary_key_position, name.clone(), ty));
        }
        parts.push((name, ty, info.not_null));
    }
    key.sort_by_key(|(position, _, _)| *position);

    let single_integer_key = match key.as_slice() {
        [(_, name, ColumnType::Integer)] => Some(name.clone()),
        _ => None,
    };

    let mut rendered = Vec::with_capacity(parts.len() + 1);
    for (name, ty, not_null) in &parts {
        let mut def = column_def(name, *ty, *not_null);
        if single_integer_key.as_ref() == Some(name) {
            def.push_str(" PRIMARY KEY");
        }
        rendered.push(def);
    }
    if single_integer_key.is_none() && !key.is_empty() {
        rendered.push(format!(
            "PRIMARY KEY ({})",
            column_list(key.iter().map(|(_, name, _)| name))
        ));
    }

    Ok(Sql {
        text: format!("CREATE TABLE {} ({})", target.quoted(), rendered.join(", ")),
        params: Vec::new(),
    })
}

fn group_by(key: &JoinKey) -> String {
    column_list(key.columns().iter())
}

pub(crate) fn duplicate_group_count(table: &TableName, key: &JoinKey) -> Sql {
    Sql {
        text: format!(
            "SELECT COUNT(1) FROM (SELECT 1 FROM {} GROUP BY {} HAVING COUNT(1) > 1)",
            table.quoted(),
            group_by(key),
        ),
        params: Vec::new(),
    }
}

pub(crate) fn delete_duplicates(table: &TableName, key: &JoinKey, keep_last: bool) -> Sql {
    let survivor = if keep_last { "MAX" } else { "MIN" };
    Sql {
        text: format!(
            "DELETE FROM {table} WHERE rowid NOT IN (SELECT {survivor}(rowid) FROM {table} GROUP BY {})",
            group_by(key),
            table = table.quoted(),
        ),
        params: Vec::new(),
    }
}

/// Selects every row that shares its key with another row. The key columns are
/// repeated in front of the full row so callers can split groups.
pub(crate) fn select_duplicates(table: &TableName, key: &JoinKey) -> Sql {
    let key_prefix = key
        .columns()
        .iter()
        .map(|column| format!("t.{}", column.quoted()))
        .collect::<Vec<_>>();
    let same_key = key
        .columns()
        .iter()
        .map(|column| format!("d.{col} IS t.{col}", col = column.quoted()))
        .collect::<Vec<_>>()
        .join(" AND ");
    Sql {
        text: format!(
            "SELECT {prefix}, t.* FROM {table} AS t \
             WHERE EXISTS (SELECT 1 FROM {table} AS d WHERE d.rowid <> t.rowid AND {same_key}) \
             ORDER BY {prefix}, t.rowid",
            prefix = key_prefix.join(", "),
            table = table.quoted(),
        ),
        params: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> TableName {
        TableName::try_new(name).unwrap()
    }

    fn col(name: &str) -> ColumnName {
        ColumnName::try_new(name).unwrap()
    }

    #[test]
    fn insert_binds_every_value() {
        let values = ValueMap::try_from_pairs([
            ("name", Value::from("A'; DROP TABLE station; --")),
            ("year", Value::from(2020)),
        ])
        .unwrap();
        let sql = insert(&table("station"), &values).unwrap();
        assert_eq!(
            sql.text,
            "INSERT INTO \"station\" (\"name\", \"year\") VALUES (?1, ?2)"
        );
        assert_eq!(
            sql.params,
            vec![
                SqlValue::Text("A'; DROP TABLE station; --".to_string()),
                SqlValue::Integer(2020)
            ]
        );
    }

    #[test]
    fn insert_rejects_empty_value_map() {
        let err = insert(&table("station"), &ValueMap::new()).unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn update_numbers_set_then_where_params() {
        let values = ValueMap::try_from_pairs([("temp", 7.5)]).unwrap();
        let filter = Filter::new()
            .equals(col("name"), "A")
            .equals(col("year"), 2020)
            .equals(col("note"), Value::Null);
        let sql = update(&table("station"), &values, &filter).unwrap();
        assert_eq!(
            sql.text,
            "UPDATE \"station\" SET \"temp\" = ?1 WHERE \"name\" = ?2 AND \"year\" = ?3 AND \"note\" IS NULL"
        );
        assert_eq!(sql.params.len(), 3);
    }

    #[test]
    fn select_without_conditions_has_no_where() {
        let sql = select(&table("station"), &Filter::new()).unwrap();
        assert_eq!(sql.text, "SELECT * FROM \"station\" ORDER BY rowid");
        assert!(sql.params.is_empty());

        let filter = Filter::new()
            .and(col("year"), CompareOp::GtEq, 2000)
            .and(col("name"), CompareOp::NotEq, Value::Null);
        let sql = select(&table("station"), &filter).unwrap();
        assert_eq!(
            sql.text,
            "SELECT * FROM \"station\" WHERE \"year\" >= ?1 AND \"name\" IS NOT NULL ORDER BY rowid"
        );
    }

    #[test]
    fn select_rejects_ordering_against_null() {
        let filter = Filter::new().and(col("year"), CompareOp::Lt, Value::Null);
        let err = select(&table("station"), &filter).unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn create_table_puts_surrogate_key_first() {
        let columns = vec![
            ColumnDef::try_new("name", ColumnType::Text).unwrap().not_null(),
            ColumnDef::try_new("year", ColumnType::Integer).unwrap(),
        ];
        let sql = create_table(&table("station"), &columns, &col("id")).unwrap();
        assert_eq!(
            sql.text,
            "CREATE TABLE \"station\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"name\" TEXT NOT NULL, \"year\" INTEGER)"
        );

        let clash = vec![ColumnDef::try_new("ID", ColumnType::Text).unwrap()];
        assert!(create_table(&table("station"), &clash, &col("id")).is_err());
    }

    #[test]
    fn create_table_like_normalizes_types_and_keys() {
        let columns = vec![
            ColumnInfo {
                name: "site".to_string(),
                declared_type: "VARCHAR(20)".to_string(),
                not_null: true,
                primary_key_position: 1,
            },
            ColumnInfo {
                name: "day".to_string(),
                declared_type: "BIGINT".to_string(),
                not_null: true,
                primary_key_position: 2,
            },
            ColumnInfo {
                name: "temp".to_string(),
                declared_type: "double".to_string(),
                not_null: false,
                primary_key_position: 0,
            },
        ];
        let sql = create_table_like(&table("copy"), &columns).unwrap();
        assert_eq!(
            sql.text,
            "CREATE TABLE \"copy\" (\"site\" TEXT NOT NULL, \"day\" INTEGER NOT NULL, \"temp\" REAL, PRIMARY KEY (\"site\", \"day\"))"
        );
    }

    #[test]
    fn dedup_statements_group_by_key() {
        let key = JoinKey::parse("name,year").unwrap();
        assert_eq!(
            delete_duplicates(&table("station"), &key, false).text,
            "DELETE FROM \"station\" WHERE rowid NOT IN (SELECT MIN(rowid) FROM \"station\" GROUP BY \"name\", \"year\")"
        );
        assert!(
            delete_duplicates(&table("station"), &key, true)
                .text
                .contains("SELECT MAX(rowid)")
        );
        assert!(
            select_duplicates(&table("station"), &key)
                .text
                .contains("d.\"name\" IS t.\"name\" AND d.\"year\" IS t.\"year\"")
        );
    }
}
