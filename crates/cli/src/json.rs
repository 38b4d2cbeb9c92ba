#![forbid(unsafe_code)]

use anyhow::{Context, bail};
use recon_core::{ColumnDef, ColumnType, Filter, Row, Value, ValueMap};
use serde_json::{Map, Number, Value as Json};

fn parse_object(raw: &str, what: &str) -> anyhow::Result<Map<String, Json>> {
    let parsed: Json =
        serde_json::from_str(raw).with_context(|| format!("{what} is not valid JSON"))?;
    match parsed {
        Json::Object(map) => Ok(map),
        _ => bail!("{what} must be a JSON object"),
    }
}

pub(crate) fn json_to_value(json: Json) -> anyhow::Result<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(v) => Value::from(v),
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::Integer(v)
            } else if n.is_u64() {
                bail!("integer {n} does not fit in 64 signed bits");
            } else {
                Value::Real(n.as_f64().unwrap_or_default())
            }
        }
        Json::String(v) => Value::Text(v),
        Json::Array(_) | Json::Object(_) => bail!("nested JSON values are not supported"),
    })
}

pub(crate) fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Integer(v) => Json::from(*v),
        Value::Real(v) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
        Value::Text(v) => Json::String(v.clone()),
        Value::Blob(v) => Json::Array(v.iter().map(|b| Json::from(*b)).collect()),
    }
}

pub(crate) fn row_to_json(row: &Row) -> Json {
    Json::Array(row.values().iter().map(value_to_json).collect())
}

/// `{"name": "A", "year": 2020}` in key order.
pub(crate) fn value_map_from_json(raw: &str) -> anyhow::Result<ValueMap> {
    let mut out = ValueMap::new();
    for (column, json) in parse_object(raw, "--values")? {
        let value = json_to_value(json).with_context(|| format!("column {column}"))?;
        out.try_set(&column, value)
            .with_context(|| format!("column {column}"))?;
    }
    Ok(out)
}

/// Equality conjunction from a JSON object.
pub(crate) fn filter_from_json(raw: &str) -> anyhow::Result<Filter> {
    let mut filter = Filter::new();
    for (column, json) in parse_object(raw, "--where")? {
        let value = json_to_value(json).with_context(|| format!("column {column}"))?;
        filter = filter
            .try_equals(&column, value)
            .with_context(|| format!("column {column}"))?;
    }
    Ok(filter)
}

/// `name:type` or `name:type:not-null`.
pub(crate) fn parse_column_spec(raw: &str) -> Result<ColumnDef, String> {
    let mut parts = raw.split(':');
    let (Some(name), Some(ty)) = (parts.next(), parts.next()) else {
        return Err(format!("expected name:type[:not-null], got {raw:?}"));
    };
    let ty = ColumnType::parse(ty).ok_or_else(|| format!("unknown column type {ty:?}"))?;
    let mut def = ColumnDef::try_new(name.trim(), ty).map_err(|err| err.to_string())?;
    match parts.next().map(str::trim) {
        None => {}
        Some("not-null" | "notnull" | "not_null") => def = def.not_null(),
        Some(other) => return Err(format!("unknown column flag {other:?}")),
    }
    if parts.next().is_some() {
        return Err(format!("too many segments in {raw:?}"));
    }
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::ColumnName;

    #[test]
    fn value_map_keeps_json_key_order() {
        let values = value_map_from_json(r#"{"year": 2020, "name": "A", "temp": 5.5, "ok": true, "note": null}"#)
            .expect("values");
        let columns: Vec<&str> = values.columns().map(ColumnName::as_str).collect();
        assert_eq!(columns, vec!["year", "name", "temp", "ok", "note"]);
        let collected: Vec<&Value> = values.values().collect();
        assert_eq!(
            collected,
            vec![
                &Value::Integer(2020),
                &Value::from("A"),
                &Value::Real(5.5),
                &Value::Integer(1),
                &Value::Null,
            ]
        );
    }

    #[test]
    fn rejects_non_objects_nested_values_and_bad_columns() {
        assert!(value_map_from_json("[1, 2]").is_err());
        assert!(value_map_from_json(r#"{"a": [1]}"#).is_err());
        assert!(value_map_from_json(r#"{"bad column": 1}"#).is_err());
        assert!(value_map_from_json(r#"{"big": 18446744073709551615}"#).is_err());
    }

    #[test]
    fn filter_is_an_equality_conjunction() {
        let filter = filter_from_json(r#"{"name": "A", "year": 2020}"#).expect("filter");
        assert_eq!(filter.conditions().len(), 2);
        assert_eq!(filter.conditions()[1].value, Value::Integer(2020));
    }

    #[test]
    fn column_specs() {
        let def = parse_column_spec("name:text:not-null").expect("spec");
        assert_eq!(def.name.as_str(), "name");
        assert_eq!(def.ty, ColumnType::Text);
        assert!(def.not_null);

        assert_eq!(
            parse_column_spec("temp:float").expect("spec").ty,
            ColumnType::Real
        );
        assert!(parse_column_spec("temp").is_err());
        assert!(parse_column_spec("temp:geometry").is_err());
        assert!(parse_column_spec("temp:real:unique").is_err());
    }

    #[test]
    fn rows_render_as_json_arrays() {
        let row = Row::new(vec![
            Value::Integer(1),
            Value::from("A"),
            Value::Real(7.5),
            Value::Null,
            Value::Blob(vec![1, 2]),
        ]);
        assert_eq!(
            row_to_json(&row).to_string(),
            r#"[1,"A",7.5,null,[1,2]]"#
        );
    }
}
