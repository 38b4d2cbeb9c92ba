use super::*;

fn col(name: &str) -> ColumnName {
    ColumnName::try_new(name).unwrap()
}

#[test]
fn identifier_validation() {
    assert_eq!(TableName::try_new("").unwrap_err(), IdentifierError::Empty);
    assert_eq!(
        TableName::try_new("1station").unwrap_err(),
        IdentifierError::InvalidFirstChar
    );
    assert_eq!(
        ColumnName::try_new("name; DROP TABLE x").unwrap_err(),
        IdentifierError::InvalidChar { ch: ';', index: 4 }
    );
    assert_eq!(
        ColumnName::try_new("a".repeat(64)).unwrap_err(),
        IdentifierError::TooLong
    );
    assert_eq!(
        ColumnName::try_new("bad\"quote").unwrap_err(),
        IdentifierError::InvalidChar { ch: '"', index: 3 }
    );
    assert!(TableName::try_new("_weather_station2").is_ok());
    assert_eq!(TableName::try_new("station").unwrap().quoted(), "\"station\"");
}

#[test]
fn value_map_keeps_insertion_order_and_replaces_in_place() {
    let mut values = ValueMap::try_from_pairs([
        ("name", Value::from("A")),
        ("year", Value::from(2020)),
        ("temp", Value::from(5.0)),
    ])
    .unwrap();
    values.set(col("year"), 2021);

    let columns: Vec<&str> = values.columns().map(ColumnName::as_str).collect();
    assert_eq!(columns, vec!["name", "year", "temp"]);
    assert_eq!(values.get(&col("year")), Some(&Value::Integer(2021)));
    assert_eq!(values.len(), 3);
    assert!(ValueMap::try_from_pairs([("bad name", 1)]).is_err());
}

#[test]
fn join_key_rejects_empty_and_deduplicates() {
    assert_eq!(
        JoinKey::try_from_names(Vec::<String>::new()).unwrap_err(),
        JoinKeyError::Empty
    );
    assert_eq!(JoinKey::parse(" , ").unwrap_err(), JoinKeyError::Empty);
    assert!(matches!(
        JoinKey::parse("name,ye ar").unwrap_err(),
        JoinKeyError::InvalidColumn(_)
    ));

    let key = JoinKey::parse("name, year, name").unwrap();
    let names: Vec<&str> = key.columns().iter().map(ColumnName::as_str).collect();
    assert_eq!(names, vec!["name", "year"]);
}

#[test]
fn join_key_equality_filter_uses_current_values() {
    let key = JoinKey::parse("name,year").unwrap();
    let values = ValueMap::try_from_pairs([
        ("temp", Value::from(7.5)),
        ("year", Value::from(2020)),
        ("name", Value::from("A")),
    ])
    .unwrap();

    let filter = key.equality_filter(&values).unwrap();
    assert_eq!(
        filter.conditions(),
        &[
            Condition {
                column: col("name"),
                op: CompareOp::Eq,
                value: Value::from("A"),
            },
            Condition {
                column: col("year"),
                op: CompareOp::Eq,
                value: Value::Integer(2020),
            },
        ]
    );

    let partial = ValueMap::try_from_pairs([("name", "A")]).unwrap();
    assert_eq!(
        key.equality_filter(&partial).unwrap_err(),
        JoinKeyError::MissingFromValues {
            column: "year".to_string()
        }
    );
}

#[test]
fn column_identity_ignores_ascii_case() {
    assert!(col("Name").matches(&col("nAME")));
    assert_ne!(col("Name"), col("name"));

    let mut values = ValueMap::try_from_pairs([("name", Value::from("A"))]).unwrap();
    values.set(col("NAME"), "B");
    assert_eq!(values.len(), 1);
    assert_eq!(values.columns().next().map(ColumnName::as_str), Some("name"));
    assert_eq!(values.get(&col("Name")), Some(&Value::from("B")));

    let key = JoinKey::parse("Name, YEAR, name").unwrap();
    assert_eq!(key.len(), 2);
    let filter = key
        .equality_filter(&values.with(col("year"), 2020))
        .unwrap();
    assert_eq!(filter.conditions().len(), 2);
    assert_eq!(filter.conditions()[0].value, Value::from("B"));
}

#[test]
fn filter_rejects_ordering_against_null() {
    let ok = Filter::new().try_equals("name", Value::Null).unwrap();
    assert!(ok.validate().is_ok());

    let bad = Filter::new()
        .try_and("year", CompareOp::Gt, Value::Null)
        .unwrap();
    assert_eq!(
        bad.validate().unwrap_err(),
        FilterError::OrderingAgainstNull {
            column: "year".to_string()
        }
    );
    assert_eq!(CompareOp::parse("<>"), Some(CompareOp::NotEq));
    assert_eq!(CompareOp::parse("~"), None);
}

#[test]
fn declared_types_map_to_affinity() {
    assert_eq!(ColumnType::from_declared("BIGINT"), ColumnType::Integer);
    assert_eq!(ColumnType::from_declared("varchar(40)"), ColumnType::Text);
    assert_eq!(ColumnType::from_declared(""), ColumnType::Blob);
    assert_eq!(ColumnType::from_declared("DOUBLE PRECISION"), ColumnType::Real);
    assert_eq!(ColumnType::from_declared("DECIMAL(10,5)"), ColumnType::Numeric);
    // "POINT" contains "INT".
    assert_eq!(ColumnType::from_declared("POINT"), ColumnType::Integer);
    assert_eq!(ColumnType::parse("Float"), Some(ColumnType::Real));
}

#[test]
fn dedup_policy_parse() {
    assert_eq!(DedupPolicy::parse("newest"), Some(DedupPolicy::KeepLast));
    assert_eq!(DedupPolicy::parse("FIRST"), Some(DedupPolicy::KeepFirst));
    assert_eq!(DedupPolicy::parse("merge"), None);
}

#[test]
fn option_values_become_null() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    assert_eq!(Value::from(true), Value::Integer(1));
}
