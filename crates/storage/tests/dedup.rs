#![forbid(unsafe_code)]

use recon_storage::{
    ColumnDef, ColumnName, ColumnType, DedupPolicy, DedupReport, ErrorKind, JoinKey, Reconciler,
    Row, Session, SessionConfig, TableName, UpsertOutcome, Value, ValueMap,
};

fn table(name: &str) -> TableName {
    TableName::try_new(name).expect("table name")
}

fn col(name: &str) -> ColumnName {
    ColumnName::try_new(name).expect("column name")
}

fn seeded_session() -> Session {
    let mut session = Session::connect(SessionConfig::memory()).expect("connect");
    session
        .create_table(
            &table("station"),
            &[
                ColumnDef::new(col("name"), ColumnType::Text),
                ColumnDef::new(col("year"), ColumnType::Integer),
                ColumnDef::new(col("temp"), ColumnType::Real),
            ],
            &col("id"),
        )
        .expect("create table");

    for (name, year, temp) in [
        ("A", Value::from(2020), 1.0),
        ("A", Value::from(2020), 2.0),
        ("B", Value::from(2020), 3.0),
        ("A", Value::from(2020), 4.0),
        ("C", Value::Null, 5.0),
        ("C", Value::Null, 6.0),
    ] {
        let values = ValueMap::try_from_pairs([
            ("name", Value::from(name)),
            ("year", year),
            ("temp", Value::from(temp)),
        ])
        .expect("values");
        session
            .insert_record(&table("station"), &values)
            .expect("seed");
    }
    session
}

fn temps(session: &Session) -> Vec<f64> {
    session
        .get_records(&table("station"))
        .expect("records")
        .iter()
        .filter_map(|row| row.get(3).and_then(Value::as_f64))
        .collect()
}

fn name_year() -> JoinKey {
    JoinKey::parse("name,year").expect("join key")
}

#[test]
fn find_duplicates_groups_rows_by_key() {
    let mut session = seeded_session();
    let groups = Reconciler::new(&mut session)
        .find_duplicates(&table("station"), &name_year())
        .expect("find");

    let ids: Vec<Vec<i64>> = groups
        .iter()
        .map(|group| {
            group
                .iter()
                .filter_map(|row: &Row| row.get(0).and_then(Value::as_i64))
                .collect()
        })
        .collect();
    assert_eq!(ids, vec![vec![1, 2, 4], vec![5, 6]]);
    assert_eq!(temps(&session).len(), 6, "find is read-only");
}

#[test]
fn keep_first_retains_the_oldest_row() {
    let mut session = seeded_session();
    let report = Reconciler::new(&mut session)
        .remove_duplicates(&table("station"), &name_year(), DedupPolicy::KeepFirst)
        .expect("dedup");

    assert_eq!(
        report,
        DedupReport {
            duplicate_groups: 2,
            rows_removed: 3,
        }
    );
    assert_eq!(temps(&session), vec![1.0, 3.0, 5.0]);
}

#[test]
fn keep_last_retains_the_newest_row() {
    let mut session = seeded_session();
    let report = Reconciler::new(&mut session)
        .remove_duplicates(&table("station"), &name_year(), DedupPolicy::KeepLast)
        .expect("dedup");

    assert_eq!(report.rows_removed, 3);
    assert_eq!(temps(&session), vec![3.0, 4.0, 6.0]);
}

#[test]
fn dedup_without_duplicates_is_a_no_op() {
    let mut session = seeded_session();
    let key = JoinKey::try_new([col("temp")]).expect("join key");
    let report = Reconciler::new(&mut session)
        .remove_duplicates(&table("station"), &key, DedupPolicy::KeepFirst)
        .expect("dedup");

    assert_eq!(report, DedupReport::default());
    assert_eq!(temps(&session).len(), 6);
}

#[test]
fn mistyped_key_column_fails_without_deleting() {
    let mut session = seeded_session();
    let key = JoinKey::parse("nmae").expect("join key");

    let err = Reconciler::new(&mut session)
        .remove_duplicates(&table("station"), &key, DedupPolicy::KeepFirst)
        .expect_err("no such column");
    assert_eq!(err.kind(), ErrorKind::Query);

    let err = Reconciler::new(&mut session)
        .find_duplicates(&table("station"), &key)
        .expect_err("no such column");
    assert_eq!(err.kind(), ErrorKind::Query);
    assert_eq!(temps(&session), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn dedup_resolves_an_ambiguous_key() {
    let mut session = seeded_session();
    let values = ValueMap::try_from_pairs([
        ("name", Value::from("A")),
        ("year", Value::from(2020)),
        ("temp", Value::from(9.0)),
    ])
    .expect("values");

    let mut reconciler = Reconciler::new(&mut session);
    let outcome = reconciler
        .upsert(&table("station"), &name_year(), &values)
        .expect("ambiguous upsert");
    assert!(outcome.is_ambiguous());

    reconciler
        .remove_duplicates(&table("station"), &name_year(), DedupPolicy::KeepLast)
        .expect("dedup");
    let outcome = reconciler
        .upsert(&table("station"), &name_year(), &values)
        .expect("upsert after dedup");
    assert!(matches!(outcome, UpsertOutcome::Updated { .. }));
}
