use pretty_assertions::assert_eq;
use qvd_model::{QvdTable, TableError, Value};

fn int_column(values: &[Option<i32>]) -> Vec<Value> {
    values
        .iter()
        .map(|v| match v {
            Some(v) => Value::Integer(*v),
            None => Value::Null,
        })
        .collect()
}

#[test]
fn sort_puts_nulls_first_ascending() {
    let table = QvdTable::from_columns([(
        "A".to_string(),
        int_column(&[Some(3), None, Some(1), Some(2)]),
    )])
    .unwrap();

    let sorted = table.sort_by("A", true).unwrap();
    assert_eq!(
        sorted.column_values("A").unwrap(),
        int_column(&[None, Some(1), Some(2), Some(3)])
    );

    let reversed = table.sort_by("A", false).unwrap();
    assert_eq!(
        reversed.column_values("A").unwrap(),
        int_column(&[Some(3), Some(2), Some(1), None])
    );
}

#[test]
fn filter_keeps_original_order() {
    let table = QvdTable::from_columns([(
        "A".to_string(),
        int_column(&[Some(3), None, Some(1), Some(2)]),
    )])
    .unwrap();

    let filtered = table
        .filter_by("A", |v| v.calculation_value().is_some_and(|c| c > 1.0))
        .unwrap();
    assert_eq!(
        filtered.column_values("A").unwrap(),
        int_column(&[Some(3), Some(2)])
    );
}

#[test]
fn sort_is_stable_across_keys() {
    // Sorting by k1 first and k2 second must order rows primarily by k2
    // with the k1 order preserved inside each k2 group.
    let table = QvdTable::from_columns([
        (
            "k1".to_string(),
            int_column(&[Some(2), Some(1), Some(2), Some(1)]),
        ),
        (
            "k2".to_string(),
            int_column(&[Some(1), Some(0), Some(0), Some(1)]),
        ),
    ])
    .unwrap();

    let sorted = table
        .sort_by("k1", true)
        .unwrap()
        .sort_by("k2", true)
        .unwrap();
    assert_eq!(
        sorted.column_values("k2").unwrap(),
        int_column(&[Some(0), Some(0), Some(1), Some(1)])
    );
    assert_eq!(
        sorted.column_values("k1").unwrap(),
        int_column(&[Some(1), Some(2), Some(1), Some(2)])
    );
}

#[test]
fn concat_is_associative_and_remaps_codes() {
    let a = QvdTable::from_columns([("A".to_string(), int_column(&[Some(1), Some(2)]))]).unwrap();
    let b = QvdTable::from_columns([("A".to_string(), int_column(&[Some(2), None]))]).unwrap();
    let c = QvdTable::from_columns([("A".to_string(), int_column(&[Some(3)]))]).unwrap();

    let left = a.concat(&b).unwrap().concat(&c).unwrap();
    let right = a.concat(&b.concat(&c).unwrap()).unwrap();
    assert_eq!(left, right);
    assert_eq!(
        left.column_values("A").unwrap(),
        int_column(&[Some(1), Some(2), Some(2), None, Some(3)])
    );
    // The shared symbol 2 is reused, not duplicated.
    assert_eq!(left.column("A").unwrap().symbols().len(), 3);
}

#[test]
fn concat_matches_columns_by_name() {
    let a = QvdTable::from_columns([
        ("A".to_string(), int_column(&[Some(1)])),
        ("B".to_string(), int_column(&[Some(10)])),
    ])
    .unwrap();
    let b = QvdTable::from_columns([
        ("B".to_string(), int_column(&[Some(20)])),
        ("A".to_string(), int_column(&[Some(2)])),
    ])
    .unwrap();

    let merged = a.concat(&b).unwrap();
    assert_eq!(merged.column_names(), vec!["A", "B"]);
    assert_eq!(
        merged.column_values("A").unwrap(),
        int_column(&[Some(1), Some(2)])
    );
    assert_eq!(
        merged.column_values("B").unwrap(),
        int_column(&[Some(10), Some(20)])
    );
}

#[test]
fn concat_rejects_schema_mismatch() {
    let a = QvdTable::from_columns([("A".to_string(), int_column(&[Some(1)]))]).unwrap();
    let b = QvdTable::from_columns([("B".to_string(), int_column(&[Some(1)]))]).unwrap();
    assert!(matches!(
        a.concat(&b),
        Err(TableError::ColumnMismatch(_))
    ));
}

#[test]
fn head_tail_slice() {
    let table = QvdTable::from_columns([(
        "A".to_string(),
        int_column(&[Some(1), Some(2), Some(3), Some(4), Some(5)]),
    )])
    .unwrap();

    assert_eq!(
        table.head(2).column_values("A").unwrap(),
        int_column(&[Some(1), Some(2)])
    );
    assert_eq!(
        table.tail(2).column_values("A").unwrap(),
        int_column(&[Some(4), Some(5)])
    );
    assert_eq!(table.head(10).row_count(), 5);
}

#[test]
fn to_columns_round_trips() {
    let columns = vec![
        ("Key".to_string(), int_column(&[Some(1), None])),
        (
            "Name".to_string(),
            vec![Value::String("x".to_string()), Value::String("y".to_string())],
        ),
    ];
    let table = QvdTable::from_columns(columns.clone()).unwrap();
    assert_eq!(table.to_columns(), columns);
}

#[test]
fn value_serde_layout_is_tagged() {
    let value = Value::DualInteger(1, "Mon".to_string());
    let json = serde_json::to_string(&value).unwrap();
    assert_eq!(json, r#"{"type":"dual_integer","value":[1,"Mon"]}"#);
    let back: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(back, value);

    assert_eq!(serde_json::to_string(&Value::Null).unwrap(), r#"{"type":"null"}"#);
}
