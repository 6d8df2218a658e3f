//! Tests for column arrays

use super::*;
use crate::bulk_record;
use crate::introspect::resolve_fields;
use crate::placeholders::extract_placeholders;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

struct Point {
    x: i32,
    y: Option<String>,
    z: u16,
}

bulk_record!(Point {
    x: i32,
    y: Option<String>,
    z: u16,
});

fn points() -> Vec<Point> {
    vec![
        Point {
            x: 1,
            y: Some("a".into()),
            z: 40_000,
        },
        Point {
            x: 2,
            y: None,
            z: 40_001,
        },
    ]
}

#[test]
fn test_nullable_column_tracks_absent_cells() {
    let column = ColumnArray::from_values(
        "y",
        DbType::Varchar,
        true,
        vec![Value::String("a".into()), Value::Null],
    )
    .unwrap();

    assert_eq!(column.cells(), &[Some(Value::String("a".into())), None]);
    assert_eq!(
        column.values(),
        vec![Value::String("a".into()), Value::String(String::new())]
    );
    assert_eq!(
        column.status(),
        Some(vec![BindStatus::Success, BindStatus::NullInsert])
    );
}

#[test]
fn test_non_nullable_column_has_no_status() {
    let column =
        ColumnArray::from_values("x", DbType::Int32, false, vec![Value::Int32(1)]).unwrap();
    assert_eq!(column.status(), None);
    assert!(!column.nullable());
}

#[test]
fn test_null_in_non_nullable_column_is_rejected() {
    let err = ColumnArray::from_values(
        "x",
        DbType::Int32,
        false,
        vec![Value::Int32(1), Value::Null],
    )
    .unwrap_err();

    assert!(matches!(
        err,
        BulkError::Conversion { ref field, row: 1, target: DbType::Int32, .. } if field == "x"
    ));
}

#[test]
fn test_conversion_failure_reports_row() {
    let err = ColumnArray::from_values(
        "z",
        DbType::Int16,
        false,
        vec![Value::UInt16(10), Value::UInt16(40_000)],
    )
    .unwrap_err();

    match err {
        BulkError::Conversion { row, reason, .. } => {
            assert_eq!(row, 1);
            assert!(reason.contains("out of range"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_dates_are_widened() {
    let day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
    let column =
        ColumnArray::from_values("d", DbType::Date, false, vec![Value::Date(day)]).unwrap();
    assert_eq!(
        column.cells()[0],
        Some(Value::DateTime(day.and_hms_opt(0, 0, 0).unwrap()))
    );
}

#[test]
fn test_into_bind_array() {
    let nullable = ColumnArray::from_values(
        "y",
        DbType::Varchar,
        true,
        vec![Value::Null, Value::String("b".into())],
    )
    .unwrap()
    .into_bind_array();

    assert_eq!(nullable.name(), "y");
    assert_eq!(nullable.db_type(), DbType::Varchar);
    assert!(nullable.is_null_at(0));
    assert_eq!(nullable.cell(1), Some(&Value::String("b".into())));

    let dense = ColumnArray::from_values("x", DbType::Int64, false, vec![Value::Int32(9)])
        .unwrap()
        .into_bind_array();
    assert_eq!(dense.values(), &[Value::Int64(9)]);
    assert_eq!(dense.status(), None);
}

#[test]
fn test_build_columns_reads_only_referenced_fields() {
    let placeholders = extract_placeholders("UPDATE t SET x = :x WHERE y = :y");
    let resolved = resolve_fields::<Point>(&placeholders).unwrap();

    // z holds values that do not fit Int16; it is never read.
    let columns = build_columns(&resolved, &points()).unwrap();

    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].field(), "x");
    assert_eq!(
        columns[0].cells(),
        &[Some(Value::Int32(1)), Some(Value::Int32(2))]
    );
    assert_eq!(columns[1].cells(), &[Some(Value::String("a".into())), None]);
}

#[test]
fn test_build_column_fails_on_unconvertible_field() {
    let placeholders = extract_placeholders("SELECT :z");
    let resolved = resolve_fields::<Point>(&placeholders).unwrap();

    let err = build_column(&resolved[0], &points()).unwrap_err();
    assert!(matches!(err, BulkError::Conversion { row: 0, .. }));
}

#[test]
fn test_empty_records_give_empty_columns() {
    let placeholders = extract_placeholders("SELECT :x, :y");
    let resolved = resolve_fields::<Point>(&placeholders).unwrap();

    let columns = build_columns::<Point>(&resolved, &[]).unwrap();
    assert!(columns.iter().all(ColumnArray::is_empty));
}
