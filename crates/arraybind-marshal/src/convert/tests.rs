//! Tests for cell conversion

use super::*;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn datetime(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[rstest]
#[case::same_width(Value::Int16(-5), DbType::Int16, Value::Int16(-5))]
#[case::unsigned_in_range(Value::UInt16(300), DbType::Int16, Value::Int16(300))]
#[case::widen_to_32(Value::Int16(12), DbType::Int32, Value::Int32(12))]
#[case::u32_fits(Value::UInt32(7), DbType::Int32, Value::Int32(7))]
#[case::byte_widened(Value::UInt8(255), DbType::Byte, Value::Int16(255))]
#[case::signed_byte(Value::Int8(-128), DbType::Byte, Value::Int16(-128))]
#[case::integral_float(Value::Float64(42.0), DbType::Int64, Value::Int64(42))]
#[case::numeric_string(Value::String(" 17 ".into()), DbType::Int32, Value::Int32(17))]
#[case::integral_decimal(Value::Decimal("12.000".into()), DbType::Int64, Value::Int64(12))]
#[case::bool_as_int(Value::Bool(true), DbType::Int32, Value::Int32(1))]
fn test_integer_conversions(#[case] input: Value, #[case] target: DbType, #[case] expected: Value) {
    assert_eq!(convert_value(&input, target).unwrap(), expected);
}

#[rstest]
#[case::u16_overflow(Value::UInt16(40_000), DbType::Int16)]
#[case::u64_overflow(Value::UInt64(u64::MAX), DbType::Int64)]
#[case::fractional_float(Value::Float64(2.5), DbType::Int32)]
#[case::fractional_decimal(Value::Decimal("1.5".into()), DbType::Int64)]
#[case::not_a_number(Value::String("abc".into()), DbType::Int32)]
#[case::byte_overflow(Value::Int32(256), DbType::Byte)]
#[case::date_to_int(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()), DbType::Int32)]
fn test_integer_conversion_failures(#[case] input: Value, #[case] target: DbType) {
    assert!(convert_value(&input, target).is_err());
}

#[test]
fn test_out_of_range_reason_mentions_bounds() {
    let reason = convert_value(&Value::UInt16(40_000), DbType::Int16).unwrap_err();
    assert_eq!(reason, "40000 is out of range -32768..=32767");
}

#[rstest]
#[case::bool(Value::Bool(true), true)]
#[case::zero(Value::Int64(0), false)]
#[case::text(Value::String("TRUE".into()), true)]
#[case::text_digit(Value::String("0".into()), false)]
fn test_boolean_conversions(#[case] input: Value, #[case] expected: bool) {
    assert_eq!(
        convert_value(&input, DbType::Boolean).unwrap(),
        Value::Bool(expected)
    );
}

#[test]
fn test_boolean_rejects_other_integers() {
    assert!(convert_value(&Value::Int32(2), DbType::Boolean).is_err());
}

#[test]
fn test_float_conversions() {
    assert_eq!(
        convert_value(&Value::Float64(1.5), DbType::Single).unwrap(),
        Value::Float32(1.5)
    );
    assert_eq!(
        convert_value(&Value::Int32(3), DbType::Double).unwrap(),
        Value::Float64(3.0)
    );
    assert_eq!(
        convert_value(&Value::Decimal("2.25".into()), DbType::Double).unwrap(),
        Value::Float64(2.25)
    );
    assert!(convert_value(&Value::Float64(f64::MAX), DbType::Single).is_err());
    assert!(convert_value(&Value::Bool(true), DbType::Double).is_err());
}

#[rstest]
#[case::trailing_zeros(Value::Decimal("10.500".into()), "10.5")]
#[case::integer(Value::Int64(42), "42")]
#[case::unsigned(Value::UInt64(u64::MAX), "18446744073709551615")]
#[case::float(Value::Float64(0.25), "0.25")]
#[case::text(Value::String("3.14".into()), "3.14")]
#[case::scientific(Value::String("1e3".into()), "1000")]
fn test_decimal_conversions(#[case] input: Value, #[case] expected: &str) {
    assert_eq!(
        convert_value(&input, DbType::Decimal).unwrap(),
        Value::Decimal(expected.to_string())
    );
}

#[test]
fn test_decimal_rejects_garbage() {
    assert!(convert_value(&Value::String("12,5x".into()), DbType::Decimal).is_err());
    assert!(convert_value(&Value::Float64(f64::NAN), DbType::Decimal).is_err());
}

#[test]
fn test_char_conversions() {
    assert_eq!(
        convert_value(&Value::String("ç".into()), DbType::Char).unwrap(),
        Value::String("ç".into())
    );
    assert!(convert_value(&Value::String("ab".into()), DbType::Char).is_err());
    assert!(convert_value(&Value::String(String::new()), DbType::Char).is_err());
}

#[test]
fn test_varchar_conversions() {
    assert_eq!(
        convert_value(&Value::String("SP".into()), DbType::Varchar).unwrap(),
        Value::String("SP".into())
    );
    assert_eq!(
        convert_value(&Value::Int32(12), DbType::Varchar).unwrap(),
        Value::String("12".into())
    );
    assert!(convert_value(&Value::Bytes(vec![1]), DbType::Varchar).is_err());
}

#[test]
fn test_date_conversions() {
    let midnight = datetime("2024-03-01 00:00:00");

    assert_eq!(
        convert_value(
            &Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            DbType::Date
        )
        .unwrap(),
        Value::DateTime(midnight)
    );
    assert_eq!(
        convert_value(
            &Value::DateTimeUtc(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            DbType::Date
        )
        .unwrap(),
        Value::DateTime(midnight)
    );
    assert_eq!(
        convert_value(&Value::String("01/03/2024".into()), DbType::Date).unwrap(),
        Value::DateTime(midnight)
    );
    assert!(convert_value(&Value::String("yesterday".into()), DbType::Date).is_err());
    assert!(convert_value(&Value::Int64(20240301), DbType::Date).is_err());
}

#[rstest]
#[case::iso_date("2024-03-01", "2024-03-01 00:00:00")]
#[case::iso_datetime("2024-03-01 13:45:10", "2024-03-01 13:45:10")]
#[case::iso_t("2024-03-01T13:45:10", "2024-03-01 13:45:10")]
#[case::br_date("01/03/2024", "2024-03-01 00:00:00")]
#[case::br_datetime("01/03/2024 08:00:00", "2024-03-01 08:00:00")]
fn test_parse_datetime(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(parse_datetime(input), Some(datetime(expected)));
}

#[test]
fn test_parse_datetime_fraction_and_garbage() {
    let parsed = parse_datetime("2024-03-01 13:45:10.250").unwrap();
    assert_eq!(parsed.and_utc().timestamp_subsec_millis(), 250);
    assert_eq!(parse_datetime("31/02/2024"), None);
    assert_eq!(parse_datetime(""), None);
}
