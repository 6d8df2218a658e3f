//! Cell conversion into the representation carried for each database type.

use std::str::FromStr;

use arraybind_core::{DbType, Value};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Converts a non-null value to the representation carried for `target`.
///
/// Returns the reason on failure. Widening conversions (`Byte` as a 16-bit
/// value, dates as midnight datetimes) are applied here.
pub fn convert_value(value: &Value, target: DbType) -> Result<Value, String> {
    match target {
        DbType::Boolean => to_bool(value).map(Value::Bool),
        DbType::Byte => to_integer(value, -128, 255).map(|v| Value::Int16(v as i16)),
        DbType::Int16 => {
            to_integer(value, i16::MIN as i128, i16::MAX as i128).map(|v| Value::Int16(v as i16))
        }
        DbType::Int32 => {
            to_integer(value, i32::MIN as i128, i32::MAX as i128).map(|v| Value::Int32(v as i32))
        }
        DbType::Int64 => {
            to_integer(value, i64::MIN as i128, i64::MAX as i128).map(|v| Value::Int64(v as i64))
        }
        DbType::Single => to_f64(value).and_then(|v| {
            let narrowed = v as f32;
            if v.is_finite() && !narrowed.is_finite() {
                Err(format!("{} is out of range for single precision", v))
            } else {
                Ok(Value::Float32(narrowed))
            }
        }),
        DbType::Double => to_f64(value).map(Value::Float64),
        DbType::Decimal => to_decimal(value).map(|d| Value::Decimal(d.normalize().to_string())),
        DbType::Char => to_char(value).map(|c| Value::String(c.to_string())),
        DbType::Varchar => to_text(value).map(Value::String),
        DbType::Date => to_datetime(value).map(Value::DateTime),
    }
}

/// Parses a date or datetime in one of the accepted text layouts.
///
/// Date-only input becomes midnight of that day.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn unsupported(value: &Value, target: &str) -> String {
    format!("cannot convert {} to {}", value.type_name(), target)
}

fn to_bool(value: &Value) -> Result<bool, String> {
    if let Some(v) = value.as_bool() {
        return Ok(v);
    }
    if let Some(v) = value.as_i128() {
        return match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(format!("{} is not a boolean", v)),
        };
    }
    match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(format!("'{}' is not a boolean", other)),
        },
        _ => Err(unsupported(value, "boolean")),
    }
}

fn to_integer(value: &Value, min: i128, max: i128) -> Result<i128, String> {
    let parsed = match value {
        Value::Bool(b) => i128::from(*b),
        Value::Float32(_) | Value::Float64(_) => {
            let v = value.as_f64().unwrap_or(f64::NAN);
            if !v.is_finite() || v.fract() != 0.0 {
                return Err(format!("{} is not an integral value", v));
            }
            v as i128
        }
        Value::String(s) | Value::Decimal(s) => parse_integral(s)?,
        other => other
            .as_i128()
            .ok_or_else(|| unsupported(value, "integer"))?,
    };

    if parsed < min || parsed > max {
        return Err(format!("{} is out of range {}..={}", parsed, min, max));
    }
    Ok(parsed)
}

fn parse_integral(text: &str) -> Result<i128, String> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i128>() {
        return Ok(v);
    }
    let decimal =
        Decimal::from_str(text).map_err(|_| format!("'{}' is not a number", text))?;
    if !decimal.fract().is_zero() {
        return Err(format!("{} is not an integral value", decimal));
    }
    decimal
        .to_i128()
        .ok_or_else(|| format!("{} is out of range", decimal))
}

fn to_f64(value: &Value) -> Result<f64, String> {
    match value {
        Value::String(s) | Value::Decimal(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", s.trim())),
        Value::Bool(_) => Err(unsupported(value, "floating point")),
        other => other
            .as_f64()
            .ok_or_else(|| unsupported(value, "floating point")),
    }
}

fn to_decimal(value: &Value) -> Result<Decimal, String> {
    match value {
        Value::String(s) | Value::Decimal(s) => {
            let text = s.trim();
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map_err(|_| format!("'{}' is not a decimal", text))
        }
        Value::Float32(_) | Value::Float64(_) => {
            let v = value.as_f64().unwrap_or(f64::NAN);
            Decimal::try_from(v).map_err(|_| format!("{} cannot be represented as a decimal", v))
        }
        other => {
            let v = other
                .as_i128()
                .ok_or_else(|| unsupported(value, "decimal"))?;
            Decimal::try_from_i128_with_scale(v, 0)
                .map_err(|_| format!("{} is out of range for a decimal", v))
        }
    }
}

fn to_char(value: &Value) -> Result<char, String> {
    let Value::String(s) = value else {
        return Err(unsupported(value, "char"));
    };
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("'{}' is not a single character", s)),
    }
}

fn to_text(value: &Value) -> Result<String, String> {
    match value {
        Value::Bytes(_) | Value::Uuid(_) | Value::Json(_) | Value::Null => {
            Err(unsupported(value, "varchar"))
        }
        other => Ok(other.to_string()),
    }
}

fn to_datetime(value: &Value) -> Result<NaiveDateTime, String> {
    match value {
        Value::DateTime(dt) => Ok(*dt),
        Value::DateTimeUtc(dt) => Ok(dt.naive_utc()),
        Value::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("{} has no midnight", d)),
        Value::String(s) => {
            parse_datetime(s).ok_or_else(|| format!("'{}' is not a recognized date", s.trim()))
        }
        _ => Err(unsupported(value, "date")),
    }
}

#[cfg(test)]
mod tests;
