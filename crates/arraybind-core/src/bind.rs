//! Array-bind wire contract
//!
//! These types are what a driver receives for a bulk execution: one
//! [`BindArray`] per placeholder occurrence, in textual order, each holding one
//! value per parameter row. Nullable columns carry a parallel status channel so
//! SQL NULL never has to be encoded as an in-band sentinel value.

use std::ops::Range;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{ArraybindError, Result, Value};

/// Database column type tag attached to every bound array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    Boolean,
    /// Single byte, carried widened as `Value::Int16`
    Byte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    /// Fixed-point decimal, carried as a normalized `Value::Decimal` string
    Decimal,
    Char,
    Varchar,
    /// Calendar date with time of day, carried as `Value::DateTime`
    Date,
}

impl DbType {
    /// Lowercase tag name
    pub fn name(&self) -> &'static str {
        match self {
            DbType::Boolean => "boolean",
            DbType::Byte => "byte",
            DbType::Int16 => "int16",
            DbType::Int32 => "int32",
            DbType::Int64 => "int64",
            DbType::Single => "single",
            DbType::Double => "double",
            DbType::Decimal => "decimal",
            DbType::Char => "char",
            DbType::Varchar => "varchar",
            DbType::Date => "date",
        }
    }

    /// Value written into a cell whose status is `NullInsert`.
    ///
    /// Drivers never read it; it only keeps the values array dense and typed.
    pub fn placeholder_value(&self) -> Value {
        match self {
            DbType::Boolean => Value::Bool(false),
            DbType::Byte | DbType::Int16 => Value::Int16(0),
            DbType::Int32 => Value::Int32(0),
            DbType::Int64 => Value::Int64(0),
            DbType::Single => Value::Float32(0.0),
            DbType::Double => Value::Float64(0.0),
            DbType::Decimal => Value::Decimal("0".to_string()),
            DbType::Char | DbType::Varchar => Value::String(String::new()),
            DbType::Date => Value::DateTime(NaiveDateTime::default()),
        }
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-row status of a nullable bound array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindStatus {
    /// Use the value at this row
    Success,
    /// Write SQL NULL at this row and ignore the value
    NullInsert,
}

/// One positional array parameter
#[derive(Debug, Clone, PartialEq)]
pub struct BindArray {
    name: String,
    db_type: DbType,
    values: Vec<Value>,
    status: Option<Vec<BindStatus>>,
}

impl BindArray {
    /// Create an array without a status channel (every row carries a value)
    pub fn new(name: impl Into<String>, db_type: DbType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            db_type,
            values,
            status: None,
        }
    }

    /// Build a nullable array: absent cells become the type's placeholder value
    /// plus `NullInsert`.
    pub fn nullable(name: impl Into<String>, db_type: DbType, cells: Vec<Option<Value>>) -> Self {
        let mut values = Vec::with_capacity(cells.len());
        let mut status = Vec::with_capacity(cells.len());
        for cell in cells {
            match cell {
                Some(value) => {
                    values.push(value);
                    status.push(BindStatus::Success);
                }
                None => {
                    values.push(db_type.placeholder_value());
                    status.push(BindStatus::NullInsert);
                }
            }
        }
        Self {
            name: name.into(),
            db_type,
            values,
            status: Some(status),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Status channel, present only for nullable arrays
    pub fn status(&self) -> Option<&[BindStatus]> {
        self.status.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the driver must write SQL NULL at `row`
    pub fn is_null_at(&self, row: usize) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.get(row))
            .is_some_and(|s| *s == BindStatus::NullInsert)
    }

    /// Value to bind at `row`, or `None` for SQL NULL
    pub fn cell(&self, row: usize) -> Option<&Value> {
        if self.is_null_at(row) {
            None
        } else {
            self.values.get(row)
        }
    }
}

/// A fully bound array-bind command, ready for exactly one round trip
#[derive(Debug, Clone)]
pub struct ArrayBindCommand {
    sql: String,
    placeholders: Vec<Range<usize>>,
    bind_count: usize,
    arrays: Vec<BindArray>,
    timeout: Option<Duration>,
}

impl ArrayBindCommand {
    /// Create a command.
    ///
    /// `placeholders` are the byte spans of every placeholder occurrence in
    /// `sql`, left to right; `arrays[i]` is bound to `placeholders[i]`.
    pub fn new(
        sql: impl Into<String>,
        placeholders: Vec<Range<usize>>,
        bind_count: usize,
        arrays: Vec<BindArray>,
    ) -> Result<Self> {
        let sql = sql.into();

        if placeholders.len() != arrays.len() {
            return Err(ArraybindError::Bind(format!(
                "statement has {} placeholders but {} arrays were bound",
                placeholders.len(),
                arrays.len()
            )));
        }

        let mut last_end = 0;
        for span in &placeholders {
            if span.start < last_end
                || span.start >= span.end
                || span.end > sql.len()
                || !sql.is_char_boundary(span.start)
                || !sql.is_char_boundary(span.end)
            {
                return Err(ArraybindError::Bind(format!(
                    "invalid placeholder span {}..{}",
                    span.start, span.end
                )));
            }
            last_end = span.end;
        }

        if let Some(array) = arrays.iter().find(|a| a.len() != bind_count) {
            return Err(ArraybindError::Bind(format!(
                "array '{}' has {} rows, expected {}",
                array.name(),
                array.len(),
                bind_count
            )));
        }

        Ok(Self {
            sql,
            placeholders,
            bind_count,
            arrays,
            timeout: None,
        })
    }

    /// Attach a time budget the driver should honor
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The SQL exactly as written by the caller
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholders(&self) -> &[Range<usize>] {
        &self.placeholders
    }

    /// Number of parameter rows
    pub fn bind_count(&self) -> usize {
        self.bind_count
    }

    pub fn arrays(&self) -> &[BindArray] {
        &self.arrays
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Rewrite the SQL replacing each placeholder occurrence with `render(ordinal)`.
    ///
    /// Drivers whose native named binding would merge repeated names use this to
    /// produce a strictly positional statement.
    pub fn positional_sql(&self, mut render: impl FnMut(usize) -> String) -> String {
        let mut result = String::with_capacity(self.sql.len());
        let mut last_end = 0;
        for (ordinal, span) in self.placeholders.iter().enumerate() {
            result.push_str(&self.sql[last_end..span.start]);
            result.push_str(&render(ordinal));
            last_end = span.end;
        }
        result.push_str(&self.sql[last_end..]);
        result
    }

    /// Parameters of one row in positional order (`None` is SQL NULL)
    pub fn row(&self, row: usize) -> impl Iterator<Item = Option<&Value>> + '_ {
        self.arrays.iter().map(move |array| array.cell(row))
    }
}
