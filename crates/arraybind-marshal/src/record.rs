//! Record description
//!
//! A record type taking part in a bulk request describes its fields once, as a
//! static table, through [`BulkRecord::describe_columns`]. The [`bulk_record!`]
//! macro builds that table from the declared field types using [`BindField`].
//!
//! [`bulk_record!`]: crate::bulk_record

use arraybind_core::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Underlying primitive kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Decimal,
    Char,
    String,
    Date,
    DateTime,
}

/// Kind of a record field as seen by the introspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A scalar with a known primitive kind
    Primitive(PrimitiveKind),
    /// A structured value (bytes, JSON, UUID, nested records)
    Composite(&'static str),
    /// An untyped value whose kind is only known per cell
    Dynamic,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Primitive(kind) => match kind {
                PrimitiveKind::Bool => "bool",
                PrimitiveKind::I8 => "i8",
                PrimitiveKind::U8 => "u8",
                PrimitiveKind::I16 => "i16",
                PrimitiveKind::U16 => "u16",
                PrimitiveKind::I32 => "i32",
                PrimitiveKind::U32 => "u32",
                PrimitiveKind::I64 => "i64",
                PrimitiveKind::U64 => "u64",
                PrimitiveKind::F32 => "f32",
                PrimitiveKind::F64 => "f64",
                PrimitiveKind::Decimal => "decimal",
                PrimitiveKind::Char => "char",
                PrimitiveKind::String => "string",
                PrimitiveKind::Date => "date",
                PrimitiveKind::DateTime => "datetime",
            },
            FieldKind::Composite(name) => name,
            FieldKind::Dynamic => "dynamic",
        }
    }
}

/// Static description of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordField {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Whether the field can hold "no value" independently of its kind
    pub nullable: bool,
}

impl RecordField {
    pub const fn new(name: &'static str, kind: FieldKind, nullable: bool) -> Self {
        Self {
            name,
            kind,
            nullable,
        }
    }
}

/// A Rust type usable as a record field.
pub trait BindField {
    const KIND: FieldKind;
    const NULLABLE: bool = false;

    /// Current value; `Value::Null` when absent.
    fn to_value(&self) -> Value;
}

/// A record type that can be marshalled into column arrays.
pub trait BulkRecord {
    /// Ordered field descriptions, computed once per type.
    fn describe_columns() -> &'static [RecordField];

    /// Value of the field at `index` in [`describe_columns`](Self::describe_columns).
    fn field_value(&self, index: usize) -> Value;
}

macro_rules! impl_bind_field {
    ($($ty:ty => $kind:ident, $variant:ident);* $(;)?) => {
        $(
            impl BindField for $ty {
                const KIND: FieldKind = FieldKind::Primitive(PrimitiveKind::$kind);

                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }
            }
        )*
    };
}

impl_bind_field! {
    bool => Bool, Bool;
    i8 => I8, Int8;
    u8 => U8, UInt8;
    i16 => I16, Int16;
    u16 => U16, UInt16;
    i32 => I32, Int32;
    u32 => U32, UInt32;
    i64 => I64, Int64;
    u64 => U64, UInt64;
    f32 => F32, Float32;
    f64 => F64, Float64;
    NaiveDate => Date, Date;
    NaiveDateTime => DateTime, DateTime;
    DateTime<Utc> => DateTime, DateTimeUtc;
}

impl BindField for Decimal {
    const KIND: FieldKind = FieldKind::Primitive(PrimitiveKind::Decimal);

    fn to_value(&self) -> Value {
        Value::Decimal(self.to_string())
    }
}

impl BindField for char {
    const KIND: FieldKind = FieldKind::Primitive(PrimitiveKind::Char);

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl BindField for String {
    const KIND: FieldKind = FieldKind::Primitive(PrimitiveKind::String);

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl BindField for Vec<u8> {
    const KIND: FieldKind = FieldKind::Composite("bytes");

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl BindField for Uuid {
    const KIND: FieldKind = FieldKind::Composite("uuid");

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl BindField for serde_json::Value {
    const KIND: FieldKind = FieldKind::Composite("json");

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl BindField for Value {
    const KIND: FieldKind = FieldKind::Dynamic;

    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: BindField> BindField for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(value) => value.to_value(),
            None => Value::Null,
        }
    }
}

/// Implements [`BulkRecord`] for a struct from its field list.
///
/// Field names are used as placeholder names.
///
/// ```
/// use arraybind_marshal::{bulk_record, BulkRecord};
///
/// struct Item {
///     id: i64,
///     note: Option<String>,
/// }
///
/// bulk_record!(Item { id: i64, note: Option<String> });
///
/// let columns = Item::describe_columns();
/// assert_eq!(columns[0].name, "id");
/// assert!(columns[1].nullable);
/// ```
#[macro_export]
macro_rules! bulk_record {
    ($record:ty { $($field:ident : $ty:ty),* $(,)? }) => {
        impl $crate::BulkRecord for $record {
            fn describe_columns() -> &'static [$crate::RecordField] {
                const COLUMNS: &[$crate::RecordField] = &[
                    $(
                        $crate::RecordField::new(
                            stringify!($field),
                            <$ty as $crate::BindField>::KIND,
                            <$ty as $crate::BindField>::NULLABLE,
                        ),
                    )*
                ];
                COLUMNS
            }

            fn field_value(&self, index: usize) -> $crate::Value {
                const ACCESSORS: &[fn(&$record) -> $crate::Value] = &[
                    $(
                        |record: &$record| {
                            <$ty as $crate::BindField>::to_value(&record.$field)
                        },
                    )*
                ];
                match ACCESSORS.get(index) {
                    Some(accessor) => accessor(self),
                    None => $crate::Value::Null,
                }
            }
        }
    };
}
