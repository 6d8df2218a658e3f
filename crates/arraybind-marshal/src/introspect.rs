//! Type Introspector
//!
//! Resolves each placeholder occurrence to a field of the record type and
//! maps the field's primitive kind to a database type tag.

use arraybind_core::DbType;

use crate::error::{BulkError, BulkResult};
use crate::placeholders::Placeholder;
use crate::record::{BulkRecord, FieldKind, PrimitiveKind, RecordField};

/// Primitive kind to database type mapping.
static TYPE_MAP: &[(PrimitiveKind, DbType)] = &[
    (PrimitiveKind::Bool, DbType::Boolean),
    (PrimitiveKind::I8, DbType::Byte),
    (PrimitiveKind::U8, DbType::Byte),
    (PrimitiveKind::I16, DbType::Int16),
    (PrimitiveKind::U16, DbType::Int16),
    (PrimitiveKind::I32, DbType::Int32),
    (PrimitiveKind::U32, DbType::Int32),
    (PrimitiveKind::I64, DbType::Int64),
    (PrimitiveKind::U64, DbType::Int64),
    (PrimitiveKind::F32, DbType::Single),
    (PrimitiveKind::F64, DbType::Double),
    (PrimitiveKind::Decimal, DbType::Decimal),
    (PrimitiveKind::Char, DbType::Char),
    (PrimitiveKind::String, DbType::Varchar),
    (PrimitiveKind::Date, DbType::Date),
    (PrimitiveKind::DateTime, DbType::Date),
];

/// Looks up the database type for a primitive kind.
pub fn db_type_for(kind: PrimitiveKind) -> Option<DbType> {
    TYPE_MAP
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .map(|(_, db_type)| *db_type)
}

/// A placeholder occurrence bound to a record field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub placeholder: Placeholder,
    /// Index into the record's column table
    pub field_index: usize,
    pub field_name: &'static str,
    pub db_type: DbType,
    pub nullable: bool,
}

/// Resolves one placeholder occurrence against `R`.
///
/// Field names match ASCII case-insensitively; the first declared field wins.
pub fn resolve_field<R: BulkRecord>(placeholder: &Placeholder) -> BulkResult<ResolvedField> {
    let columns = R::describe_columns();
    let (field_index, field) = find_field(columns, &placeholder.name).ok_or_else(|| {
        BulkError::FieldNotFound {
            placeholder: placeholder.name.clone(),
            record: std::any::type_name::<R>(),
        }
    })?;

    let db_type = match field.kind {
        FieldKind::Primitive(kind) => {
            db_type_for(kind).ok_or_else(|| BulkError::UnsupportedType {
                field: field.name.to_string(),
                type_name: field.kind.type_name(),
            })?
        }
        FieldKind::Dynamic if field.nullable => {
            return Err(BulkError::IndeterminateType {
                field: field.name.to_string(),
            });
        }
        FieldKind::Composite(_) | FieldKind::Dynamic => {
            return Err(BulkError::UnsupportedType {
                field: field.name.to_string(),
                type_name: field.kind.type_name(),
            });
        }
    };

    Ok(ResolvedField {
        placeholder: placeholder.clone(),
        field_index,
        field_name: field.name,
        db_type,
        nullable: field.nullable,
    })
}

/// Resolves every occurrence, in order. Repeats are resolved independently.
pub fn resolve_fields<R: BulkRecord>(placeholders: &[Placeholder]) -> BulkResult<Vec<ResolvedField>> {
    placeholders.iter().map(resolve_field::<R>).collect()
}

fn find_field<'a>(columns: &'a [RecordField], name: &str) -> Option<(usize, &'a RecordField)> {
    columns
        .iter()
        .enumerate()
        .find(|(_, field)| field.name.eq_ignore_ascii_case(name))
}
