//! Column arrays
//!
//! A column array holds one converted cell per record for a single placeholder
//! occurrence. Cells are `None` where the record has no value.

use arraybind_core::{BindArray, BindStatus, DbType, Value};

use crate::convert::convert_value;
use crate::error::{BulkError, BulkResult};
use crate::introspect::ResolvedField;
use crate::record::BulkRecord;

/// Typed, per-placeholder array of cells
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnArray {
    field: String,
    db_type: DbType,
    nullable: bool,
    cells: Vec<Option<Value>>,
}

impl ColumnArray {
    /// Convert raw values into a column of `db_type`.
    ///
    /// `Value::Null` in a non-nullable column is a conversion error.
    pub fn from_values(
        field: impl Into<String>,
        db_type: DbType,
        nullable: bool,
        raw: Vec<Value>,
    ) -> BulkResult<Self> {
        let field = field.into();
        let mut cells = Vec::with_capacity(raw.len());

        for (row, value) in raw.into_iter().enumerate() {
            if value.is_null() {
                if !nullable {
                    return Err(BulkError::Conversion {
                        field,
                        row,
                        target: db_type,
                        reason: "null in a non-nullable field".to_string(),
                    });
                }
                cells.push(None);
                continue;
            }

            match convert_value(&value, db_type) {
                Ok(converted) => cells.push(Some(converted)),
                Err(reason) => {
                    return Err(BulkError::Conversion {
                        field,
                        row,
                        target: db_type,
                        reason,
                    });
                }
            }
        }

        Ok(Self {
            field,
            db_type,
            nullable,
            cells,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Option<Value>] {
        &self.cells
    }

    /// Dense values, with the type's placeholder value where a cell is absent
    pub fn values(&self) -> Vec<Value> {
        self.cells
            .iter()
            .map(|cell| {
                cell.clone()
                    .unwrap_or_else(|| self.db_type.placeholder_value())
            })
            .collect()
    }

    /// Status channel; `None` for non-nullable columns
    pub fn status(&self) -> Option<Vec<BindStatus>> {
        self.nullable.then(|| {
            self.cells
                .iter()
                .map(|cell| match cell {
                    Some(_) => BindStatus::Success,
                    None => BindStatus::NullInsert,
                })
                .collect()
        })
    }

    /// Wire form handed to the driver
    pub fn into_bind_array(self) -> BindArray {
        if self.nullable {
            BindArray::nullable(self.field, self.db_type, self.cells)
        } else {
            // Non-nullable columns never hold an absent cell.
            let values = self.cells.into_iter().flatten().collect();
            BindArray::new(self.field, self.db_type, values)
        }
    }
}

/// Read the resolved field from every record and build its column.
pub fn build_column<R: BulkRecord>(resolved: &ResolvedField, records: &[R]) -> BulkResult<ColumnArray> {
    let raw = records
        .iter()
        .map(|record| record.field_value(resolved.field_index))
        .collect();
    ColumnArray::from_values(resolved.field_name, resolved.db_type, resolved.nullable, raw)
}

/// Build one column per resolved occurrence, in order.
pub fn build_columns<R: BulkRecord>(
    resolved: &[ResolvedField],
    records: &[R],
) -> BulkResult<Vec<ColumnArray>> {
    resolved
        .iter()
        .map(|field| build_column(field, records))
        .collect()
}

#[cfg(test)]
mod tests;
