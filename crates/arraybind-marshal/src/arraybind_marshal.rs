//! Arraybind Marshal - Bulk array-bind parameter marshalling
//!
//! Turns a SQL statement with named placeholders plus a slice of records into
//! one positional array parameter per placeholder occurrence, and runs the
//! statement once for all records in a single round trip.
//!
//! ```ignore
//! bulk_record!(Price { item_code: String, price: Decimal });
//!
//! let executor = BulkExecutor::new(BulkOptions::new());
//! let affected = executor
//!     .execute(&*tx, "UPDATE prices SET price = :price WHERE item = :item_code", &prices)
//!     .await?;
//! ```

mod column;
mod convert;
mod error;
mod executor;
mod introspect;
mod placeholders;
mod record;

pub use arraybind_core::{ArrayBindCommand, ArrayBinder, BindArray, BindStatus, DbType, Value};

pub use column::{ColumnArray, build_column, build_columns};
pub use convert::{convert_value, parse_datetime};
pub use error::{BulkError, BulkResult};
pub use executor::{BulkBatch, BulkExecutor, BulkOptions};
pub use introspect::{ResolvedField, db_type_for, resolve_field, resolve_fields};
pub use placeholders::{
    Placeholder, PlaceholderMarker, extract_placeholders, extract_placeholders_with_marker,
};
pub use record::{BindField, BulkRecord, FieldKind, PrimitiveKind, RecordField};
