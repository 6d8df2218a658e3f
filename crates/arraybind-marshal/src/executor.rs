//! Bulk executor
//!
//! Ties extraction, introspection and column building together and hands the
//! resulting command to an [`ArrayBinder`] in exactly one round trip.

use std::time::{Duration, Instant};

use arraybind_core::{ArrayBindCommand, ArrayBinder, ArraybindError};

use crate::column::{ColumnArray, build_columns};
use crate::error::{BulkError, BulkResult};
use crate::introspect::resolve_fields;
use crate::placeholders::{Placeholder, PlaceholderMarker, extract_placeholders_with_marker};
use crate::record::BulkRecord;

/// Configuration options for bulk execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOptions {
    /// Time budget for the round trip (`None` = no limit)
    pub command_timeout: Option<Duration>,
    /// Character introducing a named placeholder
    pub marker: PlaceholderMarker,
}

impl BulkOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the round trip time budget
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Set the placeholder marker
    pub fn with_marker(mut self, marker: PlaceholderMarker) -> Self {
        self.marker = marker;
        self
    }
}

/// A statement plus the column arrays bound to its placeholder occurrences.
///
/// Built from records with [`BulkBatch::from_records`], or by hand with
/// [`BulkBatch::push`] for callers that already hold columnar data.
#[derive(Debug, Clone)]
pub struct BulkBatch {
    sql: String,
    placeholders: Vec<Placeholder>,
    bind_count: usize,
    arrays: Vec<ColumnArray>,
}

impl BulkBatch {
    /// Empty batch of `bind_count` rows for `sql`, using `:` placeholders
    pub fn new(sql: impl Into<String>, bind_count: usize) -> Self {
        Self::with_marker(sql, bind_count, PlaceholderMarker::default())
    }

    /// Empty batch of `bind_count` rows for `sql`
    pub fn with_marker(sql: impl Into<String>, bind_count: usize, marker: PlaceholderMarker) -> Self {
        let sql = sql.into();
        let placeholders = extract_placeholders_with_marker(&sql, marker);
        Self {
            sql,
            placeholders,
            bind_count,
            arrays: Vec::new(),
        }
    }

    /// Marshal `records` into one column per placeholder occurrence.
    pub fn from_records<R: BulkRecord>(sql: impl Into<String>, records: &[R]) -> BulkResult<Self> {
        Self::from_records_with_marker(sql, records, PlaceholderMarker::default())
    }

    pub fn from_records_with_marker<R: BulkRecord>(
        sql: impl Into<String>,
        records: &[R],
        marker: PlaceholderMarker,
    ) -> BulkResult<Self> {
        let mut batch = Self::with_marker(sql, records.len(), marker);
        let resolved = resolve_fields::<R>(&batch.placeholders)?;
        batch.arrays = build_columns(&resolved, records)?;

        tracing::debug!(
            placeholders = batch.placeholders.len(),
            rows = batch.bind_count,
            "marshalled records into column arrays"
        );
        Ok(batch)
    }

    /// Attach the array for the next placeholder occurrence
    pub fn push(&mut self, array: ColumnArray) -> &mut Self {
        self.arrays.push(array);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Number of parameter rows
    pub fn bind_count(&self) -> usize {
        self.bind_count
    }

    pub fn arrays(&self) -> &[ColumnArray] {
        &self.arrays
    }

    /// Check the arrays against the statement and build the driver command.
    pub fn bind(self, timeout: Option<Duration>) -> BulkResult<ArrayBindCommand> {
        if self.placeholders.len() != self.arrays.len() {
            return Err(BulkError::ParameterCountMismatch {
                placeholders: self.placeholders.len(),
                arrays: self.arrays.len(),
            });
        }
        if let Some(array) = self.arrays.iter().find(|a| a.len() != self.bind_count) {
            return Err(BulkError::ArrayLengthMismatch {
                field: array.field().to_string(),
                expected: self.bind_count,
                actual: array.len(),
            });
        }

        let spans = self.placeholders.into_iter().map(|p| p.span).collect();
        let arrays = self
            .arrays
            .into_iter()
            .map(ColumnArray::into_bind_array)
            .collect();

        ArrayBindCommand::new(self.sql, spans, self.bind_count, arrays)
            .map(|command| command.with_timeout(timeout))
            .map_err(BulkError::InvalidCommand)
    }
}

/// Executes bulk requests against a connection or transaction
#[derive(Debug, Clone, Default)]
pub struct BulkExecutor {
    options: BulkOptions,
}

impl BulkExecutor {
    /// Create a new bulk executor with the given options
    pub fn new(options: BulkOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BulkOptions {
        &self.options
    }

    /// Marshal `records` and run `sql` once for all of them.
    ///
    /// Returns the affected-row count reported by the driver. Every
    /// marshalling error is raised before anything reaches `target`. An empty
    /// `records` slice still resolves the record type but performs no round
    /// trip.
    #[tracing::instrument(
        skip(self, target, sql, records),
        fields(
            sql_preview = %sql.chars().take(100).collect::<String>(),
            rows = records.len(),
        )
    )]
    pub async fn execute<R, T>(&self, target: &T, sql: &str, records: &[R]) -> BulkResult<u64>
    where
        R: BulkRecord,
        T: ArrayBinder + ?Sized,
    {
        let batch = BulkBatch::from_records_with_marker(sql, records, self.options.marker)?;
        self.execute_batch(target, batch).await
    }

    /// Run an already marshalled batch in one round trip.
    pub async fn execute_batch<T>(&self, target: &T, batch: BulkBatch) -> BulkResult<u64>
    where
        T: ArrayBinder + ?Sized,
    {
        let limit = self.options.command_timeout;
        let command = batch.bind(limit)?;

        if command.bind_count() == 0 {
            tracing::debug!("no rows to bind, skipping round trip");
            return Ok(0);
        }

        let start = Instant::now();
        let outcome = match limit {
            Some(limit) => tokio::time::timeout(limit, target.execute_array(&command))
                .await
                .map_err(|_| BulkError::Timeout(limit))?,
            None => target.execute_array(&command).await,
        };

        let result = outcome.map_err(|err| match (err, limit) {
            (ArraybindError::Timeout(_), Some(limit)) => BulkError::Timeout(limit),
            (err, _) => BulkError::Execution(err),
        })?;

        tracing::debug!(
            rows = command.bind_count(),
            arrays = command.arrays().len(),
            affected_rows = result.affected_rows,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "bulk execution finished"
        );
        Ok(result.affected_rows)
    }
}
