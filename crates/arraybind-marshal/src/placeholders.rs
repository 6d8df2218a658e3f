//! SQL Placeholder Extractor
//!
//! Finds every named placeholder occurrence in a SQL statement, left to right.
//! Repeated names are reported once per occurrence: array binds are positional,
//! so the N-th occurrence in the text is the N-th bound parameter.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Character that introduces a named placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderMarker {
    /// `:name` - Oracle, SQLite
    #[default]
    Colon,
    /// `@name` - SQL Server
    At,
}

impl PlaceholderMarker {
    pub fn as_char(&self) -> char {
        match self {
            PlaceholderMarker::Colon => ':',
            PlaceholderMarker::At => '@',
        }
    }

    fn regex(&self) -> &'static Regex {
        match self {
            PlaceholderMarker::Colon => &COLON_NAMED_REGEX,
            PlaceholderMarker::At => &AT_NAMED_REGEX,
        }
    }
}

/// One placeholder occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder {
    /// Name without the marker
    pub name: String,
    /// Position among all occurrences (0-based)
    pub ordinal: usize,
    /// Byte range of the marker and name in the original SQL
    pub span: Range<usize>,
}

static COLON_NAMED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z0-9_]+)").expect("valid regex"));

static AT_NAMED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_]+)").expect("valid regex"));

// String literals and comments are masked before scanning. Only a doubled
// quote escapes inside a literal; a backslash is an ordinary character.
static STRING_LITERAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'(?:[^']|'')*'|--[^\n]*|/\*[\s\S]*?\*/").expect("valid regex")
});

/// Extracts `:name` placeholder occurrences from a SQL statement.
///
/// # Example
///
/// ```
/// use arraybind_marshal::extract_placeholders;
///
/// let found = extract_placeholders("UPDATE t SET a = :a WHERE id = :id OR parent = :id");
/// let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
/// assert_eq!(names, vec!["a", "id", "id"]);
/// ```
pub fn extract_placeholders(sql: &str) -> Vec<Placeholder> {
    extract_placeholders_with_marker(sql, PlaceholderMarker::Colon)
}

/// Extracts placeholder occurrences introduced by `marker`.
///
/// Occurrences inside string literals and comments are ignored, and so is a
/// marker directly preceded by another marker (`value::int`, `@@ROWCOUNT`).
pub fn extract_placeholders_with_marker(sql: &str, marker: PlaceholderMarker) -> Vec<Placeholder> {
    let masked_sql = mask_strings_and_comments(sql);
    let marker_byte = marker.as_char() as u8;
    let bytes = masked_sql.as_bytes();

    let mut placeholders = Vec::new();
    for cap in marker.regex().captures_iter(&masked_sql) {
        let (Some(full), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if full.start() > 0 && bytes[full.start() - 1] == marker_byte {
            continue;
        }
        placeholders.push(Placeholder {
            name: name.as_str().to_string(),
            ordinal: placeholders.len(),
            span: full.range(),
        });
    }

    tracing::trace!(count = placeholders.len(), "extracted placeholders");
    placeholders
}

/// Masks string literals and comments in SQL with spaces.
///
/// The replacement has the same byte length, so spans found in the masked
/// text are valid in the original.
fn mask_strings_and_comments(sql: &str) -> String {
    STRING_LITERAL_REGEX
        .replace_all(sql, |caps: &regex::Captures| " ".repeat(caps[0].len()))
        .into_owned()
}
