//! Request and response shapes exchanged with the catalog service.
//!
//! These mirror the catalog's query input/output structures closely enough for the
//! query engine to drive both protocols. Construction and transport of the actual
//! wire messages is the service implementation's business.

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Maximum rows transferred per fetch on the cursor protocol.
pub const MAX_SQL_ROWS: usize = 256;

/// Status code embedded in the handle protocol's end-of-results failure.
pub const END_OF_RESULTSET: i32 = -408000;

/// Option bits understood by the cursor protocol.
///
/// `AUTO_CLOSE`, `RETURN_TOTAL_ROW_COUNT` and `UPPER_CASE_WHERE` are managed by
/// [`crate::Query`]; callers should only pass `NO_DISTINCT` and `QUOTA_QUERY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryOptions(u32);

impl QueryOptions {
    /// No options set.
    pub const NONE: QueryOptions = QueryOptions(0);
    /// Ask the service to report the total number of matching rows.
    pub const RETURN_TOTAL_ROW_COUNT: QueryOptions = QueryOptions(0x020);
    /// Disable the implicit DISTINCT.
    pub const NO_DISTINCT: QueryOptions = QueryOptions(0x040);
    /// Run as a quota query.
    pub const QUOTA_QUERY: QueryOptions = QueryOptions(0x080);
    /// Close the server-side statement after the next fetch.
    pub const AUTO_CLOSE: QueryOptions = QueryOptions(0x100);
    /// Upper-case the whole where clause before planning.
    pub const UPPER_CASE_WHERE: QueryOptions = QueryOptions(0x200);
    /// Bits set per execution or per fetch, never carried in query parameters.
    pub const EXECUTION_MANAGED: QueryOptions =
        QueryOptions(Self::AUTO_CLOSE.0 | Self::RETURN_TOTAL_ROW_COUNT.0);

    /// Build from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        QueryOptions(bits)
    }

    /// Raw bit value.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: QueryOptions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`.
    pub fn insert(&mut self, other: QueryOptions) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`.
    pub fn remove(&mut self, other: QueryOptions) {
        self.0 &= !other.0;
    }
}

impl BitOr for QueryOptions {
    type Output = QueryOptions;

    fn bitor(self, rhs: Self) -> Self::Output {
        QueryOptions(self.0 | rhs.0)
    }
}

impl BitOrAssign for QueryOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for QueryOptions {
    type Output = QueryOptions;

    fn bitand(self, rhs: Self) -> Self::Output {
        QueryOptions(self.0 & rhs.0)
    }
}

impl Not for QueryOptions {
    type Output = QueryOptions;

    fn not(self) -> Self::Output {
        QueryOptions(!self.0)
    }
}

impl fmt::Display for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:03x}", self.0)
    }
}

/// Cursor protocol query input, produced by the service's make-query call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenQueryInp {
    /// Projected columns, in selection order
    pub columns: Vec<String>,
    /// Filter expression as submitted
    pub conditions: String,
    /// Rows to skip before the first returned row
    pub row_offset: u64,
    /// Rows per fetch
    pub max_rows: usize,
    /// Option bits
    pub options: QueryOptions,
}

impl GenQueryInp {
    /// Create an input with the default fetch size and no options.
    pub fn new(columns: Vec<String>, conditions: impl Into<String>) -> Self {
        Self {
            columns,
            conditions: conditions.into(),
            row_offset: 0,
            max_rows: MAX_SQL_ROWS,
            options: QueryOptions::NONE,
        }
    }
}

/// One projected column of a fetched batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlColumn {
    /// Column values, one per batch row
    pub values: Vec<String>,
}

impl SqlColumn {
    /// Create a column from its values.
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Value at `row`, if the column holds that many.
    pub fn row(&self, row: usize) -> Option<&str> {
        self.values.get(row).map(String::as_str)
    }
}

/// Cursor protocol query output: one batch plus continuation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenQueryOut {
    /// Rows in this batch
    pub row_cnt: usize,
    /// > 0 while more batches are pending, <= 0 once the statement is closed
    pub continue_inx: i64,
    /// Total matching rows, only meaningful with `RETURN_TOTAL_ROW_COUNT`
    pub total_row_count: i64,
    /// Column-major batch values
    pub sql_result: Vec<SqlColumn>,
}

impl GenQueryOut {
    /// Collect row `r` across `column_count` columns.
    ///
    /// A batch whose columns hold fewer values than `row_cnt` promises is a
    /// protocol violation.
    pub fn row(&self, r: usize, column_count: usize) -> Result<Vec<String>, TransportError> {
        (0..column_count)
            .map(|c| {
                self.sql_result
                    .get(c)
                    .and_then(|col| col.row(r))
                    .map(str::to_string)
                    .ok_or_else(|| {
                        TransportError::Protocol(format!(
                            "batch of {} rows has no value for row {r} in column {c}",
                            self.row_cnt
                        ))
                    })
            })
            .collect()
    }
}

/// Opaque resultset handle issued by the handle protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gq2Handle(String);

impl Gq2Handle {
    /// Wrap a handle string returned by the service.
    pub fn new(handle: impl Into<String>) -> Self {
        Gq2Handle(handle.into())
    }

    /// Handle as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Gq2Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
