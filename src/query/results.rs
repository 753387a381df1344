//! Row shaping and row iteration.
//!
//! This module provides the [`Row`] type in its output shapes and the two row
//! iterators over a [`Query`]: [`Rows`] borrows the query, [`QueryRows`] owns it.

use crate::error::QueryError;
use crate::query::params::{OutputShape, QueryParams};
use crate::query::statement::Query;
use crate::query::IntoColumns;
use crate::transport::SharedService;
use indexmap::IndexMap;
use tracing::warn;

/// One result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// Column name to value, in column order
    Dict(IndexMap<String, String>),
    /// Plain list of column values
    List(Vec<String>),
    /// Multi-column tuple
    Tuple(Vec<String>),
    /// Single-column tuple collapsed to its value
    Scalar(String),
}

impl Row {
    /// Present raw `values` for `columns` in the requested `shape`.
    pub fn shape(values: Vec<String>, columns: &[String], shape: OutputShape) -> Row {
        match shape {
            OutputShape::AsTuple if columns.len() == 1 => {
                Row::Scalar(values.into_iter().next().unwrap_or_default())
            }
            OutputShape::AsTuple => Row::Tuple(values),
            OutputShape::AsList => Row::List(values),
            OutputShape::AsDict => Row::Dict(columns.iter().cloned().zip(values).collect()),
        }
    }

    /// Values in column order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Row::Dict(map) => map.values().map(String::as_str).collect(),
            Row::List(values) | Row::Tuple(values) => values.iter().map(String::as_str).collect(),
            Row::Scalar(value) => vec![value.as_str()],
        }
    }

    /// Consume the row into its values, in column order.
    pub fn into_values(self) -> Vec<String> {
        match self {
            Row::Dict(map) => map.into_values().collect(),
            Row::List(values) | Row::Tuple(values) => values,
            Row::Scalar(value) => vec![value],
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Row::Dict(map) => map.len(),
            Row::List(values) | Row::Tuple(values) => values.len(),
            Row::Scalar(_) => 1,
        }
    }

    /// True if the row holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value by position.
    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            Row::Dict(map) => map.get_index(index).map(|(_, v)| v.as_str()),
            Row::List(values) | Row::Tuple(values) => values.get(index).map(String::as_str),
            Row::Scalar(value) => (index == 0).then_some(value.as_str()),
        }
    }

    /// Value by column name. Only dict rows carry names.
    pub fn get_by_name(&self, column: &str) -> Option<&str> {
        match self {
            Row::Dict(map) => map.get(column).map(String::as_str),
            _ => None,
        }
    }

    /// The bare value of a collapsed single-column row.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Row::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Column names of a dict row.
    pub fn keys(&self) -> Option<Vec<&str>> {
        match self {
            Row::Dict(map) => Some(map.keys().map(String::as_str).collect()),
            _ => None,
        }
    }
}

/// Row iterator borrowing a query.
///
/// Dropping it before the rows are exhausted closes the query before the drop
/// returns, releasing the server-side cursor or handle.
pub struct Rows<'a> {
    query: &'a mut Query,
    started: bool,
    finished: bool,
}

impl<'a> Rows<'a> {
    pub(crate) fn new(query: &'a mut Query) -> Self {
        Self {
            query,
            started: false,
            finished: false,
        }
    }

    /// Close the underlying query now.
    pub fn close(&mut self) -> Result<(), QueryError> {
        self.finished = true;
        self.query.close()
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Row, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        self.started = true;
        next_item(self.query, &mut self.finished)
    }
}

impl Drop for Rows<'_> {
    fn drop(&mut self) {
        if self.started && self.query.is_active() {
            if let Err(e) = self.query.close() {
                warn!(error = %e, "failed to close abandoned query");
            }
        }
    }
}

/// Row iterator owning its query; the query closes when the iterator is dropped.
pub struct QueryRows {
    query: Query,
    finished: bool,
}

impl QueryRows {
    pub(crate) fn new(query: Query) -> Self {
        Self {
            query,
            finished: false,
        }
    }

    /// The query being iterated.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Close the underlying query now.
    pub fn close(&mut self) -> Result<(), QueryError> {
        self.finished = true;
        self.query.close()
    }
}

impl Iterator for QueryRows {
    type Item = Result<Row, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        next_item(&mut self.query, &mut self.finished)
    }
}

fn next_item(query: &mut Query, finished: &mut bool) -> Option<Result<Row, QueryError>> {
    match query.next_row() {
        Ok(Some(row)) => Some(Ok(row)),
        Ok(None) => {
            *finished = true;
            None
        }
        Err(e) => {
            *finished = true;
            Some(Err(e))
        }
    }
}

impl IntoIterator for Query {
    type Item = Result<Row, QueryError>;
    type IntoIter = QueryRows;

    fn into_iter(self) -> Self::IntoIter {
        QueryRows::new(self)
    }
}

impl<'a> IntoIterator for &'a mut Query {
    type Item = Result<Row, QueryError>;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        Rows::new(self)
    }
}

/// Row-at-a-time query over `columns` matching `conditions`, rows shaped as `output`.
pub fn row_iterator(
    service: SharedService,
    columns: impl IntoColumns,
    conditions: &str,
    output: OutputShape,
) -> Result<Query, QueryError> {
    let mut params = QueryParams::new(columns)?;
    params.conditions = conditions.to_string();
    params.output = output;
    Query::from_params(service, params)
}
