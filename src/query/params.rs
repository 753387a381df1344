//! Query parameters and the query builder.
//!
//! [`QueryParams`] is the complete, immutable configuration of a [`Query`]. It is
//! serde-serializable so parameters can be loaded from JSON and overridden by name
//! (see [`Query::copy`]).

use crate::error::QueryError;
use crate::query::columns::IntoColumns;
use crate::query::statement::Query;
use crate::transport::{QueryOptions, SharedService};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names accepted by [`Query::copy`], in listing order.
pub const PARAMETER_NAMES: [&str; 9] = [
    "columns",
    "conditions",
    "output",
    "offset",
    "limit",
    "case_sensitive",
    "options",
    "parser",
    "order_by",
];

/// Query protocol used to talk to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Parser {
    /// Cursor protocol: batched fetches, closed via an auto-close fetch.
    #[default]
    #[serde(rename = "GENQUERY1")]
    GenQuery1,
    /// Handle protocol: execute once, pull rows one at a time, free explicitly.
    #[serde(rename = "GENQUERY2")]
    GenQuery2,
}

impl Parser {
    /// Name used in the rendered query text.
    pub fn name(&self) -> &'static str {
        match self {
            Parser::GenQuery1 => "GENQUERY1",
            Parser::GenQuery2 => "GENQUERY2",
        }
    }
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parser {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GENQUERY1" | "1" => Ok(Parser::GenQuery1),
            "GENQUERY2" | "2" => Ok(Parser::GenQuery2),
            other => Err(QueryError::InvalidParser(format!(
                "expected GENQUERY1 or GENQUERY2, got '{other}'"
            ))),
        }
    }
}

/// Shape each row is presented in on the cursor protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputShape {
    /// Column names zipped to values, in column order
    #[serde(rename = "AS_DICT")]
    AsDict,
    /// Plain list of column values
    #[serde(rename = "AS_LIST")]
    AsList,
    /// Like `AsList`, but single-column rows collapse to a bare value
    #[default]
    #[serde(rename = "AS_TUPLE")]
    AsTuple,
}

impl OutputShape {
    /// Marker name.
    pub fn name(&self) -> &'static str {
        match self {
            OutputShape::AsDict => "AS_DICT",
            OutputShape::AsList => "AS_LIST",
            OutputShape::AsTuple => "AS_TUPLE",
        }
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputShape {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AS_DICT" => Ok(OutputShape::AsDict),
            "AS_LIST" => Ok(OutputShape::AsList),
            "AS_TUPLE" => Ok(OutputShape::AsTuple),
            other => Err(QueryError::RowReturnType(format!(
                "expected AS_DICT, AS_LIST or AS_TUPLE, got '{other}'"
            ))),
        }
    }
}

/// Complete caller-visible configuration of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryParams {
    /// Projected columns; order determines row shape
    pub columns: Vec<String>,
    /// Filter expression, empty for none
    #[serde(default)]
    pub conditions: String,
    /// Row shape on the cursor protocol
    #[serde(default)]
    pub output: OutputShape,
    /// Rows to skip
    #[serde(default)]
    pub offset: u64,
    /// Maximum rows to return
    #[serde(default)]
    pub limit: Option<u64>,
    /// When false the where clause is upper-cased before execution
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
    /// Extra cursor protocol option bits
    #[serde(default)]
    pub options: QueryOptions,
    /// Protocol selector
    #[serde(default)]
    pub parser: Parser,
    /// Ordering clause, only honoured by the handle protocol
    #[serde(default)]
    pub order_by: String,
}

fn default_case_sensitive() -> bool {
    true
}

impl QueryParams {
    /// Parameters for `columns` with every other setting at its default.
    pub fn new(columns: impl IntoColumns) -> Result<Self, QueryError> {
        Ok(Self {
            columns: columns.into_columns()?,
            conditions: String::new(),
            output: OutputShape::default(),
            offset: 0,
            limit: None,
            case_sensitive: true,
            options: QueryOptions::NONE,
            parser: Parser::default(),
            order_by: String::new(),
        })
    }

    /// Load parameters from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        let params: QueryParams = serde_json::from_str(json)?;
        params.validated()
    }

    /// Re-normalize the column list.
    pub(crate) fn validated(mut self) -> Result<Self, QueryError> {
        self.columns = self.columns.into_columns()?;
        Ok(self)
    }
}

/// Builder for [`Query`].
///
/// # Example
///
/// ```rust
/// use genquery_rs::query::{OutputShape, QueryBuilder};
///
/// let builder = QueryBuilder::new("COLL_NAME, DATA_NAME")
///     .conditions("DATA_SIZE > '10'")
///     .output(OutputShape::AsDict)
///     .offset(200)
///     .limit(100);
/// ```
#[derive(Debug)]
pub struct QueryBuilder {
    columns: Result<Vec<String>, QueryError>,
    conditions: String,
    output: OutputShape,
    offset: u64,
    limit: Option<u64>,
    case_sensitive: bool,
    options: QueryOptions,
    parser: Parser,
    order_by: String,
}

impl QueryBuilder {
    /// Start a query over `columns`.
    ///
    /// Column errors are reported by [`QueryBuilder::build`].
    pub fn new(columns: impl IntoColumns) -> Self {
        Self {
            columns: columns.into_columns(),
            conditions: String::new(),
            output: OutputShape::default(),
            offset: 0,
            limit: None,
            case_sensitive: true,
            options: QueryOptions::NONE,
            parser: Parser::default(),
            order_by: String::new(),
        }
    }

    /// Set the filter expression.
    pub fn conditions(mut self, conditions: &str) -> Self {
        self.conditions = conditions.to_string();
        self
    }

    /// Set the row shape.
    pub fn output(mut self, output: OutputShape) -> Self {
        self.output = output;
        self
    }

    /// Set the number of rows to skip.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the maximum number of rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Make the where clause case insensitive by passing `false`.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set extra cursor protocol option bits.
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Select the query protocol.
    pub fn parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    /// Set the ordering clause.
    pub fn order_by(mut self, order_by: &str) -> Self {
        self.order_by = order_by.to_string();
        self
    }

    /// Validated parameters.
    pub fn params(self) -> Result<QueryParams, QueryError> {
        Ok(QueryParams {
            columns: self.columns?,
            conditions: self.conditions,
            output: self.output,
            offset: self.offset,
            limit: self.limit,
            case_sensitive: self.case_sensitive,
            options: self.options,
            parser: self.parser,
            order_by: self.order_by,
        })
    }

    /// Build the (not yet executed) query.
    pub fn build(self, service: SharedService) -> Result<Query, QueryError> {
        Query::from_params(service, self.params()?)
    }
}
