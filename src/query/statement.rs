//! The lazily executed catalog query.
//!
//! A [`Query`] holds its parameters and, once the first row or the total row count is
//! requested, the live cursor of whichever protocol it uses. The cursor is released
//! on exhaustion, on [`Query::close`], when a borrowing row iterator is abandoned, and
//! when the query is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use genquery_rs::{shared, Query, Row};
//!
//! let service = shared(my_catalog);
//! let mut query = Query::builder("COLL_NAME, DATA_NAME")
//!     .conditions("DATA_NAME like '%.dat'")
//!     .limit(100)
//!     .build(service)?;
//!
//! println!("{} matching objects", query.total_rows()?.unwrap_or(0));
//! for row in &mut query {
//!     let row = row?;
//!     println!("{}/{}", row.values()[0], row.values()[1]);
//! }
//! ```

use crate::error::QueryError;
use crate::query::columns::{columns_from_value, IntoColumns};
use crate::query::cursor::{self, CursorState};
use crate::query::params::{OutputShape, Parser, QueryBuilder, QueryParams, PARAMETER_NAMES};
use crate::query::results::{Row, Rows};
use crate::transport::{QueryOptions, SharedService};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// Observable lifecycle state of a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Not yet sent to the catalog
    Unexecuted,
    /// Executed and holding server-side state
    Active,
    /// Closed; iteration yields nothing further
    Closed,
}

/// Lazily executed catalog query.
pub struct Query {
    service: SharedService,
    params: QueryParams,
    /// Filter text as submitted, possibly upper-cased
    conditions_for_exec: String,
    state: CursorState,
    /// Count reported by the service at execution
    reported_total: Option<i64>,
    total: Option<i64>,
}

impl Query {
    /// Query over `columns` with default parameters.
    pub fn new(service: SharedService, columns: impl IntoColumns) -> Result<Self, QueryError> {
        Self::from_params(service, QueryParams::new(columns)?)
    }

    /// Start building a query over `columns`.
    pub fn builder(columns: impl IntoColumns) -> QueryBuilder {
        QueryBuilder::new(columns)
    }

    /// Query with the given parameters.
    ///
    /// The case-sensitivity flag is folded into the option bits here; callers
    /// should not set `UPPER_CASE_WHERE` themselves. `AUTO_CLOSE` and
    /// `RETURN_TOTAL_ROW_COUNT` are cleared; each execution derives them anew.
    pub fn from_params(service: SharedService, params: QueryParams) -> Result<Self, QueryError> {
        let mut params = params.validated()?;

        params.options.remove(QueryOptions::EXECUTION_MANAGED);
        if params.case_sensitive {
            params.options.remove(QueryOptions::UPPER_CASE_WHERE);
        } else {
            params.options.insert(QueryOptions::UPPER_CASE_WHERE);
        }

        Ok(Self {
            service,
            conditions_for_exec: params.conditions.clone(),
            params,
            state: CursorState::Unexecuted,
            reported_total: None,
            total: None,
        })
    }

    /// Current parameters, including derived option bits.
    pub fn parameters(&self) -> &QueryParams {
        &self.params
    }

    /// Projected columns.
    pub fn columns(&self) -> &[String] {
        &self.params.columns
    }

    /// Lifecycle state.
    pub fn state(&self) -> QueryState {
        match self.state {
            CursorState::Unexecuted => QueryState::Unexecuted,
            CursorState::Active(_) => QueryState::Active,
            CursorState::Closed => QueryState::Closed,
        }
    }

    /// True while server-side state is held.
    pub fn is_active(&self) -> bool {
        matches!(self.state, CursorState::Active(_))
    }

    /// Execute the query unless that already happened.
    ///
    /// Execution is delayed until the first row or the total row count is requested.
    /// A closed query is never re-executed; build a new one to run it again.
    pub fn exec_if_not_yet_execed(&mut self) -> Result<(), QueryError> {
        if !matches!(self.state, CursorState::Unexecuted) {
            return Ok(());
        }

        if self.params.parser == Parser::GenQuery1
            && self.params.options.contains(QueryOptions::UPPER_CASE_WHERE)
        {
            self.conditions_for_exec = self.params.conditions.to_uppercase();
        }

        let cursor = cursor::execute(&self.service, &self.params, &self.conditions_for_exec)?;
        self.reported_total = cursor.reported_total();
        self.total = None;
        self.state = CursorState::Active(cursor);
        Ok(())
    }

    /// Produce the next row, executing first if needed.
    ///
    /// Returns `Ok(None)` once the results, or the row limit, are exhausted; the
    /// query is closed at that point.
    pub fn next_row(&mut self) -> Result<Option<Row>, QueryError> {
        self.exec_if_not_yet_execed()?;

        let (row, finished) = {
            let CursorState::Active(cursor) = &mut self.state else {
                return Ok(None);
            };

            let row = match cursor.next_raw(&self.service)? {
                Some(values) if cursor.shapes_rows() => Some(Row::shape(
                    values,
                    &self.params.columns,
                    self.params.output,
                )),
                Some(values) => Some(Row::List(values)),
                None => None,
            };
            (row, cursor.is_finished())
        };

        if row.is_none() || finished {
            self.close()?;
        }
        Ok(row)
    }

    /// Iterate rows; abandoning the iterator closes the query.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows::new(self)
    }

    /// Run `f` over the rows and close the query on every exit path.
    pub fn with_rows<T>(&mut self, f: impl FnOnce(&mut Rows<'_>) -> T) -> Result<T, QueryError> {
        let result = {
            let mut rows = self.rows();
            f(&mut rows)
        };
        self.close()?;
        Ok(result)
    }

    /// First row, or `None` when nothing matches. The query is closed afterwards.
    pub fn first(&mut self) -> Result<Option<Row>, QueryError> {
        let row = self.next_row();
        let closed = self.close();
        let row = row?;
        closed?;
        Ok(row)
    }

    /// Total rows matching the query, ignoring offset and limit.
    ///
    /// The handle protocol does not count rows and always yields `None`; run a
    /// separate counting query when the figure is needed.
    pub fn total_rows(&mut self) -> Result<Option<i64>, QueryError> {
        if self.total.is_some() || self.params.parser == Parser::GenQuery2 {
            return Ok(self.total);
        }

        if self.params.offset == 0 {
            self.exec_if_not_yet_execed()?;
            self.total = self.reported_total;
        }

        if self.total.is_none() {
            // With an offset the catalog returns the count but no rows, so the count
            // comes from a separate zero-offset, zero-row query.
            let mut count_params = self.params.clone();
            count_params.output = OutputShape::default();
            count_params.offset = 0;
            count_params.limit = Some(0);
            count_params.order_by.clear();

            debug!(offset = self.params.offset, "counting rows with a separate query");
            let mut count_query = Query::from_params(self.service.clone(), count_params)?;
            self.total = count_query.total_rows()?;
            count_query.close()?;
        }

        Ok(self.total)
    }

    /// Release server-side state. Safe to call any number of times.
    ///
    /// Closing is terminal: afterwards iteration yields nothing.
    pub fn close(&mut self) -> Result<(), QueryError> {
        let CursorState::Active(mut cursor) =
            std::mem::replace(&mut self.state, CursorState::Closed)
        else {
            return Ok(());
        };

        debug!(parser = %cursor.parser(), "closing query");
        let released = cursor.release(&self.service);
        if cursor.parser() == Parser::GenQuery2 {
            self.params.order_by.clear();
        }
        released?;
        Ok(())
    }

    /// New query with these parameters, except for the named overrides.
    ///
    /// `overrides` is a JSON object keyed by parameter name. Unknown names fail with
    /// [`QueryError::OptionsSpec`].
    ///
    /// ```rust,ignore
    /// let page_two = query.copy(serde_json::json!({"offset": 100, "limit": 100}))?;
    /// ```
    pub fn copy(&self, overrides: Value) -> Result<Query, QueryError> {
        let Value::Object(overrides) = overrides else {
            return Err(QueryError::OptionsSpec(
                "overrides must be an object keyed by parameter name".to_string(),
            ));
        };

        let incorrect: Vec<&str> = overrides
            .keys()
            .map(String::as_str)
            .filter(|name| !PARAMETER_NAMES.contains(name))
            .collect();
        if !incorrect.is_empty() {
            return Err(QueryError::OptionsSpec(format!(
                "Incorrect option(s) to Query: {}",
                incorrect.join(", ")
            )));
        }

        let mut merged = serde_json::to_value(&self.params)?;
        for (name, value) in overrides {
            let value = match name.as_str() {
                "columns" => Value::from(columns_from_value(&value)?),
                "output" => {
                    let shape: OutputShape = marker(&value, QueryError::RowReturnType)?.parse()?;
                    serde_json::to_value(shape)?
                }
                "parser" => {
                    let parser: Parser = marker(&value, QueryError::InvalidParser)?.parse()?;
                    serde_json::to_value(parser)?
                }
                _ => value,
            };
            merged[name.as_str()] = value;
        }

        let params: QueryParams = serde_json::from_value(merged)?;
        Query::from_params(self.service.clone(), params)
    }

    /// New query with parameters adjusted by `f`.
    pub fn copy_with(&self, f: impl FnOnce(&mut QueryParams)) -> Result<Query, QueryError> {
        let mut params = self.params.clone();
        f(&mut params);
        Query::from_params(self.service.clone(), params)
    }
}

fn marker(value: &Value, err: fn(String) -> QueryError) -> Result<&str, QueryError> {
    value
        .as_str()
        .ok_or_else(|| err(format!("expected a marker name, got {value}")))
}

impl fmt::Display for Query {
    /// Approximate SQL text for diagnostics; not used for execution.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select {}", self.params.columns.join(", "))?;
        if !self.conditions_for_exec.is_empty() {
            write!(f, " where {}", self.conditions_for_exec)?;
        }
        if !self.params.order_by.is_empty() {
            write!(f, " order by {}", self.params.order_by)?;
        }
        if let Some(limit) = self.params.limit {
            write!(f, " limit {limit}")?;
        }
        if self.params.offset > 0 {
            write!(f, " offset {}", self.params.offset)?;
        }
        write!(f, " [parser={}]", self.params.parser)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("columns", &self.params.columns)
            .field("conditions", &self.params.conditions)
            .field("output", &self.params.output)
            .field("offset", &self.params.offset)
            .field("limit", &self.params.limit)
            .field("case_sensitive", &self.params.case_sensitive)
            .field("options", &self.params.options)
            .field("parser", &self.params.parser)
            .field("order_by", &self.params.order_by)
            .field("state", &self.state())
            .field("service", &"<CatalogService>")
            .finish()
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close query on drop");
        }
    }
}
