//! Per-protocol server-side cursors.
//!
//! A [`Cursor`] is the live execution state of one query: it pulls raw rows from the
//! catalog and releases the server-side statement or resultset. The two protocols
//! differ in every one of these steps, so each gets its own implementation and
//! [`crate::Query`] only talks to the trait.

use crate::error::{QueryError, TransportError};
use crate::query::params::{Parser, QueryParams};
use crate::transport::protocol::{with_service, SharedService};
use crate::transport::{GenQueryInp, GenQueryOut, Gq2Handle, QueryOptions, MAX_SQL_ROWS};
use tracing::debug;

/// Raw row as returned by the catalog, one text value per projected column.
pub(crate) type RawRow = Vec<String>;

/// Live server-side execution state.
pub(crate) trait Cursor: Send {
    /// Protocol this cursor speaks.
    fn parser(&self) -> Parser;

    /// Produce the next raw row, fetching from the service as needed.
    fn next_raw(&mut self, service: &SharedService) -> Result<Option<RawRow>, QueryError>;

    /// True once no further rows will be produced.
    fn is_finished(&self) -> bool;

    /// Release server-side resources. Must be safe to call more than once.
    fn release(&mut self, service: &SharedService) -> Result<(), TransportError>;

    /// Total matching rows as reported at execution, if the protocol reported one.
    fn reported_total(&self) -> Option<i64>;

    /// Whether the caller's output shape applies to rows from this cursor.
    fn shapes_rows(&self) -> bool;
}

/// Lifecycle of a query's execution state.
pub(crate) enum CursorState {
    /// Parameters only; nothing sent to the service yet.
    Unexecuted,
    /// Executed, server-side state may be held.
    Active(Box<dyn Cursor>),
    /// Released. Terminal.
    Closed,
}

/// Open a cursor for `params` on the protocol they select.
///
/// Option bits derived for this execution go on the request only; `params` is
/// left untouched.
pub(crate) fn execute(
    service: &SharedService,
    params: &QueryParams,
    conditions_for_exec: &str,
) -> Result<Box<dyn Cursor>, QueryError> {
    match params.parser {
        Parser::GenQuery1 => Ok(Box::new(Gq1Cursor::execute(
            service,
            params,
            conditions_for_exec,
        )?)),
        Parser::GenQuery2 => Ok(Box::new(Gq2Cursor::execute(service, params)?)),
    }
}

/// Cursor protocol: batches of up to `MAX_SQL_ROWS` rows plus a continuation index.
pub(crate) struct Gq1Cursor {
    input: GenQueryInp,
    output: GenQueryOut,
    /// > 0 while batches are pending on the server
    continue_inx: i64,
    /// Next row within `output`
    batch_row: usize,
    column_count: usize,
    limit: Option<u64>,
    emitted: u64,
    total: Option<i64>,
}

impl Gq1Cursor {
    fn execute(
        service: &SharedService,
        params: &QueryParams,
        conditions_for_exec: &str,
    ) -> Result<Self, QueryError> {
        let columns = params.columns.join(", ");
        let mut input = with_service(service, |s| {
            s.make_gen_query(&columns, conditions_for_exec)
        })?;

        let mut options = params.options;
        options.remove(QueryOptions::EXECUTION_MANAGED);
        if params.offset > 0 {
            input.row_offset = params.offset;
        } else {
            // Row counting is only cheap without an offset.
            options.insert(QueryOptions::RETURN_TOTAL_ROW_COUNT);
        }

        if let Some(limit) = params.limit {
            if limit < (MAX_SQL_ROWS - 1) as u64 {
                // The server still reads up to a full batch when closing.
                input.max_rows = limit as usize;
            }
        }

        input.options |= options;

        debug!(
            columns = %columns,
            conditions = %conditions_for_exec,
            offset = params.offset,
            max_rows = input.max_rows,
            options = %input.options,
            "executing genquery"
        );

        let output = with_service(service, |s| s.exec_gen_query(&input))?;
        let total = input
            .options
            .contains(QueryOptions::RETURN_TOTAL_ROW_COUNT)
            .then_some(output.total_row_count);

        Ok(Self {
            continue_inx: output.continue_inx,
            input,
            output,
            batch_row: 0,
            column_count: params.columns.len(),
            limit: params.limit,
            emitted: 0,
            total,
        })
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.emitted >= limit)
    }

    fn batch_consumed(&self) -> bool {
        self.batch_row >= self.output.row_cnt
    }

    fn fetch(&mut self, service: &SharedService) -> Result<(), TransportError> {
        let output = with_service(service, |s| {
            s.get_more_rows(&self.input, &self.output, self.continue_inx)
        })?;

        debug!(
            rows = output.row_cnt,
            continue_inx = output.continue_inx,
            "fetched genquery batch"
        );

        self.continue_inx = output.continue_inx;
        self.output = output;
        self.batch_row = 0;
        Ok(())
    }
}

impl Cursor for Gq1Cursor {
    fn parser(&self) -> Parser {
        Parser::GenQuery1
    }

    fn next_raw(&mut self, service: &SharedService) -> Result<Option<RawRow>, QueryError> {
        loop {
            if self.limit_reached() {
                return Ok(None);
            }

            if !self.batch_consumed() {
                let row = self.output.row(self.batch_row, self.column_count)?;
                self.batch_row += 1;
                self.emitted += 1;
                return Ok(Some(row));
            }

            if self.continue_inx <= 0 {
                return Ok(None);
            }

            self.fetch(service)?;
        }
    }

    fn is_finished(&self) -> bool {
        self.limit_reached() || (self.batch_consumed() && self.continue_inx <= 0)
    }

    fn release(&mut self, service: &SharedService) -> Result<(), TransportError> {
        // The direct close request fails on the catalog; closing is done by a last
        // fetch carrying AUTO_CLOSE, which may transfer one more batch.
        while self.continue_inx > 0 {
            self.input.options.insert(QueryOptions::AUTO_CLOSE);
            self.fetch(service)?;
        }
        Ok(())
    }

    fn reported_total(&self) -> Option<i64> {
        self.total
    }

    fn shapes_rows(&self) -> bool {
        true
    }
}

/// Build the handle protocol query string.
///
/// Clauses appear in a fixed order: where, order by, offset, limit.
pub fn genquery2_query_string(params: &QueryParams) -> String {
    let mut query = String::with_capacity(128);
    query.push_str("select ");
    query.push_str(&params.columns.join(", "));

    if !params.conditions.is_empty() {
        query.push_str(" where ");
        query.push_str(&params.conditions);
    }
    if !params.order_by.is_empty() {
        query.push_str(" order by ");
        query.push_str(&params.order_by);
    }
    if params.offset > 0 {
        query.push_str(&format!(" offset {}", params.offset));
    }
    if let Some(limit) = params.limit {
        query.push_str(&format!(" limit {limit}"));
    }

    query
}

/// Handle protocol: one execution, rows pulled individually.
pub(crate) struct Gq2Cursor {
    handle: Option<Gq2Handle>,
    column_count: usize,
    done: bool,
}

impl Gq2Cursor {
    fn execute(service: &SharedService, params: &QueryParams) -> Result<Self, QueryError> {
        let query = genquery2_query_string(params);
        debug!(query = %query, "executing genquery2");

        let handle = with_service(service, |s| s.genquery2_execute(&query))?;

        Ok(Self {
            handle: Some(handle),
            column_count: params.columns.len(),
            done: false,
        })
    }
}

impl Cursor for Gq2Cursor {
    fn parser(&self) -> Parser {
        Parser::GenQuery2
    }

    fn next_raw(&mut self, service: &SharedService) -> Result<Option<RawRow>, QueryError> {
        if self.done {
            return Ok(None);
        }
        let Some(handle) = self.handle.as_ref() else {
            self.done = true;
            return Ok(None);
        };

        let column_count = self.column_count;
        let row = with_service(service, |s| {
            match s.genquery2_next_row(handle) {
                Ok(()) => {}
                Err(e) if e.is_end_of_resultset() => return Ok(None),
                Err(e) => return Err(e),
            }

            (0..column_count)
                .map(|c| s.genquery2_column(handle, c))
                .collect::<Result<Vec<String>, TransportError>>()
                .map(Some)
        })?;

        if row.is_none() {
            self.done = true;
        }
        Ok(row)
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn release(&mut self, service: &SharedService) -> Result<(), TransportError> {
        if let Some(handle) = self.handle.take() {
            debug!(handle = %handle, "freeing genquery2 resultset");
            with_service(service, |s| s.genquery2_free(&handle))?;
        }
        self.done = true;
        Ok(())
    }

    fn reported_total(&self) -> Option<i64> {
        None
    }

    fn shapes_rows(&self) -> bool {
        false
    }
}
