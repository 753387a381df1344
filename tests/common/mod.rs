//! In-memory catalog used by the integration tests.
//!
//! `FakeCatalog` serves a fixed list of matching rows over both protocols and records
//! every request in a shared [`CallLog`] so tests can assert on fetch and release
//! behaviour after the query is gone.

#![allow(dead_code)]

use genquery_rs::{
    shared, CatalogService, GenQueryInp, GenQueryOut, Gq2Handle, QueryOptions, SharedService,
    SqlColumn, TransportError, END_OF_RESULTSET, MAX_SQL_ROWS,
};
use std::sync::{Arc, Mutex};

/// Requests observed by the fake catalog.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    /// Inputs passed to exec_gen_query
    pub executions: Vec<GenQueryInp>,
    /// Number of get_more_rows calls
    pub fetches: usize,
    /// get_more_rows calls that carried AUTO_CLOSE
    pub auto_close_fetches: usize,
    /// Rows sent over the cursor protocol
    pub rows_transferred: usize,
    /// Query strings passed to genquery2_execute
    pub gq2_queries: Vec<String>,
    /// genquery2_next_row calls
    pub gq2_next_rows: usize,
    /// genquery2_free calls
    pub gq2_frees: usize,
}

struct Statement {
    next: usize,
    open: bool,
}

/// Catalog serving `rows` as the full match set of every query.
pub struct FakeCatalog {
    rows: Vec<Vec<String>>,
    statement: Option<Statement>,
    gq2_position: Option<usize>,
    log: Arc<Mutex<CallLog>>,
}

impl FakeCatalog {
    /// Catalog whose every query matches `rows`.
    pub fn new(rows: Vec<Vec<String>>) -> (Self, Arc<Mutex<CallLog>>) {
        let log = Arc::new(Mutex::new(CallLog::default()));
        (
            Self {
                rows,
                statement: None,
                gq2_position: None,
                log: Arc::clone(&log),
            },
            log,
        )
    }

    /// `n` rows of (`name_<i>`, `<i>`) pairs.
    pub fn numbered(n: usize) -> Vec<Vec<String>> {
        (0..n).map(|i| vec![format!("name_{i}"), i.to_string()]).collect()
    }

    fn batch(&mut self, max_rows: usize, close: bool) -> GenQueryOut {
        let total = self.rows.len();
        let Some(statement) = self.statement.as_mut() else {
            return GenQueryOut::default();
        };

        let start = statement.next.min(total);
        let end = (start + max_rows.min(MAX_SQL_ROWS)).min(total);
        statement.next = end;

        let column_count = self.rows.first().map_or(0, Vec::len);
        let sql_result = (0..column_count)
            .map(|c| SqlColumn::new(self.rows[start..end].iter().map(|r| r[c].clone()).collect()))
            .collect();

        let more = end < total && max_rows > 0 && !close;
        statement.open = more;

        self.log.lock().unwrap().rows_transferred += end - start;

        GenQueryOut {
            row_cnt: end - start,
            continue_inx: if more { 1 } else { 0 },
            total_row_count: 0,
            sql_result,
        }
    }
}

impl CatalogService for FakeCatalog {
    fn make_gen_query(
        &mut self,
        columns: &str,
        conditions: &str,
    ) -> Result<GenQueryInp, TransportError> {
        let columns = columns.split(',').map(|c| c.trim().to_string()).collect();
        Ok(GenQueryInp::new(columns, conditions))
    }

    fn exec_gen_query(&mut self, input: &GenQueryInp) -> Result<GenQueryOut, TransportError> {
        self.log.lock().unwrap().executions.push(input.clone());
        self.statement = Some(Statement {
            next: input.row_offset as usize,
            open: true,
        });

        let mut output = self.batch(input.max_rows, false);
        if input.options.contains(QueryOptions::RETURN_TOTAL_ROW_COUNT) {
            output.total_row_count = self.rows.len() as i64;
        }
        Ok(output)
    }

    fn get_more_rows(
        &mut self,
        input: &GenQueryInp,
        _output: &GenQueryOut,
        continue_inx: i64,
    ) -> Result<GenQueryOut, TransportError> {
        let close = input.options.contains(QueryOptions::AUTO_CLOSE);
        {
            let mut log = self.log.lock().unwrap();
            log.fetches += 1;
            if close {
                log.auto_close_fetches += 1;
            }
        }

        let open = self.statement.as_ref().is_some_and(|s| s.open);
        if continue_inx <= 0 || !open {
            return Err(TransportError::service(-808000, "CAT_NO_ROWS_FOUND"));
        }

        // Closing reads a full batch regardless of max_rows.
        let max_rows = if close { MAX_SQL_ROWS } else { input.max_rows };
        Ok(self.batch(max_rows, close))
    }

    fn genquery2_execute(&mut self, query: &str) -> Result<Gq2Handle, TransportError> {
        let mut log = self.log.lock().unwrap();
        log.gq2_queries.push(query.to_string());
        self.gq2_position = None;
        Ok(Gq2Handle::new(format!("{}", log.gq2_queries.len() - 1)))
    }

    fn genquery2_next_row(&mut self, _handle: &Gq2Handle) -> Result<(), TransportError> {
        self.log.lock().unwrap().gq2_next_rows += 1;
        let next = self.gq2_position.map_or(0, |p| p + 1);
        self.gq2_position = Some(next);
        if next >= self.rows.len() {
            return Err(TransportError::service(
                END_OF_RESULTSET,
                "msi_genquery2_next_row: END_OF_RESULTSET",
            ));
        }
        Ok(())
    }

    fn genquery2_column(
        &mut self,
        _handle: &Gq2Handle,
        index: usize,
    ) -> Result<String, TransportError> {
        let row = self
            .gq2_position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| TransportError::Protocol("no current row".to_string()))?;
        row.get(index)
            .cloned()
            .ok_or_else(|| TransportError::Protocol(format!("no column {index}")))
    }

    fn genquery2_free(&mut self, _handle: &Gq2Handle) -> Result<(), TransportError> {
        self.log.lock().unwrap().gq2_frees += 1;
        self.gq2_position = None;
        Ok(())
    }
}

/// Shared fake catalog serving `rows`, plus its call log.
pub fn fake_service(rows: Vec<Vec<String>>) -> (SharedService, Arc<Mutex<CallLog>>) {
    let (catalog, log) = FakeCatalog::new(rows);
    (shared(catalog), log)
}

/// Snapshot of the call log.
pub fn calls(log: &Arc<Mutex<CallLog>>) -> CallLog {
    log.lock().unwrap().clone()
}

/// Route tracing output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
