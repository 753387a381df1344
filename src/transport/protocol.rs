//! Catalog service protocol trait.
//!
//! Every request the query engine makes goes through [`CatalogService`]. All calls are
//! blocking and at most one is in flight per query.

use crate::error::TransportError;
use crate::transport::messages::{GenQueryInp, GenQueryOut, Gq2Handle};
use std::sync::{Arc, Mutex};

/// Request/response contract of the remote catalog query service.
///
/// The first three methods make up the cursor protocol (fetch in batches, closed by a
/// fetch carrying `AUTO_CLOSE`); the last four make up the handle protocol (execute once,
/// pull rows one at a time, free explicitly).
pub trait CatalogService {
    /// Build a query input for the projected columns and filter expression.
    fn make_gen_query(
        &mut self,
        columns: &str,
        conditions: &str,
    ) -> Result<GenQueryInp, TransportError>;

    /// Execute a prepared query input and return the first batch.
    fn exec_gen_query(&mut self, input: &GenQueryInp) -> Result<GenQueryOut, TransportError>;

    /// Fetch the batch following `output`.
    ///
    /// The returned output carries the updated continuation index.
    fn get_more_rows(
        &mut self,
        input: &GenQueryInp,
        output: &GenQueryOut,
        continue_inx: i64,
    ) -> Result<GenQueryOut, TransportError>;

    /// Execute a handle-protocol query string.
    fn genquery2_execute(&mut self, query: &str) -> Result<Gq2Handle, TransportError>;

    /// Advance to the next row.
    ///
    /// Exhaustion is reported as an error whose text carries the end-of-results marker.
    fn genquery2_next_row(&mut self, handle: &Gq2Handle) -> Result<(), TransportError>;

    /// Read the zero-based `index` column of the current row as text.
    fn genquery2_column(&mut self, handle: &Gq2Handle, index: usize)
        -> Result<String, TransportError>;

    /// Release the server-side resultset.
    fn genquery2_free(&mut self, handle: &Gq2Handle) -> Result<(), TransportError>;
}

/// Shared, lockable service reference held by queries.
pub type SharedService = Arc<Mutex<dyn CatalogService + Send>>;

/// Wrap a service for use by [`crate::Query`].
pub fn shared<S>(service: S) -> SharedService
where
    S: CatalogService + Send + 'static,
{
    Arc::new(Mutex::new(service))
}

/// Run `f` with the service locked.
pub(crate) fn with_service<T>(
    service: &SharedService,
    f: impl FnOnce(&mut dyn CatalogService) -> Result<T, TransportError>,
) -> Result<T, TransportError> {
    let mut guard = service
        .lock()
        .map_err(|e| TransportError::LockPoisoned(e.to_string()))?;
    f(&mut *guard)
}
