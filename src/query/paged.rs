//! Page-at-a-time iteration.
//!
//! [`PagedIterator`] groups rows from any row source into pages of `0 < N <= page size`
//! rows. Iteration over pages ends at the first page fetch that finds no rows.

use crate::error::QueryError;
use crate::query::params::OutputShape;
use crate::query::results::{row_iterator, QueryRows, Row};
use crate::query::IntoColumns;
use crate::transport::{SharedService, MAX_SQL_ROWS};
use tracing::error;

/// Iterator over pages of rows.
pub struct PagedIterator<S = QueryRows>
where
    S: Iterator<Item = Result<Row, QueryError>>,
{
    rows: S,
    rows_per_page: usize,
    exhausted: bool,
}

impl PagedIterator<QueryRows> {
    /// Page through `columns` matching `conditions`.
    ///
    /// The page size is capped at [`MAX_SQL_ROWS`]; call
    /// [`set_page_size`](Self::set_page_size) without the cap for larger pages.
    pub fn new(
        service: SharedService,
        columns: impl IntoColumns,
        conditions: &str,
        output: OutputShape,
        page_size: usize,
    ) -> Result<Self, QueryError> {
        let query = row_iterator(service, columns, conditions, output)?;
        Ok(Self::from_rows(query.into_iter(), page_size))
    }
}

impl<S> PagedIterator<S>
where
    S: Iterator<Item = Result<Row, QueryError>>,
{
    /// Page any row source; the page size is capped at [`MAX_SQL_ROWS`].
    pub fn from_rows(rows: S, page_size: usize) -> Self {
        let mut paged = Self {
            rows,
            rows_per_page: MAX_SQL_ROWS,
            exhausted: false,
        };
        paged.set_page_size(page_size, true);
        paged
    }

    /// Set the page size, at least 1 and with `hard_cap` at most [`MAX_SQL_ROWS`].
    pub fn set_page_size(&mut self, page_size: usize, hard_cap: bool) -> &mut Self {
        self.rows_per_page = page_size.max(1);
        if hard_cap {
            self.rows_per_page = self.rows_per_page.min(MAX_SQL_ROWS);
        }
        self
    }

    /// Current page size.
    pub fn page_size(&self) -> usize {
        self.rows_per_page
    }

    /// Next page, or `None` once the row source is exhausted.
    pub fn next_page(&mut self) -> Result<Option<Vec<Row>>, QueryError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = if self.rows_per_page > MAX_SQL_ROWS {
            self.next_arbitrary_size()?
        } else {
            self.next_bounded()?
        };

        if page.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(page))
    }

    fn next_arbitrary_size(&mut self) -> Result<Vec<Row>, QueryError> {
        self.rows
            .by_ref()
            .take(self.rows_per_page)
            .collect::<Result<Vec<Row>, QueryError>>()
    }

    fn next_bounded(&mut self) -> Result<Vec<Row>, QueryError> {
        let mut page = Vec::with_capacity(self.rows_per_page);

        while page.len() < self.rows_per_page {
            match self.rows.next() {
                Some(Ok(row)) => page.push(row),
                Some(Err(e)) => {
                    error!(error = ?e, "unexpected error in paged iteration");
                    return Err(e);
                }
                None => break,
            }
        }

        Ok(page)
    }

    /// The underlying row source.
    pub fn into_rows(self) -> S {
        self.rows
    }
}

impl<S> Iterator for PagedIterator<S>
where
    S: Iterator<Item = Result<Row, QueryError>>,
{
    type Item = Result<Vec<Row>, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_page().transpose()
    }
}
