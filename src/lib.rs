//! # genquery-rs
//!
//! Lazy, paginated iteration over GenQuery-style catalog queries.
//!
//! A query names projected columns, an optional filter expression, ordering, offset and
//! limit. It runs against a remote catalog service over one of two protocols and is read
//! back through one iteration interface:
//!
//! - **GENQUERY1** (cursor protocol): rows arrive in batches of up to [`MAX_SQL_ROWS`];
//!   a continuation index tells whether more batches remain. The service can report the
//!   total match count cheaply when no offset is used.
//! - **GENQUERY2** (handle protocol): the query is executed once into a server-held
//!   resultset that is pulled one row at a time and freed explicitly.
//!
//! ## Features
//!
//! - **Lazy execution**: nothing is sent until the first row or the row count is needed
//! - **Output shapes**: rows as ordered maps, lists, or tuples with single-column collapse
//! - **Guaranteed release**: cursors and handles are released on exhaustion, on `close`,
//!   when a row iterator is dropped early, and when the query is dropped
//! - **Row counts**: [`Query::total_rows`] including the offset workaround
//! - **Paging**: [`PagedIterator`] groups rows into pages of a configurable size
//!
//! ## Example
//!
//! ```rust,ignore
//! use genquery_rs::{shared, OutputShape, PagedIterator, Query};
//!
//! let service = shared(my_catalog);
//!
//! // Print all collections.
//! let mut query = Query::new(service.clone(), "COLL_NAME")?;
//! for row in &mut query {
//!     println!("name: {}", row?.values()[0]);
//! }
//!
//! // Data objects 200-299 owned by a user containing 'r', case-insensitive filter.
//! let mut query = Query::builder("COLL_NAME, ORDER_DESC(DATA_NAME), DATA_OWNER_NAME")
//!     .conditions("DATA_OWNER_NAME like '%r%' and COLL_NAME like '/TEMPzone/%'")
//!     .case_sensitive(false)
//!     .offset(200)
//!     .limit(100)
//!     .build(service.clone())?;
//! println!("{} matches in total", query.total_rows()?.unwrap_or(0));
//!
//! // Pages of 50 rows as ordered maps.
//! for page in PagedIterator::new(service, "DATA_NAME, DATA_SIZE", "", OutputShape::AsDict, 50)? {
//!     println!("page of {}", page?.len());
//! }
//! ```

// Module declarations
pub mod error;
pub mod query;
pub mod transport;

// =============================================================================
// Error Types
// =============================================================================

/// Re-export error types for convenient error handling.
pub use error::{QueryError, TransportError};

// =============================================================================
// Query Types
// =============================================================================

/// Query, parameters and iterators.
pub use query::{
    genquery2_query_string, normalize_columns, row_iterator, IntoColumns, OutputShape,
    PagedIterator, Parser, Query, QueryBuilder, QueryParams, QueryRows, QueryState, Row, Rows,
    PARAMETER_NAMES,
};

// =============================================================================
// Service Boundary
// =============================================================================

/// Catalog service trait, wire shapes and protocol constants.
pub use transport::{
    shared, CatalogService, GenQueryInp, GenQueryOut, Gq2Handle, QueryOptions, SharedService,
    SqlColumn, END_OF_RESULTSET, MAX_SQL_ROWS,
};
