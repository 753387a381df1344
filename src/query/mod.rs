//! Query execution and result handling.
//!
//! This module provides the lazily executed [`Query`], its parameters, row shaping and
//! the row and page iterators built on top of it.
//!
//! # Overview
//!
//! The query module is organized into:
//! - `columns` - Column list conversion and normalization
//! - `params` - Query parameters, protocol selector, output shapes and the builder
//! - `cursor` - Per-protocol server-side cursors
//! - `statement` - The `Query` itself: lazy execution, counting, close, copy
//! - `results` - Row shaping and row iterators
//! - `paged` - Page-at-a-time iteration

pub mod columns;
pub(crate) mod cursor;
pub mod paged;
pub mod params;
pub mod results;
pub mod statement;

// Re-export commonly used types
pub use columns::{normalize_columns, IntoColumns};
pub use cursor::genquery2_query_string;
pub use paged::PagedIterator;
pub use params::{OutputShape, Parser, QueryBuilder, QueryParams, PARAMETER_NAMES};
pub use results::{row_iterator, QueryRows, Row, Rows};
pub use statement::{Query, QueryState};
