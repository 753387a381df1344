//! Boundary with the remote catalog query service.
//!
//! The service itself is an external collaborator; this module only defines the
//! requests the query engine issues and the shapes it expects back.

pub mod messages;
pub mod protocol;

pub use messages::{
    GenQueryInp, GenQueryOut, Gq2Handle, QueryOptions, SqlColumn, END_OF_RESULTSET, MAX_SQL_ROWS,
};
pub use protocol::{shared, CatalogService, SharedService};
