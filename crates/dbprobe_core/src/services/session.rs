//! Driver seam for catalog metadata queries.

use crate::error::ProbeError;
use crate::models::{Driver, ForeignKey, Index, SchemaFilter, TableId};

/// A column as reported by the driver, before type mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    /// Column name.
    pub name: String,
    /// Native type text.
    pub native_type: String,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Column position (1-based ordinal).
    pub ordinal_position: u32,
}

/// An open database session able to answer catalog metadata queries.
///
/// One implementation exists per supported driver. Every query either returns
/// the complete answer or an [`ProbeError::Introspection`] error.
pub trait MetadataSession: Send {
    /// Driver backing this session.
    fn driver(&self) -> Driver;

    /// List tables in the driver's natural order.
    ///
    /// Drivers may push the filter's patterns into their catalog query; the
    /// reader re-applies the filter either way.
    fn list_tables(&self, filter: &SchemaFilter) -> Result<Vec<TableId>, ProbeError>;

    /// Columns of a table, ordered by ordinal position.
    fn columns(&self, table: &TableId) -> Result<Vec<RawColumn>, ProbeError>;

    /// Primary-key column names in key order. Empty when there is none.
    fn primary_key(&self, table: &TableId) -> Result<Vec<String>, ProbeError>;

    /// Secondary indexes of a table.
    fn indexes(&self, table: &TableId) -> Result<Vec<Index>, ProbeError>;

    /// Foreign keys declared on a table.
    fn foreign_keys(&self, table: &TableId) -> Result<Vec<ForeignKey>, ProbeError>;

    /// Release the session. Failures are logged, not returned, since the
    /// session is unusable afterwards either way.
    fn close(self: Box<Self>);
}
