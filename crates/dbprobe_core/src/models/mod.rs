//! Data models for dbprobe.
//!
//! - `config` - IntrospectionConfig, Driver, ConnectOptions
//! - `filter` - LIKE-style name patterns and the per-run SchemaFilter
//! - `schema` - Normalized schema model (tables, columns, keys, indexes)

pub mod config;
pub mod filter;
pub mod schema;

pub use config::{ConnectOptions, Driver, IntrospectionConfig, IntrospectionConfigBuilder};
pub use filter::{NamePattern, SchemaFilter};
pub use schema::{Column, ForeignKey, Index, SchemaModel, SqlType, Table, TableId};
