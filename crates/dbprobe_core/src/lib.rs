//! Core types and services for dbprobe.
//!
//! This crate reads the structure of a relational database into a
//! driver-independent [`SchemaModel`]:
//!
//! - **error**: Error taxonomy with actionable hints
//! - **models**: Configuration, name filters and the schema model
//! - **services**: Driver sessions, connector, reader and collector
//! - **logging**: Structured logging setup
//!
//! ```no_run
//! use dbprobe_core::{introspect, IntrospectionConfig};
//!
//! let config = IntrospectionConfig::new("sqlite:///var/lib/app/app.db");
//! let model = introspect(config)?;
//! for table in model.tables() {
//!     println!("{} ({} columns)", table.id, table.columns.len());
//! }
//! # Ok::<(), dbprobe_core::ProbeError>(())
//! ```

pub mod error;
pub mod logging;
pub mod models;
pub mod services;

#[cfg(test)]
mod verification_tests;

pub use error::{ErrorInfo, ProbeError};
pub use models::{
    Column, ConnectOptions, Driver, ForeignKey, Index, IntrospectionConfig,
    IntrospectionConfigBuilder, NamePattern, SchemaFilter, SchemaModel, SqlType, Table, TableId,
};
pub use services::{
    introspect, ConnectionHandle, Connector, IncludeAll, Introspector, MetadataSession,
    RawColumn, SchemaCollector, SchemaReader, StandardTypeMapper, Strategy, TableFilter,
    TypeMapper,
};
