//! Introspection services for dbprobe.
//!
//! This module contains the introspection pipeline:
//! - `session` - Driver seam answering catalog metadata queries
//! - `postgres` - PostgreSQL session over tokio-postgres
//! - `sqlite` - SQLite session over rusqlite
//! - `connector` - Session acquisition and scoped release
//! - `strategy` - Pluggable table filter and type mapper
//! - `reader` - Reads one schema model from an open session
//! - `collector` - Accumulates and validates the model
//! - `introspector` - Connect, read and close in one call

pub mod collector;
pub mod connector;
pub mod introspector;
pub mod postgres;
pub mod reader;
pub mod session;
pub mod sqlite;
pub mod strategy;

pub use collector::SchemaCollector;
pub use connector::{ConnectionHandle, Connector};
pub use introspector::{introspect, Introspector};
pub use postgres::PostgresSession;
pub use reader::SchemaReader;
pub use session::{MetadataSession, RawColumn};
pub use sqlite::{SqliteSession, SqliteTarget};
pub use strategy::{IncludeAll, StandardTypeMapper, Strategy, TableFilter, TypeMapper};
