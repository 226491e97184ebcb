//! Pluggable introspection strategy.
//!
//! A [`Strategy`] bundles the two decisions a run delegates to the caller:
//! which listed tables to keep, and how native column types map onto
//! [`SqlType`]. Both have defaults, and either can be swapped independently.

use std::fmt;
use std::sync::Arc;

use crate::models::{Driver, SqlType, TableId};

/// Decides whether a listed table is introspected.
pub trait TableFilter: Send + Sync {
    /// Return `true` to keep the table.
    fn include(&self, table: &TableId) -> bool;
}

impl<F> TableFilter for F
where
    F: Fn(&TableId) -> bool + Send + Sync,
{
    fn include(&self, table: &TableId) -> bool {
        self(table)
    }
}

/// Keeps every table.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeAll;

impl TableFilter for IncludeAll {
    fn include(&self, _table: &TableId) -> bool {
        true
    }
}

/// Maps a driver's native type text onto a generic SQL type.
pub trait TypeMapper: Send + Sync {
    /// Map a native type such as `character varying(255)` or `INT`.
    fn map_type(&self, driver: Driver, native_type: &str) -> SqlType;
}

/// Default type mapping for PostgreSQL and SQLite.
///
/// Known type names are matched after stripping length/precision modifiers.
/// Unknown PostgreSQL types map to [`SqlType::Other`]; unknown SQLite types
/// fall back to SQLite's column affinity rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTypeMapper;

impl TypeMapper for StandardTypeMapper {
    fn map_type(&self, driver: Driver, native_type: &str) -> SqlType {
        let (base, is_array) = normalize_type_name(native_type);
        if is_array {
            return SqlType::Array;
        }
        if let Some(sql_type) = known_type(&base) {
            return sql_type;
        }
        match driver {
            Driver::Postgres => SqlType::Other,
            Driver::Sqlite => sqlite_affinity(&base),
        }
    }
}

/// Lowercase, drop `(...)` modifiers and quotes, collapse whitespace and
/// detect a trailing `[]`.
fn normalize_type_name(native_type: &str) -> (String, bool) {
    let mut stripped = String::with_capacity(native_type.len());
    let mut depth = 0usize;
    for c in native_type.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '"' => {}
            _ if depth == 0 => stripped.extend(c.to_lowercase()),
            _ => {}
        }
    }

    let mut base = stripped.trim();
    let mut is_array = false;
    while let Some(inner) = base.strip_suffix("[]") {
        is_array = true;
        base = inner.trim_end();
    }

    (base.split_whitespace().collect::<Vec<_>>().join(" "), is_array)
}

fn known_type(base: &str) -> Option<SqlType> {
    let sql_type = match base {
        "bit" => SqlType::Bit,
        "tinyint" => SqlType::TinyInt,
        "smallint" | "int2" | "smallserial" | "serial2" => SqlType::SmallInt,
        "integer" | "int" | "int4" | "serial" | "serial4" | "mediumint" => SqlType::Integer,
        "bigint" | "int8" | "bigserial" | "serial8" => SqlType::BigInt,
        "float" => SqlType::Float,
        "real" | "float4" => SqlType::Real,
        "double precision" | "double" | "float8" => SqlType::Double,
        "numeric" | "money" => SqlType::Numeric,
        "decimal" => SqlType::Decimal,
        "char" | "character" | "bpchar" | "nchar" => SqlType::Char,
        "varchar" | "character varying" | "nvarchar" | "varchar2" => SqlType::Varchar,
        "text" | "citext" | "name" => SqlType::LongVarchar,
        "clob" => SqlType::Clob,
        "date" => SqlType::Date,
        "time" | "time without time zone" => SqlType::Time,
        "timetz" | "time with time zone" => SqlType::TimeWithTimezone,
        "timestamp" | "timestamp without time zone" | "datetime" => SqlType::Timestamp,
        "timestamptz" | "timestamp with time zone" => SqlType::TimestampWithTimezone,
        "binary" => SqlType::Binary,
        "varbinary" | "bytea" => SqlType::VarBinary,
        "blob" => SqlType::Blob,
        "boolean" | "bool" => SqlType::Boolean,
        "xml" => SqlType::SqlXml,
        _ => return None,
    };
    Some(sql_type)
}

/// SQLite type affinity, as described in the SQLite datatype documentation.
fn sqlite_affinity(base: &str) -> SqlType {
    if base.contains("int") {
        SqlType::Integer
    } else if base.contains("char") || base.contains("clob") || base.contains("text") {
        SqlType::Varchar
    } else if base.is_empty() || base.contains("blob") {
        SqlType::Blob
    } else if base.contains("real") || base.contains("floa") || base.contains("doub") {
        SqlType::Double
    } else {
        SqlType::Numeric
    }
}

/// Table filter and type mapper used by a run.
#[derive(Clone)]
pub struct Strategy {
    table_filter: Arc<dyn TableFilter>,
    type_mapper: Arc<dyn TypeMapper>,
}

impl Default for Strategy {
    fn default() -> Self {
        Self { table_filter: Arc::new(IncludeAll), type_mapper: Arc::new(StandardTypeMapper) }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy").finish_non_exhaustive()
    }
}

impl Strategy {
    /// Replace the table filter.
    pub fn with_table_filter(mut self, filter: impl TableFilter + 'static) -> Self {
        self.table_filter = Arc::new(filter);
        self
    }

    /// Replace the type mapper.
    pub fn with_type_mapper(mut self, mapper: impl TypeMapper + 'static) -> Self {
        self.type_mapper = Arc::new(mapper);
        self
    }

    /// Whether the table should be introspected.
    pub fn include_table(&self, table: &TableId) -> bool {
        self.table_filter.include(table)
    }

    /// Map a native type for the given driver.
    pub fn map_type(&self, driver: Driver, native_type: &str) -> SqlType {
        self.type_mapper.map_type(driver, native_type)
    }
}
