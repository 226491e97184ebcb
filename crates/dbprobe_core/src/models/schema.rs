//! Schema introspection models.
//!
//! Normalized, driver-independent representation of the tables, columns,
//! keys and indexes read from a database catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of a table: the (catalog, schema, name) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId {
    /// Catalog (database) name, if the driver reports one.
    pub catalog: Option<String>,
    /// Schema (namespace) name, if the driver reports one.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
}

impl TableId {
    /// Create a fully specified table identity.
    pub fn new(catalog: Option<String>, schema: Option<String>, name: impl Into<String>) -> Self {
        Self { catalog, schema, name: name.into() }
    }

    /// Create an identity with no catalog or schema qualifier.
    pub fn named(name: impl Into<String>) -> Self {
        Self { catalog: None, schema: None, name: name.into() }
    }

    /// Create an identity qualified by schema only.
    pub fn in_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self { catalog: None, schema: Some(schema.into()), name: name.into() }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in [&self.catalog, &self.schema].into_iter().flatten() {
            write!(f, "{part}.")?;
        }
        f.write_str(&self.name)
    }
}

/// Generic SQL type, numbered like `java.sql.Types`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    Date,
    Time,
    Timestamp,
    TimeWithTimezone,
    TimestampWithTimezone,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
    Clob,
    Boolean,
    Array,
    SqlXml,
    Other,
}

impl SqlType {
    /// Every variant, in declaration order.
    pub const ALL: [SqlType; 27] = [
        Self::Bit,
        Self::TinyInt,
        Self::SmallInt,
        Self::Integer,
        Self::BigInt,
        Self::Float,
        Self::Real,
        Self::Double,
        Self::Numeric,
        Self::Decimal,
        Self::Char,
        Self::Varchar,
        Self::LongVarchar,
        Self::Date,
        Self::Time,
        Self::Timestamp,
        Self::TimeWithTimezone,
        Self::TimestampWithTimezone,
        Self::Binary,
        Self::VarBinary,
        Self::LongVarBinary,
        Self::Blob,
        Self::Clob,
        Self::Boolean,
        Self::Array,
        Self::SqlXml,
        Self::Other,
    ];

    /// The numeric type code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Bit => -7,
            Self::TinyInt => -6,
            Self::SmallInt => 5,
            Self::Integer => 4,
            Self::BigInt => -5,
            Self::Float => 6,
            Self::Real => 7,
            Self::Double => 8,
            Self::Numeric => 2,
            Self::Decimal => 3,
            Self::Char => 1,
            Self::Varchar => 12,
            Self::LongVarchar => -1,
            Self::Date => 91,
            Self::Time => 92,
            Self::Timestamp => 93,
            Self::TimeWithTimezone => 2013,
            Self::TimestampWithTimezone => 2014,
            Self::Binary => -2,
            Self::VarBinary => -3,
            Self::LongVarBinary => -4,
            Self::Blob => 2004,
            Self::Clob => 2005,
            Self::Boolean => 16,
            Self::Array => 2003,
            Self::SqlXml => 2009,
            Self::Other => 1111,
        }
    }

    /// Look up a type by its numeric code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// The `java.sql.Types` constant name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bit => "BIT",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Numeric => "NUMERIC",
            Self::Decimal => "DECIMAL",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::LongVarchar => "LONGVARCHAR",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::TimeWithTimezone => "TIME_WITH_TIMEZONE",
            Self::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
            Self::Binary => "BINARY",
            Self::VarBinary => "VARBINARY",
            Self::LongVarBinary => "LONGVARBINARY",
            Self::Blob => "BLOB",
            Self::Clob => "CLOB",
            Self::Boolean => "BOOLEAN",
            Self::Array => "ARRAY",
            Self::SqlXml => "SQLXML",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Type as reported by the database (e.g., "varchar(255)").
    pub native_type: String,
    /// Generic SQL type the native type maps to.
    pub sql_type: SqlType,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Column position (1-based ordinal).
    pub ordinal_position: u32,
}

impl Column {
    /// Numeric SQL type code of this column.
    pub fn type_code(&self) -> i32 {
        self.sql_type.code()
    }
}

/// A secondary index. Primary-key indexes are represented by
/// [`Table::primary_key`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Indexed columns in key order.
    pub columns: Vec<String>,
}

/// A table with its columns, primary key and indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table identity.
    pub id: TableId,
    /// Columns ordered by ordinal position.
    pub columns: Vec<Column>,
    /// Primary-key column names in key order, without duplicates.
    pub primary_key: Vec<String>,
    /// Secondary indexes.
    pub indexes: Vec<Index>,
}

impl Table {
    /// Create a table with no columns, keys or indexes.
    pub fn new(id: TableId) -> Self {
        Self { id, columns: Vec::new(), primary_key: Vec::new(), indexes: Vec::new() }
    }

    /// Table name without qualifiers.
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Find a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether the named column is part of the primary key.
    pub fn is_primary_key_column(&self, name: &str) -> bool {
        self.primary_key.iter().any(|c| c == name)
    }

    /// Whether the table declares a primary key.
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Primary-key names that are not among the table's columns.
    pub fn missing_primary_key_columns(&self) -> impl Iterator<Item = &str> {
        self.primary_key.iter().map(String::as_str).filter(|pk| self.column(pk).is_none())
    }
}

/// A foreign-key relationship between two tables, referenced by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name, if the database reports one.
    pub name: Option<String>,
    /// Referencing table.
    pub table: TableId,
    /// Referencing columns, paired positionally with `referenced_columns`.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: TableId,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// Iterate (referencing, referenced) column pairs.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(String::as_str).zip(self.referenced_columns.iter().map(String::as_str))
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) -> {}({})",
            self.table,
            self.columns.join(", "),
            self.referenced_table,
            self.referenced_columns.join(", ")
        )
    }
}

/// The complete result of an introspection run.
///
/// Tables keep the driver's listing order and are also indexed by identity.
/// Instances are produced by `SchemaCollector::finalize`, which guarantees
/// that every foreign key refers to tables present in the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaModel {
    tables: Vec<Table>,
    #[serde(skip)]
    positions: HashMap<TableId, usize>,
    foreign_keys: Vec<ForeignKey>,
    introspected_at: DateTime<Utc>,
}

impl SchemaModel {
    pub(crate) fn new(
        tables: Vec<Table>,
        foreign_keys: Vec<ForeignKey>,
        introspected_at: DateTime<Utc>,
    ) -> Self {
        let positions = tables.iter().enumerate().map(|(i, t)| (t.id.clone(), i)).collect();
        Self { tables, positions, foreign_keys, introspected_at }
    }

    /// Tables in listing order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Look up a table by identity.
    pub fn table(&self, id: &TableId) -> Option<&Table> {
        self.positions.get(id).map(|&i| &self.tables[i])
    }

    /// Whether a table with this identity exists.
    pub fn contains(&self, id: &TableId) -> bool {
        self.positions.contains_key(id)
    }

    /// First table with the given unqualified name.
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id.name == name)
    }

    /// All foreign keys.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Foreign keys declared on the given table.
    pub fn foreign_keys_from<'a>(&'a self, id: &'a TableId) -> impl Iterator<Item = &'a ForeignKey> {
        self.foreign_keys.iter().filter(move |fk| &fk.table == id)
    }

    /// Foreign keys that reference the given table.
    pub fn foreign_keys_to<'a>(&'a self, id: &'a TableId) -> impl Iterator<Item = &'a ForeignKey> {
        self.foreign_keys.iter().filter(move |fk| &fk.referenced_table == id)
    }

    /// When the run that produced this model started.
    pub fn introspected_at(&self) -> DateTime<Utc> {
        self.introspected_at
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the model has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
