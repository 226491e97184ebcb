//! SQLite metadata session.
//!
//! Reads `sqlite_master` and the `pragma_*` table-valued functions of the
//! `main` database. File databases are opened read-only, so a missing file is
//! a connection error instead of silently creating an empty database.

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Params, Row};

use crate::error::ProbeError;
use crate::models::{Driver, ForeignKey, Index, IntrospectionConfig, SchemaFilter, TableId};
use crate::services::session::{MetadataSession, RawColumn};

/// Schema name SQLite uses for the primary database.
const MAIN_SCHEMA: &str = "main";

/// Where a SQLite URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    /// A private in-memory database.
    Memory,
    /// A database file.
    File(PathBuf),
}

impl SqliteTarget {
    /// Parse `sqlite::memory:`, `sqlite://path`, `sqlite:path` or a bare path.
    /// Query parameters after `?` are ignored.
    pub fn from_url(url: &str) -> Self {
        let rest = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        let path = rest.split('?').next().unwrap_or_default();

        if path.is_empty() || path == ":memory:" {
            Self::Memory
        } else {
            Self::File(PathBuf::from(path))
        }
    }
}

/// A single SQLite connection used for one introspection run.
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    /// Open the database named by the configuration URL.
    pub fn open(config: &IntrospectionConfig) -> Result<Self, ProbeError> {
        let conn = match SqliteTarget::from_url(&config.url) {
            SqliteTarget::Memory => Connection::open_in_memory()?,
            SqliteTarget::File(path) => Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| {
                ProbeError::connection_with_source(
                    format!("Failed to open database '{}'", path.display()),
                    e,
                )
                .with_hint("Check that the database file exists and is readable")
            })?,
        };
        Self::from_connection(conn, Duration::from_secs(u64::from(config.options.connect_timeout_secs)))
    }

    /// Wrap an already open connection.
    ///
    /// Verifies the connection really is a SQLite database, which catches
    /// files that exist but hold something else.
    pub fn from_connection(conn: Connection, busy_timeout: Duration) -> Result<Self, ProbeError> {
        conn.busy_timeout(busy_timeout)?;
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))?;
        Ok(Self { conn })
    }

    fn query<T, P, F>(
        &self,
        query: &'static str,
        sql: &str,
        params: P,
        map: F,
    ) -> Result<Vec<T>, ProbeError>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        tracing::trace!(query, "Running SQLite metadata query");
        self.collect_rows(sql, params, map).map_err(|e| ProbeError::query_failed(query, e))
    }

    /// Resolve a table name as written in DDL to the name stored in
    /// `sqlite_master`. SQLite compares table names case-insensitively.
    /// Names of tables that do not exist are returned unchanged.
    fn canonical_table_name(&self, written: String) -> Result<String, ProbeError> {
        let stored: Vec<String> = self.query(
            "table name",
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [written.as_str()],
            |row| row.get(0),
        )?;
        Ok(stored.into_iter().next().unwrap_or(written))
    }

    fn collect_rows<T, P, F>(&self, sql: &str, params: P, map: F) -> rusqlite::Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        let values = rows.collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(values)
    }
}

impl MetadataSession for SqliteSession {
    fn driver(&self) -> Driver {
        Driver::Sqlite
    }

    fn list_tables(&self, _filter: &SchemaFilter) -> Result<Vec<TableId>, ProbeError> {
        // no ORDER BY: sqlite_master order is the database's own listing order
        self.query(
            "tables",
            r"SELECT name FROM sqlite_master
              WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\'",
            [],
            |row| Ok(TableId::new(None, Some(MAIN_SCHEMA.to_string()), row.get::<_, String>(0)?)),
        )
    }

    fn columns(&self, table: &TableId) -> Result<Vec<RawColumn>, ProbeError> {
        self.query(
            "columns",
            // hidden: 0 normal, 2 virtual generated, 3 stored generated
            r#"SELECT cid, name, type, "notnull" FROM pragma_table_xinfo(?1)
               WHERE hidden IN (0, 2, 3) ORDER BY cid"#,
            [table.name.as_str()],
            |row| {
                let cid: i64 = row.get(0)?;
                let not_null: i64 = row.get(3)?;
                Ok(RawColumn {
                    name: row.get(1)?,
                    native_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    nullable: not_null == 0,
                    ordinal_position: u32::try_from(cid + 1).unwrap_or_default(),
                })
            },
        )
    }

    fn primary_key(&self, table: &TableId) -> Result<Vec<String>, ProbeError> {
        self.query(
            "primary key",
            "SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk",
            [table.name.as_str()],
            |row| row.get(0),
        )
    }

    fn indexes(&self, table: &TableId) -> Result<Vec<Index>, ProbeError> {
        let listed: Vec<(String, bool)> = self.query(
            "indexes",
            r#"SELECT name, "unique" FROM pragma_index_list(?1) WHERE origin <> 'pk'"#,
            [table.name.as_str()],
            |row| Ok((row.get(0)?, row.get::<_, i64>(1)? == 1)),
        )?;

        listed
            .into_iter()
            .map(|(name, unique)| -> Result<Index, ProbeError> {
                // expression columns have a NULL name
                let columns: Vec<Option<String>> = self.query(
                    "index columns",
                    "SELECT name FROM pragma_index_info(?1) ORDER BY seqno",
                    [name.as_str()],
                    |row| row.get(0),
                )?;
                Ok(Index { name, unique, columns: columns.into_iter().flatten().collect() })
            })
            .collect()
    }

    fn foreign_keys(&self, table: &TableId) -> Result<Vec<ForeignKey>, ProbeError> {
        let rows: Vec<(i64, String, String, Option<String>)> = self.query(
            "foreign keys",
            r#"SELECT id, "table", "from", "to" FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#,
            [table.name.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let mut grouped: Vec<(i64, ForeignKey, Vec<Option<String>>)> = Vec::new();
        for (id, referenced, from, to) in rows {
            if grouped.last().map(|(last_id, ..)| *last_id) != Some(id) {
                let referenced = self.canonical_table_name(referenced)?;
                let fk = ForeignKey {
                    name: None,
                    table: table.clone(),
                    columns: Vec::new(),
                    referenced_table: TableId::new(None, Some(MAIN_SCHEMA.to_string()), referenced),
                    referenced_columns: Vec::new(),
                };
                grouped.push((id, fk, Vec::new()));
            }
            if let Some((_, fk, targets)) = grouped.last_mut() {
                fk.columns.push(from);
                targets.push(to);
            }
        }

        grouped
            .into_iter()
            .map(|(_, mut fk, targets)| -> Result<ForeignKey, ProbeError> {
                // `REFERENCES parent` without a column list targets the parent's primary key
                if targets.iter().any(Option::is_none) {
                    let parent_key = self.primary_key(&fk.referenced_table)?;
                    fk.referenced_columns = targets
                        .into_iter()
                        .enumerate()
                        .map(|(i, to)| to.or_else(|| parent_key.get(i).cloned()).unwrap_or_default())
                        .collect();
                } else {
                    fk.referenced_columns = targets.into_iter().flatten().collect();
                }
                Ok(fk)
            })
            .collect()
    }

    fn close(self: Box<Self>) {
        if let Err((_conn, e)) = self.conn.close() {
            tracing::warn!(error = %e, "SQLite connection did not close cleanly");
        } else {
            tracing::debug!("SQLite session closed");
        }
    }
}
