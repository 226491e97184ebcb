//! PostgreSQL metadata session.
//!
//! Reads tables, columns, keys and indexes from the `pg_catalog` system
//! catalogs over a single tokio-postgres client. The session owns a
//! current-thread runtime and blocks on every query, so callers stay
//! synchronous and the connection task is only driven while a query runs.

use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

use crate::error::ProbeError;
use crate::models::{Driver, ForeignKey, Index, IntrospectionConfig, SchemaFilter, TableId};
use crate::services::session::{MetadataSession, RawColumn};

const LIST_TABLES: &str = r#"
    SELECT
        n.nspname::text AS schema,
        c.relname::text AS name
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE c.relkind IN ('r', 'p')
      AND NOT c.relispartition
      AND n.nspname::text LIKE $1
      AND c.relname::text LIKE $2
      AND ($3::boolean OR (n.nspname NOT LIKE 'pg_%' AND n.nspname <> 'information_schema'))
    ORDER BY n.nspname, c.relname
"#;

const COLUMNS: &str = r#"
    SELECT
        a.attname::text AS name,
        pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
        NOT a.attnotnull AS is_nullable,
        a.attnum::integer AS ordinal_position
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname::text = $1
      AND c.relname::text = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

const PRIMARY_KEY: &str = r#"
    SELECT a.attname::text AS name
    FROM pg_catalog.pg_index i
    JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    CROSS JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, position)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = k.attnum
    WHERE n.nspname::text = $1
      AND c.relname::text = $2
      AND i.indisprimary
    ORDER BY k.position
"#;

const INDEXES: &str = r#"
    SELECT
        ic.relname::text AS index_name,
        i.indisunique AS is_unique,
        a.attname::text AS column_name
    FROM pg_catalog.pg_index i
    JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_class ic ON ic.oid = i.indexrelid
    CROSS JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, position)
    LEFT JOIN pg_catalog.pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = k.attnum
    WHERE n.nspname::text = $1
      AND c.relname::text = $2
      AND NOT i.indisprimary
    ORDER BY ic.relname, k.position
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT
        con.conname::text AS constraint_name,
        fn.nspname::text AS referenced_schema,
        fc.relname::text AS referenced_table,
        a.attname::text AS column_name,
        fa.attname::text AS referenced_column
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_class fc ON fc.oid = con.confrelid
    JOIN pg_catalog.pg_namespace fn ON fn.oid = fc.relnamespace
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, fattnum, position)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
    JOIN pg_catalog.pg_attribute fa ON fa.attrelid = con.confrelid AND fa.attnum = k.fattnum
    WHERE con.contype = 'f'
      AND n.nspname::text = $1
      AND c.relname::text = $2
    ORDER BY con.conname, k.position
"#;

/// A single PostgreSQL connection used for one introspection run.
pub struct PostgresSession {
    runtime: Runtime,
    client: Client,
    connection_task: JoinHandle<()>,
    /// Name of the connected database, reported as every table's catalog.
    catalog: String,
}

impl PostgresSession {
    /// Connect using the given configuration.
    ///
    /// Explicit `user`/`password` settings override credentials in the URL.
    /// The session is made read-only and gets the configured statement timeout.
    pub fn open(config: &IntrospectionConfig) -> Result<Self, ProbeError> {
        let mut pg_config: tokio_postgres::Config = config.url.parse().map_err(|e| {
            ProbeError::connection_with_source(
                format!("Invalid PostgreSQL URL: {}", config.display_url()),
                e,
            )
        })?;
        if let Some(user) = config.user.as_deref() {
            pg_config.user(user);
        }
        if let Some(password) = config.password.as_deref() {
            pg_config.password(password);
        }
        pg_config.application_name(config.options.application_name.as_str());
        pg_config.connect_timeout(Duration::from_secs(u64::from(
            config.options.connect_timeout_secs,
        )));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProbeError::connection_with_source("Failed to start I/O runtime", e))?;

        let (client, connection) = runtime.block_on(pg_config.connect(NoTls))?;
        let connection_task = runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "PostgreSQL connection terminated with error");
            }
        });

        let mut session_defaults =
            String::from("SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY;");
        if let Some(secs) = config.options.statement_timeout_secs {
            session_defaults.push_str(&format!(" SET statement_timeout = {};", u64::from(secs) * 1000));
        }
        runtime.block_on(client.batch_execute(&session_defaults)).map_err(|e| {
            tracing::error!(error = %e, "Failed to apply session defaults");
            ProbeError::connection_with_source("Failed to apply session defaults", e)
        })?;

        let row = runtime
            .block_on(client.query_one("SELECT current_database()::text", &[]))
            .map_err(|e| ProbeError::connection_with_source("Connection validation failed", e))?;
        let catalog: String = row
            .try_get(0)
            .map_err(|e| ProbeError::connection_with_source("Connection validation failed", e))?;

        Ok(Self { runtime, client, connection_task, catalog })
    }

    fn query(
        &self,
        query: &'static str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, ProbeError> {
        tracing::trace!(query, "Running PostgreSQL metadata query");
        self.runtime
            .block_on(self.client.query(sql, params))
            .map_err(|e| ProbeError::query_failed(query, e))
    }

    /// Schema and table name parameters for per-table queries.
    fn table_params(table: &TableId) -> (&str, &str) {
        (table.schema.as_deref().unwrap_or("public"), table.name.as_str())
    }
}

fn column<'a, T>(row: &'a Row, query: &'static str, name: &str) -> Result<T, ProbeError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name).map_err(|e| ProbeError::query_failed(query, e))
}

impl MetadataSession for PostgresSession {
    fn driver(&self) -> Driver {
        Driver::Postgres
    }

    fn list_tables(&self, filter: &SchemaFilter) -> Result<Vec<TableId>, ProbeError> {
        let include_system = filter.schema.is_some();
        let rows = self.query(
            "tables",
            LIST_TABLES,
            &[&filter.schema_like(), &filter.table_like(), &include_system],
        )?;

        rows.iter()
            .map(|row| -> Result<TableId, ProbeError> {
                Ok(TableId::new(
                    Some(self.catalog.clone()),
                    Some(column(row, "tables", "schema")?),
                    column::<String>(row, "tables", "name")?,
                ))
            })
            .collect()
    }

    fn columns(&self, table: &TableId) -> Result<Vec<RawColumn>, ProbeError> {
        let (schema, name) = Self::table_params(table);
        let rows = self.query("columns", COLUMNS, &[&schema, &name])?;

        rows.iter()
            .map(|row| -> Result<RawColumn, ProbeError> {
                let ordinal: i32 = column(row, "columns", "ordinal_position")?;
                Ok(RawColumn {
                    name: column(row, "columns", "name")?,
                    native_type: column(row, "columns", "data_type")?,
                    nullable: column(row, "columns", "is_nullable")?,
                    ordinal_position: u32::try_from(ordinal).unwrap_or_default(),
                })
            })
            .collect()
    }

    fn primary_key(&self, table: &TableId) -> Result<Vec<String>, ProbeError> {
        let (schema, name) = Self::table_params(table);
        let rows = self.query("primary key", PRIMARY_KEY, &[&schema, &name])?;
        rows.iter().map(|row| column(row, "primary key", "name")).collect()
    }

    fn indexes(&self, table: &TableId) -> Result<Vec<Index>, ProbeError> {
        let (schema, name) = Self::table_params(table);
        let rows = self.query("indexes", INDEXES, &[&schema, &name])?;

        let mut indexes: Vec<Index> = Vec::new();
        for row in &rows {
            let index_name: String = column(row, "indexes", "index_name")?;
            // expression columns have no attribute name
            let column_name: Option<String> = column(row, "indexes", "column_name")?;

            if indexes.last().map(|i| &i.name) != Some(&index_name) {
                indexes.push(Index {
                    name: index_name,
                    unique: column(row, "indexes", "is_unique")?,
                    columns: Vec::new(),
                });
            }
            if let (Some(index), Some(column_name)) = (indexes.last_mut(), column_name) {
                index.columns.push(column_name);
            }
        }
        Ok(indexes)
    }

    fn foreign_keys(&self, table: &TableId) -> Result<Vec<ForeignKey>, ProbeError> {
        let (schema, name) = Self::table_params(table);
        let rows = self.query("foreign keys", FOREIGN_KEYS, &[&schema, &name])?;

        let mut foreign_keys: Vec<ForeignKey> = Vec::new();
        for row in &rows {
            let constraint: String = column(row, "foreign keys", "constraint_name")?;

            if foreign_keys.last().and_then(|fk| fk.name.as_ref()) != Some(&constraint) {
                foreign_keys.push(ForeignKey {
                    name: Some(constraint),
                    table: table.clone(),
                    columns: Vec::new(),
                    referenced_table: TableId::new(
                        Some(self.catalog.clone()),
                        Some(column(row, "foreign keys", "referenced_schema")?),
                        column::<String>(row, "foreign keys", "referenced_table")?,
                    ),
                    referenced_columns: Vec::new(),
                });
            }
            if let Some(fk) = foreign_keys.last_mut() {
                fk.columns.push(column(row, "foreign keys", "column_name")?);
                fk.referenced_columns.push(column(row, "foreign keys", "referenced_column")?);
            }
        }
        Ok(foreign_keys)
    }

    fn close(self: Box<Self>) {
        let Self { runtime, client, connection_task, catalog } = *self;
        // dropping the client sends Terminate and lets the connection task finish
        drop(client);
        let finished = runtime
            .block_on(async { tokio::time::timeout(Duration::from_secs(1), connection_task).await });
        if finished.is_err() {
            tracing::warn!(catalog = %catalog, "PostgreSQL connection did not shut down in time");
        }
        tracing::debug!(catalog = %catalog, "PostgreSQL session closed");
    }
}
