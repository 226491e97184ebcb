//! Schema reader.
//!
//! Drives a [`MetadataSession`] through one introspection pass: list tables,
//! read each table's columns, primary key and indexes, then its foreign
//! keys, and hand everything to a [`SchemaCollector`].

use std::collections::HashSet;
use std::time::Instant;

use crate::error::ProbeError;
use crate::models::{Column, SchemaFilter, SchemaModel, Table, TableId};
use crate::services::collector::SchemaCollector;
use crate::services::connector::ConnectionHandle;
use crate::services::session::MetadataSession;
use crate::services::strategy::Strategy;

/// Reads a schema model from an open connection.
#[derive(Debug, Clone, Default)]
pub struct SchemaReader {
    strategy: Strategy,
}

impl SchemaReader {
    /// Create a reader with the given strategy.
    pub fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    /// Get the strategy.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Read every table matching `filter` and the strategy's table filter.
    ///
    /// Either the whole model is returned or the first error is; no partial
    /// model escapes. Errors raised while reading a table name that table.
    pub fn read(
        &self,
        handle: &ConnectionHandle,
        filter: &SchemaFilter,
    ) -> Result<SchemaModel, ProbeError> {
        let start = Instant::now();
        let session = handle.session()?;

        let listed = session.list_tables(filter)?;
        let listed_count = listed.len();
        let tables: Vec<TableId> = listed
            .into_iter()
            .filter(|id| filter.matches(id) && self.strategy.include_table(id))
            .collect();

        tracing::debug!(
            run_id = %handle.id(),
            listed = listed_count,
            included = tables.len(),
            "Listed tables"
        );

        let mut collector = SchemaCollector::new();
        for id in &tables {
            let table = self.read_table(session, id).map_err(|e| e.with_table(id))?;
            collector.collect_table(table);
        }

        let included: HashSet<&TableId> = tables.iter().collect();
        // every table in the database, listed on first need
        let mut existing: Option<HashSet<TableId>> = None;
        for id in &tables {
            let foreign_keys = session.foreign_keys(id).map_err(|e| e.with_table(id))?;
            for fk in foreign_keys {
                if included.contains(&fk.referenced_table) {
                    collector.collect_foreign_key(fk);
                    continue;
                }

                if existing.is_none() {
                    let all = session
                        .list_tables(&SchemaFilter::all())
                        .map_err(|e| e.with_table(id))?;
                    existing = Some(all.into_iter().collect());
                }
                let excluded = existing.as_ref().is_some_and(|all| all.contains(&fk.referenced_table));

                if excluded {
                    tracing::debug!(
                        run_id = %handle.id(),
                        foreign_key = %fk,
                        "Skipping foreign key to a table outside the filter"
                    );
                } else {
                    // dangling reference, rejected by finalize
                    tracing::warn!(
                        run_id = %handle.id(),
                        foreign_key = %fk,
                        "Foreign key references a table that does not exist"
                    );
                    collector.collect_foreign_key(fk);
                }
            }
        }

        let model = collector.finalize()?;

        tracing::info!(
            run_id = %handle.id(),
            tables = model.len(),
            foreign_keys = model.foreign_keys().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Schema introspection complete"
        );

        Ok(model)
    }

    fn read_table(&self, session: &dyn MetadataSession, id: &TableId) -> Result<Table, ProbeError> {
        let driver = session.driver();

        let mut raw = session.columns(id)?;
        raw.sort_by_key(|c| c.ordinal_position);

        let mut table = Table::new(id.clone());
        table.columns = raw
            .into_iter()
            .map(|c| Column {
                sql_type: self.strategy.map_type(driver, &c.native_type),
                name: c.name,
                native_type: c.native_type,
                nullable: c.nullable,
                ordinal_position: c.ordinal_position,
            })
            .collect();

        for pk in session.primary_key(id)? {
            if !table.primary_key.contains(&pk) {
                table.primary_key.push(pk);
            }
        }

        table.indexes = session.indexes(id)?;

        tracing::trace!(
            table = %id,
            columns = table.columns.len(),
            indexes = table.indexes.len(),
            "Read table"
        );

        Ok(table)
    }
}
