//! Accumulates introspected tables and foreign keys into a [`SchemaModel`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::ProbeError;
use crate::models::{ForeignKey, SchemaModel, Table, TableId};

/// Receives tables and foreign keys during a run and builds the final model.
#[derive(Debug, Clone)]
pub struct SchemaCollector {
    tables: Vec<Table>,
    positions: HashMap<TableId, usize>,
    foreign_keys: Vec<ForeignKey>,
    started_at: DateTime<Utc>,
}

impl Default for SchemaCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaCollector {
    /// Create an empty collector stamped with the current time.
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            positions: HashMap::new(),
            foreign_keys: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Add a table. A table with the same identity is replaced in place.
    pub fn collect_table(&mut self, table: Table) {
        match self.positions.get(&table.id) {
            Some(&i) => {
                tracing::warn!(table = %table.id, "Table collected twice, keeping the latest");
                self.tables[i] = table;
            }
            None => {
                self.positions.insert(table.id.clone(), self.tables.len());
                self.tables.push(table);
            }
        }
    }

    /// Add a foreign key. References are checked in [`finalize`](Self::finalize).
    pub fn collect_foreign_key(&mut self, foreign_key: ForeignKey) {
        self.foreign_keys.push(foreign_key);
    }

    /// Whether a table with this identity has been collected.
    pub fn contains(&self, id: &TableId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn foreign_key_count(&self) -> usize {
        self.foreign_keys.len()
    }

    /// Validate everything collected and produce the model.
    ///
    /// The collector is left untouched, so calling this again yields an
    /// equal model. Every violation found is reported in one
    /// [`ProbeError::Validation`].
    pub fn finalize(&self) -> Result<SchemaModel, ProbeError> {
        let violations = self.violations();
        if !violations.is_empty() {
            tracing::warn!(count = violations.len(), "Collected schema failed validation");
            return Err(ProbeError::validation(violations));
        }

        Ok(SchemaModel::new(self.tables.clone(), self.foreign_keys.clone(), self.started_at))
    }

    fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for table in &self.tables {
            for pk in table.missing_primary_key_columns() {
                violations.push(format!(
                    "table {}: primary-key column '{}' is not a column of the table",
                    table.id, pk
                ));
            }
        }

        for fk in &self.foreign_keys {
            if !self.contains(&fk.table) {
                violations.push(format!("foreign key {}: table {} was not collected", fk, fk.table));
            }
            if !self.contains(&fk.referenced_table) {
                violations.push(format!(
                    "foreign key {}: referenced table {} was not collected",
                    fk, fk.referenced_table
                ));
            }
            if fk.columns.is_empty() {
                violations.push(format!("foreign key {}: no columns", fk));
            } else if fk.columns.len() != fk.referenced_columns.len() {
                violations.push(format!(
                    "foreign key {}: {} referencing columns but {} referenced columns",
                    fk,
                    fk.columns.len(),
                    fk.referenced_columns.len()
                ));
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, SqlType};

    fn table(name: &str, columns: &[&str], pk: &[&str]) -> Table {
        let mut t = Table::new(TableId::named(name));
        t.columns = columns
            .iter()
            .enumerate()
            .map(|(i, c)| Column {
                name: c.to_string(),
                native_type: "INTEGER".into(),
                sql_type: SqlType::Integer,
                nullable: true,
                ordinal_position: i as u32 + 1,
            })
            .collect();
        t.primary_key = pk.iter().map(|c| c.to_string()).collect();
        t
    }

    fn fk(from: &str, cols: &[&str], to: &str, ref_cols: &[&str]) -> ForeignKey {
        ForeignKey {
            name: None,
            table: TableId::named(from),
            columns: cols.iter().map(|c| c.to_string()).collect(),
            referenced_table: TableId::named(to),
            referenced_columns: ref_cols.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_finalize_keeps_listing_order() {
        let mut collector = SchemaCollector::new();
        collector.collect_table(table("users", &["id"], &["id"]));
        collector.collect_table(table("orders", &["id", "user_id"], &["id"]));
        collector.collect_foreign_key(fk("orders", &["user_id"], "users", &["id"]));

        let model = collector.finalize().unwrap();
        let names: Vec<_> = model.tables().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["users", "orders"]);
        assert_eq!(model.foreign_keys().len(), 1);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut collector = SchemaCollector::new();
        collector.collect_table(table("users", &["id"], &["id"]));

        let first = collector.finalize().unwrap();
        let second = collector.finalize().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_table_replaced_in_place() {
        let mut collector = SchemaCollector::new();
        collector.collect_table(table("a", &["x"], &[]));
        collector.collect_table(table("b", &["y"], &[]));
        collector.collect_table(table("a", &["x", "z"], &[]));

        assert_eq!(collector.table_count(), 2);
        let model = collector.finalize().unwrap();
        assert_eq!(model.tables()[0].name(), "a");
        assert_eq!(model.tables()[0].columns.len(), 2);
    }

    #[test]
    fn test_primary_key_outside_columns_rejected() {
        let mut collector = SchemaCollector::new();
        collector.collect_table(table("users", &["id"], &["id", "tenant"]));

        let err = collector.finalize().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.violations().len(), 1);
        assert!(err.violations()[0].contains("tenant"));
    }

    #[test]
    fn test_dangling_foreign_key_rejected() {
        let mut collector = SchemaCollector::new();
        collector.collect_table(table("orders", &["user_id"], &[]));
        collector.collect_foreign_key(fk("orders", &["user_id"], "users", &["id"]));

        let err = collector.finalize().unwrap_err();
        assert!(err.violations().iter().any(|v| v.contains("referenced table users")));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let mut collector = SchemaCollector::new();
        collector.collect_table(table("a", &["x"], &["missing"]));
        collector.collect_foreign_key(fk("a", &["x", "y"], "a", &["x"]));
        collector.collect_foreign_key(fk("a", &[], "a", &[]));

        let err = collector.finalize().unwrap_err();
        assert_eq!(err.violations().len(), 3);
    }

    #[test]
    fn test_empty_collector_finalizes() {
        let model = SchemaCollector::default().finalize().unwrap();
        assert!(model.is_empty());
        assert!(model.foreign_keys().is_empty());
    }
}
