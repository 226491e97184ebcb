//! Output formatting for schema models.

use dbprobe_core::{SchemaModel, Table};
use std::fmt::Write;

/// Format the model as JSON.
///
/// If `compact` is true, outputs minified JSON without whitespace.
pub fn format_json(model: &SchemaModel, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(model)
    } else {
        serde_json::to_string_pretty(model)
    }
}

/// Format the model as a human-readable listing.
pub fn format_summary(model: &SchemaModel) -> String {
    let mut out = String::new();

    for table in model.tables() {
        write_table(&mut out, table);
        out.push('\n');
    }

    if !model.foreign_keys().is_empty() {
        out.push_str("Foreign keys:\n");
        for fk in model.foreign_keys() {
            match &fk.name {
                Some(name) => {
                    let _ = writeln!(out, "  {fk}  [{name}]");
                }
                None => {
                    let _ = writeln!(out, "  {fk}");
                }
            }
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "{} table{}, {} foreign key{}",
        model.len(),
        plural(model.len()),
        model.foreign_keys().len(),
        plural(model.foreign_keys().len())
    );
    out
}

fn write_table(out: &mut String, table: &Table) {
    let _ = writeln!(out, "{}", table.id);

    let name_width = table.columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
    let type_width = table.columns.iter().map(|c| c.native_type.len()).max().unwrap_or(0);

    for column in &table.columns {
        let key = if table.is_primary_key_column(&column.name) { "PK" } else { "  " };
        let null = if column.nullable { "" } else { " not null" };
        let _ = writeln!(
            out,
            "  {key} {:<name_width$}  {:<type_width$}  {}{null}",
            column.name,
            column.native_type,
            column.sql_type.name(),
        );
    }

    for index in &table.indexes {
        let kind = if index.unique { "unique index" } else { "index" };
        let _ = writeln!(out, "  {kind} {} ({})", index.name, index.columns.join(", "));
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
