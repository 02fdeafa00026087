//! CLI output: error mapping and table rendering for the CLI surface.

use crate::error::SyncError;
use crate::oplog::LogEntry;
use crate::store::{Record, TableSchema};
use crate::types::CompositeKey;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &SyncError) -> String {
    e.to_string()
}

/// Render a system's current rows: key columns, value columns, timestamp.
pub fn render_records(schema: &TableSchema, rows: &[(CompositeKey, Record)]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);

    let mut header: Vec<String> = schema.columns.clone();
    header.push("timestamp".to_string());
    table.set_header(header);

    for (key, record) in rows {
        let mut cells: Vec<String> = key.parts().to_vec();
        for column in schema.value_columns() {
            cells.push(
                record
                    .values
                    .get(column)
                    .cloned()
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        cells.push(record.timestamp.to_string());
        table.add_row(cells);
    }
    format!("{}", table)
}

/// Render oplog entries ascending by timestamp.
pub fn render_log(entries: &[LogEntry]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["timestamp", "operation", "table", "keys", "item"]);

    for entry in entries {
        let keys = entry
            .keys
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        let item = entry
            .item
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            entry.timestamp.to_string(),
            entry.operation.to_string(),
            entry.table.clone(),
            keys,
            item,
        ]);
    }
    format!("{}", table)
}
