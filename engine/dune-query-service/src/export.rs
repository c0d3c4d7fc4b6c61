//! CSV export of query results

use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::models::QueryTable;

/// Write `table` to `path` as comma-delimited UTF-8, header first, no index column.
///
/// Existing files are truncated and overwritten in place.
pub fn write_csv(table: &QueryTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(render_cell))?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
