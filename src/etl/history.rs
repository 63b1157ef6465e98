//! Append-only history of study snapshots

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{info, warn};

use super::transform::UTF8_BOM;

/// A CSV held in memory as strings
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Read a CSV leniently: a leading BOM is dropped and rows whose field
/// count differs from the header are skipped
pub fn read_table(path: &Path) -> Result<CsvTable> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let content = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        match record {
            Ok(record) if record.len() == headers.len() => {
                rows.push(record.iter().map(str::to_string).collect());
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "Skipped malformed rows");
    }

    Ok(CsvTable { headers, rows })
}

/// Append the rows of `current_csv` to `history_csv`. The header is only
/// written when the history file is created. Returns the appended row count.
pub fn append_to_history(current_csv: &Path, history_csv: &Path) -> Result<usize> {
    let current = read_table(current_csv)?;
    let exists = history_csv.is_file() && std::fs::metadata(history_csv)?.len() > 0;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(history_csv)
        .with_context(|| format!("Cannot open {}", history_csv.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    if !exists {
        writer.write_record(&current.headers)?;
    }
    for row in &current.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    info!(
        rows = current.rows.len(),
        history = %history_csv.display(),
        "Appended snapshot to history"
    );
    Ok(current.rows.len())
}
