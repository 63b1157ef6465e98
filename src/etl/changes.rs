//! Change detection over the snapshot history

use anyhow::{bail, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

use super::history::{read_table, CsvTable};
use super::normalize::humanize_field;
use super::transform::DATE_COLUMNS;

pub const NEW_STUDY: &str = "New Study Added";
pub const REMOVED_STUDY: &str = "Study Removed";
pub const NO_CHANGES: &str = "No changes detected";

const CHANGE_COLUMNS: [&str; 6] = [
    "NCTId",
    "final_date",
    "start_date",
    "field_changed",
    "final_value",
    "start_value",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    #[serde(rename = "NCTId")]
    pub nct_id: String,
    pub final_date: String,
    pub start_date: String,
    pub field_changed: String,
    pub final_value: String,
    pub start_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Numeric,
    Date,
    Text,
}

struct HistoryRow<'a> {
    timestamp: NaiveDateTime,
    values: &'a [String],
}

/// Timestamps are written as ISO-8601; older files may use a space separator
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn classify_columns(table: &CsvTable, rows: &[HistoryRow<'_>]) -> Vec<ColumnKind> {
    (0..table.headers.len())
        .map(|col| {
            if DATE_COLUMNS.contains(&table.headers[col].as_str()) {
                return ColumnKind::Date;
            }
            let mut non_empty = rows
                .iter()
                .map(|r| r.values[col].trim())
                .filter(|v| !v.is_empty())
                .peekable();
            if non_empty.peek().is_none() {
                return ColumnKind::Numeric;
            }
            if non_empty.all(|v| v.parse::<f64>().is_ok()) {
                ColumnKind::Numeric
            } else {
                ColumnKind::Text
            }
        })
        .collect()
}

/// Compare two values of one column; `Some((final, start))` when they differ.
/// Empty values on either side never count as a change.
fn compare(kind: ColumnKind, current: &str, previous: &str) -> Option<(String, String)> {
    if current.trim().is_empty() || previous.trim().is_empty() {
        return None;
    }
    match kind {
        ColumnKind::Numeric => {
            let (a, b) = (current.trim().parse::<f64>().ok()?, previous.trim().parse::<f64>().ok()?);
            (a != b).then(|| (current.to_string(), previous.to_string()))
        }
        ColumnKind::Date => {
            let (a, b) = (parse_date(current)?, parse_date(previous)?);
            (a != b).then(|| (a.format("%Y-%m-%d").to_string(), b.format("%Y-%m-%d").to_string()))
        }
        ColumnKind::Text => {
            let a = current.replace("\n\n", "\n");
            let b = previous.replace("\n\n", "\n");
            (a != b).then_some((a, b))
        }
    }
}

/// Detect additions, removals and field changes across the last `last_n`
/// snapshots of each study
pub fn detect_changes(table: &CsvTable, last_n: usize) -> Result<Vec<ChangeRecord>> {
    let (Some(id_col), Some(ts_col)) = (table.column("NCTId"), table.column("Timestamp")) else {
        bail!("History is missing the NCTId or Timestamp column");
    };

    let rows: Vec<HistoryRow<'_>> = table
        .rows
        .iter()
        .filter_map(|values| {
            parse_timestamp(&values[ts_col]).map(|timestamp| HistoryRow { timestamp, values })
        })
        .collect();

    let Some(latest) = rows.iter().map(|r| r.timestamp).max() else {
        return Ok(Vec::new());
    };

    let mut by_study: BTreeMap<&str, Vec<&HistoryRow<'_>>> = BTreeMap::new();
    for row in &rows {
        by_study.entry(row.values[id_col].as_str()).or_default().push(row);
    }
    for group in by_study.values_mut() {
        group.sort_by_key(|r| r.timestamp);
    }

    let latest_ids: BTreeSet<&str> = rows
        .iter()
        .filter(|r| r.timestamp == latest)
        .map(|r| r.values[id_col].as_str())
        .collect();
    let previous_ids: BTreeSet<&str> = rows
        .iter()
        .filter(|r| r.timestamp < latest)
        .map(|r| r.values[id_col].as_str())
        .collect();

    let last_seen = |id: &str| {
        by_study
            .get(id)
            .and_then(|g| g.last())
            .map(|r| format_timestamp(&r.timestamp))
            .unwrap_or_default()
    };

    let mut changes = Vec::new();

    for id in latest_ids.difference(&previous_ids) {
        changes.push(ChangeRecord {
            nct_id: id.to_string(),
            final_date: last_seen(*id),
            field_changed: NEW_STUDY.to_string(),
            ..Default::default()
        });
    }

    for id in previous_ids.difference(&latest_ids) {
        changes.push(ChangeRecord {
            nct_id: id.to_string(),
            start_date: last_seen(*id),
            field_changed: REMOVED_STUDY.to_string(),
            ..Default::default()
        });
    }

    let kinds = classify_columns(table, &rows);

    for (id, group) in &by_study {
        if group.len() < 2 {
            continue;
        }
        let recent = &group[group.len().saturating_sub(last_n)..];
        for pair in recent.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            for (col, header) in table.headers.iter().enumerate() {
                if col == id_col || col == ts_col {
                    continue;
                }
                if let Some((final_value, start_value)) =
                    compare(kinds[col], &current.values[col], &previous.values[col])
                {
                    changes.push(ChangeRecord {
                        nct_id: id.to_string(),
                        final_date: format_timestamp(&current.timestamp),
                        start_date: format_timestamp(&previous.timestamp),
                        field_changed: humanize_field(header),
                        final_value,
                        start_value,
                    });
                }
            }
        }
    }

    Ok(changes)
}

/// Outcome of regenerating the changes report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeReport {
    pub new_studies: usize,
    pub removed_studies: usize,
    pub field_changes: usize,
}

impl ChangeReport {
    pub fn is_empty(&self) -> bool {
        self.new_studies + self.removed_studies + self.field_changes == 0
    }
}

/// Read `history_csv`, detect changes and write `changes_csv`
pub fn generate_changes(history_csv: &Path, changes_csv: &Path, last_n: usize) -> Result<ChangeReport> {
    let table = read_table(history_csv)?;
    info!(rows = table.rows.len(), "Read snapshot history");

    let changes = detect_changes(&table, last_n)?;
    let report = ChangeReport {
        new_studies: changes.iter().filter(|c| c.field_changed == NEW_STUDY).count(),
        removed_studies: changes.iter().filter(|c| c.field_changed == REMOVED_STUDY).count(),
        field_changes: changes
            .iter()
            .filter(|c| c.field_changed != NEW_STUDY && c.field_changed != REMOVED_STUDY)
            .count(),
    };

    let rows = if changes.is_empty() {
        vec![ChangeRecord {
            field_changed: NO_CHANGES.to_string(),
            ..Default::default()
        }]
    } else {
        changes
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(changes_csv)?;
    writer.write_record(CHANGE_COLUMNS)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    if report.is_empty() {
        info!("No changes detected in the data");
    } else {
        info!(
            new = report.new_studies,
            removed = report.removed_studies,
            changed = report.field_changes,
            path = %changes_csv.display(),
            "Changes file generated"
        );
    }
    Ok(report)
}
