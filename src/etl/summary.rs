//! Headline metrics of the current snapshot

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::changes::parse_timestamp;
use super::history::read_table;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotSummary {
    pub total_studies: usize,
    pub recruiting: usize,
    pub completed: usize,
    /// Latest extraction time, `DD Month YYYY HH:MM`
    pub extracted_at: Option<String>,
    pub by_status: BTreeMap<String, usize>,
}

pub fn summarize(studies_csv: &Path) -> Result<SnapshotSummary> {
    let table = read_table(studies_csv)?;
    let id_col = table.column("NCTId").context("studies.csv has no NCTId column")?;
    let status_col = table.column("OverallStatus");
    let ts_col = table.column("Timestamp");

    let mut summary = SnapshotSummary::default();
    let mut seen = BTreeSet::new();
    let mut recruiting = BTreeSet::new();
    let mut completed = BTreeSet::new();

    for row in &table.rows {
        let id = row[id_col].as_str();
        let first = seen.insert(id);

        if let Some(col) = status_col {
            let status = row[col].as_str();
            match status {
                "Recruiting" => {
                    recruiting.insert(id);
                }
                "Completed" => {
                    completed.insert(id);
                }
                _ => {}
            }
            if first && !status.is_empty() {
                *summary.by_status.entry(status.to_string()).or_default() += 1;
            }
        }
    }

    summary.total_studies = seen.len();
    summary.recruiting = recruiting.len();
    summary.completed = completed.len();
    summary.extracted_at = ts_col
        .and_then(|col| table.rows.iter().filter_map(|r| parse_timestamp(&r[col])).max())
        .map(|ts| ts.format("%d %B %Y %H:%M").to_string());

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_counts_unique_studies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studies.csv");
        std::fs::write(
            &path,
            "\u{feff}NCTId,OverallStatus,Timestamp\n\
             NCT1,Recruiting,2026-03-01T08:30:00.000000\n\
             NCT2,Completed,2026-03-01T08:30:00.000000\n\
             NCT3,Recruiting,2026-03-01T08:30:00.000000\n\
             NCT4,Withdrawn,2026-03-01T08:30:00.000000\n",
        )
        .unwrap();

        let summary = summarize(&path).unwrap();
        assert_eq!(summary.total_studies, 4);
        assert_eq!(summary.recruiting, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.extracted_at.as_deref(), Some("01 March 2026 08:30"));
        assert_eq!(summary.by_status.get("Withdrawn"), Some(&1));
    }
}
