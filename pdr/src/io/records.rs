//! Append-only CSV persistence of run records.

use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::Record;

/// Append `records` to the CSV at `path`.
///
/// A new or empty file gets a header made of the first-seen column order
/// across `records`. An existing header is kept as is: missing columns are
/// written as empty cells and unknown ones are dropped.
pub fn append_records(path: &Path, records: &[Record]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }

    let existing = read_header(path)?;
    let write_header = existing.is_none();
    let header = existing.unwrap_or_else(|| header_for(records));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if write_header {
        writer
            .write_record(&header)
            .with_context(|| format!("write header {}", path.display()))?;
    }
    for record in records {
        let row = header.iter().map(|col| record.get(col).unwrap_or(""));
        writer
            .write_record(row)
            .with_context(|| format!("write row {}", path.display()))?;
    }
    writer.flush().with_context(|| format!("flush {}", path.display()))?;
    debug!(path = %path.display(), rows = records.len(), "records appended");
    Ok(())
}

/// Header of an existing non-empty CSV file.
pub fn read_header(path: &Path) -> Result<Option<Vec<String>>> {
    let non_empty = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if !non_empty {
        return Ok(None);
    }
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("read header {}", path.display()))?;
    Ok(Some(headers.iter().map(str::to_string).collect()))
}

fn header_for(records: &[Record]) -> Vec<String> {
    let mut header: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !header.iter().any(|h| h == key) {
                header.push(key.to_string());
            }
        }
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .expect("open");
        reader
            .records()
            .map(|r| r.expect("row").iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn new_file_gets_header_from_first_seen_keys() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/results.csv");
        append_records(
            &path,
            &[record(&[("a", "1"), ("b", "2")]), record(&[("a", "3"), ("c", "4")])],
        )
        .expect("append");
        assert_eq!(
            read_rows(&path),
            vec![
                vec!["a", "b", "c"],
                vec!["1", "2", ""],
                vec!["3", "", "4"],
            ]
        );
    }

    #[test]
    fn later_appends_drop_extras_and_blank_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("results.csv");
        append_records(&path, &[record(&[("a", "1"), ("b", "2")])]).expect("first");
        append_records(&path, &[record(&[("b", "x"), ("z", "extra")])]).expect("second");
        assert_eq!(
            read_rows(&path),
            vec![vec!["a", "b"], vec!["1", "2"], vec!["", "x"]]
        );
    }

    #[test]
    fn empty_existing_file_is_treated_as_new() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("results.csv");
        fs::write(&path, "").expect("touch");
        append_records(&path, &[record(&[("a", "1")])]).expect("append");
        assert_eq!(read_rows(&path), vec![vec!["a"], vec!["1"]]);
    }

    #[test]
    fn multiline_values_round_trip_through_quoting() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("results.csv");
        append_records(&path, &[record(&[("final_output", "line one,\n\"two\"")])]).expect("append");
        assert_eq!(read_rows(&path)[1], vec!["line one,\n\"two\""]);
    }
}
