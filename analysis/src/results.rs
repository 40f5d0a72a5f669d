//! Loading persisted result CSVs.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument, warn};

use pdr::core::types::StrategyKind;

pub const UNKNOWN_STRATEGY: &str = "unknown";

/// Measures summarized when none are requested.
pub const DEFAULT_MEASURES: [&str; 4] = [
    "iteration_count",
    "time_spent_sec",
    "final_score",
    "satisfaction_score",
];

/// One persisted run: its normalized strategy plus every raw column.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub strategy: String,
    pub fields: BTreeMap<String, String>,
}

impl ResultRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Grouping key for `column`. `strategy` yields the normalized label.
    pub fn key(&self, column: &str) -> String {
        if column == "strategy" {
            return self.strategy.clone();
        }
        self.get(column).unwrap_or_default().to_string()
    }

    /// Numeric value of `column`, `None` when absent or non-numeric.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column)?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Canonical label for a raw strategy cell; unrecognized values pass through trimmed.
pub fn normalize_strategy(raw: &str) -> String {
    match StrategyKind::from_label(raw) {
        Some(kind) => kind.label().to_string(),
        None => raw.trim().to_string(),
    }
}

/// Strategy implied by a `{strategy}_results_{stamp}.csv` file name.
pub fn strategy_from_file_name(path: &Path) -> Option<StrategyKind> {
    let stem = path.file_stem()?.to_str()?;
    let (prefix, _) = stem.split_once("_results")?;
    StrategyKind::from_label(prefix)
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_results(path: &Path) -> Result<Vec<ResultRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let header: Vec<String> = reader
        .headers()
        .with_context(|| format!("read header {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    let fallback = strategy_from_file_name(path)
        .map(|kind| kind.label().to_string())
        .unwrap_or_else(|| UNKNOWN_STRATEGY.to_string());

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("read row {} of {}", line + 1, path.display()))?;
        let fields: BTreeMap<String, String> = header
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        let strategy = match fields.get("strategy") {
            Some(raw) if !raw.trim().is_empty() => normalize_strategy(raw),
            _ => fallback.clone(),
        };
        rows.push(ResultRow { strategy, fields });
    }
    debug!(rows = rows.len(), "results loaded");
    Ok(rows)
}

pub fn load_all(paths: &[impl AsRef<Path>]) -> Result<Vec<ResultRow>> {
    let mut rows = Vec::new();
    for path in paths {
        rows.extend(load_results(path.as_ref())?);
    }
    Ok(rows)
}

/// Numeric values of `column`, skipping cells that do not parse.
pub fn values(rows: &[ResultRow], column: &str) -> Vec<f64> {
    rows.iter().filter_map(|row| row.number(column)).collect()
}

/// Values of one measure from two result sets, aligned pair by pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Paired {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    /// Rows left out: unmatched, or non-numeric on either side.
    pub dropped: usize,
}

/// Pair rows by `(participant_name, task_name)` when every row carries a
/// participant, otherwise by position. Pairs with a non-numeric side are dropped.
pub fn paired_values(left: &[ResultRow], right: &[ResultRow], column: &str) -> Result<Paired> {
    let keyed = |rows: &[ResultRow]| {
        rows.iter()
            .all(|r| r.get("participant_name").is_some_and(|p| !p.trim().is_empty()))
    };
    let pairs: Vec<(&ResultRow, &ResultRow)> = if keyed(left) && keyed(right) {
        let index = unique_index(right)?;
        unique_index(left)?;
        left.iter()
            .filter_map(|l| index.get(&pair_key(l)).map(|r| (l, *r)))
            .collect()
    } else {
        if left.len() != right.len() {
            bail!(
                "rows without participant_name are paired by position and need equal counts ({} vs {})",
                left.len(),
                right.len()
            );
        }
        left.iter().zip(right).collect()
    };

    let mut paired = Paired {
        left: Vec::new(),
        right: Vec::new(),
        dropped: left.len().max(right.len()) - pairs.len(),
    };
    for (l, r) in pairs {
        match (l.number(column), r.number(column)) {
            (Some(a), Some(b)) => {
                paired.left.push(a);
                paired.right.push(b);
            }
            _ => paired.dropped += 1,
        }
    }
    if paired.dropped > 0 {
        warn!(column, dropped = paired.dropped, used = paired.left.len(), "pairs dropped");
    }
    Ok(paired)
}

fn pair_key(row: &ResultRow) -> (String, String) {
    (row.key("participant_name"), row.key("task_name"))
}

fn unique_index(rows: &[ResultRow]) -> Result<BTreeMap<(String, String), &ResultRow>> {
    let mut index = BTreeMap::new();
    for row in rows {
        let key = pair_key(row);
        if index.insert(key.clone(), row).is_some() {
            bail!(
                "duplicate row for participant {:?}, task {:?}; cannot pair",
                key.0,
                key.1
            );
        }
    }
    Ok(index)
}
