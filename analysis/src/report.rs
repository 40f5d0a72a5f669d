//! Grouped statistics and the per (model, strategy) summary CSV.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::results::{DEFAULT_MEASURES, ResultRow, values};
use crate::stats::{Describe, describe, mean, sample_std};

/// Rows partitioned by one column, in key order.
pub fn group_by<'a>(rows: &'a [ResultRow], column: &str) -> BTreeMap<String, Vec<&'a ResultRow>> {
    let mut groups: BTreeMap<String, Vec<&ResultRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.key(column)).or_default().push(row);
    }
    groups
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub group: String,
    pub measure: String,
    /// `None` when the group has no numeric values for the measure.
    pub stats: Option<Describe>,
}

pub fn describe_groups(rows: &[ResultRow], by: &str, measures: &[String]) -> Vec<GroupStats> {
    let mut out = Vec::new();
    for (group, members) in group_by(rows, by) {
        for measure in measures {
            let numbers: Vec<f64> = members.iter().filter_map(|r| r.number(measure)).collect();
            out.push(GroupStats {
                group: group.clone(),
                measure: measure.clone(),
                stats: describe(&numbers),
            });
        }
    }
    out
}

/// Summary cell group for one measure. `std` is the sample deviation,
/// absent below two values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub count: usize,
}

impl SummaryStats {
    fn of(values: &[f64]) -> Self {
        SummaryStats {
            mean: mean(values),
            std: sample_std(values),
            count: values.len(),
        }
    }
}

/// One line of the summary CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub model: String,
    pub strategy: String,
    pub measures: Vec<(String, SummaryStats)>,
}

/// Per (model, strategy) stats for the default measures.
pub fn summarize(rows: &[ResultRow]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(String, String), Vec<ResultRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.key("model"), row.strategy.clone()))
            .or_default()
            .push(row.clone());
    }
    groups
        .into_iter()
        .map(|((model, strategy), members)| SummaryRow {
            model,
            strategy,
            measures: DEFAULT_MEASURES
                .iter()
                .map(|m| (m.to_string(), SummaryStats::of(&values(&members, m))))
                .collect(),
        })
        .collect()
}

pub fn write_summary(path: &Path, summary: &[SummaryRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;

    let mut header = vec!["model".to_string(), "strategy".to_string()];
    for measure in DEFAULT_MEASURES {
        for stat in ["mean", "std", "count"] {
            header.push(format!("{measure}_{stat}"));
        }
    }
    writer
        .write_record(&header)
        .with_context(|| format!("write header {}", path.display()))?;

    for row in summary {
        let mut record = vec![row.model.clone(), row.strategy.clone()];
        for (_, stats) in &row.measures {
            record.push(stats.mean.map(|v| format!("{v:.4}")).unwrap_or_default());
            record.push(stats.std.map(|v| format!("{v:.4}")).unwrap_or_default());
            record.push(stats.count.to_string());
        }
        writer
            .write_record(&record)
            .with_context(|| format!("write row {}", path.display()))?;
    }
    writer.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(strategy: &str, model: &str, score: &str) -> ResultRow {
        ResultRow {
            strategy: strategy.to_string(),
            fields: [
                ("model".to_string(), model.to_string()),
                ("final_score".to_string(), score.to_string()),
                ("iteration_count".to_string(), "1".to_string()),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn describe_and_summary_use_different_deviations() {
        let rows = [row("PDR", "m", "100"), row("PDR", "m", "50")];
        let described = describe_groups(&rows, "strategy", &["final_score".to_string()]);
        assert_eq!(described[0].stats.expect("stats").std, 25.0);

        let summary = summarize(&rows);
        let (_, score) = &summary[0].measures[2];
        let std = score.std.expect("two values");
        assert!((std - 1250f64.sqrt()).abs() < 1e-12, "{std}");
    }

    #[test]
    fn groups_by_normalized_strategy() {
        let rows = [row("PDR", "m", "100"), row("Ad Hoc", "m", "50"), row("PDR", "m", "50")];
        let stats = describe_groups(&rows, "strategy", &["final_score".to_string()]);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].group, "Ad Hoc");
        let pdr = stats[1].stats.expect("pdr stats");
        assert_eq!((pdr.mean, pdr.std, pdr.count), (75.0, 25.0, 2));
    }

    #[test]
    fn summary_csv_has_one_line_per_model_and_strategy() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("out/summary.csv");
        let rows = [
            row("PDR", "gpt-5", "100"),
            row("PDR", "gpt-4o", "75"),
            row("PDR", "gpt-5", "50"),
        ];
        let summary = summarize(&rows);
        write_summary(&path, &summary).expect("write");

        let mut reader = csv::Reader::from_path(&path).expect("open");
        let header = reader.headers().expect("header").clone();
        assert_eq!(&header[0], "model");
        assert_eq!(&header[2], "iteration_count_mean");
        assert_eq!(header.len(), 2 + 4 * 3);
        let lines: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(&lines[0][0], "gpt-4o");
        assert_eq!(&lines[1][0], "gpt-5");
        // final_score columns follow iteration_count and time_spent_sec.
        assert_eq!(&lines[1][8], "75.0000");
        assert_eq!(&lines[1][10], "2");
        // Sample std of 100 and 50; a single value has none.
        assert_eq!(&lines[1][9], "35.3553");
        assert_eq!(&lines[0][9], "");
        assert_eq!(&lines[0][10], "1");
        // time_spent_sec is absent from the fixture rows.
        assert_eq!(&lines[1][5], "");
        assert_eq!(&lines[1][7], "0");
    }
}
