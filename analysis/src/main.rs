//! Statistics over persisted PDR result files.

mod report;
mod results;
mod stats;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use pdr::{exit_codes, logging};

use crate::report::{describe_groups, group_by, summarize, write_summary};
use crate::results::{DEFAULT_MEASURES, load_all, load_results, paired_values, values};
use crate::stats::{TestResult, mann_whitney, one_way_anova, paired_t, wilcoxon};

#[derive(Parser)]
#[command(
    name = "pdr-analysis",
    version,
    about = "Descriptive and inferential statistics over PDR result CSVs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mean, population std and count per group.
    Describe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Measures to summarize (repeatable). Defaults to the four run measures.
        #[arg(long = "measure")]
        measures: Vec<String>,
        #[arg(long, value_enum, default_value = "strategy")]
        by: GroupBy,
    },
    /// Compare one measure between two result files.
    Compare {
        a: PathBuf,
        b: PathBuf,
        #[arg(long)]
        measure: String,
        #[arg(long, value_enum)]
        test: TestKind,
    },
    /// One-way ANOVA of a measure across strategies.
    Anova {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        measure: String,
    },
    /// Write per (model, strategy) statistics as CSV.
    Summary {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GroupBy {
    Strategy,
    Model,
    #[value(name = "participant_name")]
    ParticipantName,
    #[value(name = "task_name")]
    TaskName,
}

impl GroupBy {
    fn column(self) -> &'static str {
        match self {
            GroupBy::Strategy => "strategy",
            GroupBy::Model => "model",
            GroupBy::ParticipantName => "participant_name",
            GroupBy::TaskName => "task_name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TestKind {
    PairedT,
    Wilcoxon,
    MannWhitney,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Describe {
            files,
            measures,
            by,
        } => cmd_describe(&files, measures, by),
        Command::Compare {
            a,
            b,
            measure,
            test,
        } => cmd_compare(&a, &b, &measure, test),
        Command::Anova { files, measure } => cmd_anova(&files, &measure),
        Command::Summary { files, out } => cmd_summary(&files, &out),
    }
}

fn cmd_describe(files: &[PathBuf], measures: Vec<String>, by: GroupBy) -> Result<()> {
    let rows = load_all(files)?;
    let measures = if measures.is_empty() {
        DEFAULT_MEASURES.iter().map(|m| m.to_string()).collect()
    } else {
        measures
    };
    for entry in describe_groups(&rows, by.column(), &measures) {
        match entry.stats {
            Some(d) => println!(
                "describe: {}={} measure={} mean={:.4} std={:.4} n={}",
                by.column(),
                entry.group,
                entry.measure,
                d.mean,
                d.std,
                d.count
            ),
            None => println!(
                "describe: {}={} measure={} n=0",
                by.column(),
                entry.group,
                entry.measure
            ),
        }
    }
    Ok(())
}

fn cmd_compare(a: &Path, b: &Path, measure: &str, test: TestKind) -> Result<()> {
    let left_rows = load_results(a)?;
    let right_rows = load_results(b)?;
    let (result, dropped): (TestResult, usize) = match test {
        TestKind::PairedT | TestKind::Wilcoxon => {
            let paired = paired_values(&left_rows, &right_rows, measure)?;
            let result = if test == TestKind::PairedT {
                paired_t(&paired.left, &paired.right)?
            } else {
                wilcoxon(&paired.left, &paired.right)?
            };
            (result, paired.dropped)
        }
        TestKind::MannWhitney => {
            let left = values(&left_rows, measure);
            let right = values(&right_rows, measure);
            let dropped = left_rows.len() + right_rows.len() - left.len() - right.len();
            (mann_whitney(&left, &right)?, dropped)
        }
    };
    println!(
        "compare: test={} measure={} statistic={:.4} p={:.4} n={} dropped={}",
        result.test, measure, result.statistic, result.p_value, result.n, dropped
    );
    Ok(())
}

fn cmd_anova(files: &[PathBuf], measure: &str) -> Result<()> {
    let rows = load_all(files)?;
    let groups = group_by(&rows, "strategy");
    if groups.len() < 2 {
        bail!(
            "anova needs rows from at least 2 strategies, found {}",
            groups.len()
        );
    }
    let samples: Vec<Vec<f64>> = groups
        .values()
        .map(|members| members.iter().filter_map(|r| r.number(measure)).collect())
        .collect();
    let anova = one_way_anova(&samples)?;
    println!(
        "anova: measure={} groups={} f={:.4} p={:.4} df_between={} df_within={}",
        measure,
        groups.keys().cloned().collect::<Vec<_>>().join(","),
        anova.f,
        anova.p_value,
        anova.df_between,
        anova.df_within
    );
    Ok(())
}

fn cmd_summary(files: &[PathBuf], out: &Path) -> Result<()> {
    let rows = load_all(files)?;
    let summary = summarize(&rows);
    write_summary(out, &summary)?;
    println!("summary: groups={} out={}", summary.len(), out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_compare() {
        let cli = Cli::parse_from([
            "pdr-analysis",
            "compare",
            "adhoc_results_1.csv",
            "pdr_results_1.csv",
            "--measure",
            "iteration_count",
            "--test",
            "paired-t",
        ]);
        assert!(matches!(
            cli.command,
            Command::Compare { test: TestKind::PairedT, ref measure, .. } if measure == "iteration_count"
        ));
    }

    #[test]
    fn parse_describe_defaults_to_strategy() {
        let cli = Cli::parse_from(["pdr-analysis", "describe", "a.csv", "b.csv"]);
        let Command::Describe { files, measures, by } = cli.command else {
            panic!("expected describe");
        };
        assert_eq!(files.len(), 2);
        assert!(measures.is_empty());
        assert_eq!(by, GroupBy::Strategy);
    }

    #[test]
    fn group_by_accepts_column_names() {
        let cli = Cli::parse_from(["pdr-analysis", "describe", "a.csv", "--by", "participant_name"]);
        assert!(matches!(
            cli.command,
            Command::Describe { by: GroupBy::ParticipantName, .. }
        ));
    }

    #[test]
    fn describe_requires_files() {
        assert!(Cli::try_parse_from(["pdr-analysis", "describe"]).is_err());
    }
}
