//! PDR prompt-refinement simulator.
//!
//! Runs simulated participants through the ad hoc, PDR and PDR+Critic
//! refinement loops against a catalog of writing tasks and appends one CSV
//! record per run to the results directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use pdr::core::rubric::check_rubric;
use pdr::core::satisfaction::satisfaction;
use pdr::core::types::StrategyKind;
use pdr::driver::{DriverStop, RunEvent, run_experiment};
use pdr::evaluator::Evaluator;
use pdr::exit_codes;
use pdr::io::catalog::{BUILTIN_NAMES, load_catalog};
use pdr::io::chat::OpenAiClient;
use pdr::io::config::{ErrorPolicy, ExperimentConfig, load_config};
use pdr::io::critic::LlmCritic;
use pdr::io::expert::{ExpertReviewer, LlmExpert};
use pdr::io::generator::LlmGenerator;
use pdr::io::judge::{LlmJudge, QualitativeJudge};
use pdr::io::ladder::CompletionLadder;
use pdr::io::manifest::{RunManifest, manifest_path, results_path, write_manifest};
use pdr::io::records::append_records;
use pdr::logging;
use pdr::strategy::{AdHocStrategy, PdrStrategy, Strategy};

#[derive(Parser)]
#[command(
    name = "pdr",
    version,
    about = "Simulate prompt refinement with ad hoc, PDR and PDR+Critic loops"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the personas and tasks of a catalog.
    List {
        /// Builtin catalog name or path to a catalog TOML.
        #[arg(long, default_value = "writing")]
        catalog: String,
    },
    /// Run one or all strategies over every (persona, task) pair.
    Run(RunArgs),
    /// Score a text file against a task rubric without calling any model.
    Score {
        #[arg(long)]
        task: String,
        #[arg(long, default_value = "writing")]
        catalog: String,
        file: PathBuf,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    #[arg(long, value_enum)]
    strategy: StrategyArg,
    #[arg(long, default_value = "pdr.toml")]
    config: PathBuf,
    #[arg(long, default_value = "writing")]
    catalog: String,
    /// Restrict to these personas (repeatable).
    #[arg(long = "persona")]
    personas: Vec<String>,
    /// Restrict to these tasks (repeatable).
    #[arg(long = "task")]
    tasks: Vec<String>,
    #[arg(long)]
    max_iterations: Option<u32>,
    #[arg(long)]
    threshold: Option<u32>,
    /// Candidates per PDR iteration.
    #[arg(long)]
    outputs: Option<u32>,
    #[arg(long)]
    results_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    on_error: Option<ErrorPolicyArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Adhoc,
    Pdr,
    PdrCritic,
    All,
}

impl StrategyArg {
    fn kinds(self) -> Vec<StrategyKind> {
        match self {
            StrategyArg::Adhoc => vec![StrategyKind::AdHoc],
            StrategyArg::Pdr => vec![StrategyKind::Pdr],
            StrategyArg::PdrCritic => vec![StrategyKind::PdrCritic],
            StrategyArg::All => StrategyKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ErrorPolicyArg {
    Skip,
    Halt,
}

impl From<ErrorPolicyArg> for ErrorPolicy {
    fn from(arg: ErrorPolicyArg) -> Self {
        match arg {
            ErrorPolicyArg::Skip => ErrorPolicy::Skip,
            ErrorPolicyArg::Halt => ErrorPolicy::Halt,
        }
    }
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::List { catalog } => cmd_list(&catalog),
        Command::Run(args) => cmd_run(&args),
        Command::Score {
            task,
            catalog,
            file,
        } => cmd_score(&catalog, &task, &file),
    }
}

fn cmd_list(catalog: &str) -> Result<i32> {
    let loaded = load_catalog(catalog)?;
    println!(
        "catalog: source={} sha256={} builtins={}",
        loaded.source,
        loaded.sha256,
        BUILTIN_NAMES.join(",")
    );
    for persona in &loaded.catalog.personas {
        println!("persona: {}", persona.name);
    }
    for task in &loaded.catalog.tasks {
        let (min, max) = task.rubric.word_count_range;
        println!(
            "task: {} domain={} words={}-{} must_include={}",
            task.name,
            task.domain,
            min,
            max,
            task.rubric.must_include.join(",")
        );
    }
    Ok(exit_codes::OK)
}

fn cmd_score(catalog: &str, task_name: &str, file: &Path) -> Result<i32> {
    let loaded = load_catalog(catalog)?;
    let task = loaded.catalog.task(task_name)?;
    let text = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let check = check_rubric(&text, &task.rubric);
    let score = check.score();
    println!(
        "score: task={} words={} word_count_ok={} must_include_ok={} score={} satisfaction={:.1}",
        task.name,
        check.word_count,
        check.word_count_ok,
        check.must_include_ok,
        score,
        satisfaction(score)
    );
    Ok(exit_codes::OK)
}

fn apply_overrides(config: &mut ExperimentConfig, args: &RunArgs) {
    let refinement = &mut config.refinement;
    if let Some(n) = args.max_iterations {
        refinement.max_iterations = n;
    }
    if let Some(t) = args.threshold {
        refinement.score_threshold = t;
    }
    if let Some(n) = args.outputs {
        refinement.num_outputs_per_iter = n;
    }
    if let Some(dir) = &args.results_dir {
        config.output.results_dir = dir.clone();
    }
    if let Some(policy) = args.on_error {
        config.output.on_error = policy.into();
    }
}

fn cmd_run(args: &RunArgs) -> Result<i32> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, args);
    config.validate().context("invalid configuration after overrides")?;

    let loaded = load_catalog(&args.catalog)?;
    let selected = loaded.catalog.select(&args.personas, &args.tasks)?;

    let api_key = config.resolve_api_key()?;
    let client = OpenAiClient::new(&config.api.base_url, api_key, config.api.timeout_secs)?;
    let ladder = CompletionLadder::new(
        &client,
        config.retry.clone(),
        config.ladder.content_retries,
        config.models.fallbacks.clone(),
        config.models.no_temperature.clone(),
    );
    let limits = &config.ladder;
    let models = &config.models;
    let generator = LlmGenerator::new(&ladder, &models.participant, limits.generator_max_tokens);
    let judge = LlmJudge::new(&ladder, &models.judge, limits.judge_max_tokens);
    let critic = LlmCritic::new(&ladder, &models.critic, limits.critic_max_tokens);
    let expert = LlmExpert::new(&ladder, &models.expert, limits.expert_max_tokens);

    let judge = config
        .evaluation
        .qualitative
        .then_some(&judge as &dyn QualitativeJudge);
    let expert = config
        .evaluation
        .expert
        .then_some(&expert as &dyn ExpertReviewer);
    let evaluator = Evaluator::new(judge);
    let settings = &config.refinement;

    let mut code = exit_codes::OK;
    for kind in args.strategy.kinds() {
        let strategy: Box<dyn Strategy + '_> = match kind {
            StrategyKind::AdHoc => {
                let adhoc = AdHocStrategy::new(&generator, evaluator, settings);
                Box::new(match expert {
                    Some(expert) => adhoc.with_expert(expert),
                    None => adhoc,
                })
            }
            StrategyKind::Pdr => Box::new(PdrStrategy::new(&generator, evaluator, settings)),
            StrategyKind::PdrCritic => {
                Box::new(PdrStrategy::new(&generator, evaluator, settings).with_critic(&critic))
            }
        };

        let started_at = Utc::now();
        let stamp = started_at.timestamp();
        let dir = &config.output.results_dir;
        let results_file = results_path(dir, kind, stamp);
        info!(strategy = %kind, results = %results_file.display(), "starting experiment");

        let outcome = run_experiment(
            strategy.as_ref(),
            &selected.personas,
            &selected.tasks,
            config.output.on_error,
            |event| {
                match event {
                    RunEvent::Completed(result) => {
                        append_records(&results_file, &[result.record()])?;
                        println!(
                            "run: strategy={} participant={} task={} score={} iterations={} time={:.2}s",
                            kind.as_str(),
                            result.participant_name,
                            result.task_name,
                            result.final_score,
                            result.iteration_count,
                            result.time_spent_sec
                        );
                    }
                    RunEvent::Failed(failure) => {
                        eprintln!(
                            "failed: strategy={} participant={} task={} error={}",
                            kind.as_str(),
                            failure.participant_name,
                            failure.task_name,
                            failure.error
                        );
                    }
                }
                Ok(())
            },
        )?;

        let mut manifest = RunManifest {
            strategy: kind.as_str().to_string(),
            results_file: results_file.display().to_string(),
            catalog_source: loaded.source.clone(),
            catalog_hash: loaded.sha256.clone(),
            participant_model: models.participant.clone(),
            judge_model: judge.map(|_| models.judge.clone()),
            critic_model: (kind == StrategyKind::PdrCritic).then(|| models.critic.clone()),
            expert_model: (kind == StrategyKind::AdHoc && expert.is_some())
                .then(|| models.expert.clone()),
            refinement: settings.clone(),
            on_error: config.output.on_error,
            start_time: String::new(),
            end_time: String::new(),
            duration_secs: 0.0,
            completed: outcome.completed,
            failures: outcome.failures,
            halted: outcome.stop == DriverStop::Halted,
        };
        manifest.set_times(started_at, Utc::now());
        let manifest_file = manifest_path(dir, kind, stamp);
        write_manifest(&manifest_file, &manifest)?;
        println!(
            "done: strategy={} completed={} failed={} results={} manifest={}",
            kind.as_str(),
            manifest.completed,
            manifest.failures.len(),
            results_file.display(),
            manifest_file.display()
        );

        if manifest.halted {
            code = exit_codes::HALTED;
            break;
        }
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "pdr",
            "run",
            "--strategy",
            "pdr-critic",
            "--persona",
            "Alice",
            "--persona",
            "Bob",
            "--max-iterations",
            "3",
            "--on-error",
            "halt",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.strategy, StrategyArg::PdrCritic);
        assert_eq!(args.personas, ["Alice", "Bob"]);
        assert_eq!(args.config, PathBuf::from("pdr.toml"));

        let mut config = ExperimentConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.refinement.max_iterations, 3);
        assert_eq!(config.refinement.score_threshold, 85);
        assert_eq!(config.output.on_error, ErrorPolicy::Halt);
    }

    #[test]
    fn all_expands_to_every_strategy_in_order() {
        assert_eq!(
            StrategyArg::All.kinds(),
            [StrategyKind::AdHoc, StrategyKind::Pdr, StrategyKind::PdrCritic]
        );
    }

    #[test]
    fn parse_score() {
        let cli = Cli::parse_from(["pdr", "score", "--task", "Short Story", "story.txt"]);
        assert!(matches!(
            cli.command,
            Command::Score { ref task, ref catalog, .. } if task == "Short Story" && catalog == "writing"
        ));
    }
}
