//! caseflow command-line interface.
//!
//! Discovers test-case documents, wires the built-in action registry and the
//! configured reporters, runs each case through the scheduler, and exits zero
//! iff every aggregate verdict is success.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::fmt;

use caseflow_actions::builtin_registry;
use caseflow_engine::{ExecutionContext, Reporter, Scheduler, validate_test_case};
use caseflow_report::{AllureReporter, FanoutReporter, LogReporter};
use caseflow_types::load_test_case_from_file;
use caseflow_util::Config;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match dispatch().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    // Respect CASEFLOW_LOG without imposing a lower max level ceiling.
    let filter = std::env::var("CASEFLOW_LOG").unwrap_or_else(|_| "info".into());
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn build_cli() -> Command {
    Command::new("caseflow")
        .about("Declarative test-case workflow runner")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Execute test-case documents")
                .arg(
                    Arg::new("paths")
                        .value_name("PATH")
                        .num_args(1..)
                        .required(true)
                        .help("Test-case files or directories to search"),
                )
                .arg(
                    Arg::new("report-dir")
                        .long("report-dir")
                        .value_name("DIR")
                        .help("Write Allure-compatible result files into this directory"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_name("FILE")
                        .default_value("caseflow.yaml")
                        .help("Configuration file (missing files are ignored)"),
                )
                .arg(
                    Arg::new("var")
                        .long("var")
                        .value_name("KEY=VALUE")
                        .action(ArgAction::Append)
                        .help("Static variable made available to placeholder resolution"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check test-case documents without executing them")
                .arg(Arg::new("paths").value_name("PATH").num_args(1..).required(true)),
        )
}

async fn dispatch() -> Result<bool> {
    let matches = build_cli().get_matches();
    match matches.subcommand() {
        Some(("run", sub)) => run_cases(sub).await,
        Some(("validate", sub)) => validate_documents(sub),
        _ => Ok(true),
    }
}

async fn run_cases(matches: &ArgMatches) -> Result<bool> {
    let documents = discover_documents(matches.get_many::<String>("paths").into_iter().flatten())?;
    if documents.is_empty() {
        bail!("no test-case documents found");
    }

    let config_path = matches.get_one::<String>("config").expect("defaulted");
    let config = Config::load_from_file(config_path)?;
    let report_dir = matches
        .get_one::<String>("report-dir")
        .cloned()
        .or_else(|| config.get("report.dir"));

    let reporter: Arc<dyn Reporter> = match report_dir {
        Some(dir) => {
            let sinks: Vec<Arc<dyn Reporter>> = vec![Arc::new(LogReporter), Arc::new(AllureReporter::new(dir))];
            Arc::new(FanoutReporter::new(sinks))
        }
        None => Arc::new(LogReporter),
    };

    let vars = parse_vars(matches)?;
    let scheduler = Scheduler::new(Arc::new(builtin_registry()), Arc::clone(&reporter));

    let mut all_passed = true;
    for path in &documents {
        let case = load_test_case_from_file(path)?;
        let mut context = ExecutionContext::new("", None).with_vars(vars.clone());
        let verdict = scheduler.execute_test_case(&case, &mut context).await?;
        info!(path = %path.display(), test_case = %case.name, success = verdict, "test case completed");
        all_passed &= verdict;
    }

    reporter.generate_report()?;
    Ok(all_passed)
}

fn validate_documents(matches: &ArgMatches) -> Result<bool> {
    let documents = discover_documents(matches.get_many::<String>("paths").into_iter().flatten())?;
    if documents.is_empty() {
        bail!("no test-case documents found");
    }

    let mut all_valid = true;
    for path in &documents {
        let outcome = load_test_case_from_file(path).and_then(|case| validate_test_case(&case));
        match outcome {
            Ok(()) => info!(path = %path.display(), "test case is valid"),
            Err(err) => {
                error!(path = %path.display(), "invalid test case: {err:#}");
                all_valid = false;
            }
        }
    }
    Ok(all_valid)
}

/// Parses repeated `--var key=value` flags. Values that parse as JSON keep
/// their structure; everything else stays a string.
fn parse_vars(matches: &ArgMatches) -> Result<serde_json::Map<String, Value>> {
    let mut vars = serde_json::Map::new();
    if let Some(entries) = matches.get_many::<String>("var") {
        for entry in entries {
            let (key, value) = entry
                .split_once('=')
                .with_context(|| format!("expected KEY=VALUE, found '{entry}'"))?;
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            vars.insert(key.to_string(), value);
        }
    }
    Ok(vars)
}

/// Collects test-case documents from the given files and directories,
/// recursing into directories and keeping a stable sorted order.
fn discover_documents<'a>(paths: impl Iterator<Item = &'a String>) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for path in paths {
        collect_documents(Path::new(path), &mut documents)?;
    }
    documents.sort();
    documents.dedup();
    Ok(documents)
}

fn collect_documents(path: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let metadata = fs::metadata(path).with_context(|| format!("inspect {}", path.display()))?;
    if metadata.is_dir() {
        for entry in fs::read_dir(path).with_context(|| format!("read directory {}", path.display()))? {
            collect_documents(&entry?.path(), out)?;
        }
    } else if matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml" | "json")) {
        out.push(path.to_path_buf());
    }
    Ok(())
}
