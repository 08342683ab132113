//! `linkbridge` command-line tools: quality gate and configuration

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use linkbridge_core::LinkbridgeConfig;
use linkbridge_model::{AlignmentVerdict, GeneratedArtifact, GenerationConstraints, QualityStatus};
use linkbridge_quality::{AutoFixController, QualityGate};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    match run(cli().get_matches()) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            ExitCode::FAILURE
        }
    }
}

fn cli() -> Command {
    let path_arg = |name: &'static str, help: &'static str| {
        Arg::new(name)
            .long(name)
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help(help)
    };

    Command::new("linkbridge")
        .version(linkbridge_core::VERSION)
        .about("Sponsored-link article pipeline tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("qc")
                .about("Run the quality gate on a generated article")
                .arg(path_arg("artifact", "Artifact JSON ({\"text\", \"anchor_url\"})"))
                .arg(path_arg("constraints", "Generation constraints JSON"))
                .arg(path_arg("verdict", "Alignment verdict JSON"))
                .arg(
                    Arg::new("autofix")
                        .long("autofix")
                        .action(ArgAction::SetTrue)
                        .help("Apply one autofix pass when the report allows it"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Configuration TOML (defaults when omitted)"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect configuration")
                .subcommand_required(true)
                .subcommand(Command::new("print").about("Print the default configuration as TOML"))
                .subcommand(
                    Command::new("validate")
                        .about("Parse and validate a configuration file")
                        .arg(
                            Arg::new("path")
                                .required(true)
                                .value_parser(value_parser!(PathBuf)),
                        ),
                ),
        )
}

fn run(matches: ArgMatches) -> Result<ExitCode> {
    match matches.subcommand() {
        Some(("qc", args)) => quality_check(args),
        Some(("config", args)) => match args.subcommand() {
            Some(("print", _)) => {
                print!("{}", LinkbridgeConfig::default().to_toml_string()?);
                Ok(ExitCode::SUCCESS)
            }
            Some(("validate", args)) => {
                let path = required_path(args, "path")?;
                LinkbridgeConfig::load(path)
                    .with_context(|| format!("configuration {} is invalid", path.display()))?;
                println!("{}: ok", path.display());
                Ok(ExitCode::SUCCESS)
            }
            _ => anyhow::bail!("unknown config subcommand"),
        },
        _ => anyhow::bail!("unknown subcommand"),
    }
}

fn quality_check(args: &ArgMatches) -> Result<ExitCode> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => LinkbridgeConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LinkbridgeConfig::default(),
    };
    let artifact: GeneratedArtifact = read_json(required_path(args, "artifact")?)?;
    let constraints: GenerationConstraints = read_json(required_path(args, "constraints")?)?;
    let verdict: AlignmentVerdict = read_json(required_path(args, "verdict")?)?;

    let gate = QualityGate::new(config.quality);
    let report = gate.evaluate(&artifact, &constraints, &verdict);

    let output = if args.get_flag("autofix") && report.status() == QualityStatus::PassWithAutofix {
        let outcome = AutoFixController::new(&gate)
            .apply(&artifact, &constraints, &verdict, &report)
            .context("autofix failed")?;
        serde_json::json!({
            "report": report,
            "autofix": {
                "changed": outcome.changed(),
                "before": outcome.before,
                "after": outcome.after,
                "log": outcome.log,
                "report": outcome.report,
                "text": outcome.artifact.text(),
            },
        })
    } else {
        serde_json::json!({ "report": report })
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    let final_status = output["autofix"]["report"]["status"]
        .as_str()
        .unwrap_or_else(|| report.status().as_str());
    Ok(if final_status == QualityStatus::Blocked.as_str() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing --{name}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
