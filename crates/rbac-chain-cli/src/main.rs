mod display;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rbac_chain_core::analyzer::{self, markdown, sarif};
use rbac_chain_core::config::{discover_config, load_config};
use rbac_chain_core::graph::{self, PrivilegeGraph};
use rbac_chain_core::{Baseline, ManifestLoader, Relationships, ScanConfig, Severity};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Exit code for errors that prevent a scan from running at all.
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(
    name = "rbac-chain",
    version,
    about = "RBAC Privilege Chain Analyzer - Identify privilege escalation paths",
    long_about = "Maps Kubernetes RBAC privilege chains (ClusterRole -> Binding -> ServiceAccount -> Pod) \
        in a repository of manifests and reports dangerous permissions.\n\n\
        Exit codes: 0 = no findings at or above the threshold, 1 = findings at or above the threshold, \
        2 = the scan could not run.",
    after_help = "Examples:\n  \
        # Fail on CRITICAL findings only (default)\n  \
        rbac-chain /path/to/repo\n\n  \
        # Fail on HIGH or CRITICAL findings\n  \
        rbac-chain /path/to/repo --fail-on HIGH\n\n  \
        # Fail on any WARNING+ findings\n  \
        rbac-chain /path/to/repo --fail-on WARNING"
)]
struct Cli {
    /// Root directory to scan for Kubernetes manifests
    path: PathBuf,

    /// Minimum severity that triggers a non-zero exit code [default: CRITICAL]
    #[arg(long, value_parser = ["CRITICAL", "HIGH", "WARNING", "INFO"], ignore_case = true)]
    fail_on: Option<String>,

    /// Include confidential attack scenarios in the report
    #[arg(long)]
    include_attack_scenarios: bool,

    /// Output format (markdown, json, sarif)
    #[arg(short, long, default_value = "markdown", value_parser = ["markdown", "json", "sarif"])]
    format: String,

    /// Baseline of acknowledged findings (YAML or JSON)
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Do not load any baseline, not even the default locations
    #[arg(long, conflicts_with = "baseline")]
    no_baseline: bool,

    /// Config file [default: <path>/.rbac-chain.toml when present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra path segment to exclude (repeatable)
    #[arg(long, value_name = "SEGMENT")]
    exclude: Vec<String>,

    /// Write the privilege graph to a file (.dot/.gv for Graphviz, Mermaid otherwise)
    #[arg(long, value_name = "FILE")]
    graph_out: Option<PathBuf>,

    /// Disable colored status output
    #[arg(long)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            display::print_fatal(&err);
            std::process::exit(EXIT_FATAL);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("RBAC_CHAIN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<ScanConfig> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => discover_config(&cli.path)?.unwrap_or_default(),
    };
    Ok(config)
}

fn resolve_baseline(cli: &Cli, config: &ScanConfig) -> Result<Option<Baseline>> {
    if cli.no_baseline {
        return Ok(None);
    }
    let explicit = cli
        .baseline
        .clone()
        .or_else(|| config.baseline_path(&cli.path));
    let baseline = match explicit {
        Some(path) => Some(Baseline::load(&path)?),
        None => Baseline::discover(&cli.path)?,
    };
    Ok(baseline)
}

fn run(cli: &Cli) -> Result<i32> {
    let config = resolve_config(cli)?;

    let fail_on = match &cli.fail_on {
        Some(value) => value.parse::<Severity>()?,
        None => config.fail_on.unwrap_or(Severity::Critical),
    };
    let include_attack_scenarios =
        cli.include_attack_scenarios || config.include_attack_scenarios.unwrap_or(false);

    let loader = ManifestLoader::new()
        .with_extra_excludes(config.exclude.iter().chain(cli.exclude.iter()).cloned());
    let manifests = loader
        .load(&cli.path)
        .with_context(|| format!("Failed to scan '{}'", cli.path.display()))?;

    let mut report = analyzer::analyze(&cli.path.display().to_string(), &manifests);

    if let Some(baseline) = resolve_baseline(cli, &config)? {
        report.apply_baseline(&baseline);
    }

    match cli.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&report.to_json(fail_on))?;
            println!("{}", json);
        }
        "sarif" => {
            let sarif = serde_json::to_string_pretty(&sarif::to_sarif(&report))?;
            println!("{}", sarif);
        }
        _ => {
            let options = markdown::MarkdownOptions {
                fail_on,
                include_attack_scenarios,
            };
            print!("{}", markdown::render(&report, &options));
        }
    }

    if let Some(out) = &cli.graph_out {
        let relationships = Relationships::build(&manifests);
        write_graph(out, &PrivilegeGraph::build(&relationships))?;
    }

    display::print_verdict(&report, fail_on);
    Ok(report.exit_code(fail_on))
}

fn write_graph(path: &Path, privileges: &PrivilegeGraph) -> Result<()> {
    let is_dot = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "dot" || e == "gv");
    let rendered = if is_dot {
        graph::to_dot(privileges)
    } else {
        graph::to_mermaid(privileges)
    };
    std::fs::write(path, rendered)
        .with_context(|| format!("Failed to write graph to '{}'", path.display()))?;
    tracing::info!(path = %path.display(), nodes = privileges.node_count(), "Wrote privilege graph");
    Ok(())
}
