use colored::*;
use rbac_chain_core::{AnalysisReport, Severity};

fn colorize(severity: Severity, text: &str) -> ColoredString {
    match severity {
        Severity::Critical => text.red().bold(),
        Severity::High => text.red(),
        Severity::Warning => text.yellow(),
        Severity::Info => text.blue(),
    }
}

/// Print the pass/fail verdict to stderr so it never mixes with report output.
pub fn print_verdict(report: &AnalysisReport, threshold: Severity) {
    let counts: Vec<String> = Severity::DESCENDING
        .iter()
        .map(|s| {
            let label = format!("{} {}", report.count(*s), s);
            colorize(*s, &label).to_string()
        })
        .collect();

    eprintln!();
    eprintln!(" {} {}", "Findings:".bold(), counts.join(", "));
    if !report.suppressed.is_empty() {
        eprintln!(
            " {} {} acknowledged in baseline",
            "|-".dimmed(),
            report.suppressed.len()
        );
    }

    let blocking = report.blocking(threshold).len();
    if blocking == 0 {
        eprintln!(
            " {} No findings at or above {}",
            "PASS".green().bold(),
            threshold
        );
    } else {
        eprintln!(
            " {} {} finding(s) at or above {}",
            "FAIL".red().bold(),
            blocking,
            threshold
        );
    }
}

pub fn print_fatal(err: &anyhow::Error) {
    eprintln!("{} {}", "error:".red().bold(), err);
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }
}
