// CLI entrypoint for forge12.

use clap::Parser;
use serde_json::json;

use forge12::assembler::{self, AsmRunReport, Cli, Diagnostic, Severity};

fn severity_to_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

fn format_diagnostic_line(diag: &Diagnostic, json_format: bool) -> String {
    if json_format {
        json!({
            "severity": severity_to_str(diag.severity()),
            "message": diag.message(),
            "file": diag.file(),
            "line": diag.line(),
        })
        .to_string()
    } else {
        diag.format()
    }
}

fn emit_report(report: &AsmRunReport, json_format: bool) {
    for diag in report.diagnostics() {
        eprintln!("{}", format_diagnostic_line(diag, json_format));
    }
    if json_format {
        return;
    }
    if report.error_count() > 0 {
        eprintln!(
            "{}: {} error(s); no output written",
            report.file(),
            report.error_count()
        );
    } else if !report.artifacts().is_empty() {
        let (ic, dc) = report.counts();
        eprintln!(
            "{}: {ic} code words, {dc} data words -> {}",
            report.file(),
            report.artifacts().join(" ")
        );
    }
}

fn main() {
    let cli = Cli::parse();
    match assembler::run(&cli) {
        Ok(reports) => {
            let mut failed = false;
            for report in &reports {
                emit_report(report, cli.json);
                if report.error_count() > 0 {
                    failed = true;
                }
            }
            if failed {
                std::process::exit(1);
            }
        }
        Err(err) => {
            if cli.json {
                eprintln!(
                    "{}",
                    json!({ "severity": "error", "message": err.to_string() })
                );
            } else {
                eprintln!("{err}");
            }
            std::process::exit(1);
        }
    }
}
