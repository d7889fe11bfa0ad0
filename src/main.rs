// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Assembler binary entry point.

use std::process::ExitCode;

use clap::Parser;

use dspforge::assembler::cli::{validate_cli, Cli, DiagnosticsFormat};
use dspforge::assembler::run_with_cli;
use dspforge::core::error::{Diagnostic, Severity};

struct DiagnosticsSink {
    format: DiagnosticsFormat,
    no_warn: bool,
    input: String,
}

impl DiagnosticsSink {
    fn emit(&self, diag: &Diagnostic, source_lines: &[String]) {
        if self.no_warn && diag.severity() == Severity::Warning {
            return;
        }
        match self.format {
            DiagnosticsFormat::Text => {
                let diag = diag.clone().with_file(Some(self.input.clone()));
                eprintln!("{}", diag.format_with_context(Some(source_lines), false));
            }
            DiagnosticsFormat::Json => {
                let severity = match diag.severity() {
                    Severity::Warning => "warning",
                    Severity::Error => "error",
                };
                let entry = serde_json::json!({
                    "file": self.input,
                    "line": diag.line(),
                    "severity": severity,
                    "code": diag.code(),
                    "message": diag.message(),
                });
                eprintln!("{entry}");
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match validate_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dspforge: {e}");
            return ExitCode::FAILURE;
        }
    };

    let sink = DiagnosticsSink {
        format: config.format,
        no_warn: config.no_warn,
        input: config.input.display().to_string(),
    };

    let report = match run_with_cli(&config) {
        Ok(report) => report,
        Err(e) => {
            for diag in e.diagnostics() {
                sink.emit(diag, &[]);
            }
            eprintln!("dspforge: {e}");
            return ExitCode::FAILURE;
        }
    };

    for diag in report.diagnostics() {
        sink.emit(diag, report.source_lines());
    }

    let errors = report.error_count();
    let warnings = report.warning_count();
    if !config.quiet {
        eprintln!(
            "{}: {errors} error(s), {warnings} warning(s)",
            config.input.display()
        );
    }

    if errors > 0 || (config.warnings_as_errors && warnings > 0) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
