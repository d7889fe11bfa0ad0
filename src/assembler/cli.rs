// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::c54x::CpuVersion;
use crate::core::error::{AsmError, AsmErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiagnosticsFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "dspforge",
    about = "Assembler for the TMS320C54x fixed-point DSP family",
    version
)]
pub struct Cli {
    /// Source file to assemble.
    pub input: PathBuf,

    /// Object file path. Defaults to the input name with an .obj extension.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Write an assembly listing to this path.
    #[arg(short = 'l', long = "listing")]
    pub listing: Option<PathBuf>,

    /// Diagnostics output format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: DiagnosticsFormat,

    /// Suppress the summary line.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Suppress warning diagnostics.
    #[arg(short = 'w', long = "no-warn")]
    pub no_warn: bool,

    /// Treat warnings as errors.
    #[arg(long = "werror")]
    pub warnings_as_errors: bool,

    /// Predefine a substitution symbol, as NAME or NAME=VALUE.
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Target CPU revision (541, 542, 543, 545, 546, 548, 549).
    #[arg(long, default_value = "542")]
    pub cpu: String,

    /// Start in far mode: branch and call mnemonics use extended
    /// addressing. Requires a '548 or later CPU.
    #[arg(long = "far-mode")]
    pub far_mode: bool,
}

/// Validated CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub listing: Option<PathBuf>,
    pub format: DiagnosticsFormat,
    pub quiet: bool,
    pub no_warn: bool,
    pub warnings_as_errors: bool,
    pub defines: Vec<(String, String)>,
    pub cpu: CpuVersion,
    pub far_mode: bool,
}

pub fn validate_cli(cli: &Cli) -> Result<CliConfig, AsmError> {
    let cpu = CpuVersion::parse(&cli.cpu).ok_or_else(|| {
        AsmError::new(AsmErrorKind::Cli, "Unknown CPU revision", Some(&cli.cpu))
    })?;
    if cli.far_mode && !cpu.supports_extended_addressing() {
        return Err(AsmError::new(
            AsmErrorKind::Cli,
            "Far mode requires a '548 or later CPU",
            Some(&cli.cpu),
        ));
    }
    let output = match &cli.output {
        Some(path) => path.clone(),
        None => cli.input.with_extension("obj"),
    };
    let defines = cli
        .defines
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => (entry.clone(), "1".to_string()),
        })
        .collect();
    Ok(CliConfig {
        input: cli.input.clone(),
        output,
        listing: cli.listing.clone(),
        format: cli.format,
        quiet: cli.quiet,
        no_warn: cli.no_warn,
        warnings_as_errors: cli.warnings_as_errors,
        defines,
        cpu,
        far_mode: cli.far_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse")
    }

    #[test]
    fn output_defaults_to_obj_extension() {
        let cli = parse(&["dspforge", "prog.asm"]);
        let config = validate_cli(&cli).expect("validate");
        assert_eq!(config.output, PathBuf::from("prog.obj"));
        assert_eq!(config.cpu, CpuVersion::C542);
    }

    #[test]
    fn defines_split_on_equals_with_default_value() {
        let cli = parse(&["dspforge", "-D", "DEBUG", "-D", "N=4", "prog.asm"]);
        let config = validate_cli(&cli).expect("validate");
        assert_eq!(
            config.defines,
            vec![
                ("DEBUG".to_string(), "1".to_string()),
                ("N".to_string(), "4".to_string())
            ]
        );
    }

    #[test]
    fn far_mode_requires_extended_addressing_cpu() {
        let cli = parse(&["dspforge", "--far-mode", "--cpu", "542", "prog.asm"]);
        assert!(validate_cli(&cli).is_err());
        let cli = parse(&["dspforge", "--far-mode", "--cpu", "548", "prog.asm"]);
        assert!(validate_cli(&cli).is_ok());
    }

    #[test]
    fn unknown_cpu_is_rejected() {
        let cli = parse(&["dspforge", "--cpu", "c99", "prog.asm"]);
        assert!(validate_cli(&cli).is_err());
    }
}
