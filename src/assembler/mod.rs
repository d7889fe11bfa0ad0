// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Assembly run orchestration: read the source, drive the engine, write
//! the object and listing files, and report diagnostics.

pub mod cli;
pub mod engine;
pub mod output;

use std::fs;
use std::sync::Arc;

use crate::core::error::{AsmError, AsmErrorKind, AsmRunError, AsmRunReport};

use cli::CliConfig;
use engine::Assembler;

/// Assemble per the validated CLI configuration. Output files are written
/// only when the run produced no errors.
pub fn run_with_cli(config: &CliConfig) -> Result<AsmRunReport, AsmRunError> {
    let source = fs::read_to_string(&config.input).map_err(|e| {
        AsmRunError::new(
            AsmError::new(
                AsmErrorKind::Io,
                "Cannot read input file",
                Some(&format!("{}: {e}", config.input.display())),
            ),
            Vec::new(),
        )
    })?;
    let source_lines: Arc<Vec<String>> =
        Arc::new(source.lines().map(str::to_string).collect());

    let mut asm = Assembler::new(config.cpu, config.far_mode);
    for (name, value) in &config.defines {
        asm.predefine(name, value);
    }
    asm.assemble_source(&source);

    let error_count = asm.log.error_count();
    if error_count == 0 {
        if let Err(e) = output::write_object(&config.output, asm.words()) {
            return Err(AsmRunError::new(
                AsmError::new(
                    AsmErrorKind::Io,
                    "Cannot write object file",
                    Some(&format!("{}: {e}", config.output.display())),
                ),
                asm.log.into_diagnostics(),
            ));
        }
        if let Some(listing_path) = &config.listing {
            if let Err(e) = output::write_listing(listing_path, asm.listing()) {
                return Err(AsmRunError::new(
                    AsmError::new(
                        AsmErrorKind::Io,
                        "Cannot write listing file",
                        Some(&format!("{}: {e}", listing_path.display())),
                    ),
                    asm.log.into_diagnostics(),
                ));
            }
        }
    }

    Ok(AsmRunReport::new(asm.log.into_diagnostics(), source_lines))
}
