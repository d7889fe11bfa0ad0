// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Pipeline hazard checks.
//!
//! Tracks the delay-slot window opened by delayed branch forms and the
//! single-instruction repeat state, flagging code the pipeline would
//! execute differently than written.

use super::table::{FL_BMASK, FL_DELAY, FL_NR, FL_PAR, FL_REPEAT};

/// A hazard found while sequencing instructions. Overflowing the delay
/// window is fatal for a parallel pair but only suspect for a serial
/// instruction, which still executes on the sequential path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hazard {
    Error(String),
    Warning(String),
}

/// Sequencing state carried across instructions.
#[derive(Debug, Default)]
pub struct HazardState {
    delay_budget: u16,
    repeat: bool,
}

impl HazardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the next instruction sits in a delay window.
    pub fn in_delay_window(&self) -> bool {
        self.delay_budget > 0
    }

    pub fn repeat_pending(&self) -> bool {
        self.repeat
    }

    /// Account for one instruction; returns the hazards it triggers.
    pub fn check(
        &mut self,
        mnemonic: &str,
        flags: u16,
        words: u16,
        uses_lk_addressing: bool,
    ) -> Vec<Hazard> {
        let mut hazards = Vec::new();

        if self.delay_budget > 0 {
            if words > self.delay_budget {
                let message = format!(
                    "Instruction does not fit in available delay slots \
                     ({words}-word instruction, {} slot(s) left)",
                    self.delay_budget
                );
                if flags & FL_PAR != 0 {
                    hazards.push(Hazard::Error(message));
                } else {
                    hazards.push(Hazard::Warning(format!(
                        "{message}; executed in the sequential path"
                    )));
                }
                self.delay_budget = 0;
            } else {
                if flags & FL_BMASK != 0 {
                    hazards.push(Hazard::Warning(format!(
                        "Instructions changing program flow are not allowed \
                         in a delay slot: {mnemonic}"
                    )));
                }
                self.delay_budget -= words;
            }
        }

        if self.repeat {
            if flags & FL_NR != 0 {
                hazards.push(Hazard::Warning(format!(
                    "Instruction cannot be repeated: {mnemonic}"
                )));
            } else if uses_lk_addressing {
                hazards.push(Hazard::Warning(
                    "Instructions using long offset modifiers or absolute addresses \
                     are not repeatable"
                        .to_string(),
                ));
            }
            self.repeat = false;
        }

        if flags & FL_DELAY != 0 {
            self.delay_budget = 2;
        }
        if flags & FL_REPEAT != 0 {
            self.repeat = true;
        }

        hazards
    }
}
