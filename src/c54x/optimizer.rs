// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Peephole rewrites on the operand list of an instruction that already
//! matched a template.
//!
//! At most one rewrite fires per instruction; the rewritten list is matched
//! against the table again so the shorter encoding wins.

use super::operand::Operand;
use crate::core::expr::parse_number;

/// Result of a peephole rewrite: the new operand list, and whether the
/// destination accumulator was collapsed into the source.
pub struct Rewrite {
    pub operands: Vec<Operand>,
    pub using_default_dst: bool,
}

/// Try to shorten the operand list of `mnemonic`. Returns `None` when no
/// rule applies.
pub fn optimize(mnemonic: &str, operands: &[Operand]) -> Option<Rewrite> {
    let lower = mnemonic.to_ascii_lowercase();

    // add src, dst, dst collapses to add src, dst with the default
    // destination, dropping a word on the long-immediate forms.
    if matches!(lower.as_str(), "add" | "sub") && operands.len() >= 3 {
        let last = &operands[operands.len() - 1];
        let prev = &operands[operands.len() - 2];
        if last.is_accumulator()
            && prev.is_accumulator()
            && last.text().eq_ignore_ascii_case(prev.text())
        {
            let mut rewritten = operands.to_vec();
            rewritten.pop();
            return Some(Rewrite {
                operands: rewritten,
                using_default_dst: true,
            });
        }
    }

    // A literal zero shift is the same as no shift operand at all.
    if matches!(lower.as_str(), "add" | "sub" | "ld" | "sth" | "stl")
        && operands.len() == 3
        && is_literal_zero(&operands[1])
    {
        let mut rewritten = operands.to_vec();
        rewritten.remove(1);
        return Some(Rewrite {
            operands: rewritten,
            using_default_dst: false,
        });
    }

    None
}

fn is_literal_zero(op: &Operand) -> bool {
    let body = op.immediate_text().unwrap_or(op.text());
    parse_number(body) == Some(0)
}
