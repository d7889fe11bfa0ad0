// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Template matching.
//!
//! Operands are bound to template slots left to right. A slot that does not
//! fit the next operand is skipped when optional and fails the template
//! otherwise; the first template that consumes every operand wins, so table
//! order is the priority order.

use super::operand::{operand_matches, Operand, OperandKind};
use super::table::{self, Template};
use crate::core::expr::EvalContext;

/// Why no template matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    UnknownMnemonic(String),
    NoTemplate(String),
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMnemonic(name) => write!(f, "Unrecognized mnemonic: {name}"),
            Self::NoTemplate(name) => {
                write!(f, "Operands do not match any form of instruction: {name}")
            }
        }
    }
}

/// A successfully matched instruction: the winning template plus each
/// operand bound to its slot category.
#[derive(Debug)]
pub struct MatchedInsn {
    pub template: &'static Template,
    pub pairs: Vec<(OperandKind, Operand)>,
    pub parpairs: Vec<(OperandKind, Operand)>,
    /// Set when the optimizer collapsed an explicit destination that
    /// equalled the source.
    pub using_default_dst: bool,
}

impl MatchedInsn {
    /// Words this instruction occupies, counting a long-offset memory
    /// extension word when present.
    pub fn word_count(&self) -> u16 {
        self.template.words + u16::from(self.uses_lk_addressing())
    }

    /// Whether any memory operand uses an lk-addressing form.
    pub fn uses_lk_addressing(&self) -> bool {
        self.pairs
            .iter()
            .chain(&self.parpairs)
            .any(|(kind, op)| {
                matches!(kind, OperandKind::Smem | OperandKind::Lmem) && op.uses_lk_addressing()
            })
    }
}

fn bind_slots(
    slots: &[table::Slot],
    operands: &[Operand],
    ctx: &dyn EvalContext,
) -> Option<Vec<(OperandKind, Operand)>> {
    let mut pairs = Vec::with_capacity(operands.len());
    let mut next = 0usize;
    for slot in slots {
        if next < operands.len() && operand_matches(&operands[next], slot.kind, ctx) {
            pairs.push((slot.kind, operands[next].clone()));
            next += 1;
        } else if slot.optional {
            continue;
        } else {
            return None;
        }
    }
    // Every operand must be consumed.
    (next == operands.len()).then_some(pairs)
}

/// Match a serial instruction against its templates in table order.
pub fn match_serial(
    mnemonic: &str,
    operands: &[Operand],
    ctx: &dyn EvalContext,
) -> Result<MatchedInsn, MatchError> {
    let templates = table::lookup(mnemonic);
    if templates.is_empty() {
        return Err(MatchError::UnknownMnemonic(mnemonic.to_string()));
    }
    for tpl in templates {
        if operands.len() < tpl.minops || operands.len() > tpl.maxops {
            continue;
        }
        if let Some(pairs) = bind_slots(tpl.operands, operands, ctx) {
            return Ok(MatchedInsn {
                template: tpl,
                pairs,
                parpairs: Vec::new(),
                using_default_dst: false,
            });
        }
    }
    Err(MatchError::NoTemplate(mnemonic.to_string()))
}

/// Match a `||` parallel pair against the parallel table.
pub fn match_parallel(
    mnemonic: &str,
    operands: &[Operand],
    parname: &str,
    paroperands: &[Operand],
    ctx: &dyn EvalContext,
) -> Result<MatchedInsn, MatchError> {
    let templates = table::lookup_parallel(mnemonic, parname);
    if templates.is_empty() {
        return Err(MatchError::UnknownMnemonic(format!(
            "{mnemonic} || {parname}"
        )));
    }
    for tpl in templates {
        if let (Some(pairs), Some(parpairs)) = (
            bind_slots(tpl.operands, operands, ctx),
            bind_slots(tpl.paropers, paroperands, ctx),
        ) {
            return Ok(MatchedInsn {
                template: tpl,
                pairs,
                parpairs,
                using_default_dst: false,
            });
        }
    }
    Err(MatchError::NoTemplate(format!("{mnemonic} || {parname}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expr::MapContext;

    fn ops(texts: &[&str]) -> Vec<Operand> {
        texts.iter().copied().map(Operand::new).collect()
    }

    fn ctx() -> MapContext {
        MapContext::default()
    }

    #[test]
    fn long_immediate_add_matches_the_lk_form() {
        let insn = match_serial("add", &ops(&["#1", "a"]), &ctx()).expect("match");
        assert_eq!(insn.template.opcode[0], 0xF000);
        assert_eq!(insn.word_count(), 2);
        assert_eq!(insn.pairs[0].0, OperandKind::Lk);
        assert_eq!(insn.pairs[1].0, OperandKind::Src);
    }

    #[test]
    fn optional_shift_slot_binds_when_present() {
        let insn = match_serial("add", &ops(&["#1", "5", "a", "b"]), &ctx()).expect("match");
        assert_eq!(insn.template.opcode[0], 0xF000);
        assert_eq!(insn.pairs.len(), 4);
        assert_eq!(insn.pairs[1].0, OperandKind::Shft);
        assert_eq!(insn.pairs[3].0, OperandKind::Dst);
    }

    #[test]
    fn memory_form_wins_over_register_form_by_table_order() {
        let insn = match_serial("add", &ops(&["@x", "a"]), &ctx()).expect("match");
        assert_eq!(insn.template.opcode[0], 0x0000);
        let insn = match_serial("add", &ops(&["b", "a"]), &ctx()).expect("match");
        assert_eq!(insn.template.opcode[0], 0xF400);
    }

    #[test]
    fn register_add_requires_a_destination() {
        assert!(matches!(
            match_serial("add", &ops(&["a"]), &ctx()),
            Err(MatchError::NoTemplate(_))
        ));
        assert!(matches!(
            match_serial("sub", &ops(&["b"]), &ctx()),
            Err(MatchError::NoTemplate(_))
        ));
    }

    #[test]
    fn lk_addressing_adds_an_extension_word() {
        let insn = match_serial("ld", &ops(&["*AR3(40)", "a"]), &ctx()).expect("match");
        assert_eq!(insn.template.opcode[0], 0x1000);
        assert_eq!(insn.word_count(), 2);
    }

    #[test]
    fn matching_is_deterministic() {
        let first = match_serial("sub", &ops(&["#2", "a", "b"]), &ctx()).expect("match");
        for _ in 0..10 {
            let again = match_serial("sub", &ops(&["#2", "a", "b"]), &ctx()).expect("match");
            assert_eq!(again.template.opcode[0], first.template.opcode[0]);
            assert_eq!(again.pairs.len(), first.pairs.len());
        }
    }

    #[test]
    fn operand_count_gates_each_template() {
        assert!(matches!(
            match_serial("nop", &ops(&["a"]), &ctx()),
            Err(MatchError::NoTemplate(_))
        ));
        assert!(matches!(
            match_serial("frob", &ops(&[]), &ctx()),
            Err(MatchError::UnknownMnemonic(_))
        ));
    }

    #[test]
    fn parallel_pair_matches_the_parallel_table() {
        let insn = match_parallel(
            "st",
            &ops(&["a", "*AR3+"]),
            "mpy",
            &ops(&["*AR4+", "b"]),
            &ctx(),
        )
        .expect("match");
        assert_eq!(insn.template.opcode[0], 0xC800);
        assert_eq!(insn.parpairs[0].0, OperandKind::Xmem);
    }

    #[test]
    fn status_bit_selector_slot_is_optional() {
        let insn = match_serial("ssbx", &ops(&["sxm"]), &ctx()).expect("match");
        assert_eq!(insn.pairs.len(), 1);
        assert_eq!(insn.pairs[0].0, OperandKind::Sbit);
        let insn = match_serial("ssbx", &ops(&["1", "8"]), &ctx()).expect("match");
        assert_eq!(insn.pairs[0].0, OperandKind::N);
    }
}
