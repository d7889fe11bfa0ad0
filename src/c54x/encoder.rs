// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand encoding.
//!
//! A matched instruction becomes one to three 16-bit words: the opcode word
//! with operand fields packed in, then any extension words in operand order
//! (a long-offset memory displacement, a long immediate, or the low half of
//! an extended program address). Operands that reference a still-undefined
//! symbol leave a fixup behind instead of a value.

use super::matcher::MatchedInsn;
use super::operand::{
    cc3_value, condition_value, dual_value, mmr_address, n_value, sbit_value, Operand, OperandKind,
};
use crate::core::expr::{parse_expr, EvalContext, ExprValue};

/// Relocation style of a fixup, keyed by the field it patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    /// Low 7 bits of the opcode word (direct-addressing offset).
    Partial7,
    /// Low 9 bits of the opcode word (DP load).
    Partial9,
    /// A full 16-bit extension word.
    Word16,
    /// A 23-bit extended address split over the opcode word's low 7 bits
    /// and the following extension word.
    Far16,
}

impl RelocKind {
    pub fn mask(self) -> u32 {
        match self {
            Self::Partial7 => 0x7F,
            Self::Partial9 => 0x1FF,
            Self::Word16 => 0xFFFF,
            Self::Far16 => 0x7F_FFFF,
        }
    }
}

/// A deferred patch against an encoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixup {
    /// Word index within the instruction.
    pub word: usize,
    pub reloc: RelocKind,
    pub symbol: String,
    pub addend: i64,
}

/// The encoded form of one instruction.
#[derive(Debug, Default)]
pub struct EncodedInsn {
    pub words: Vec<u16>,
    pub fixups: Vec<Fixup>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EncodeError {
    pub message: String,
}

impl EncodeError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EncodeError {}

/// Patch a resolved symbol value into previously emitted words. Partial
/// fields keep only the value's low bits, the way an already-resolved
/// constant encodes; full-width fields are range checked.
pub fn apply_fixup(words: &mut [u16], fixup: &Fixup, value: i64) -> Result<(), EncodeError> {
    let value = value.wrapping_add(fixup.addend);
    match fixup.reloc {
        RelocKind::Partial7 => {
            words[fixup.word] = (words[fixup.word] & !0x7F) | (value as u16 & 0x7F);
        }
        RelocKind::Partial9 => {
            words[fixup.word] = (words[fixup.word] & !0x1FF) | (value as u16 & 0x1FF);
        }
        RelocKind::Word16 | RelocKind::Far16 => {
            if !(0..=fixup.reloc.mask() as i64).contains(&value) {
                return Err(EncodeError::new(format!(
                    "Value of {} out of range for field: {value}",
                    fixup.symbol
                )));
            }
            if fixup.reloc == RelocKind::Word16 {
                words[fixup.word] = value as u16;
            } else {
                words[fixup.word] = (words[fixup.word] & !0x7F) | ((value >> 16) as u16 & 0x7F);
                words[fixup.word + 1] = value as u16;
            }
        }
    }
    Ok(())
}

struct Encoder<'a> {
    ctx: &'a dyn EvalContext,
    out: EncodedInsn,
}

impl<'a> Encoder<'a> {
    fn word0(&mut self) -> &mut u16 {
        &mut self.out.words[0]
    }

    fn eval(&self, op: &Operand, hash: bool) -> Result<ExprValue, EncodeError> {
        let body = match op.immediate_text() {
            Some(body) => body,
            None if hash => op.text(),
            None => op.text().strip_prefix('@').unwrap_or(op.text()),
        };
        parse_expr(body, self.ctx).map_err(|e| EncodeError::new(e.message))
    }

    fn eval_text(&self, text: &str) -> Result<ExprValue, EncodeError> {
        parse_expr(text, self.ctx).map_err(|e| EncodeError::new(e.message))
    }

    fn require_const(
        &self,
        op: &Operand,
        lo: i64,
        hi: i64,
    ) -> Result<i64, EncodeError> {
        match self.eval(op, true)? {
            ExprValue::Const(v) if (lo..=hi).contains(&v) => Ok(v),
            ExprValue::Const(v) => Err(EncodeError::new(format!(
                "Operand out of range ({lo}..{hi}): {v}"
            ))),
            ExprValue::Symbolic { .. } => Err(EncodeError::new(format!(
                "Undefined symbol in short-immediate operand: {}",
                op.text()
            ))),
        }
    }

    /// Append an extension word, recording a fixup when the value is still
    /// symbolic.
    fn push_word16(&mut self, value: ExprValue, lo: i64, hi: i64) -> Result<(), EncodeError> {
        match value {
            ExprValue::Const(v) => {
                if !(lo..=hi).contains(&v) {
                    return Err(EncodeError::new(format!(
                        "Extension word value out of range: {v}"
                    )));
                }
                self.out.words.push(v as u16);
            }
            ExprValue::Symbolic { name, offset } => {
                let word = self.out.words.len();
                self.out.words.push(0);
                self.out.fixups.push(Fixup {
                    word,
                    reloc: RelocKind::Word16,
                    symbol: name,
                    addend: offset,
                });
            }
        }
        Ok(())
    }

    fn encode_memory(&mut self, op: &Operand) -> Result<(), EncodeError> {
        if let Some(ind) = op.indirect() {
            if ind.modifier == 3 {
                self.out.warnings.push(
                    "Address mode *+ARx is write-only; reads in this mode are undefined"
                        .to_string(),
                );
            }
            *self.word0() |= 0x80 | (ind.modifier << 3) | ind.arf;
            if let Some(disp) = &ind.disp {
                let value = self.eval_text(disp)?;
                self.push_word16(value, -32768, 65535)?;
            }
            return Ok(());
        }
        // Direct addressing: the low 7 bits of the operand address, page
        // bits supplied by DP at run time.
        match self.eval(op, false)? {
            ExprValue::Const(v) => {
                *self.word0() |= (v as u16) & 0x7F;
            }
            ExprValue::Symbolic { name, offset } => {
                self.out.fixups.push(Fixup {
                    word: 0,
                    reloc: RelocKind::Partial7,
                    symbol: name,
                    addend: offset,
                });
            }
        }
        Ok(())
    }

    fn encode_address(
        &mut self,
        op: &Operand,
        far: bool,
    ) -> Result<(), EncodeError> {
        let value = self.eval(op, false)?;
        if far {
            match value {
                ExprValue::Const(v) => {
                    if !(0..=0x7F_FFFF).contains(&v) {
                        return Err(EncodeError::new(format!(
                            "Extended address out of range: {v}"
                        )));
                    }
                    *self.word0() |= ((v >> 16) as u16) & 0x7F;
                    self.out.words.push(v as u16);
                }
                ExprValue::Symbolic { name, offset } => {
                    self.out.fixups.push(Fixup {
                        word: 0,
                        reloc: RelocKind::Far16,
                        symbol: name,
                        addend: offset,
                    });
                    self.out.words.push(0);
                }
            }
        } else {
            self.push_word16(value, 0, 0xFFFF)?;
        }
        Ok(())
    }
}

/// Encode a matched instruction into words and fixups.
pub fn encode(insn: &MatchedInsn, ctx: &dyn EvalContext) -> Result<EncodedInsn, EncodeError> {
    let tpl = insn.template;
    let mut enc = Encoder {
        ctx,
        out: EncodedInsn {
            words: vec![tpl.opcode[0]],
            fixups: Vec::new(),
            warnings: Vec::new(),
        },
    };

    let mut conditions: Vec<u16> = Vec::new();
    let mut src_bit: Option<u16> = None;
    let mut dst_bound = false;
    let mut n_bound = false;
    let mut sbit_name: Option<String> = None;

    for (kind, op) in insn.pairs.iter().chain(&insn.parpairs) {
        match kind {
            OperandKind::None
            | OperandKind::T
            | OperandKind::Ts
            | OperandKind::Trn
            | OperandKind::Dp
            | OperandKind::Asm
            | OperandKind::Sixteen => {}
            OperandKind::Src => {
                let bit = accumulator(op)?;
                src_bit = Some(bit);
                *enc.word0() |= bit << 9;
            }
            OperandKind::Src1 => {
                let bit = accumulator(op)?;
                src_bit = Some(bit);
                *enc.word0() |= bit << 8;
            }
            OperandKind::Dst => {
                dst_bound = true;
                *enc.word0() |= accumulator(op)? << 8;
            }
            OperandKind::Arx => {
                let arx = op
                    .arx_number()
                    .ok_or_else(|| EncodeError::new("Auxiliary register expected"))?;
                *enc.word0() |= arx;
            }
            OperandKind::Smem | OperandKind::Lmem => enc.encode_memory(op)?,
            OperandKind::Xmem => {
                let value = dual_value(op)
                    .ok_or_else(|| EncodeError::new("Invalid dual-operand reference"))?;
                *enc.word0() |= value << 4;
            }
            OperandKind::Ymem => {
                let value = dual_value(op)
                    .ok_or_else(|| EncodeError::new("Invalid dual-operand reference"))?;
                *enc.word0() |= value;
            }
            OperandKind::Mmr => {
                let addr = mmr_address(op.text())
                    .ok_or_else(|| EncodeError::new("Memory-mapped register expected"))?;
                *enc.word0() |= addr;
            }
            OperandKind::Pmad | OperandKind::Dmad | OperandKind::PA => {
                enc.encode_address(op, false)?;
            }
            OperandKind::Xpmad => enc.encode_address(op, true)?,
            OperandKind::Lk => {
                let value = enc.eval(op, true)?;
                enc.push_word16(value, -32768, 65535)?;
            }
            OperandKind::Lku => {
                let value = enc.eval(op, true)?;
                enc.push_word16(value, 0, 65535)?;
            }
            // Short immediates reinterpret the sign bit in place.
            OperandKind::K8 => {
                let v = enc.require_const(op, -128, 127)?;
                *enc.word0() |= (v as u16) & 0xFF;
            }
            OperandKind::K8u => {
                let v = enc.require_const(op, 0, 255)?;
                *enc.word0() |= v as u16;
            }
            OperandKind::K5 => {
                let v = enc.require_const(op, -16, 15)?;
                *enc.word0() |= (v as u16) & 0x1F;
            }
            OperandKind::K9 => match enc.eval(op, true)? {
                ExprValue::Const(v) => {
                    if !(0..=511).contains(&v) {
                        return Err(EncodeError::new(format!(
                            "Operand out of range (0..511): {v}"
                        )));
                    }
                    *enc.word0() |= (v as u16) & 0x1FF;
                }
                ExprValue::Symbolic { name, offset } => {
                    enc.out.fixups.push(Fixup {
                        word: 0,
                        reloc: RelocKind::Partial9,
                        symbol: name,
                        addend: offset,
                    });
                }
            },
            OperandKind::BitC => {
                let v = enc.require_const(op, 0, 15)?;
                *enc.word0() |= v as u16;
            }
            OperandKind::Cc | OperandKind::Cc2 => {
                let value = condition_value(op.text())
                    .ok_or_else(|| EncodeError::new("Condition code expected"))?;
                conditions.push(value);
            }
            OperandKind::Cc3 => {
                let value = cc3_value(op.text())
                    .ok_or_else(|| EncodeError::new("Compare condition expected"))?;
                *enc.word0() |= value;
            }
            OperandKind::U123 => {
                let v = enc.require_const(op, 1, 3)?;
                if v > 2 {
                    return Err(EncodeError::new(
                        "Conditional execution covers one or two words only",
                    ));
                }
                *enc.word0() |= ((v as u16) - 1) << 12;
            }
            OperandKind::U031 => {
                let v = enc.require_const(op, 0, 31)?;
                *enc.word0() |= v as u16;
            }
            OperandKind::Shift => {
                let v = enc.require_const(op, -16, 15)?;
                *enc.word0() |= (v as u16) & 0x1F;
            }
            OperandKind::Shft => {
                let v = enc.require_const(op, 0, 15)?;
                *enc.word0() |= v as u16;
            }
            OperandKind::N => {
                let n = n_value(op.text())
                    .ok_or_else(|| EncodeError::new("Status register selector expected"))?;
                n_bound = true;
                *enc.word0() |= n << 8;
            }
            OperandKind::Sbit => {
                let bit = match sbit_value(op.text()) {
                    Some(bit) => {
                        sbit_name = Some(op.text().to_string());
                        bit
                    }
                    None => enc.require_const(op, 0, 15)? as u16,
                };
                *enc.word0() |= bit;
            }
        }
    }

    if !conditions.is_empty() {
        *enc.word0() |= combine_conditions(&conditions).map_err(EncodeError::new)?;
    }

    // A named status bit implies its register; a numeric one does not.
    let has_n_slot = tpl.operands.iter().any(|s| s.kind == OperandKind::N);
    if has_n_slot && !n_bound {
        if sbit_name.is_some() {
            *enc.word0() |= 1 << 8;
        } else {
            return Err(EncodeError::new(
                "Status register selector required with a numeric bit",
            ));
        }
    }

    // An omitted destination accumulator defaults to the source.
    let has_dst_slot = tpl.operands.iter().any(|s| s.kind == OperandKind::Dst);
    if has_dst_slot && !dst_bound {
        if let Some(bit) = src_bit {
            *enc.word0() |= bit << 8;
        }
    }

    Ok(enc.out)
}

fn accumulator(op: &Operand) -> Result<u16, EncodeError> {
    op.accumulator_bit()
        .ok_or_else(|| EncodeError::new("Accumulator expected"))
}

/// Combine condition codes into one field, enforcing the group rules:
/// groups cannot mix, group 1 must agree on the accumulator and use each
/// category (compare, overflow) at most once, group 2 likewise for TC,
/// carry, and BIO.
pub fn combine_conditions(values: &[u16]) -> Result<u16, String> {
    let mut acc = values[0];
    for &value in &values[1..] {
        if (acc ^ value) & 0x40 != 0 {
            return Err("Conditions from different groups cannot be combined".to_string());
        }
        if acc & 0x40 != 0 {
            if (acc ^ value) & 0x08 != 0 {
                return Err("Conditions apply to different accumulators".to_string());
            }
            for category in [0x07u16, 0x30] {
                if acc & category != 0 && value & category != 0 {
                    return Err("Only one condition per category is allowed".to_string());
                }
            }
        } else {
            for category in [0x30u16, 0x0C, 0x03] {
                if acc & category != 0 && value & category != 0 {
                    return Err("Only one condition per category is allowed".to_string());
                }
            }
        }
        acc |= value;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c54x::matcher::{match_parallel, match_serial};
    use crate::core::expr::MapContext;

    fn ops(texts: &[&str]) -> Vec<Operand> {
        texts.iter().copied().map(Operand::new).collect()
    }

    fn assemble(mnemonic: &str, texts: &[&str], ctx: &MapContext) -> EncodedInsn {
        let insn = match_serial(mnemonic, &ops(texts), ctx).expect("match");
        encode(&insn, ctx).expect("encode")
    }

    #[test]
    fn long_immediate_add_emits_two_words() {
        let ctx = MapContext::default();
        let enc = assemble("add", &["#1", "a"], &ctx);
        assert_eq!(enc.words, vec![0xF000, 0x0001]);
        assert!(enc.fixups.is_empty());
    }

    #[test]
    fn destination_defaults_to_the_source_accumulator() {
        let ctx = MapContext::default();
        let enc = assemble("add", &["#1", "b"], &ctx);
        // src = B at bit 9, defaulted dst = B at bit 8.
        assert_eq!(enc.words[0], 0xF000 | (1 << 9) | (1 << 8));
        let enc = assemble("add", &["#1", "a", "b"], &ctx);
        assert_eq!(enc.words[0], 0xF000 | (1 << 8));
    }

    #[test]
    fn indirect_memory_operand_packs_mod_and_register() {
        let ctx = MapContext::default();
        let enc = assemble("add", &["*AR1+", "a"], &ctx);
        assert_eq!(enc.words, vec![0x0000 | 0x80 | (2 << 3) | 1]);
    }

    #[test]
    fn write_only_address_mode_warns() {
        let ctx = MapContext::default();
        let enc = assemble("ld", &["*+AR3", "a"], &ctx);
        assert_eq!(enc.words[0] & 0xFF, 0x80 | (3 << 3) | 3);
        assert_eq!(enc.warnings.len(), 1);
    }

    #[test]
    fn long_offset_displacement_appends_a_word() {
        let ctx = MapContext::default();
        let enc = assemble("ld", &["*AR3(40)", "a"], &ctx);
        assert_eq!(enc.words, vec![0x1000 | 0x80 | (12 << 3) | 3, 40]);
        let enc = assemble("ld", &["*(100)", "b"], &ctx);
        assert_eq!(enc.words[0] & 0xFF, 0x80 | (15 << 3));
        assert_eq!(enc.words[1], 100);
    }

    #[test]
    fn direct_addressing_uses_the_low_seven_bits() {
        let mut ctx = MapContext::default();
        ctx.symbols.insert("sample".to_string(), 0x85);
        let enc = assemble("add", &["@sample", "a"], &ctx);
        // Only the page offset lands in the opcode word.
        assert_eq!(enc.words, vec![0x0005]);
    }

    #[test]
    fn undefined_direct_symbol_leaves_a_partial7_fixup() {
        let ctx = MapContext::default();
        let enc = assemble("add", &["@sample", "a"], &ctx);
        assert_eq!(enc.words, vec![0x0000]);
        assert_eq!(enc.fixups[0].reloc, RelocKind::Partial7);
        assert_eq!(enc.fixups[0].symbol, "sample");
    }

    #[test]
    fn undefined_branch_target_leaves_a_word16_fixup() {
        let ctx = MapContext::default();
        let enc = assemble("b", &["loop"], &ctx);
        assert_eq!(enc.words, vec![0xF073, 0]);
        assert_eq!(
            enc.fixups,
            vec![Fixup {
                word: 1,
                reloc: RelocKind::Word16,
                symbol: "loop".to_string(),
                addend: 0,
            }]
        );
    }

    #[test]
    fn extended_address_splits_across_both_words() {
        let mut ctx = MapContext::default();
        ctx.symbols.insert("far_fn".to_string(), 0x12_3456);
        let enc = assemble("fb", &["far_fn"], &ctx);
        assert_eq!(enc.words, vec![0xF880 | 0x12, 0x3456]);
    }

    #[test]
    fn far_fixup_patches_both_words() {
        let ctx = MapContext::default();
        let enc = assemble("fcall", &["far_fn"], &ctx);
        assert_eq!(enc.fixups[0].reloc, RelocKind::Far16);
        let mut words = enc.words.clone();
        apply_fixup(&mut words, &enc.fixups[0], 0x7F_FFFF).expect("fixup");
        assert_eq!(words, vec![0xFA80 | 0x7F, 0xFFFF]);
    }

    #[test]
    fn partial_fixups_take_the_low_bits_of_the_value() {
        // Same result as encoding a resolved address: only the page offset
        // lands in the field.
        let fixup = Fixup {
            word: 0,
            reloc: RelocKind::Partial7,
            symbol: "sample".to_string(),
            addend: 0,
        };
        let mut words = vec![0x8000];
        apply_fixup(&mut words, &fixup, 0x85).expect("page offset");
        assert_eq!(words[0], 0x8005);

        let fixup = Fixup {
            word: 0,
            reloc: RelocKind::Partial9,
            symbol: "dp".to_string(),
            addend: 0,
        };
        let mut words = vec![0xEA00];
        apply_fixup(&mut words, &fixup, 0x1FF).expect("in range");
        assert_eq!(words[0], 0xEBFF);
    }

    #[test]
    fn full_width_fixups_are_range_checked() {
        let fixup = Fixup {
            word: 1,
            reloc: RelocKind::Word16,
            symbol: "target".to_string(),
            addend: 0,
        };
        let mut words = vec![0xF073, 0];
        assert!(apply_fixup(&mut words, &fixup, 0x1_0000).is_err());
        assert!(apply_fixup(&mut words, &fixup, -1).is_err());
        apply_fixup(&mut words, &fixup, 0xFFFF).expect("in range");
        assert_eq!(words[1], 0xFFFF);
    }

    #[test]
    fn double_precision_load_packs_the_memory_field() {
        let ctx = MapContext::default();
        let enc = assemble("dld", &["*AR3+", "b"], &ctx);
        assert_eq!(enc.words, vec![0x5600 | (1 << 8) | 0x80 | (2 << 3) | 3]);
    }

    #[test]
    fn compare_condition_and_register_share_the_opcode_word() {
        let ctx = MapContext::default();
        let enc = assemble("cmpr", &["gt", "ar4"], &ctx);
        assert_eq!(enc.words, vec![0xF4A8 | 0x0200 | 4]);
        assert!(match_serial("cmpr", &ops(&["leq", "ar4"]), &ctx).is_err());
    }

    #[test]
    fn port_transfers_emit_the_address_as_an_extension_word() {
        let ctx = MapContext::default();
        let enc = assemble("portr", &["5", "@dat"], &ctx);
        assert_eq!(enc.words, vec![0x7400, 5]);
        assert_eq!(enc.fixups[0].reloc, RelocKind::Partial7);

        let mut ctx = MapContext::default();
        ctx.symbols.insert("dat".to_string(), 0x23);
        let enc = assemble("portw", &["@dat", "5"], &ctx);
        assert_eq!(enc.words, vec![0x7523, 5]);
    }

    #[test]
    fn data_move_appends_the_destination_address() {
        let mut ctx = MapContext::default();
        ctx.symbols.insert("dst_tab".to_string(), 0x1000);
        let enc = assemble("mvdk", &["*AR5+", "dst_tab"], &ctx);
        assert_eq!(enc.words, vec![0x7100 | 0x80 | (2 << 3) | 5, 0x1000]);
    }

    #[test]
    fn bit_test_packs_index_and_dual_memory_field() {
        let ctx = MapContext::default();
        let enc = assemble("bit", &["*AR2+", "9"], &ctx);
        assert_eq!(enc.words, vec![0x9600 | (0b1000 << 4) | 9]);
    }

    #[test]
    fn software_interrupt_number_is_bounded() {
        let ctx = MapContext::default();
        let enc = assemble("intr", &["3"], &ctx);
        assert_eq!(enc.words, vec![0xF7C3]);
        assert!(match_serial("intr", &ops(&["32"]), &ctx).is_err());
    }

    #[test]
    fn negative_short_immediate_reinterprets_the_sign() {
        let ctx = MapContext::default();
        let enc = assemble("frame", &["#-1"], &ctx);
        assert_eq!(enc.words, vec![0xEEFF]);
    }

    #[test]
    fn status_bit_by_name_implies_st1() {
        let ctx = MapContext::default();
        let enc = assemble("ssbx", &["sxm"], &ctx);
        assert_eq!(enc.words, vec![0xF4B0 | (1 << 8) | 8]);
        let enc = assemble("rsbx", &["0", "11"], &ctx);
        assert_eq!(enc.words, vec![0xF4A0 | 11]);
    }

    #[test]
    fn numeric_status_bit_without_selector_is_an_error() {
        let ctx = MapContext::default();
        let insn = match_serial("ssbx", &ops(&["8"]), &ctx).expect("match");
        assert!(encode(&insn, &ctx).is_err());
    }

    #[test]
    fn conditions_combine_within_a_group() {
        assert_eq!(combine_conditions(&[0x30, 0x0C, 0x03]), Ok(0x3F));
        assert_eq!(combine_conditions(&[0x45, 0x70]), Ok(0x75));
    }

    #[test]
    fn condition_group_mismatch_is_rejected() {
        // TC is group 2, AGT is group 1.
        assert!(combine_conditions(&[0x30, 0x46]).is_err());
        // AEQ and BEQ name different accumulators.
        assert!(combine_conditions(&[0x45, 0x4D]).is_err());
        // Two compare-category conditions.
        assert!(combine_conditions(&[0x45, 0x46]).is_err());
    }

    #[test]
    fn conditional_branch_merges_conditions_into_the_opcode() {
        let mut ctx = MapContext::default();
        ctx.symbols.insert("loop".to_string(), 0x2000);
        let enc = assemble("bc", &["loop", "tc", "c", "bio"], &ctx);
        assert_eq!(enc.words, vec![0xF800 | 0x3F, 0x2000]);
        let insn = match_serial("bc", &ops(&["loop", "tc", "agt"]), &ctx).expect("match");
        assert!(encode(&insn, &ctx).is_err());
    }

    #[test]
    fn parallel_pair_packs_both_memory_fields() {
        let ctx = MapContext::default();
        let insn = match_parallel(
            "st",
            &ops(&["a", "*AR3+"]),
            "mpy",
            &ops(&["*AR4+", "b"]),
            &ctx,
        )
        .expect("match");
        let enc = encode(&insn, &ctx).expect("encode");
        // Ymem = *AR3+ -> 0b1001, Xmem = *AR4+ -> 0b1010.
        assert_eq!(
            enc.words,
            vec![0xC800 | (0b1010 << 4) | 0b1001 | (1 << 8)]
        );
    }
}
