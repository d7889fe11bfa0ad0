// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction template table.
//!
//! Templates for one mnemonic are tried in table order, so more specific
//! forms must precede more general ones. Optional slots let a single
//! template cover syntaxes that omit the shift count or the destination
//! accumulator.

use super::operand::OperandKind;

/// Instruction has delay slots (D-suffix forms).
pub const FL_DELAY: u16 = 1 << 0;
/// Instruction must not sit under a single-instruction repeat.
pub const FL_NR: u16 = 1 << 1;
/// Branch class; unsafe inside another instruction's delay slots.
pub const FL_BMASK: u16 = 1 << 2;
/// Uses extended 23-bit program addressing ('548 and later).
pub const FL_FAR: u16 = 1 << 3;
/// Two-word opcode; the long-immediate extension word follows.
pub const FL_EXT: u16 = 1 << 4;
/// Begins a single-instruction repeat.
pub const FL_REPEAT: u16 = 1 << 5;
/// Parallel pair spelled with `||`.
pub const FL_PAR: u16 = 1 << 6;

/// One operand slot of a template.
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub kind: OperandKind,
    pub optional: bool,
}

/// One row of the instruction table.
#[derive(Debug)]
pub struct Template {
    pub mnemonic: &'static str,
    /// Base word count, before any lk-addressing extension.
    pub words: u16,
    pub minops: usize,
    pub maxops: usize,
    pub opcode: [u16; 2],
    pub operands: &'static [Slot],
    pub flags: u16,
    /// Second-half mnemonic for parallel pairs, empty otherwise.
    pub parname: &'static str,
    pub paropers: &'static [Slot],
}

macro_rules! required {
    ($name:ident, $kind:ident) => {
        const $name: Slot = Slot {
            kind: OperandKind::$kind,
            optional: false,
        };
    };
}

macro_rules! optional {
    ($name:ident, $kind:ident) => {
        const $name: Slot = Slot {
            kind: OperandKind::$kind,
            optional: true,
        };
    };
}

required!(SMEM, Smem);
required!(XMEM, Xmem);
required!(YMEM, Ymem);
required!(MMR, Mmr);
required!(SRC, Src);
required!(SRC1, Src1);
required!(DST, Dst);
required!(TS, Ts);
required!(T, T);
required!(TRN, Trn);
required!(DP, Dp);
required!(ASM, Asm);
required!(SIXTEEN, Sixteen);
required!(LK, Lk);
required!(LKU, Lku);
required!(K8, K8);
required!(K8U, K8u);
required!(K5, K5);
required!(K9, K9);
required!(SHFT, Shft);
required!(PMAD, Pmad);
required!(XPMAD, Xpmad);
required!(CC, Cc);
required!(CC2, Cc2);
required!(U123, U123);
required!(U031, U031);
required!(SBIT, Sbit);
required!(LMEM, Lmem);
required!(ARX, Arx);
required!(CC3, Cc3);
required!(PA, PA);
required!(DMAD, Dmad);
required!(BITC, BitC);
optional!(OPT_DST, Dst);
optional!(OPT_SHIFT, Shift);
optional!(OPT_SHFT, Shft);
optional!(OPT_N, N);
optional!(OPT_CC, Cc);
optional!(OPT_CC2, Cc2);

/// Serial instruction templates, in priority order per mnemonic.
pub static TEMPLATES: &[Template] = &[
    Template { mnemonic: "add", words: 1, minops: 2, maxops: 2, opcode: [0x0000, 0], operands: &[SMEM, SRC1], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "add", words: 1, minops: 3, maxops: 3, opcode: [0x0400, 0], operands: &[SMEM, TS, SRC1], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "add", words: 1, minops: 3, maxops: 4, opcode: [0x3C00, 0], operands: &[SMEM, SIXTEEN, SRC, OPT_DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "add", words: 1, minops: 3, maxops: 3, opcode: [0x9000, 0], operands: &[XMEM, YMEM, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "add", words: 2, minops: 2, maxops: 4, opcode: [0xF000, 0], operands: &[LK, OPT_SHFT, SRC, OPT_DST], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "add", words: 1, minops: 2, maxops: 3, opcode: [0xF400, 0], operands: &[SRC, OPT_SHIFT, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "add", words: 1, minops: 2, maxops: 3, opcode: [0xF480, 0], operands: &[SRC, ASM, OPT_DST], flags: 0, parname: "", paropers: &[] },

    Template { mnemonic: "sub", words: 1, minops: 2, maxops: 2, opcode: [0x0800, 0], operands: &[SMEM, SRC1], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "sub", words: 1, minops: 3, maxops: 3, opcode: [0x0C00, 0], operands: &[SMEM, TS, SRC1], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "sub", words: 1, minops: 3, maxops: 4, opcode: [0x3E00, 0], operands: &[SMEM, SIXTEEN, SRC, OPT_DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "sub", words: 1, minops: 3, maxops: 3, opcode: [0xA000, 0], operands: &[XMEM, YMEM, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "sub", words: 2, minops: 2, maxops: 4, opcode: [0xF010, 0], operands: &[LK, OPT_SHFT, SRC, OPT_DST], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "sub", words: 1, minops: 2, maxops: 3, opcode: [0xF410, 0], operands: &[SRC, OPT_SHIFT, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "sub", words: 1, minops: 2, maxops: 3, opcode: [0xF490, 0], operands: &[SRC, ASM, OPT_DST], flags: 0, parname: "", paropers: &[] },

    Template { mnemonic: "ld", words: 1, minops: 2, maxops: 2, opcode: [0x1000, 0], operands: &[SMEM, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 1, minops: 3, maxops: 3, opcode: [0x1400, 0], operands: &[SMEM, SIXTEEN, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 1, minops: 3, maxops: 3, opcode: [0x4400, 0], operands: &[SMEM, SHFT, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 1, minops: 2, maxops: 2, opcode: [0x3000, 0], operands: &[SMEM, T], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 1, minops: 2, maxops: 2, opcode: [0x4600, 0], operands: &[SMEM, ASM], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 1, minops: 2, maxops: 2, opcode: [0xEA00, 0], operands: &[K9, DP], flags: FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 1, minops: 2, maxops: 2, opcode: [0xED80, 0], operands: &[K5, ASM], flags: FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 1, minops: 2, maxops: 2, opcode: [0xE800, 0], operands: &[K8U, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 2, minops: 2, maxops: 3, opcode: [0xF020, 0], operands: &[LK, OPT_SHFT, DST], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 2, minops: 3, maxops: 3, opcode: [0xF060, 0], operands: &[LK, SIXTEEN, DST], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "ld", words: 1, minops: 2, maxops: 3, opcode: [0xF420, 0], operands: &[SRC, OPT_SHIFT, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "dld", words: 1, minops: 2, maxops: 2, opcode: [0x5600, 0], operands: &[LMEM, DST], flags: 0, parname: "", paropers: &[] },

    Template { mnemonic: "stl", words: 1, minops: 2, maxops: 2, opcode: [0x8000, 0], operands: &[SRC1, SMEM], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "stl", words: 1, minops: 3, maxops: 3, opcode: [0x9800, 0], operands: &[SRC1, SHFT, SMEM], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "sth", words: 1, minops: 2, maxops: 2, opcode: [0x8200, 0], operands: &[SRC1, SMEM], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "sth", words: 1, minops: 3, maxops: 3, opcode: [0x9A00, 0], operands: &[SRC1, SHFT, SMEM], flags: 0, parname: "", paropers: &[] },

    Template { mnemonic: "st", words: 1, minops: 2, maxops: 2, opcode: [0x8C00, 0], operands: &[T, SMEM], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "st", words: 1, minops: 2, maxops: 2, opcode: [0x8D00, 0], operands: &[TRN, SMEM], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "st", words: 2, minops: 2, maxops: 2, opcode: [0x7600, 0], operands: &[LK, SMEM], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "stm", words: 2, minops: 2, maxops: 2, opcode: [0x7700, 0], operands: &[LK, MMR], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },

    Template { mnemonic: "mvdk", words: 2, minops: 2, maxops: 2, opcode: [0x7100, 0], operands: &[SMEM, DMAD], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "portr", words: 2, minops: 2, maxops: 2, opcode: [0x7400, 0], operands: &[PA, SMEM], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "portw", words: 2, minops: 2, maxops: 2, opcode: [0x7500, 0], operands: &[SMEM, PA], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },

    Template { mnemonic: "mpy", words: 1, minops: 2, maxops: 2, opcode: [0x2000, 0], operands: &[SMEM, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "mpy", words: 1, minops: 3, maxops: 3, opcode: [0xA400, 0], operands: &[XMEM, YMEM, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "mpy", words: 2, minops: 2, maxops: 2, opcode: [0xF066, 0], operands: &[LK, DST], flags: FL_EXT | FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "mac", words: 1, minops: 2, maxops: 2, opcode: [0x2800, 0], operands: &[SMEM, DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "mac", words: 1, minops: 3, maxops: 4, opcode: [0xB000, 0], operands: &[XMEM, YMEM, SRC, OPT_DST], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "bit", words: 1, minops: 2, maxops: 2, opcode: [0x9600, 0], operands: &[XMEM, BITC], flags: 0, parname: "", paropers: &[] },

    Template { mnemonic: "nop", words: 1, minops: 0, maxops: 0, opcode: [0xF495, 0], operands: &[], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "frame", words: 1, minops: 1, maxops: 1, opcode: [0xEE00, 0], operands: &[K8], flags: 0, parname: "", paropers: &[] },

    Template { mnemonic: "rpt", words: 1, minops: 1, maxops: 1, opcode: [0x4700, 0], operands: &[SMEM], flags: FL_NR | FL_REPEAT, parname: "", paropers: &[] },
    Template { mnemonic: "rpt", words: 1, minops: 1, maxops: 1, opcode: [0xEC00, 0], operands: &[K8U], flags: FL_NR | FL_REPEAT, parname: "", paropers: &[] },
    Template { mnemonic: "rpt", words: 2, minops: 1, maxops: 1, opcode: [0xF070, 0], operands: &[LKU], flags: FL_EXT | FL_NR | FL_REPEAT, parname: "", paropers: &[] },
    Template { mnemonic: "rptz", words: 2, minops: 2, maxops: 2, opcode: [0xF071, 0], operands: &[DST, LKU], flags: FL_EXT | FL_NR | FL_REPEAT, parname: "", paropers: &[] },

    Template { mnemonic: "ssbx", words: 1, minops: 1, maxops: 2, opcode: [0xF4B0, 0], operands: &[OPT_N, SBIT], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "rsbx", words: 1, minops: 1, maxops: 2, opcode: [0xF4A0, 0], operands: &[OPT_N, SBIT], flags: 0, parname: "", paropers: &[] },
    Template { mnemonic: "xc", words: 1, minops: 2, maxops: 4, opcode: [0xE400, 0], operands: &[U123, CC2, OPT_CC2, OPT_CC2], flags: FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "cmpr", words: 1, minops: 2, maxops: 2, opcode: [0xF4A8, 0], operands: &[CC3, ARX], flags: FL_NR, parname: "", paropers: &[] },
    Template { mnemonic: "intr", words: 1, minops: 1, maxops: 1, opcode: [0xF7C0, 0], operands: &[U031], flags: FL_NR, parname: "", paropers: &[] },

    Template { mnemonic: "b", words: 2, minops: 1, maxops: 1, opcode: [0xF073, 0], operands: &[PMAD], flags: FL_EXT | FL_NR | FL_BMASK, parname: "", paropers: &[] },
    Template { mnemonic: "bd", words: 2, minops: 1, maxops: 1, opcode: [0xF273, 0], operands: &[PMAD], flags: FL_EXT | FL_NR | FL_BMASK | FL_DELAY, parname: "", paropers: &[] },
    Template { mnemonic: "call", words: 2, minops: 1, maxops: 1, opcode: [0xF074, 0], operands: &[PMAD], flags: FL_EXT | FL_NR | FL_BMASK, parname: "", paropers: &[] },
    Template { mnemonic: "calld", words: 2, minops: 1, maxops: 1, opcode: [0xF274, 0], operands: &[PMAD], flags: FL_EXT | FL_NR | FL_BMASK | FL_DELAY, parname: "", paropers: &[] },
    Template { mnemonic: "ret", words: 1, minops: 0, maxops: 0, opcode: [0xFC00, 0], operands: &[], flags: FL_NR | FL_BMASK, parname: "", paropers: &[] },
    Template { mnemonic: "retd", words: 1, minops: 0, maxops: 0, opcode: [0xFD00, 0], operands: &[], flags: FL_NR | FL_BMASK | FL_DELAY, parname: "", paropers: &[] },
    Template { mnemonic: "bacc", words: 1, minops: 1, maxops: 1, opcode: [0xF6E1, 0], operands: &[SRC], flags: FL_NR | FL_BMASK, parname: "", paropers: &[] },
    Template { mnemonic: "baccd", words: 1, minops: 1, maxops: 1, opcode: [0xF6E3, 0], operands: &[SRC], flags: FL_NR | FL_BMASK | FL_DELAY, parname: "", paropers: &[] },

    Template { mnemonic: "fb", words: 2, minops: 1, maxops: 1, opcode: [0xF880, 0], operands: &[XPMAD], flags: FL_EXT | FL_NR | FL_BMASK | FL_FAR, parname: "", paropers: &[] },
    Template { mnemonic: "fbd", words: 2, minops: 1, maxops: 1, opcode: [0xF980, 0], operands: &[XPMAD], flags: FL_EXT | FL_NR | FL_BMASK | FL_FAR | FL_DELAY, parname: "", paropers: &[] },
    Template { mnemonic: "fcall", words: 2, minops: 1, maxops: 1, opcode: [0xFA80, 0], operands: &[XPMAD], flags: FL_EXT | FL_NR | FL_BMASK | FL_FAR, parname: "", paropers: &[] },
    Template { mnemonic: "fcalld", words: 2, minops: 1, maxops: 1, opcode: [0xFB80, 0], operands: &[XPMAD], flags: FL_EXT | FL_NR | FL_BMASK | FL_FAR | FL_DELAY, parname: "", paropers: &[] },

    Template { mnemonic: "bc", words: 2, minops: 2, maxops: 4, opcode: [0xF800, 0], operands: &[PMAD, CC, OPT_CC, OPT_CC], flags: FL_EXT | FL_NR | FL_BMASK, parname: "", paropers: &[] },
    Template { mnemonic: "bcd", words: 2, minops: 2, maxops: 4, opcode: [0xF300, 0], operands: &[PMAD, CC, OPT_CC, OPT_CC], flags: FL_EXT | FL_NR | FL_BMASK | FL_DELAY, parname: "", paropers: &[] },
    Template { mnemonic: "cc", words: 2, minops: 2, maxops: 4, opcode: [0xFE00, 0], operands: &[PMAD, CC, OPT_CC, OPT_CC], flags: FL_EXT | FL_NR | FL_BMASK, parname: "", paropers: &[] },
    Template { mnemonic: "ccd", words: 2, minops: 2, maxops: 4, opcode: [0xFF00, 0], operands: &[PMAD, CC, OPT_CC, OPT_CC], flags: FL_EXT | FL_NR | FL_BMASK | FL_DELAY, parname: "", paropers: &[] },
];

/// Parallel pair templates. The first half writes to memory while the
/// second half computes; both halves encode into one word.
pub static PARALLEL_TEMPLATES: &[Template] = &[
    Template { mnemonic: "st", words: 1, minops: 2, maxops: 2, opcode: [0xC000, 0], operands: &[SRC, YMEM], flags: FL_PAR, parname: "add", paropers: &[XMEM, DST] },
    Template { mnemonic: "st", words: 1, minops: 2, maxops: 2, opcode: [0xC400, 0], operands: &[SRC, YMEM], flags: FL_PAR, parname: "sub", paropers: &[XMEM, DST] },
    Template { mnemonic: "st", words: 1, minops: 2, maxops: 2, opcode: [0xC800, 0], operands: &[SRC, YMEM], flags: FL_PAR, parname: "mpy", paropers: &[XMEM, DST] },
    Template { mnemonic: "ld", words: 1, minops: 2, maxops: 2, opcode: [0xA800, 0], operands: &[XMEM, DST], flags: FL_PAR, parname: "mac", paropers: &[YMEM], },
];

/// All serial templates for a mnemonic, in priority order.
pub fn lookup(mnemonic: &str) -> Vec<&'static Template> {
    let lower = mnemonic.to_ascii_lowercase();
    TEMPLATES
        .iter()
        .filter(|tpl| tpl.mnemonic == lower)
        .collect()
}

/// All parallel templates for a mnemonic pair, in priority order.
pub fn lookup_parallel(mnemonic: &str, parname: &str) -> Vec<&'static Template> {
    let first = mnemonic.to_ascii_lowercase();
    let second = parname.to_ascii_lowercase();
    PARALLEL_TEMPLATES
        .iter()
        .filter(|tpl| tpl.mnemonic == first && tpl.parname == second)
        .collect()
}
