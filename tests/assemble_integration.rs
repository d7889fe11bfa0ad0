// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! End-to-end assembly tests against the library API.

use proptest::prelude::*;

use dspforge::assembler::engine::Assembler;
use dspforge::assembler::output::object_bytes;
use dspforge::c54x::encoder::combine_conditions;
use dspforge::c54x::operand::CONDITION_TABLE;
use dspforge::c54x::CpuVersion;

fn assemble(lines: &[&str]) -> Assembler {
    let mut asm = Assembler::new(CpuVersion::C549, false);
    asm.assemble_source(&lines.join("\n"));
    asm
}

#[test]
fn small_program_assembles_to_the_expected_image() {
    let asm = assemble(&[
        "        .asg 040h, mask",
        "start:  ld #mask, a",
        "        stm #100, ar1",
        "        rpt #7",
        "        mac *ar2+, a",
        "        stl a, @result",
        "        b start",
        "result: .word 0",
    ]);
    assert_eq!(asm.log.error_count(), 0, "{:?}", asm.log.diagnostics());
    assert_eq!(asm.log.warning_count(), 0);
    assert_eq!(
        asm.words(),
        &[
            0xE840, // ld #40h, a
            0x7711, 0x0064, // stm #100, ar1
            0xEC07, // rpt #7
            0x2892, // mac *ar2+, a
            0x8008, // stl a, @result (direct offset patched to 8)
            0xF073, 0x0000, // b start
            0x0000, // .word 0
        ]
    );
    assert_eq!(asm.symbol("start"), Some(0));
    assert_eq!(asm.symbol("result"), Some(8));
}

#[test]
fn extended_call_emits_the_high_word_first() {
    let asm = assemble(&["        fcall target", "target: nop"]);
    assert_eq!(asm.log.error_count(), 0);
    assert_eq!(asm.words(), &[0xFA80, 0x0002, 0xF495]);
    // Each word is little-endian; the 23-bit unit keeps its high word in
    // front of the low word.
    assert_eq!(
        object_bytes(asm.words()),
        vec![0x80, 0xFA, 0x02, 0x00, 0x95, 0xF4]
    );
}

#[test]
fn mixed_condition_groups_fail_the_line() {
    let asm = assemble(&["        bc spot, tc, agt", "spot:   nop"]);
    assert_eq!(asm.log.error_count(), 1);
    assert!(asm.log.diagnostics()[0].message().contains("groups"));
}

#[test]
fn delay_slots_and_repeat_interact_across_a_program() {
    let asm = assemble(&[
        "        bd exit",
        "        nop",
        "        nop",
        "        rpt #3",
        "        add *ar1+, a",
        "exit:   ret",
    ]);
    assert_eq!(asm.log.error_count(), 0);
    assert_eq!(asm.log.warning_count(), 0);
    assert_eq!(asm.symbol("exit"), Some(6));
}

#[test]
fn listing_records_addresses_and_emitted_words() {
    let asm = assemble(&["        add #1, a", "        nop"]);
    let listing = asm.listing();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].address, 0);
    assert_eq!(listing[0].words, vec![0xF000, 0x0001]);
    assert_eq!(listing[1].address, 2);
    assert_eq!(listing[1].line, 2);
}

#[test]
fn predefines_act_like_file_scope_asg() {
    let mut asm = Assembler::new(CpuVersion::C549, false);
    asm.predefine("N", "9");
    asm.assemble_source("        ld #N, b");
    assert_eq!(asm.log.error_count(), 0);
    assert_eq!(asm.words(), &[0xE909]);
}

proptest! {
    #[test]
    fn unsigned_byte_immediates_land_in_the_low_bits(k in 0u16..=255) {
        let source = format!("        ld #{k}, a");
        let mut asm = Assembler::new(CpuVersion::C549, false);
        asm.assemble_source(&source);
        prop_assert_eq!(asm.log.error_count(), 0);
        prop_assert_eq!(asm.words()[0], 0xE800 | k);
    }

    #[test]
    fn signed_frame_immediates_reinterpret_the_sign(k in -128i32..=127) {
        let source = format!("        frame #{k}");
        let mut asm = Assembler::new(CpuVersion::C549, false);
        asm.assemble_source(&source);
        prop_assert_eq!(asm.log.error_count(), 0);
        prop_assert_eq!(asm.words()[0], 0xEE00 | (k as u16 & 0xFF));
    }

    #[test]
    fn condition_combining_is_order_independent(
        a in 0usize..CONDITION_TABLE.len(),
        b in 0usize..CONDITION_TABLE.len(),
    ) {
        let x = CONDITION_TABLE[a].1;
        let y = CONDITION_TABLE[b].1;
        match combine_conditions(&[x, y]) {
            Ok(value) => prop_assert_eq!(combine_conditions(&[y, x]), Ok(value)),
            Err(_) => prop_assert!(combine_conditions(&[y, x]).is_err()),
        }
    }

    #[test]
    fn assembly_of_a_line_is_deterministic(k in 0u16..=255) {
        let source = format!("        add #{k}, a, b");
        let mut first = Assembler::new(CpuVersion::C549, false);
        first.assemble_source(&source);
        let mut second = Assembler::new(CpuVersion::C549, false);
        second.assemble_source(&source);
        prop_assert_eq!(first.words(), second.words());
    }
}
