// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The line-by-line assembly engine.
//!
//! Each source line is comment-stripped, run through the substitution
//! preprocessor, then dispatched as a label, directive, or instruction.
//! Instructions go through template matching, the peephole optimizer,
//! hazard checks, and encoding; forward references become fixups resolved
//! once the whole source has been read.

use std::collections::HashMap;

use crate::assembler::output::ListingLine;
use crate::c54x::encoder::{self, apply_fixup, Fixup};
use crate::c54x::hazards::{Hazard, HazardState};
use crate::c54x::matcher::{match_parallel, match_serial, MatchedInsn};
use crate::c54x::operand::{is_register_name, Operand};
use crate::c54x::optimizer;
use crate::c54x::table::FL_FAR;
use crate::c54x::CpuVersion;
use crate::core::error::{AsmErrorKind, DiagnosticLog, LineStatus};
use crate::core::expr::{parse_expr, EvalContext, ExprValue};
use crate::core::subsym::{SubsymContext, SubsymTable};

struct EngineEvalCtx<'a> {
    symbols: &'a HashMap<String, i64>,
    address: i64,
}

impl EvalContext for EngineEvalCtx<'_> {
    fn lookup_symbol(&self, name: &str) -> Option<i64> {
        self.symbols.get(name).copied()
    }

    fn current_address(&self) -> Option<i64> {
        Some(self.address)
    }
}

struct EngineSubsymCtx<'a> {
    symbols: &'a HashMap<String, i64>,
}

impl SubsymContext for EngineSubsymCtx<'_> {
    fn is_defined_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    fn is_register(&self, name: &str) -> bool {
        is_register_name(name)
    }
}

struct PendingFixup {
    line: u32,
    index: usize,
    fixup: Fixup,
}

struct PartialPair {
    mnemonic: String,
    operands: Vec<Operand>,
}

struct CondFrame {
    parent_active: bool,
    active: bool,
    taken: bool,
}

/// Single-pass assembler with deferred fixups for forward references.
pub struct Assembler {
    cpu: CpuVersion,
    far_mode: bool,
    subsym: SubsymTable,
    symbols: HashMap<String, i64>,
    address: u32,
    words: Vec<u16>,
    relocs: Vec<PendingFixup>,
    listing: Vec<ListingLine>,
    pub log: DiagnosticLog,
    hazards: HazardState,
    pending_parallel: Option<PartialPair>,
    cond_stack: Vec<CondFrame>,
    ended: bool,
}

impl Assembler {
    pub fn new(cpu: CpuVersion, far_mode: bool) -> Self {
        Self {
            cpu,
            far_mode,
            subsym: SubsymTable::new(),
            symbols: HashMap::new(),
            address: 0,
            words: Vec::new(),
            relocs: Vec::new(),
            listing: Vec::new(),
            log: DiagnosticLog::new(),
            hazards: HazardState::new(),
            pending_parallel: None,
            cond_stack: Vec::new(),
            ended: false,
        }
    }

    /// Predefine a substitution symbol (CLI `-D`).
    pub fn predefine(&mut self, name: &str, value: &str) {
        self.subsym.define_at_base(name, value);
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    pub fn listing(&self) -> &[ListingLine] {
        &self.listing
    }

    pub fn symbol(&self, name: &str) -> Option<i64> {
        self.symbols.get(name).copied()
    }

    /// Assemble a complete source text, then resolve fixups.
    pub fn assemble_source(&mut self, text: &str) {
        for (idx, line) in text.lines().enumerate() {
            self.assemble_line(line, idx as u32 + 1);
        }
        self.finalize();
    }

    pub fn assemble_line(&mut self, raw: &str, line_no: u32) -> LineStatus {
        if self.ended {
            return LineStatus::NothingDone;
        }
        let errors_before = self.log.error_count();
        let warnings_before = self.log.warning_count();

        let stripped = strip_comment(raw);
        if stripped.trim().is_empty() {
            return LineStatus::NothingDone;
        }

        let text = {
            let ctx = EngineSubsymCtx {
                symbols: &self.symbols,
            };
            let (text, warnings) = self.subsym.substitute(&stripped, false, &ctx);
            for warning in warnings {
                self.log
                    .warning(line_no, AsmErrorKind::Preprocess, &warning.message, None);
            }
            text
        };

        let (label, rest) = split_label(&text);
        let body = rest.trim().to_string();

        // Conditional directives run even in inactive regions.
        if self.try_conditional(&body, line_no).is_none() && self.cond_active() {
            if let Some(label) = label {
                self.define_label(&label, line_no);
            }
            if !body.is_empty() {
                if body.starts_with('.') {
                    self.directive(&body, raw, line_no);
                } else {
                    self.instruction(&body, raw, line_no);
                }
            }
        }

        if self.log.error_count() > errors_before {
            LineStatus::Error
        } else if self.log.warning_count() > warnings_before {
            LineStatus::Warning
        } else {
            LineStatus::Ok
        }
    }

    fn cond_active(&self) -> bool {
        self.cond_stack.iter().all(|frame| frame.active)
    }

    /// Handle `.if`/`.elseif`/`.else`/`.endif`; `None` when `body` is not a
    /// conditional directive.
    fn try_conditional(&mut self, body: &str, line_no: u32) -> Option<()> {
        let (name, args) = split_directive(body);
        match name.as_str() {
            ".if" => {
                let parent = self.cond_active();
                let value = parent && self.eval_condition(args, line_no);
                self.cond_stack.push(CondFrame {
                    parent_active: parent,
                    active: parent && value,
                    taken: value,
                });
                Some(())
            }
            ".elseif" => {
                let Some(frame) = self.cond_stack.last() else {
                    self.log
                        .error(line_no, AsmErrorKind::Directive, ".elseif without .if", None);
                    return Some(());
                };
                let (parent, taken) = (frame.parent_active, frame.taken);
                let value = parent && !taken && self.eval_condition(args, line_no);
                if let Some(frame) = self.cond_stack.last_mut() {
                    frame.active = value;
                    frame.taken = taken || value;
                }
                Some(())
            }
            ".else" => {
                match self.cond_stack.last_mut() {
                    Some(frame) => {
                        frame.active = frame.parent_active && !frame.taken;
                        frame.taken = true;
                    }
                    None => {
                        self.log
                            .error(line_no, AsmErrorKind::Directive, ".else without .if", None);
                    }
                }
                Some(())
            }
            ".endif" => {
                if self.cond_stack.pop().is_none() {
                    self.log
                        .error(line_no, AsmErrorKind::Directive, ".endif without .if", None);
                }
                Some(())
            }
            _ => None,
        }
    }

    fn eval_condition(&mut self, args: &str, line_no: u32) -> bool {
        let ctx = EngineEvalCtx {
            symbols: &self.symbols,
            address: self.address as i64,
        };
        match eval_comparison(args, &ctx) {
            Ok(value) => value != 0,
            Err(message) => {
                self.log
                    .error(line_no, AsmErrorKind::Expression, &message, None);
                false
            }
        }
    }

    fn define_label(&mut self, label: &str, line_no: u32) {
        let name = label.trim_end_matches(':');
        if self.symbols.contains_key(name) {
            self.log.error(
                line_no,
                AsmErrorKind::Symbol,
                "Symbol already defined",
                Some(name),
            );
            return;
        }
        self.symbols.insert(name.to_string(), self.address as i64);
    }

    fn directive(&mut self, body: &str, raw: &str, line_no: u32) {
        let (name, args) = split_directive(body);
        match name.as_str() {
            ".asg" => {
                let parts = split_operands(args);
                if parts.len() != 2 {
                    self.log.error(
                        line_no,
                        AsmErrorKind::Directive,
                        ".asg expects a value and a symbol name",
                        None,
                    );
                    return;
                }
                let value = unquote(parts[0].trim());
                self.subsym.define(parts[1].trim(), &value);
            }
            ".eval" => {
                let parts = split_operands(args);
                if parts.len() != 2 {
                    self.log.error(
                        line_no,
                        AsmErrorKind::Directive,
                        ".eval expects an expression and a symbol name",
                        None,
                    );
                    return;
                }
                let ctx = EngineEvalCtx {
                    symbols: &self.symbols,
                    address: self.address as i64,
                };
                match parse_expr(parts[0].trim(), &ctx) {
                    Ok(ExprValue::Const(v)) => {
                        self.subsym.define(parts[1].trim(), &v.to_string());
                    }
                    Ok(ExprValue::Symbolic { .. }) => {
                        self.log.error(
                            line_no,
                            AsmErrorKind::Expression,
                            ".eval requires a constant expression",
                            None,
                        );
                    }
                    Err(e) => {
                        self.log
                            .error(line_no, AsmErrorKind::Expression, &e.message, None);
                    }
                }
            }
            ".newblock" => self.subsym.clear_local_labels(),
            ".far_mode" => self.far_mode = true,
            ".near_mode" => self.far_mode = false,
            ".org" => {
                let ctx = EngineEvalCtx {
                    symbols: &self.symbols,
                    address: self.address as i64,
                };
                match parse_expr(args.trim(), &ctx) {
                    Ok(ExprValue::Const(v)) if v >= self.address as i64 => {
                        while (self.address as i64) < v {
                            self.words.push(0);
                            self.address += 1;
                        }
                    }
                    Ok(_) => {
                        self.log.error(
                            line_no,
                            AsmErrorKind::Directive,
                            ".org target must be a constant at or after the current address",
                            None,
                        );
                    }
                    Err(e) => {
                        self.log
                            .error(line_no, AsmErrorKind::Expression, &e.message, None);
                    }
                }
            }
            ".word" | ".int" => {
                let start = self.address;
                let mut emitted = Vec::new();
                for part in split_operands(args) {
                    let ctx = EngineEvalCtx {
                        symbols: &self.symbols,
                        address: self.address as i64,
                    };
                    match parse_expr(part.trim(), &ctx) {
                        Ok(ExprValue::Const(v)) if (-32768..=65535).contains(&v) => {
                            emitted.push(v as u16);
                            self.words.push(v as u16);
                            self.address += 1;
                        }
                        Ok(ExprValue::Const(v)) => {
                            self.log.error(
                                line_no,
                                AsmErrorKind::Expression,
                                "Word value out of range",
                                Some(&v.to_string()),
                            );
                        }
                        Ok(ExprValue::Symbolic { name, offset }) => {
                            self.relocs.push(PendingFixup {
                                line: line_no,
                                index: self.words.len(),
                                fixup: Fixup {
                                    word: 0,
                                    reloc: encoder::RelocKind::Word16,
                                    symbol: name,
                                    addend: offset,
                                },
                            });
                            emitted.push(0);
                            self.words.push(0);
                            self.address += 1;
                        }
                        Err(e) => {
                            self.log
                                .error(line_no, AsmErrorKind::Expression, &e.message, None);
                        }
                    }
                }
                self.listing.push(ListingLine {
                    line: line_no,
                    address: start,
                    words: emitted,
                    source: raw.to_string(),
                });
            }
            ".end" => self.ended = true,
            _ => {
                self.log.error(
                    line_no,
                    AsmErrorKind::Directive,
                    "Unknown directive",
                    Some(&name),
                );
            }
        }
    }

    fn instruction(&mut self, body: &str, raw: &str, line_no: u32) {
        // A pending first half waits for its `||` partner.
        if let Some(pending) = self.pending_parallel.take() {
            let Some(second) = body.strip_prefix("||") else {
                self.log.error(
                    line_no,
                    AsmErrorKind::Instruction,
                    "Expected second half of parallel instruction",
                    None,
                );
                return;
            };
            let (parname, paroperands) = parse_insn_text(second);
            self.finish_parallel(pending, &parname, &paroperands, raw, line_no);
            return;
        }

        if let Some(split) = find_parallel_bar(body) {
            let (first, second) = (body[..split].trim(), body[split + 2..].trim());
            let (mnemonic, operands) = parse_insn_text(first);
            if second.is_empty() {
                self.pending_parallel = Some(PartialPair { mnemonic, operands });
                return;
            }
            let (parname, paroperands) = parse_insn_text(second);
            self.finish_parallel(
                PartialPair { mnemonic, operands },
                &parname,
                &paroperands,
                raw,
                line_no,
            );
            return;
        }

        let (mut mnemonic, operands) = parse_insn_text(body);
        if self.far_mode {
            mnemonic = remap_far(&mnemonic);
        }

        // The peephole rewrite only applies once the original operand list
        // has matched; the shortened list is then matched again.
        let matched = {
            let ctx = EngineEvalCtx {
                symbols: &self.symbols,
                address: self.address as i64,
            };
            match_serial(&mnemonic, &operands, &ctx).map(|insn| {
                let Some(rewrite) = optimizer::optimize(&mnemonic, &operands) else {
                    return insn;
                };
                match match_serial(&mnemonic, &rewrite.operands, &ctx) {
                    Ok(mut shorter) => {
                        shorter.using_default_dst = rewrite.using_default_dst;
                        shorter
                    }
                    Err(_) => insn,
                }
            })
        };
        match matched {
            Ok(insn) => self.commit_insn(insn, raw, line_no),
            Err(e) => {
                self.log
                    .error(line_no, AsmErrorKind::Instruction, &e.to_string(), None);
            }
        }
    }

    fn finish_parallel(
        &mut self,
        first: PartialPair,
        parname: &str,
        paroperands: &[Operand],
        raw: &str,
        line_no: u32,
    ) {
        let matched = {
            let ctx = EngineEvalCtx {
                symbols: &self.symbols,
                address: self.address as i64,
            };
            match_parallel(&first.mnemonic, &first.operands, parname, paroperands, &ctx)
        };
        match matched {
            Ok(insn) => self.commit_insn(insn, raw, line_no),
            Err(e) => {
                self.log
                    .error(line_no, AsmErrorKind::Instruction, &e.to_string(), None);
            }
        }
    }

    fn commit_insn(&mut self, insn: MatchedInsn, raw: &str, line_no: u32) {
        let tpl = insn.template;
        if tpl.flags & FL_FAR != 0 && !self.cpu.supports_extended_addressing() {
            self.log.error(
                line_no,
                AsmErrorKind::Instruction,
                "Extended addressing is not supported on this CPU",
                Some(tpl.mnemonic),
            );
            return;
        }

        for hazard in self.hazards.check(
            tpl.mnemonic,
            tpl.flags,
            insn.word_count(),
            insn.uses_lk_addressing(),
        ) {
            match hazard {
                Hazard::Error(message) => {
                    self.log
                        .error(line_no, AsmErrorKind::Instruction, &message, None);
                }
                Hazard::Warning(message) => {
                    self.log
                        .warning(line_no, AsmErrorKind::Instruction, &message, None);
                }
            }
        }

        let encoded = {
            let ctx = EngineEvalCtx {
                symbols: &self.symbols,
                address: self.address as i64,
            };
            encoder::encode(&insn, &ctx)
        };
        match encoded {
            Ok(enc) => {
                for warning in &enc.warnings {
                    self.log
                        .warning(line_no, AsmErrorKind::Instruction, warning, None);
                }
                let base = self.words.len();
                for fixup in enc.fixups {
                    self.relocs.push(PendingFixup {
                        line: line_no,
                        index: base + fixup.word,
                        fixup,
                    });
                }
                self.listing.push(ListingLine {
                    line: line_no,
                    address: self.address,
                    words: enc.words.clone(),
                    source: raw.to_string(),
                });
                self.address += enc.words.len() as u32;
                self.words.extend(enc.words);
            }
            Err(e) => {
                self.log
                    .error(line_no, AsmErrorKind::Instruction, &e.message, None);
            }
        }
    }

    /// Resolve deferred fixups and flag leftover state.
    pub fn finalize(&mut self) {
        if self.pending_parallel.take().is_some() {
            self.log.error(
                0,
                AsmErrorKind::Instruction,
                "Unfinished parallel instruction at end of input",
                None,
            );
        }
        if !self.cond_stack.is_empty() {
            self.cond_stack.clear();
            self.log
                .error(0, AsmErrorKind::Directive, "Unterminated .if block", None);
        }
        let relocs = std::mem::take(&mut self.relocs);
        for pending in relocs {
            match self.symbols.get(&pending.fixup.symbol) {
                Some(&value) => {
                    let fixup = Fixup {
                        word: pending.index,
                        ..pending.fixup
                    };
                    if let Err(e) = apply_fixup(&mut self.words, &fixup, value) {
                        self.log
                            .error(pending.line, AsmErrorKind::Expression, &e.message, None);
                    }
                }
                None => {
                    self.log.error(
                        pending.line,
                        AsmErrorKind::Symbol,
                        "Undefined symbol",
                        Some(&pending.fixup.symbol),
                    );
                }
            }
        }
    }
}

/// Strip a `;` comment (quote aware) and a `*` comment in column one.
fn strip_comment(raw: &str) -> String {
    if raw.starts_with('*') {
        return String::new();
    }
    let mut out = String::new();
    let mut in_quote = false;
    for c in raw.chars() {
        match c {
            '"' => in_quote = !in_quote,
            ';' if !in_quote => break,
            _ => {}
        }
        out.push(c);
    }
    out
}

/// A label starts in column one; mnemonics and directives are indented.
fn split_label(text: &str) -> (Option<String>, &str) {
    let Some(first) = text.chars().next() else {
        return (None, text);
    };
    if first.is_whitespace() || first == '.' || first == '|' {
        return (None, text);
    }
    match text.find(|c: char| c.is_whitespace()) {
        Some(end) => (Some(text[..end].to_string()), &text[end..]),
        None => (Some(text.to_string()), ""),
    }
}

fn split_directive(body: &str) -> (String, &str) {
    match body.find(|c: char| c.is_whitespace()) {
        Some(end) => (body[..end].to_ascii_lowercase(), body[end..].trim()),
        None => (body.to_ascii_lowercase(), ""),
    }
}

fn parse_insn_text(text: &str) -> (String, Vec<Operand>) {
    let text = text.trim();
    match text.find(|c: char| c.is_whitespace()) {
        Some(end) => {
            let mnemonic = text[..end].to_string();
            let operands = split_operands(text[end..].trim())
                .into_iter()
                .map(Operand::new)
                .collect();
            (mnemonic, operands)
        }
        None => (text.to_string(), Vec::new()),
    }
}

/// Split an operand list on top-level commas, respecting quotes and parens.
fn split_operands(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    for c in text.chars() {
        match c {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth = depth.saturating_sub(1),
            ',' if !in_quote && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current.trim().to_string());
    parts
}

fn find_parallel_bar(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut in_quote = false;
    for i in 0..bytes.len().saturating_sub(1) {
        match bytes[i] {
            b'"' => in_quote = !in_quote,
            b'|' if !in_quote && bytes[i + 1] == b'|' => return Some(i),
            _ => {}
        }
    }
    None
}

fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

fn remap_far(mnemonic: &str) -> String {
    match mnemonic.to_ascii_lowercase().as_str() {
        "b" => "fb".to_string(),
        "bd" => "fbd".to_string(),
        "call" => "fcall".to_string(),
        "calld" => "fcalld".to_string(),
        _ => mnemonic.to_string(),
    }
}

/// `.if` arguments allow comparison operators on top of ordinary
/// expressions.
fn eval_comparison(text: &str, ctx: &dyn EvalContext) -> Result<i64, String> {
    for (op, idx) in find_comparison(text) {
        let (lhs, rhs) = (&text[..idx], &text[idx + op.len()..]);
        let l = require_const(lhs, ctx)?;
        let r = require_const(rhs, ctx)?;
        let value = match op {
            "==" => l == r,
            "!=" => l != r,
            "<=" => l <= r,
            ">=" => l >= r,
            "<" => l < r,
            ">" => l > r,
            _ => unreachable!(),
        };
        return Ok(i64::from(value));
    }
    require_const(text, ctx)
}

fn require_const(text: &str, ctx: &dyn EvalContext) -> Result<i64, String> {
    match parse_expr(text.trim(), ctx) {
        Ok(ExprValue::Const(v)) => Ok(v),
        Ok(ExprValue::Symbolic { name, .. }) => {
            Err(format!("Undefined symbol in conditional: {name}"))
        }
        Err(e) => Err(e.message),
    }
}

fn find_comparison(text: &str) -> Option<(&'static str, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        let op = match &text[i..i + 2] {
            "==" => Some("=="),
            "!=" => Some("!="),
            "<=" => Some("<="),
            ">=" => Some(">="),
            // Shift operators belong to the expression.
            "<<" | ">>" => {
                i += 2;
                continue;
            }
            _ if bytes[i] == b'<' => Some("<"),
            _ if bytes[i] == b'>' => Some(">"),
            _ => None,
        };
        if let Some(op) = op {
            return Some((op, i));
        }
        i += 1;
    }
    None
}
