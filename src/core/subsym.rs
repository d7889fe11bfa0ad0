// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Substitution-symbol preprocessor: recursive textual replacement, built-in
// string/math functions, and local-label mangling. Runs on every physical
// line before any instruction parsing.

use std::collections::{HashMap, HashSet};

#[path = "subsym_builtins.rs"]
mod subsym_builtins;
use subsym_builtins::{eval_math_builtin, eval_string_builtin, is_math_builtin, is_string_builtin};

/// Warning raised during substitution; substitution itself never hard-fails,
/// the offending token is left as literal text instead.
#[derive(Debug, Clone)]
pub struct SubsymWarning {
    pub message: String,
}

impl SubsymWarning {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Queries the preprocessor needs from the surrounding assembler.
pub trait SubsymContext {
    /// Whether `name` is a defined assembler symbol (label or constant).
    fn is_defined_symbol(&self, name: &str) -> bool;

    /// Whether `name` spells a machine register.
    fn is_register(&self, name: &str) -> bool;
}

/// Substitution-symbol and local-label tables, one level per macro nesting
/// depth. Level 0 is file scope and always present.
pub struct SubsymTable {
    scopes: Vec<HashMap<String, String>>,
    local_labels: Vec<HashMap<String, String>>,
    label_seq: u32,
}

impl Default for SubsymTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SubsymTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            local_labels: vec![HashMap::new()],
            label_seq: 0,
        }
    }

    /// Enter a macro level. Fresh substitution and local-label maps.
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
        self.local_labels.push(HashMap::new());
    }

    /// Leave a macro level, invalidating its bindings and local labels.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
            self.local_labels.pop();
        }
    }

    /// Bind `name` in the innermost scope (`.asg`, `.eval`).
    pub fn define(&mut self, name: &str, text: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), text.to_string());
        }
    }

    /// Bind `name` at file scope (CLI `-D`).
    pub fn define_at_base(&mut self, name: &str, text: &str) {
        self.scopes[0].insert(name.to_string(), text.to_string());
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).map(String::as_str))
    }

    /// `.newblock` and section changes reset the current local-label table.
    pub fn clear_local_labels(&mut self) {
        if let Some(labels) = self.local_labels.last_mut() {
            labels.clear();
        }
    }

    /// Resolve one local-label spelling to its generated name, creating the
    /// mapping on first use within the current macro level.
    pub fn local_label(&mut self, spelling: &str) -> String {
        let level = self.local_labels.len() - 1;
        if let Some(existing) = self.local_labels[level].get(spelling) {
            return existing.clone();
        }
        self.label_seq += 1;
        let generated = format!("LL{}", self.label_seq);
        self.local_labels[level].insert(spelling.to_string(), generated.clone());
        generated
    }

    /// Rewrite one source line: legacy text-compatibility fixes, then
    /// substitution-symbol expansion, built-in functions, and local labels.
    /// `forced` additionally recognizes colon-delimited `:name:` references.
    pub fn substitute(
        &mut self,
        line: &str,
        forced: bool,
        ctx: &dyn SubsymContext,
    ) -> (String, Vec<SubsymWarning>) {
        let mut warnings = Vec::new();
        let line = apply_legacy_rewrites(line);
        let mut visited = HashSet::new();
        let out = self.substitute_inner(&line, forced, ctx, &mut visited, &mut warnings);
        (out, warnings)
    }

    fn substitute_inner(
        &mut self,
        line: &str,
        forced: bool,
        ctx: &dyn SubsymContext,
        visited: &mut HashSet<String>,
        warnings: &mut Vec<SubsymWarning>,
    ) -> String {
        let mut out = String::new();
        let bytes = line.as_bytes();
        let mut i = 0usize;
        let mut in_quote = false;
        while i < bytes.len() {
            let c = bytes[i];
            if c == b'"' {
                in_quote = !in_quote;
                out.push('"');
                i += 1;
                continue;
            }
            if in_quote {
                push_char(&mut out, line, &mut i);
                continue;
            }
            // Local label of the "$<digit>" shape.
            if c == b'$'
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
                && bytes.get(i + 2).is_none_or(|b| !is_ident_char(*b))
            {
                let spelling = &line[i..i + 2];
                out.push_str(&self.local_label(spelling));
                i += 2;
                continue;
            }
            // Built-in function: $name( ... ).
            if c == b'$' && bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) {
                let mut j = i + 1;
                while j < bytes.len() && is_ident_char(bytes[j]) {
                    j += 1;
                }
                let name = &line[i..j];
                if bytes.get(j) == Some(&b'(')
                    && (is_string_builtin(name) || is_math_builtin(name))
                {
                    match extract_paren_list(line, j) {
                        Ok((inner, next)) => {
                            // String builtins receive raw symbol names so
                            // they can look up or rebind them; math builtins
                            // get fully substituted text.
                            let result = if is_string_builtin(name) {
                                let args: Vec<String> = split_args(&inner)
                                    .iter()
                                    .map(|arg| arg.trim().to_string())
                                    .collect();
                                eval_string_builtin(self, ctx, name, &args)
                            } else {
                                let args: Vec<String> = split_args(&inner)
                                    .iter()
                                    .map(|arg| {
                                        self.substitute_inner(
                                            arg.trim(),
                                            forced,
                                            ctx,
                                            visited,
                                            warnings,
                                        )
                                    })
                                    .collect();
                                eval_math_builtin(name, &args)
                            };
                            match result {
                                Ok(text) => out.push_str(&text),
                                Err(message) => {
                                    warnings.push(SubsymWarning::new(message));
                                    out.push_str(&line[i..next]);
                                }
                            }
                            i = next;
                            continue;
                        }
                        Err(message) => {
                            warnings.push(SubsymWarning::new(message));
                        }
                    }
                }
                out.push_str(name);
                i = j;
                continue;
            }
            // Forced reference: ":name:".
            if forced && c == b':' {
                if let Some((name, next)) = read_forced_name(line, i) {
                    if let Some(replacement) = self.lookup(name).map(str::to_string) {
                        let expanded =
                            self.expand_guarded(name, &replacement, forced, ctx, visited, warnings);
                        out.push_str(&expanded);
                        i = next;
                        continue;
                    }
                }
                out.push(':');
                i += 1;
                continue;
            }
            if is_ident_start(c) {
                let mut j = i + 1;
                while j < bytes.len() && is_ident_char(bytes[j]) {
                    j += 1;
                }
                // Local label of the "name?" shape.
                if bytes.get(j) == Some(&b'?') {
                    let spelling = &line[i..j + 1];
                    out.push_str(&self.local_label(spelling));
                    i = j + 1;
                    continue;
                }
                let name = &line[i..j];
                if let Some(replacement) = self.lookup(name).map(str::to_string) {
                    let expanded =
                        self.expand_guarded(name, &replacement, forced, ctx, visited, warnings);
                    out.push_str(&expanded);
                } else {
                    out.push_str(name);
                }
                i = j;
                continue;
            }
            push_char(&mut out, line, &mut i);
        }
        out
    }

    fn expand_guarded(
        &mut self,
        name: &str,
        replacement: &str,
        forced: bool,
        ctx: &dyn SubsymContext,
        visited: &mut HashSet<String>,
        warnings: &mut Vec<SubsymWarning>,
    ) -> String {
        if visited.contains(name) {
            warnings.push(SubsymWarning::new(format!(
                "Infinite recursion in substitution symbol: {name}"
            )));
            return name.to_string();
        }
        visited.insert(name.to_string());
        let expanded = self.substitute_inner(replacement, forced, ctx, visited, warnings);
        visited.remove(name);
        expanded
    }
}

// Copies the whole character at byte offset `i`, keeping multi-byte UTF-8
// sequences intact.
fn push_char(out: &mut String, line: &str, i: &mut usize) {
    if let Some(ch) = line[*i..].chars().next() {
        out.push(ch);
        *i += ch.len_utf8();
    } else {
        *i += 1;
    }
}

/// Legacy rewrites on conditional-directive lines: a bare `=` becomes `==`,
/// and a triple-quote sequence becomes quote+escape form.
fn apply_legacy_rewrites(line: &str) -> String {
    let lower = line.to_ascii_lowercase();
    if !lower.contains(".if") && !lower.contains(".elseif") && !lower.contains(".break") {
        return line.to_string();
    }
    let rewritten = line.replace("\"\"\"", "\"\\\"");
    let chars: Vec<char> = rewritten.chars().collect();
    let mut out = String::with_capacity(rewritten.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '=' {
            let prev = (i > 0).then(|| chars[i - 1]);
            let next = chars.get(i + 1).copied();
            let part_of_operator =
                matches!(prev, Some('=' | '!' | '<' | '>')) || next == Some('=');
            if part_of_operator {
                out.push('=');
            } else {
                out.push_str("==");
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn read_forced_name(line: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = line.as_bytes();
    let name_start = start + 1;
    if !bytes.get(name_start).is_some_and(|b| is_ident_start(*b)) {
        return None;
    }
    let mut j = name_start + 1;
    while j < bytes.len() && is_ident_char(bytes[j]) {
        j += 1;
    }
    if bytes.get(j) == Some(&b':') {
        Some((&line[name_start..j], j + 1))
    } else {
        None
    }
}

fn extract_paren_list(code: &str, start: usize) -> Result<(String, usize), String> {
    let bytes = code.as_bytes();
    if bytes.get(start) != Some(&b'(') {
        return Err("Expected '(' to start argument list".to_string());
    }
    let mut i = start + 1;
    let mut depth = 1usize;
    let mut in_quote = false;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'"' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => {
                depth -= 1;
                if depth == 0 {
                    return Ok((code[start + 1..i].to_string(), i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err("Unterminated argument list".to_string())
}

fn split_args(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    for c in text.chars() {
        match c {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth = depth.saturating_sub(1),
            ',' if !in_quote && depth == 0 => {
                out.push(current.clone());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    out.push(current);
    out
}

pub(crate) fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

pub(crate) fn is_ident_char(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}
