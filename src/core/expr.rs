// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand expression evaluation.
//!
//! Operand text evaluates to either a compile-time constant or a symbolic
//! value with an additive offset. Symbols that are not yet defined stay
//! symbolic so the encoder can record a deferred relocation for them.

use std::collections::HashMap;

/// Error returned from expression evaluation.
#[derive(Debug, Clone)]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

/// A parsed operand expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprValue {
    Const(i64),
    Symbolic { name: String, offset: i64 },
}

impl ExprValue {
    pub fn as_const(&self) -> Option<i64> {
        match self {
            Self::Const(v) => Some(*v),
            Self::Symbolic { .. } => None,
        }
    }
}

/// Context for expression evaluation.
pub trait EvalContext {
    /// Look up a symbol's value by name.
    fn lookup_symbol(&self, name: &str) -> Option<i64>;

    /// Get the current address (`$`).
    fn current_address(&self) -> Option<i64>;
}

/// Evaluation context backed by a plain symbol map, used by directives and
/// tests that have no assembler state.
#[derive(Debug, Default)]
pub struct MapContext {
    pub symbols: HashMap<String, i64>,
    pub address: Option<i64>,
}

impl EvalContext for MapContext {
    fn lookup_symbol(&self, name: &str) -> Option<i64> {
        self.symbols.get(name).copied()
    }

    fn current_address(&self) -> Option<i64> {
        self.address
    }
}

/// Parse a standalone number literal: decimal, `0x` prefix, or the DSP
/// assembler suffix forms `NNNNh` (hex) and `NNNNb` (binary).
pub fn parse_number(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(hex) = text
        .strip_suffix('h')
        .or_else(|| text.strip_suffix('H'))
        .filter(|body| !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = text
        .strip_suffix('b')
        .or_else(|| text.strip_suffix('B'))
        .filter(|body| !body.is_empty() && body.chars().all(|c| c == '0' || c == '1'))
    {
        return i64::from_str_radix(bin, 2).ok();
    }
    text.parse::<i64>().ok()
}

/// Evaluate operand text to a constant or a symbol plus additive offset.
pub fn parse_expr(text: &str, ctx: &dyn EvalContext) -> Result<ExprValue, EvalError> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        pos: 0,
        text,
        ctx,
    };
    parser.skip_ws();
    let value = parser.additive()?;
    parser.skip_ws();
    if parser.pos != parser.bytes.len() {
        return Err(EvalError::new(format!(
            "Trailing characters in expression: {}",
            &text[parser.pos..]
        )));
    }
    Ok(value)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    text: &'a str,
    ctx: &'a dyn EvalContext,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn additive(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.multiplicative()?;
        loop {
            self.skip_ws();
            let op = match self.peek() {
                Some(b'+') => b'+',
                Some(b'-') => b'-',
                _ => break,
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = apply_additive(left, op, right)?;
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.unary()?;
        loop {
            self.skip_ws();
            let op = match self.peek() {
                Some(b'*') => "*",
                Some(b'/') => "/",
                Some(b'%') => "%",
                Some(b'&') => "&",
                Some(b'|') => "|",
                Some(b'^') => "^",
                Some(b'<') if self.bytes.get(self.pos + 1) == Some(&b'<') => "<<",
                Some(b'>') if self.bytes.get(self.pos + 1) == Some(&b'>') => ">>",
                _ => break,
            };
            self.pos += op.len();
            let right = self.unary()?;
            let (l, r) = (require_const(&left)?, require_const(&right)?);
            left = ExprValue::Const(apply_binary(op, l, r)?);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<ExprValue, EvalError> {
        self.skip_ws();
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                let inner = self.unary()?;
                Ok(ExprValue::Const(
                    require_const(&inner)?.wrapping_neg(),
                ))
            }
            Some(b'+') => {
                self.pos += 1;
                self.unary()
            }
            Some(b'~') => {
                self.pos += 1;
                let inner = self.unary()?;
                Ok(ExprValue::Const(!require_const(&inner)?))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<ExprValue, EvalError> {
        self.skip_ws();
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.additive()?;
                self.skip_ws();
                if self.peek() != Some(b')') {
                    return Err(EvalError::new("Missing ')' in expression"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(b'$')
                if self
                    .bytes
                    .get(self.pos + 1)
                    .is_none_or(|b| !b.is_ascii_alphanumeric()) =>
            {
                self.pos += 1;
                self.ctx
                    .current_address()
                    .map(ExprValue::Const)
                    .ok_or_else(|| EvalError::new("Current address ($) not available"))
            }
            Some(c) if c.is_ascii_digit() => self.number(),
            Some(c) if c == b'_' || c.is_ascii_alphabetic() => self.identifier(),
            Some(c) => Err(EvalError::new(format!(
                "Unexpected character in expression: {}",
                c as char
            ))),
            None => Err(EvalError::new("Empty expression")),
        }
    }

    fn number(&mut self) -> Result<ExprValue, EvalError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        let token = &self.text[start..self.pos];
        parse_number(token)
            .map(ExprValue::Const)
            .ok_or_else(|| EvalError::new(format!("Invalid number: {token}")))
    }

    fn identifier(&mut self) -> Result<ExprValue, EvalError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.')
        {
            self.pos += 1;
        }
        let name = &self.text[start..self.pos];
        match self.ctx.lookup_symbol(name) {
            Some(value) => Ok(ExprValue::Const(value)),
            None => Ok(ExprValue::Symbolic {
                name: name.to_string(),
                offset: 0,
            }),
        }
    }
}

fn require_const(value: &ExprValue) -> Result<i64, EvalError> {
    value
        .as_const()
        .ok_or_else(|| EvalError::new("Undefined symbol used outside an additive expression"))
}

fn apply_additive(left: ExprValue, op: u8, right: ExprValue) -> Result<ExprValue, EvalError> {
    match (left, op, right) {
        (ExprValue::Const(l), b'+', ExprValue::Const(r)) => Ok(ExprValue::Const(l.wrapping_add(r))),
        (ExprValue::Const(l), b'-', ExprValue::Const(r)) => Ok(ExprValue::Const(l.wrapping_sub(r))),
        (ExprValue::Symbolic { name, offset }, b'+', ExprValue::Const(r)) => {
            Ok(ExprValue::Symbolic {
                name,
                offset: offset.wrapping_add(r),
            })
        }
        (ExprValue::Symbolic { name, offset }, b'-', ExprValue::Const(r)) => {
            Ok(ExprValue::Symbolic {
                name,
                offset: offset.wrapping_sub(r),
            })
        }
        (ExprValue::Const(l), b'+', ExprValue::Symbolic { name, offset }) => {
            Ok(ExprValue::Symbolic {
                name,
                offset: offset.wrapping_add(l),
            })
        }
        _ => Err(EvalError::new(
            "Undefined symbol used outside an additive expression",
        )),
    }
}

fn apply_binary(op: &str, l: i64, r: i64) -> Result<i64, EvalError> {
    match op {
        "*" => Ok(l.wrapping_mul(r)),
        "/" => {
            if r == 0 {
                Err(EvalError::new("Division by zero"))
            } else {
                Ok(l.wrapping_div(r))
            }
        }
        "%" => {
            if r == 0 {
                Err(EvalError::new("Division by zero"))
            } else {
                Ok(l.wrapping_rem(r))
            }
        }
        "&" => Ok(l & r),
        "|" => Ok(l | r),
        "^" => Ok(l ^ r),
        "<<" => Ok(l.wrapping_shl(r as u32)),
        ">>" => Ok(l.wrapping_shr(r as u32)),
        _ => Err(EvalError::new(format!("Unknown operator: {op}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(symbols: &[(&str, i64)]) -> MapContext {
        MapContext {
            symbols: symbols
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
            address: Some(0x100),
        }
    }

    #[test]
    fn parses_suffix_and_prefix_radix_forms() {
        assert_eq!(parse_number("1234"), Some(1234));
        assert_eq!(parse_number("0x7f"), Some(0x7f));
        assert_eq!(parse_number("0FFh"), Some(0xff));
        assert_eq!(parse_number("1010b"), Some(0b1010));
        assert_eq!(parse_number("zzzh"), None);
    }

    #[test]
    fn evaluates_constant_arithmetic() {
        let ctx = ctx_with(&[]);
        assert_eq!(
            parse_expr("2+3*4", &ctx).expect("eval"),
            ExprValue::Const(14)
        );
        assert_eq!(
            parse_expr("(1<<4)|3", &ctx).expect("eval"),
            ExprValue::Const(0x13)
        );
        assert_eq!(
            parse_expr("-16", &ctx).expect("eval"),
            ExprValue::Const(-16)
        );
    }

    #[test]
    fn defined_symbols_resolve_to_constants() {
        let ctx = ctx_with(&[("table", 0x80)]);
        assert_eq!(
            parse_expr("table+4", &ctx).expect("eval"),
            ExprValue::Const(0x84)
        );
    }

    #[test]
    fn undefined_symbols_stay_symbolic_with_offset() {
        let ctx = ctx_with(&[]);
        assert_eq!(
            parse_expr("loop+2", &ctx).expect("eval"),
            ExprValue::Symbolic {
                name: "loop".to_string(),
                offset: 2
            }
        );
        assert_eq!(
            parse_expr("4+loop", &ctx).expect("eval"),
            ExprValue::Symbolic {
                name: "loop".to_string(),
                offset: 4
            }
        );
    }

    #[test]
    fn undefined_symbol_in_multiplicative_position_is_an_error() {
        let ctx = ctx_with(&[]);
        assert!(parse_expr("loop*2", &ctx).is_err());
    }

    #[test]
    fn dollar_evaluates_to_current_address() {
        let ctx = ctx_with(&[]);
        assert_eq!(
            parse_expr("$+1", &ctx).expect("eval"),
            ExprValue::Const(0x101)
        );
    }
}
