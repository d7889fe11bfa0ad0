// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Target-independent assembler core: diagnostics, operand expressions,
//! and the substitution-symbol preprocessor.

pub mod error;
pub mod expr;
pub mod subsym;
