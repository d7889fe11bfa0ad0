// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! TMS320C54x family backend: operand classification, the instruction
//! template table, template matching, the peephole optimizer, operand
//! encoding, and pipeline hazard checks.

pub mod encoder;
pub mod hazards;
pub mod matcher;
pub mod operand;
pub mod optimizer;
pub mod table;

/// Supported CPU revisions. Extended (far) addressing needs the '548 core
/// or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CpuVersion {
    C541,
    C542,
    C543,
    C545,
    C546,
    C548,
    C549,
}

impl CpuVersion {
    pub fn supports_extended_addressing(self) -> bool {
        self >= Self::C548
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "541" | "c541" => Some(Self::C541),
            "542" | "c542" => Some(Self::C542),
            "543" | "c543" => Some(Self::C543),
            "545" | "c545" => Some(Self::C545),
            "546" | "c546" => Some(Self::C546),
            "548" | "c548" => Some(Self::C548),
            "549" | "c549" => Some(Self::C549),
            _ => None,
        }
    }
}

impl Default for CpuVersion {
    fn default() -> Self {
        Self::C542
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_addressing_starts_at_the_548() {
        assert!(!CpuVersion::C545.supports_extended_addressing());
        assert!(CpuVersion::C548.supports_extended_addressing());
        assert!(CpuVersion::C549.supports_extended_addressing());
    }

    #[test]
    fn cpu_names_parse_with_or_without_prefix() {
        assert_eq!(CpuVersion::parse("549"), Some(CpuVersion::C549));
        assert_eq!(CpuVersion::parse("C548"), Some(CpuVersion::C548));
        assert_eq!(CpuVersion::parse("c99"), None);
    }
}
