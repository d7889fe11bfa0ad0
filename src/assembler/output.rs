// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Object and listing output.
//!
//! The object file is the raw word image, each 16-bit word little-endian,
//! in program order. Extended-address instructions already place the high
//! word before the low word, so the four-octet unit needs no special
//! handling here.

use std::fs;
use std::io;
use std::path::Path;

/// One line of the assembly listing.
#[derive(Debug, Clone)]
pub struct ListingLine {
    pub line: u32,
    pub address: u32,
    pub words: Vec<u16>,
    pub source: String,
}

pub fn object_bytes(words: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 2);
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

pub fn write_object(path: &Path, words: &[u16]) -> io::Result<()> {
    fs::write(path, object_bytes(words))
}

pub fn render_listing(lines: &[ListingLine]) -> String {
    let mut out = String::new();
    for entry in lines {
        let words = entry
            .words
            .iter()
            .map(|w| format!("{w:04X}"))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!(
            "{:5} {:04X}  {:<14}  {}\n",
            entry.line, entry.address, words, entry.source
        ));
    }
    out
}

pub fn write_listing(path: &Path, lines: &[ListingLine]) -> io::Result<()> {
    fs::write(path, render_listing(lines))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_written_little_endian() {
        assert_eq!(
            object_bytes(&[0xF000, 0x0001]),
            vec![0x00, 0xF0, 0x01, 0x00]
        );
    }

    #[test]
    fn listing_shows_address_words_and_source() {
        let lines = [ListingLine {
            line: 3,
            address: 0x20,
            words: vec![0xF000, 0x0001],
            source: "add #1, a".to_string(),
        }];
        let text = render_listing(&lines);
        assert!(text.contains("0020"));
        assert!(text.contains("F000 0001"));
        assert!(text.contains("add #1, a"));
    }
}
