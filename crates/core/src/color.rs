// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic per-label ANSI256 color assignment for log prefixing.
//!
//! Colors are assigned by hashing the label and indexing a fixed palette,
//! so the same label always gets the same color across runs (useful when
//! comparing two separate supervisor invocations side by side).

use std::hash::{Hash, Hasher};

/// 76 readable foreground colors from the ANSI256 cube, avoiding the
/// near-black/near-white ends and the standard 16 colors (which a
/// terminal theme might have remapped to something illegible).
const PALETTE: [u8; 76] = [
    30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 58, 59, 60, 61, 62, 63, 64, 65,
    66, 67, 68, 69, 70, 71, 72, 73, 74, 75, 76, 77, 78, 79, 80, 81, 82, 83, 84, 85, 86, 87, 88, 89,
    90, 91, 92, 93, 94, 95, 96, 97, 98, 99, 100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110,
    125, 126, 127, 128, 129, 130, 131,
];

/// Assign a stable ANSI256 color code to a label.
pub fn assign_color(label: &str) -> u8 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    label.hash(&mut hasher);
    let index = (hasher.finish() as usize) % PALETTE.len();
    PALETTE[index]
}

/// Wrap `text` in the ANSI256 foreground escape for `code`, with a trailing reset.
pub fn colorize(code: u8, text: &str) -> String {
    format!("\x1b[38;5;{code}m{text}\x1b[0m")
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
