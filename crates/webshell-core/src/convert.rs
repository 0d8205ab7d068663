// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Argument conventions shared with hosted content.
//
// Everything crossing the callable boundary is a string, so flags and colors
// follow fixed textual rules that existing pages already rely on.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShellError};

/// Textual flag rule for callable arguments.
///
/// Falsy: empty, `0`, `false`, `no` (any case). Everything else is truthy.
pub fn is_truthy(text: &str) -> bool {
    !(text.is_empty()
        || text.eq_ignore_ascii_case("0")
        || text.eq_ignore_ascii_case("false")
        || text.eq_ignore_ascii_case("no"))
}

/// Stricter flag rule used by the quick configuration import: only `1`,
/// `true` and `yes` (any case) are set.
pub fn is_affirmative(text: &str) -> bool {
    text.eq_ignore_ascii_case("1")
        || text.eq_ignore_ascii_case("true")
        || text.eq_ignore_ascii_case("yes")
}

/// Drop every character outside the ASCII range.
pub fn strip_non_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

/// An opaque ARGB color.
///
/// Callers only ever supply RGB; alpha is forced to `0xFF` on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(u32);

impl Color {
    const OPAQUE: u32 = 0xFF00_0000;

    pub fn from_rgb(rgb: u32) -> Self {
        Self((rgb & 0x00FF_FFFF) | Self::OPAQUE)
    }

    pub fn from_argb(argb: u32) -> Self {
        Self(argb)
    }

    pub fn argb(self) -> u32 {
        self.0
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Parse `RRGGBB`, `#RRGGBB` or `0xRRGGBB`.
    pub fn parse(text: &str) -> Result<Self> {
        let digits = text
            .strip_prefix('#')
            .or_else(|| text.strip_prefix("0x"))
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);

        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ShellError::InvalidArgument(format!(
                "expected a 6-digit hex color, got {text:?}"
            )));
        }

        let rgb = u32::from_str_radix(digits, 16)
            .map_err(|e| ShellError::InvalidArgument(format!("color {text:?}: {e}")))?;
        Ok(Self::from_rgb(rgb))
    }

    /// Web-style rendering without alpha, e.g. `0x00aeef`.
    pub fn to_rgb_hex(self) -> String {
        format!("0x{:02x}{:02x}{:02x}", self.red(), self.green(), self.blue())
    }
}
