// 💰 Money - integer amounts, exact half-up rounding, lenient parsing
//
// Every amount the pipeline emits is a whole number of the smallest currency
// unit and never negative. Rates are held as basis points so that applying a
// percentage is exact integer arithmetic instead of float multiplication.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary amount in the smallest currency unit.
pub type Amount = u64;

/// Basis points in one whole (100%).
pub const BASIS_POINTS_PER_UNIT: u64 = 10_000;

// ============================================================================
// ROUNDING
// ============================================================================

/// Round a raw real-valued amount half-up to a non-negative integer.
///
/// NaN, infinities and negative values become 0. Values beyond `u64::MAX`
/// saturate.
pub fn round_half_up(value: f64) -> Amount {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    // f64::round rounds half away from zero, which is half-up for positives.
    // `as` saturates on overflow.
    value.round() as Amount
}

/// `numerator / denominator` rounded half-up. A zero denominator yields 0.
pub fn div_round_half_up(numerator: Amount, denominator: Amount) -> Amount {
    if denominator == 0 {
        return 0;
    }
    let n = numerator as u128;
    let d = denominator as u128;
    ((2 * n + d) / (2 * d)) as Amount
}

/// Round a raw number to a whole amount of at least 1 when the source is
/// positive. Used for per-unit figures that must not print as zero.
pub fn at_least_one(value: Amount, source: Amount) -> Amount {
    if value == 0 && source > 0 {
        1
    } else {
        value
    }
}

// ============================================================================
// RATE
// ============================================================================

/// A percentage stored as basis points (7500 = 75%).
///
/// Serialized as a plain fraction (`0.75`) so configuration files stay
/// readable. Precision is one basis point: fractions are rounded half-up to
/// four decimals on the way in (`0.07506` reads as 7.51%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Rate {
    basis_points: u64,
}

impl Rate {
    pub const ZERO: Rate = Rate { basis_points: 0 };
    pub const ONE: Rate = Rate {
        basis_points: BASIS_POINTS_PER_UNIT,
    };

    pub const fn from_basis_points(basis_points: u64) -> Self {
        Rate { basis_points }
    }

    /// Build from a fraction (0.10 = 10%). Negative and non-finite inputs
    /// clamp to zero.
    pub fn from_fraction(fraction: f64) -> Self {
        Rate {
            basis_points: round_half_up(fraction * BASIS_POINTS_PER_UNIT as f64),
        }
    }

    pub fn basis_points(&self) -> u64 {
        self.basis_points
    }

    pub fn as_fraction(&self) -> f64 {
        self.basis_points as f64 / BASIS_POINTS_PER_UNIT as f64
    }

    /// `amount × rate`, rounded half-up, computed exactly.
    pub fn apply(&self, amount: Amount) -> Amount {
        let scaled = amount as u128 * self.basis_points as u128;
        let denominator = BASIS_POINTS_PER_UNIT as u128;
        let rounded = (2 * scaled + denominator) / (2 * denominator);
        rounded.min(Amount::MAX as u128) as Amount
    }

    /// `apply` clamped so the result never exceeds `amount`.
    pub fn apply_capped(&self, amount: Amount) -> Amount {
        self.apply(amount).min(amount)
    }
}

impl From<f64> for Rate {
    fn from(fraction: f64) -> Self {
        Rate::from_fraction(fraction)
    }
}

impl From<Rate> for f64 {
    fn from(rate: Rate) -> Self {
        rate.as_fraction()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.basis_points as f64 / 100.0)
    }
}

// ============================================================================
// PARSING & FORMATTING
// ============================================================================

/// Parse a spreadsheet-style number leniently.
///
/// Accepts `1234`, `1.234.567` (dot thousands), `1.234,50` (dot thousands,
/// comma decimal), `12,5` (comma decimal), currency prefixes like `Gs.` and
/// stray letters. Returns `None` for blanks, `n/a`-style markers and anything
/// that still fails to parse.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let marker = crate::text::normalize(trimmed);
    if matches!(marker.as_str(), "no aplica" | "n a" | "na") {
        return None;
    }

    let mut s: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    // "Gs." leaves a leading dot behind
    while s.starts_with('.') || s.starts_with(',') {
        s.remove(0);
    }

    if s.is_empty() || s == "-" {
        return None;
    }

    let dots = s.matches('.').count();
    let commas = s.matches(',').count();

    if dots > 0 && commas > 0 {
        // dot thousands, comma decimal
        s = s.replace('.', "").replace(',', ".");
    } else {
        if dots > 1 {
            s = s.replace('.', "");
        } else if dots == 1 && commas == 0 && looks_like_thousands(&s, '.') {
            s = s.replace('.', "");
        }
        if commas > 1 {
            s = s.replace(',', "");
        } else {
            s = s.replace(',', ".");
        }
    }

    s.parse::<f64>().ok()
}

/// A single separator followed by exactly three digits is a thousands
/// separator in local spreadsheets ("1.500" is fifteen hundred).
fn looks_like_thousands(s: &str, sep: char) -> bool {
    match s.split_once(sep) {
        Some((head, tail)) => {
            let head = head.trim_start_matches('-');
            !head.is_empty() && head != "0" && tail.len() == 3 && tail.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Format with `.` as thousands separator: `1234567` → `1.234.567`.
pub fn format_thousands(amount: Amount) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Format a real number with `.` thousands and `,` decimals, negatives
/// clamped to zero: `1234.5` → `1.234,50`.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() && value > 0.0 { value } else { 0.0 };
    let fixed = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (fixed.clone(), None),
    };

    let int_value: Amount = int_part.parse().unwrap_or(0);
    match frac_part {
        Some(frac) => format!("{},{}", format_thousands(int_value), frac),
        None => format_thousands(int_value),
    }
}

// ============================================================================
// TESTS
// ============================================================================
