//! The duration grammar used by rate-limit `period` strings (§4.7, §6):
//! `N(ms|s|m|h|d)` with non-negative `N`.

use bantai_core::{Error, Result};

const UNITS: &[(&str, u64)] = &[
    ("ms", 1),
    ("s", 1_000),
    ("m", 60_000),
    ("h", 3_600_000),
    ("d", 86_400_000),
];

/// Parse `input` (e.g. `"30s"`, `"1h"`) into milliseconds. Units are checked
/// longest-suffix-first so `"ms"` isn't swallowed by `"m"`.
pub fn parse_duration(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let mut units: Vec<&(&str, u64)> = UNITS.iter().collect();
    units.sort_by_key(|(unit, _)| std::cmp::Reverse(unit.len()));

    for (unit, multiplier) in units {
        if let Some(digits) = trimmed.strip_suffix(unit) {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let n: u64 = digits
                .parse()
                .map_err(|_| Error::Duration(input.to_string()))?;
            return Ok(n * multiplier);
        }
    }

    Err(Error::Duration(input.to_string()))
}
