//! Human-readable memory-size tokens
//!
//! Grammar: `<digits><unit?>` where the unit is one of K, M, G
//! (powers of 1024). The aggregator's 1 MiB default floor is expressed
//! in these units; the CLI uses the parser for `--mem-limit` overrides.

use crate::error::SubmitError;

const KIB: i64 = 1024;
const MIB: i64 = 1024 * 1024;
const GIB: i64 = 1024 * 1024 * 1024;

/// Parse a size token into bytes.
///
/// Fails with `SubmitError::Format` on anything outside the grammar:
/// empty tokens, non-numeric digit fields, unknown unit suffixes.
pub fn parse_mem(token: &str) -> Result<i64, SubmitError> {
    let (digits, unit) = match token.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => token.split_at(pos),
        None => (token, ""),
    };
    if digits.is_empty() {
        return Err(SubmitError::Format(token.to_string()));
    }
    let n: i64 = digits
        .parse()
        .map_err(|_| SubmitError::Format(token.to_string()))?;
    let scale = match unit {
        "" => 1,
        "K" => KIB,
        "M" => MIB,
        "G" => GIB,
        _ => return Err(SubmitError::Format(token.to_string())),
    };
    n.checked_mul(scale)
        .ok_or_else(|| SubmitError::Format(token.to_string()))
}

/// Format bytes as the shortest token that parses back to the same value.
///
/// Picks the largest unit that divides the value exactly, so
/// `parse_mem(format_mem(n)) == n` for all non-negative n.
pub fn format_mem(bytes: i64) -> String {
    if bytes != 0 && bytes % GIB == 0 {
        format!("{}G", bytes / GIB)
    } else if bytes != 0 && bytes % MIB == 0 {
        format!("{}M", bytes / MIB)
    } else if bytes != 0 && bytes % KIB == 0 {
        format!("{}K", bytes / KIB)
    } else {
        bytes.to_string()
    }
}
