use crate::constants::{GIB, KIB, MIB, TIB};

/// Parse a human-readable byte size such as `512`, `64K`, `10MiB` or `2G`.
///
/// Suffixes are binary multiples and case-insensitive; a trailing `B` and an
/// `i` before it are accepted and ignored.
pub fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".to_string());
    }

    let upper = s.to_ascii_uppercase();
    let mut digits = upper.as_str();
    if let Some(rest) = digits.strip_suffix('B') {
        digits = rest;
    }
    if let Some(rest) = digits.strip_suffix('I') {
        digits = rest;
    }

    let (num_str, multiplier) = if let Some(num) = digits.strip_suffix('T') {
        (num, TIB)
    } else if let Some(num) = digits.strip_suffix('G') {
        (num, GIB)
    } else if let Some(num) = digits.strip_suffix('M') {
        (num, MIB)
    } else if let Some(num) = digits.strip_suffix('K') {
        (num, KIB)
    } else {
        (digits, 1)
    };

    let value = num_str
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid size '{}': {}", s, e))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{}' overflows 64 bits", s))
}

/// Format a byte count with a binary unit, e.g. `10.0 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= TIB {
        format!("{:.1} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
