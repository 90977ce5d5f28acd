//! Amount parsing and formatting in minor units (fen). Never float.

/// Parse a decimal amount string to i64 minor units.
/// Handles "12.5", "-3.00", "+100", ".5", "100.".
pub fn parse_amount(s: &str) -> Result<i64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty amount".into());
    }
    // At most one leading sign.
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if digits.is_empty() || !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return Err(format!("bad amount: {}", s));
    }

    let (whole, frac) = match digits.find('.') {
        Some(dot) => (&digits[..dot], &digits[dot + 1..]),
        None => (digits, ""),
    };

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u32>()
            .map_err(|e| format!("bad amount {:?}: {}", s, e))? as i64
    };
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("bad fraction: {}", s));
    }
    let minor: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|e| format!("bad fraction: {}", e))? * 10,
        2 => frac.parse().map_err(|e| format!("bad fraction: {}", e))?,
        _ => return Err(format!("too many decimal places: {}", s)),
    };

    let total = units * 100 + minor;
    Ok(if negative { -total } else { total })
}

/// Format minor units as a two-decimal string: `-1250` → `"-12.50"`.
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Minor units as a float for spreadsheet cells. Display only.
pub fn to_float(minor: i64) -> f64 {
    minor as f64 / 100.0
}
