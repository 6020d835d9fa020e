//! Fixed-point amounts. The registry stores fractions and tez amounts as integers scaled by
//! [`SCALE`].

use serde_json::Value;

use crate::CodecError;

/// Number of raw units per displayed unit.
pub const SCALE: i128 = 10_000;

const SCALE_DIGITS: usize = 4;

/// Renders a scaled integer as the shortest decimal string, e.g. `9000` -> `"0.9"`.
pub fn format_scaled(raw: i128) -> String {
    let sign = if raw < 0 { "-" } else { "" };
    let abs = raw.unsigned_abs();
    let int_part = abs / SCALE.unsigned_abs();
    let frac_part = abs % SCALE.unsigned_abs();

    if frac_part == 0 {
        return format!("{sign}{int_part}");
    }

    let frac = format!("{frac_part:0width$}", width = SCALE_DIGITS);
    format!("{sign}{int_part}.{}", frac.trim_end_matches('0'))
}

/// Parses a decimal string into scaled units, truncating digits past the scale.
pub fn parse_scaled(text: &str) -> Result<i128, CodecError> {
    let invalid = || CodecError::InvalidDecimal(text.to_owned());

    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (int_str, frac_str) = digits.split_once('.').unwrap_or((digits, ""));
    if int_str.is_empty() && frac_str.is_empty() {
        return Err(invalid());
    }
    if !int_str.chars().all(|c| c.is_ascii_digit()) || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let int_part: i128 = if int_str.is_empty() {
        0
    } else {
        int_str.parse().map_err(|_| invalid())?
    };

    let mut frac: String = frac_str.chars().take(SCALE_DIGITS).collect();
    while frac.len() < SCALE_DIGITS {
        frac.push('0');
    }
    let frac_part: i128 = frac.parse().map_err(|_| invalid())?;

    let value = int_part
        .checked_mul(SCALE)
        .and_then(|v| v.checked_add(frac_part))
        .ok_or_else(invalid)?;
    Ok(if negative { -value } else { value })
}

/// Reads an integer that the RPC may have rendered as a number or a numeric string.
pub fn raw_int(field: &str, value: &Value) -> Result<i128, CodecError> {
    let bad = || CodecError::InvalidField {
        field: field.to_owned(),
        expected: "integer",
    };
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .ok_or_else(bad),
        Value::String(s) => s.trim().parse().map_err(|_| bad()),
        _ => Err(bad()),
    }
}

/// Reads a human-entered amount: strings are decimal and get scaled, integers are taken as
/// already scaled.
pub fn display_amount(field: &str, value: &Value) -> Result<i128, CodecError> {
    match value {
        Value::String(s) => parse_scaled(s),
        Value::Number(n) if n.is_f64() => parse_scaled(&n.to_string()),
        Value::Number(_) => raw_int(field, value),
        _ => Err(CodecError::InvalidField {
            field: field.to_owned(),
            expected: "decimal string or integer",
        }),
    }
}

/// Converts a scaled integer back to a JSON number.
pub fn int_value(raw: i128) -> Value {
    i64::try_from(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}
