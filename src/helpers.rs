/// Word bytes for whole-token matching. ASCII-only on purpose: gazetteer and
/// keyword entries are ASCII, and a multibyte neighbor is never a word byte,
/// so UTF-8 continuation bytes correctly count as boundaries.
pub(crate) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Does `[start, end)` sit on token boundaries within `text`? This is the
/// runtime equivalent of anchoring every keyword with non-word sentinels:
/// it rejects substring hits like `api` inside `capita`.
pub(crate) fn token_bounded(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let left_ok = start == 0 || !is_word_byte(bytes[start - 1]);
    let right_ok = end >= bytes.len() || !is_word_byte(bytes[end]);
    left_ok && right_ok
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Parse a number that may carry thousands separators (`5,200,000.5`).
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    s.replace(',', "").parse().ok()
}

/// Render a float without trailing zeros: `0.9398`, `5200000`, `4`.
pub(crate) fn format_decimal(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{v:.6}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Render a non-negative amount with comma-grouped thousands, keeping a
/// fractional part only when one exists (`5,200,000`, `4.25`).
pub(crate) fn group_thousands(v: f64) -> String {
    let whole = v.trunc() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let fract = v.fract().abs();
    if fract > 1e-9 {
        let frac_str = format_decimal(fract);
        // format_decimal yields `0.xxx`; splice the fractional digits on.
        if let Some(rest) = frac_str.strip_prefix("0.") {
            grouped.push('.');
            grouped.push_str(rest);
        }
    }
    if v < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
