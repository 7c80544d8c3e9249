//! Row Rendering
//!
//! Result rows travel over the wire as text. Existing callers parse the
//! tuple notation of the Python store bridge they were written against, so
//! every row is rendered the way a Python tuple of SQLite values prints:
//!
//! ```text
//! ('alice', 'pw', None)     three columns
//! ('alice',)                one column keeps the trailing comma
//! (42, 1.5, b'\x00\x01')    integer, real, blob
//! ```
//!
//! The shape is part of the protocol. Changing it breaks callers.

use rusqlite::types::ValueRef;
use rusqlite::Row;

/// Renders one result row as a tuple.
///
/// `columns` is the statement's column count; `rusqlite::Row` does not
/// expose it directly.
pub fn render_row(row: &Row<'_>, columns: usize) -> rusqlite::Result<String> {
    let mut values = Vec::with_capacity(columns);
    for idx in 0..columns {
        values.push(render_value(row.get_ref(idx)?));
    }
    Ok(render_tuple(&values))
}

/// Joins already-rendered values into tuple notation.
pub fn render_tuple(values: &[String]) -> String {
    match values {
        [] => "()".to_string(),
        [single] => format!("({},)", single),
        _ => format!("({})", values.join(", ")),
    }
}

/// Renders a single SQLite value.
pub fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "None".to_string(),
        ValueRef::Integer(n) => n.to_string(),
        ValueRef::Real(f) => render_real(f),
        ValueRef::Text(bytes) => render_text(&String::from_utf8_lossy(bytes)),
        ValueRef::Blob(bytes) => render_blob(bytes),
    }
}

/// Quote character for a literal: single quotes unless the content has a
/// single quote and no double quote.
fn pick_quote(has_single: bool, has_double: bool) -> char {
    if has_single && !has_double {
        '"'
    } else {
        '\''
    }
}

/// Renders text as a quoted, escaped literal.
pub fn render_text(s: &str) -> String {
    let quote = pick_quote(s.contains('\''), s.contains('"'));
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);

    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if !is_printable(c) => {
                let code = c as u32;
                if code < 0x100 {
                    out.push_str(&format!("\\x{:02x}", code));
                } else if code < 0x10000 {
                    out.push_str(&format!("\\u{:04x}", code));
                } else {
                    out.push_str(&format!("\\U{:08x}", code));
                }
            }
            c => out.push(c),
        }
    }

    out.push(quote);
    out
}

/// Whether a character is shown as-is inside a text literal.
///
/// Control, separator (other than a plain space), format, private-use and
/// non-character code points are escaped.
fn is_printable(c: char) -> bool {
    if c.is_control() || (c.is_whitespace() && c != ' ') {
        return false;
    }
    !matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{2028}'..='\u{202E}'
            | '\u{2060}'..='\u{206F}'
            | '\u{E000}'..='\u{F8FF}'
            | '\u{FDD0}'..='\u{FDEF}'
            | '\u{FEFF}'
            | '\u{FFF0}'..='\u{FFFB}'
            | '\u{FFFE}'..='\u{FFFF}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0000}'..='\u{E00FF}'
            | '\u{E01F0}'..='\u{E0FFF}'
            | '\u{F0000}'..='\u{10FFFF}'
    )
}

/// Renders a blob as a bytes literal (`b'...'`).
pub fn render_blob(bytes: &[u8]) -> String {
    let quote = pick_quote(bytes.contains(&b'\''), bytes.contains(&b'"'));
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push('b');
    out.push(quote);

    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b as char == quote => {
                out.push('\\');
                out.push(quote);
            }
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }

    out.push(quote);
    out
}

/// Renders a real using the shortest round-trip digits, switching to
/// scientific notation when the decimal exponent is below -4 or at least 16.
pub fn render_real(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // `{:e}` yields the shortest digits that round-trip, e.g. "-1.25e-7"
    let sci = format!("{:e}", f);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exp: i32 = match exponent.parse() {
        Ok(exp) => exp,
        Err(_) => return sci,
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let body = if (-4..16).contains(&exp) {
        let point = exp + 1;
        if point <= 0 {
            format!("0.{}{}", "0".repeat((-point) as usize), digits)
        } else if point as usize >= digits.len() {
            format!("{}{}.0", digits, "0".repeat(point as usize - digits.len()))
        } else {
            let (int_part, frac_part) = digits.split_at(point as usize);
            format!("{}.{}", int_part, frac_part)
        }
    } else {
        let (first, rest) = digits.split_at(1);
        let exp_sign = if exp < 0 { '-' } else { '+' };
        if rest.is_empty() {
            format!("{}e{}{:02}", first, exp_sign, exp.abs())
        } else {
            format!("{}.{}e{}{:02}", first, rest, exp_sign, exp.abs())
        }
    };

    format!("{}{}", sign, body)
}
