//! Literal decoding.
//!
//! Tokens carry their raw source text. The functions here turn that text into
//! values: numbers with radix and range checks, unit-suffixed durations and
//! sizes, and quoted strings with their escapes decoded. Double-quoted strings
//! are split into text and `${...}` segments; the segments are handed back as
//! source fragments with absolute offsets so the caller can lex and parse them.

use crate::{LexError, Span};

// ============================================================================
// Scanning (used by the token callbacks)
// ============================================================================

/// Length of a quoted body up to and including the closing `quote`.
pub(crate) fn scan_quoted(rest: &str, quote: u8) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Like [`scan_quoted`] for `"`, but steps over `${ ... }` segments so a quote
/// inside an interpolated expression does not end the string.
pub(crate) fn scan_double_quoted(rest: &str) -> Option<usize> {
    scan_nested(rest, Scan::Text)
}

/// Length of an interpolation body following `${`, including the closing `}`.
fn scan_interpolation(rest: &str) -> Option<usize> {
    scan_nested(rest, Scan::Code(0))
}

#[derive(Debug, Clone, Copy)]
enum Scan {
    /// Inside `"..."`
    Text,
    /// Inside `${...}`, with the number of unclosed `{`
    Code(usize),
}

/// Scan until the context `initial` is closed. Strings and interpolations
/// nest through an explicit stack, so arbitrarily deep input cannot exhaust
/// the call stack. Comments inside an interpolation are skipped.
fn scan_nested(rest: &str, initial: Scan) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut stack = vec![initial];
    let mut i = 0;

    while let Some(&state) = stack.last() {
        let byte = *bytes.get(i)?;
        match (state, byte) {
            (Scan::Text, b'\\') => {
                i += 2;
                continue;
            }
            (Scan::Text, b'"') => {
                stack.pop();
            }
            (Scan::Text, b'$') if bytes.get(i + 1) == Some(&b'{') => {
                stack.push(Scan::Code(0));
                i += 1;
            }
            (Scan::Code(0), b'}') => {
                stack.pop();
            }
            (Scan::Code(open), b'{' | b'}') => {
                let open = if byte == b'{' { open + 1 } else { open - 1 };
                if let Some(top) = stack.last_mut() {
                    *top = Scan::Code(open);
                }
            }
            (Scan::Code(_), b'"') => stack.push(Scan::Text),
            (Scan::Code(_), b'\'') => {
                i += 1 + scan_quoted(&rest[i + 1..], b'\'')?;
                continue;
            }
            (Scan::Code(_), b'/') if bytes.get(i + 1) == Some(&b'/') => {
                i += rest[i..].find('\n').unwrap_or(rest.len() - i);
                continue;
            }
            (Scan::Code(_), b'/') if bytes.get(i + 1) == Some(&b'*') => {
                i += 2 + rest[i + 2..].find("*/")? + 2;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    Some(i)
}

// ============================================================================
// Strings
// ============================================================================

/// A piece of a double-quoted string.
#[derive(Debug, Clone, PartialEq)]
pub enum StringSegment<'a> {
    /// Literal text with escapes already decoded
    Text(String),
    /// The source of an embedded expression and the absolute offset it starts at
    Interpolation { source: &'a str, offset: usize },
}

enum Escape {
    Char(char),
    Byte(u8),
}

/// Split a double-quoted string token (quotes included) into segments.
pub fn split_interpolated(raw: &str, span: Span) -> Result<Vec<StringSegment<'_>>, LexError> {
    let body = strip_delimiters(raw, "\"", span)?;
    let base = span.start + 1;
    let bytes = body.as_bytes();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < body.len() {
        match bytes[i] {
            b'\\' => {
                let (escape, len) = read_escape(body, i, base)?;
                match escape {
                    Escape::Char(c) => text.push(c),
                    Escape::Byte(b) => text.push(char::from(b)),
                }
                i += len;
            }
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                let start = i + 2;
                let len = scan_interpolation(&body[start..]).ok_or(LexError::UnterminatedString {
                    quote: '"',
                    span,
                })?;
                if !text.is_empty() {
                    segments.push(StringSegment::Text(std::mem::take(&mut text)));
                }
                segments.push(StringSegment::Interpolation {
                    source: &body[start..start + len - 1],
                    offset: base + start,
                });
                i = start + len;
            }
            _ => {
                let c = body[i..].chars().next().unwrap_or_default();
                text.push(c);
                i += c.len_utf8();
            }
        }
    }

    if !text.is_empty() {
        segments.push(StringSegment::Text(text));
    }
    Ok(segments)
}

/// Decode a single-quoted string token (quotes included).
pub fn decode_simple_string(raw: &str, span: Span) -> Result<String, LexError> {
    let body = strip_delimiters(raw, "'", span)?;
    unescape(body, span.start + 1)
}

/// Decode a byte string token (`b"..."`). Characters outside ASCII contribute
/// their UTF-8 encoding; `\xHH` contributes the raw byte.
pub fn decode_byte_string(raw: &str, span: Span) -> Result<Vec<u8>, LexError> {
    let body = raw
        .strip_prefix('b')
        .ok_or(LexError::UnterminatedString { quote: '"', span })
        .and_then(|rest| strip_delimiters(rest, "\"", span))?;
    let base = span.start + 2;
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body.as_bytes()[i] == b'\\' {
            let (escape, len) = read_escape(body, i, base)?;
            match escape {
                Escape::Byte(b) => out.push(b),
                Escape::Char(c) => {
                    let mut buf = [0u8; 4];
                    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
            i += len;
        } else {
            let c = body[i..].chars().next().unwrap_or_default();
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            i += c.len_utf8();
        }
    }
    Ok(out)
}

/// Decode the escapes in `body`, whose first byte sits at absolute offset `base`.
pub fn unescape(body: &str, base: usize) -> Result<String, LexError> {
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body.as_bytes()[i] == b'\\' {
            let (escape, len) = read_escape(body, i, base)?;
            match escape {
                Escape::Char(c) => out.push(c),
                Escape::Byte(b) => out.push(char::from(b)),
            }
            i += len;
        } else {
            let c = body[i..].chars().next().unwrap_or_default();
            out.push(c);
            i += c.len_utf8();
        }
    }
    Ok(out)
}

fn strip_delimiters<'a>(raw: &'a str, quote: &str, span: Span) -> Result<&'a str, LexError> {
    raw.strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .ok_or(LexError::UnterminatedString {
            quote: quote.chars().next().unwrap_or('"'),
            span,
        })
}

/// Read the escape sequence starting at the backslash `body[at]`.
/// Returns the decoded value and the number of bytes consumed.
fn read_escape(body: &str, at: usize, base: usize) -> Result<(Escape, usize), LexError> {
    let rest = &body[at + 1..];
    let invalid = |len: usize, expected: &'static str| LexError::InvalidEscape {
        sequence: body[at..at + len].to_string(),
        expected,
        span: Span::new(base + at, base + at + len),
    };

    let Some(c) = rest.chars().next() else {
        return Err(invalid(1, "an escape character after '\\'"));
    };

    let simple = match c {
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'v' => Some('\u{b}'),
        '0' => Some('\0'),
        _ => None,
    };
    if let Some(decoded) = simple {
        return Ok((Escape::Char(decoded), 2));
    }

    match c {
        'x' => {
            let digits = hex_prefix_len(&rest[1..], 2);
            if digits < 2 {
                return Err(invalid(2 + digits, "two hex digits after '\\x'"));
            }
            let value = u8::from_str_radix(&rest[1..3], 16)
                .map_err(|_| invalid(4, "two hex digits after '\\x'"))?;
            Ok((Escape::Byte(value), 4))
        }
        'u' if rest[1..].starts_with('{') => {
            let digits = hex_prefix_len(&rest[2..], usize::MAX);
            let closed = rest[2 + digits..].starts_with('}');
            if digits == 0 || digits > 6 || !closed {
                let len = 3 + digits + usize::from(closed);
                return Err(invalid(len, "one to six hex digits in '\\u{...}'"));
            }
            let len = 4 + digits;
            u32::from_str_radix(&rest[2..2 + digits], 16)
                .ok()
                .and_then(char::from_u32)
                .map(|decoded| (Escape::Char(decoded), len))
                .ok_or_else(|| invalid(len, "a Unicode scalar value"))
        }
        'u' => {
            let digits = hex_prefix_len(&rest[1..], 4);
            if digits < 4 {
                return Err(invalid(2 + digits, "four hex digits after '\\u'"));
            }
            u32::from_str_radix(&rest[1..5], 16)
                .ok()
                .and_then(char::from_u32)
                .map(|decoded| (Escape::Char(decoded), 6))
                .ok_or_else(|| invalid(6, "a Unicode scalar value"))
        }
        other => Err(invalid(
            1 + other.len_utf8(),
            "one of \\\\ \\' \\\" \\n \\r \\t \\b \\f \\v \\0 \\x \\u",
        )),
    }
}

/// Number of leading ASCII hex digits in `s`, capped at `max`.
fn hex_prefix_len(s: &str, max: usize) -> usize {
    s.bytes().take(max).take_while(u8::is_ascii_hexdigit).count()
}

// ============================================================================
// Numbers
// ============================================================================

/// Parse an integer token. A leading `-` is accepted for literals the parser
/// folded with a prefix minus.
pub fn parse_integer(raw: &str, span: Span) -> Result<i64, LexError> {
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (radix, digits) = match unsigned.get(..2) {
        Some("0x") | Some("0X") => (16, &unsigned[2..]),
        Some("0o") | Some("0O") => (8, &unsigned[2..]),
        Some("0b") | Some("0B") => (2, &unsigned[2..]),
        _ => (10, unsigned),
    };

    let invalid = |reason: &str| LexError::InvalidNumber {
        kind: "integer",
        text: raw.to_string(),
        reason: reason.to_string(),
        span,
    };

    let magnitude = u64::from_str_radix(digits, radix)
        .map_err(|_| invalid("out of range for a 64-bit integer"))?;
    let value = if negative {
        -i128::from(magnitude)
    } else {
        i128::from(magnitude)
    };
    i64::try_from(value).map_err(|_| invalid("out of range for a 64-bit integer"))
}

pub fn parse_float(raw: &str, span: Span) -> Result<f64, LexError> {
    raw.parse::<f64>().map_err(|e| LexError::InvalidNumber {
        kind: "float",
        text: raw.to_string(),
        reason: e.to_string(),
        span,
    })
}

/// Time unit of a duration literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
}

impl DurationUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            DurationUnit::Millis => "ms",
            DurationUnit::Seconds => "s",
            DurationUnit::Minutes => "m",
            DurationUnit::Hours => "h",
        }
    }

    /// Length of one unit in seconds
    pub fn seconds(self) -> f64 {
        match self {
            DurationUnit::Millis => 0.001,
            DurationUnit::Seconds => 1.0,
            DurationUnit::Minutes => 60.0,
            DurationUnit::Hours => 3600.0,
        }
    }

    /// `value` units as a `std::time::Duration`; negative values clamp to zero
    pub fn to_std(self, value: f64) -> std::time::Duration {
        std::time::Duration::from_secs_f64((value * self.seconds()).max(0.0))
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "ms" => Some(DurationUnit::Millis),
            "s" => Some(DurationUnit::Seconds),
            "m" => Some(DurationUnit::Minutes),
            "h" => Some(DurationUnit::Hours),
            _ => None,
        }
    }
}

/// Unit of a size literal. Multiples of 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeUnit {
    Kilobytes,
    Megabytes,
    Gigabytes,
    Terabytes,
}

impl SizeUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            SizeUnit::Kilobytes => "kb",
            SizeUnit::Megabytes => "mb",
            SizeUnit::Gigabytes => "gb",
            SizeUnit::Terabytes => "tb",
        }
    }

    pub fn bytes(self) -> u64 {
        match self {
            SizeUnit::Kilobytes => 1 << 10,
            SizeUnit::Megabytes => 1 << 20,
            SizeUnit::Gigabytes => 1 << 30,
            SizeUnit::Terabytes => 1 << 40,
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "kb" => Some(SizeUnit::Kilobytes),
            "mb" => Some(SizeUnit::Megabytes),
            "gb" => Some(SizeUnit::Gigabytes),
            "tb" => Some(SizeUnit::Terabytes),
            _ => None,
        }
    }
}

fn split_suffix(raw: &str) -> (&str, &str) {
    let at = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    raw.split_at(at)
}

pub fn parse_duration(raw: &str, span: Span) -> Result<(f64, DurationUnit), LexError> {
    let (number, suffix) = split_suffix(raw);
    let unit = DurationUnit::from_suffix(suffix).ok_or_else(|| LexError::InvalidNumber {
        kind: "duration",
        text: raw.to_string(),
        reason: "expected one of the suffixes ms, s, m, h".to_string(),
        span,
    })?;
    let value = parse_float(number, span).map_err(|_| LexError::InvalidNumber {
        kind: "duration",
        text: raw.to_string(),
        reason: "expected a decimal magnitude".to_string(),
        span,
    })?;
    Ok((value, unit))
}

pub fn parse_size(raw: &str, span: Span) -> Result<(f64, SizeUnit), LexError> {
    let (number, suffix) = split_suffix(raw);
    let unit = SizeUnit::from_suffix(suffix).ok_or_else(|| LexError::InvalidNumber {
        kind: "size",
        text: raw.to_string(),
        reason: "expected one of the suffixes kb, mb, gb, tb".to_string(),
        span,
    })?;
    let value = parse_float(number, span).map_err(|_| LexError::InvalidNumber {
        kind: "size",
        text: raw.to_string(),
        reason: "expected a decimal magnitude".to_string(),
        span,
    })?;
    Ok((value, unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn span_of(raw: &str) -> Span {
        Span::new(0, raw.len())
    }

    #[test]
    fn test_integer_radixes() {
        assert_eq!(parse_integer("0xFF", span_of("0xFF")), Ok(255));
        assert_eq!(parse_integer("0o17", span_of("0o17")), Ok(15));
        assert_eq!(parse_integer("0b1010", span_of("0b1010")), Ok(10));
        assert_eq!(parse_integer("-42", span_of("-42")), Ok(-42));
        assert_eq!(
            parse_integer("-9223372036854775808", Span::dummy()),
            Ok(i64::MIN)
        );
    }

    #[test]
    fn test_integer_overflow() {
        let err = parse_integer("9223372036854775808", Span::new(3, 22)).unwrap_err();
        assert!(matches!(err, LexError::InvalidNumber { kind: "integer", .. }));
        assert_eq!(err.span(), Span::new(3, 22));
    }

    #[test]
    fn test_float() {
        assert_eq!(parse_float("3.14e2", Span::dummy()), Ok(314.0));
        assert_eq!(parse_float("-0.5", Span::dummy()), Ok(-0.5));
    }

    #[test]
    fn test_duration_and_size() {
        assert_eq!(parse_duration("250ms", Span::dummy()), Ok((250.0, DurationUnit::Millis)));
        assert_eq!(parse_duration("1.5h", Span::dummy()), Ok((1.5, DurationUnit::Hours)));
        assert_eq!(parse_size("5kb", Span::dummy()), Ok((5.0, SizeUnit::Kilobytes)));
        assert_eq!(SizeUnit::Megabytes.bytes(), 1_048_576);
        assert_eq!(
            DurationUnit::Minutes.to_std(1.5),
            std::time::Duration::from_secs(90)
        );
    }

    #[test]
    fn test_simple_escapes() {
        let decoded = decode_simple_string(r"'a\n\t\\\'\0'", Span::new(0, 13)).unwrap();
        assert_eq!(decoded, "a\n\t\\'\0");
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(unescape(r"é\u{1F600}\x41", 0).unwrap(), "é😀A");
    }

    #[test]
    fn test_invalid_escape_span() {
        let err = unescape(r"ok \q", 10).unwrap_err();
        assert_eq!(
            err,
            LexError::InvalidEscape {
                sequence: r"\q".to_string(),
                expected: "one of \\\\ \\' \\\" \\n \\r \\t \\b \\f \\v \\0 \\x \\u",
                span: Span::new(13, 15),
            }
        );
    }

    #[test]
    fn test_short_hex_escape() {
        let err = unescape(r"\x4", 0).unwrap_err();
        assert!(matches!(err, LexError::InvalidEscape { ref sequence, .. } if sequence == r"\x4"));
        let err = unescape(r"\u{110000}", 0).unwrap_err();
        assert!(matches!(err, LexError::InvalidEscape { expected: "a Unicode scalar value", .. }));
    }

    #[test]
    fn test_split_interpolated() {
        let raw = r#""a${1+1}b\n""#;
        let segments = split_interpolated(raw, Span::new(5, 5 + raw.len())).unwrap();
        assert_eq!(
            segments,
            vec![
                StringSegment::Text("a".to_string()),
                StringSegment::Interpolation {
                    source: "1+1",
                    offset: 9,
                },
                StringSegment::Text("b\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_interpolation_skips_comments() {
        let raw = "\"a${ x // }\n }b\"";
        let segments = split_interpolated(raw, span_of(raw)).unwrap();
        assert_eq!(
            segments,
            vec![
                StringSegment::Text("a".to_string()),
                StringSegment::Interpolation {
                    source: " x // }\n ",
                    offset: 4,
                },
                StringSegment::Text("b".to_string()),
            ]
        );

        let raw = r#""${ 1 /* } " */ }""#;
        let segments = split_interpolated(raw, span_of(raw)).unwrap();
        assert_eq!(
            segments,
            vec![StringSegment::Interpolation {
                source: " 1 /* } \" */ ",
                offset: 3,
            }]
        );
    }

    #[test]
    fn test_lone_dollar_is_text() {
        let raw = r#""$5 and $""#;
        let segments = split_interpolated(raw, span_of(raw)).unwrap();
        assert_eq!(segments, vec![StringSegment::Text("$5 and $".to_string())]);
    }

    #[test]
    fn test_empty_string_has_no_segments() {
        assert!(split_interpolated("\"\"", Span::new(0, 2)).unwrap().is_empty());
    }

    #[test]
    fn test_byte_string() {
        let raw = r#"b"A\x00é""#;
        let bytes = decode_byte_string(raw, span_of(raw)).unwrap();
        assert_eq!(bytes, vec![b'A', 0, 0xC3, 0xA9]);
    }
}
