use std::fmt::{self, Write};

use gbnf_runtime::CharSet;

use crate::{
    error::{LexErrorKind, SpannedError},
    lexer::Lexer,
    span::Span,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Quoting {
    /// Inside `"..."`
    Literal,
    /// Inside `[...]`
    Class,
}

/// Decodes the escape sequence following a backslash at `backslash`, which the lexer already consumed.
pub fn unescape(l: &mut Lexer, backslash: u32, quoting: Quoting) -> Result<char, SpannedError> {
    let Some(c) = l.next() else {
        return Err(LexErrorKind::UnterminatedEscape.at(Span::new(backslash, l.pos())));
    };

    let escaped = match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '\\' | '"' | '[' | ']' => c,
        '-' | '^' if quoting == Quoting::Class => c,
        'x' => return hex_escape(l, backslash, 2),
        'u' => return hex_escape(l, backslash, 4),
        'U' => return hex_escape(l, backslash, 8),
        other => {
            return Err(LexErrorKind::InvalidEscape(other).at(Span::new(backslash, l.pos())));
        }
    };

    Ok(escaped)
}

fn hex_escape(l: &mut Lexer, backslash: u32, digits: u8) -> Result<char, SpannedError> {
    let mut value = 0u32;
    for _ in 0..digits {
        match l.peek().and_then(|c| c.to_digit(16)) {
            Some(digit) => {
                l.next();
                value = (value << 4) | digit;
            }
            None => {
                let span = Span::new(backslash, l.pos());
                return Err(LexErrorKind::InvalidNumericEscape { digits }.at(span));
            }
        }
    }

    char::from_u32(value)
        .ok_or_else(|| LexErrorKind::InvalidCodePoint(value).at(Span::new(backslash, l.pos())))
}

/// Writes `c` so that [`unescape`] reads it back.
pub fn write_char(out: &mut dyn Write, c: char, quoting: Quoting) -> fmt::Result {
    match (c, quoting) {
        ('\n', _) => out.write_str("\\n"),
        ('\t', _) => out.write_str("\\t"),
        ('\r', _) => out.write_str("\\r"),
        ('\\', _) => out.write_str("\\\\"),
        ('"', Quoting::Literal) => out.write_str("\\\""),
        (']' | '-' | '^', Quoting::Class) => write!(out, "\\{c}"),
        // all control characters are below U+00A0
        (c, _) if c.is_control() => write!(out, "\\x{:02X}", c as u32),
        (c, _) => out.write_char(c),
    }
}

pub fn write_literal(out: &mut dyn Write, chars: &[char]) -> fmt::Result {
    out.write_char('"')?;
    for &c in chars {
        write_char(out, c, Quoting::Literal)?;
    }
    out.write_char('"')
}

/// Writes `.` for the any set, otherwise a bracketed class.
pub fn write_class(out: &mut dyn Write, set: &CharSet) -> fmt::Result {
    if set.is_any() {
        return out.write_char('.');
    }

    out.write_char('[')?;
    if set.is_negated() {
        out.write_char('^')?;
    }
    for range in set.ranges() {
        write_char(out, range.start, Quoting::Class)?;
        if !range.is_single() {
            out.write_char('-')?;
            write_char(out, range.end, Quoting::Class)?;
        }
    }
    out.write_char(']')
}
