use std::fmt::Display;

use crate::{
    linemap::{self, LineMap},
    span::{Span, Spanned},
};

/// Where an error was detected. `line` and `column` are one-based, `column` counts code points.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Location {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(src: &str, offset: u32) -> Location {
        let map = LineMap::new(src);
        let pos = map.offset_to_codepoint(src, offset);
        Location {
            offset: offset.min(linemap::end_offset(src)),
            line: pos.line + 1,
            column: pos.character + 1,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum Error {
    #[error("{location}: {kind}")]
    Lex {
        kind: LexErrorKind,
        location: Location,
    },

    #[error("{location}: {kind}")]
    Parse {
        kind: ParseErrorKind,
        location: Location,
    },

    #[error("{location}: rule '{name}' is referenced but never defined")]
    UndefinedRule { name: String, location: Location },
}

impl Error {
    pub fn location(&self) -> Location {
        match self {
            Error::Lex { location, .. }
            | Error::Parse { location, .. }
            | Error::UndefinedRule { location, .. } => *location,
        }
    }
    pub(crate) fn from_spanned(err: SpannedError, src: &str) -> Error {
        let location = Location::new(src, err.span.start());
        match err.inner {
            ErrorKind::Lex(kind) => Error::Lex { kind, location },
            ErrorKind::Parse(kind) => Error::Parse { kind, location },
            ErrorKind::UndefinedRule(name) => Error::UndefinedRule { name, location },
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedLiteral,
    #[error("unterminated character class")]
    UnterminatedClass,
    #[error("unterminated escape sequence")]
    UnterminatedEscape,
    #[error("unknown escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("numeric escape expects {digits} hex digits")]
    InvalidNumericEscape { digits: u8 },
    #[error("escape produces invalid code point U+{0:X}")]
    InvalidCodePoint(u32),
    #[error("inverted character range {start:?}-{end:?}")]
    InvertedRange { start: char, end: char },
    #[error("empty character class")]
    EmptyClass,
    #[error("malformed repetition, expected '{{m}}', '{{m,}}' or '{{m,n}}'")]
    MalformedRepetition,
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),
    #[error("source of {0} bytes is too large, offsets are limited to 32 bits")]
    SourceTooLarge(usize),
}

#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected a rule name, found {0}")]
    ExpectedRuleName(String),
    #[error("expected '::=' after rule name '{name}', found {found}")]
    ExpectedDefine { name: String, found: String },
    #[error("empty alternative, use \"\" to match nothing")]
    EmptyAlternative,
    #[error("unclosed '('")]
    UnclosedGroup,
    #[error("unmatched ')'")]
    UnmatchedParen,
    #[error("expected newline or end of input, found {0}")]
    TrailingInput(String),
    #[error("expected a literal, character class, rule name or group, found {0}")]
    ExpectedTerm(String),
    #[error("repetition of an empty expression")]
    EmptyRepetition,
    #[error("invalid repetition bounds {{{min},{max}}}")]
    InvalidRepetitionBounds { min: u32, max: u32 },
    #[error("repetition count {count} exceeds the limit of {limit}")]
    RepetitionTooLarge { count: u32, limit: u32 },
    #[error("groups nested deeper than the limit of {limit}")]
    NestingTooDeep { limit: u32 },
    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),
    #[error("rule name '{0}' uses the reserved prefix '_'")]
    ReservedName(String),
    #[error("grammar contains no rules")]
    NoRules,
    #[error("root rule '{0}' is not defined")]
    MissingRoot(String),
    #[error("rule '{0}' is left recursive")]
    LeftRecursion(String),
}

/// Error inside the compiler, converted to [`Error`] once the source is at hand.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) enum ErrorKind {
    Lex(LexErrorKind),
    Parse(ParseErrorKind),
    UndefinedRule(String),
}

pub(crate) type SpannedError = Spanned<ErrorKind>;

impl LexErrorKind {
    pub(crate) fn at(self, span: Span) -> SpannedError {
        Spanned::new(ErrorKind::Lex(self), span)
    }
}

impl ParseErrorKind {
    pub(crate) fn at(self, span: Span) -> SpannedError {
        Spanned::new(ErrorKind::Parse(self), span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_is_one_based() {
        let src = "root ::= a\nbé ::= [z-a]";
        let location = Location::new(src, 18);
        assert_eq!(
            location,
            Location {
                offset: 18,
                line: 2,
                column: 7
            }
        );
        assert_eq!(location.to_string(), "2:7");
    }

    #[test]
    fn display_messages() {
        let src = "root ::= x";
        let err = Error::from_spanned(
            Spanned::new(ErrorKind::UndefinedRule("x".to_owned()), Span::new(9, 10)),
            src,
        );
        assert_eq!(
            err.to_string(),
            "1:10: rule 'x' is referenced but never defined"
        );

        let err = Error::from_spanned(LexErrorKind::InvalidEscape('q').at(Span::at(0)), src);
        assert_eq!(err.to_string(), "1:1: unknown escape sequence '\\q'");
        assert_eq!(err.location().offset, 0);

        let kind = ParseErrorKind::InvalidRepetitionBounds { min: 3, max: 1 };
        assert_eq!(kind.to_string(), "invalid repetition bounds {3,1}");
    }
}
