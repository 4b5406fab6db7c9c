use std::fmt::Display;

use gbnf_runtime::{CharRange, CharSet};

use crate::{
    error::{LexErrorKind, SpannedError},
    literal::{self, Quoting},
    span::Span,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Rule name, the text is in the token span.
    Name,
    /// Decoded contents of `"..."`
    Literal(Vec<char>),
    Class(CharSet),
    /// `.`
    Any,
    /// `::=`
    Define,
    Pipe,
    LParen,
    RParen,
    Question,
    Star,
    Plus,
    /// `{m}`, `{m,}` or `{m,n}`, `max` is `None` when unbounded.
    Repeat { min: u32, max: Option<u32> },
    Newline,
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            TokenKind::Name => "rule name",
            TokenKind::Literal(_) => "string literal",
            TokenKind::Class(_) => "character class",
            TokenKind::Any => "'.'",
            TokenKind::Define => "'::='",
            TokenKind::Pipe => "'|'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Question => "'?'",
            TokenKind::Star => "'*'",
            TokenKind::Plus => "'+'",
            TokenKind::Repeat { .. } => "repetition",
            TokenKind::Newline => "newline",
            TokenKind::Eof => "end of input",
        };
        f.write_str(str)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Human description for error messages.
    pub fn describe(&self, src: &str) -> String {
        match self.kind {
            TokenKind::Name => format!("'{}'", self.span.as_str(src)),
            _ => self.kind.to_string(),
        }
    }
}

pub fn is_name_char(c: char) -> bool {
    matches!(c, '_' | '-' | 'a'..='z' | 'A'..='Z' | '0'..='9')
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: u32,
}

impl<'a> Lexer<'a> {
    /// Offsets are `u32`, [`tokenize`] rejects larger sources before getting here.
    pub fn new(src: &'a str) -> Self {
        debug_assert!(src.len() <= u32::MAX as usize);
        Self { src, pos: 0 }
    }

    pub fn pos(&self) -> u32 {
        self.pos
    }

    pub fn span_since(&self, start: u32) -> Span {
        Span::new(start, self.pos)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos as usize..]
    }

    pub fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8() as u32;
        Some(c)
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    pub fn consume(&mut self, value: char) -> bool {
        if self.peek() == Some(value) {
            self.next();
            true
        } else {
            false
        }
    }

    pub fn consume_while(&mut self, predicate: impl Fn(char) -> bool) -> Span {
        let start = self.pos();
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.next();
            } else {
                break;
            }
        }
        self.span_since(start)
    }

    pub fn sequence(&mut self, sequence: &str) -> bool {
        if self.rest().starts_with(sequence) {
            self.pos += sequence.len() as u32;
            true
        } else {
            false
        }
    }

    /// Spaces, tabs and `#` comments, newlines are tokens.
    fn skip_trivia(&mut self) {
        loop {
            self.consume_while(|c| c == ' ' || c == '\t');
            if self.consume('#') {
                self.consume_while(|c| c != '\n' && c != '\r');
            } else {
                break;
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, SpannedError> {
        self.skip_trivia();

        let start = self.pos();
        let Some(c) = self.next() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::at(start),
            });
        };

        let kind = match c {
            '\n' => TokenKind::Newline,
            '\r' => {
                self.consume('\n');
                TokenKind::Newline
            }
            '|' => TokenKind::Pipe,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '?' => TokenKind::Question,
            '*' => TokenKind::Star,
            '+' => TokenKind::Plus,
            '.' => TokenKind::Any,
            ':' if self.sequence(":=") => TokenKind::Define,
            '"' => self.literal(start)?,
            '[' => self.class(start)?,
            '{' => self.repetition(start)?,
            c if is_name_char(c) => {
                self.consume_while(is_name_char);
                TokenKind::Name
            }
            c => {
                return Err(LexErrorKind::UnexpectedCharacter(c).at(self.span_since(start)));
            }
        };

        Ok(Token {
            kind,
            span: self.span_since(start),
        })
    }

    fn literal(&mut self, start: u32) -> Result<TokenKind, SpannedError> {
        let mut chars = Vec::new();
        loop {
            let pos = self.pos();
            match self.next() {
                Some('"') => break,
                Some('\\') => chars.push(literal::unescape(self, pos, Quoting::Literal)?),
                Some(c) => chars.push(c),
                None => {
                    return Err(LexErrorKind::UnterminatedLiteral.at(self.span_since(start)));
                }
            }
        }
        Ok(TokenKind::Literal(chars))
    }

    fn class(&mut self, start: u32) -> Result<TokenKind, SpannedError> {
        let negated = self.consume('^');
        let mut ranges = Vec::new();

        loop {
            match self.peek() {
                Some(']') => {
                    self.next();
                    break;
                }
                None => return Err(LexErrorKind::UnterminatedClass.at(self.span_since(start))),
                Some(_) => {}
            }

            let item = self.pos();
            let first = self.class_char(start)?;
            // a '-' right before the closing bracket is a plain character
            if self.peek() == Some('-') && !matches!(self.peek_second(), Some(']') | None) {
                self.next();
                let last = self.class_char(start)?;
                if first > last {
                    let kind = LexErrorKind::InvertedRange {
                        start: first,
                        end: last,
                    };
                    return Err(kind.at(self.span_since(item)));
                }
                ranges.push(CharRange::new(first, last));
            } else {
                ranges.push(CharRange::single(first));
            }
        }

        if ranges.is_empty() {
            return Err(LexErrorKind::EmptyClass.at(self.span_since(start)));
        }

        Ok(TokenKind::Class(CharSet::new(ranges, negated)))
    }

    fn class_char(&mut self, start: u32) -> Result<char, SpannedError> {
        let pos = self.pos();
        match self.next() {
            Some('\\') => literal::unescape(self, pos, Quoting::Class),
            Some(c) => Ok(c),
            None => Err(LexErrorKind::UnterminatedClass.at(self.span_since(start))),
        }
    }

    fn repetition(&mut self, start: u32) -> Result<TokenKind, SpannedError> {
        let blank = |c: char| c == ' ' || c == '\t';

        self.consume_while(blank);
        let min = self.number(start)?;
        self.consume_while(blank);
        let max = if self.consume(',') {
            self.consume_while(blank);
            self.number(start)?
        } else {
            min
        };
        self.consume_while(blank);

        match (min, self.consume('}')) {
            (Some(min), true) => Ok(TokenKind::Repeat { min, max }),
            _ => Err(LexErrorKind::MalformedRepetition.at(self.span_since(start))),
        }
    }

    fn number(&mut self, start: u32) -> Result<Option<u32>, SpannedError> {
        let digits = self.consume_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Ok(None);
        }
        match digits.as_str(self.src).parse() {
            Ok(n) => Ok(Some(n)),
            Err(_) => Err(LexErrorKind::MalformedRepetition.at(self.span_since(start))),
        }
    }
}

/// Splits the whole source into tokens, the last one is always [`TokenKind::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Token>, SpannedError> {
    check_source_len(src.len())?;
    let mut l = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let token = l.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

fn check_source_len(len: usize) -> Result<(), SpannedError> {
    if u32::try_from(len).is_err() {
        return Err(LexErrorKind::SourceTooLarge(len).at(Span::at(0)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn lex_error(src: &str) -> (LexErrorKind, Span) {
        match tokenize(src) {
            Err(err) => match err.inner {
                ErrorKind::Lex(kind) => (kind, err.span),
                other => panic!("Expected lex error, got {other:?}"),
            },
            Ok(tokens) => panic!("Expected lex error, got {tokens:?}"),
        }
    }

    #[test]
    fn rule_line() {
        use TokenKind::*;
        assert_eq!(
            kinds("root ::= a-b | \"x\"* # comment\r\n(.)"),
            [
                Name,
                Define,
                Name,
                Pipe,
                Literal(vec!['x']),
                Star,
                Newline,
                LParen,
                Any,
                RParen,
                Eof
            ]
        );

        let tokens = tokenize("ab  cd").unwrap();
        assert_eq!(tokens[1].span, Span::new(4, 6));
        assert_eq!(tokens[1].describe("ab  cd"), "'cd'");
    }

    #[test]
    fn classes() {
        let set = |ranges, negated| TokenKind::Class(CharSet::new(ranges, negated));
        assert_eq!(
            kinds("[a-zA-Z_] [^\"\\\\] [a-] [\\]\\-]"),
            [
                set(
                    vec![
                        CharRange::new('a', 'z'),
                        CharRange::new('A', 'Z'),
                        CharRange::single('_')
                    ],
                    false
                ),
                set(vec![CharRange::single('"'), CharRange::single('\\')], true),
                set(vec![CharRange::single('a'), CharRange::single('-')], false),
                set(vec![CharRange::single(']'), CharRange::single('-')], false),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn repetitions() {
        assert_eq!(
            kinds("{3} { 2 , } {1,4}"),
            [
                TokenKind::Repeat {
                    min: 3,
                    max: Some(3)
                },
                TokenKind::Repeat { min: 2, max: None },
                TokenKind::Repeat {
                    min: 1,
                    max: Some(4)
                },
                TokenKind::Eof
            ]
        );
        assert_eq!(lex_error("{,3}").0, LexErrorKind::MalformedRepetition);
        assert_eq!(lex_error("{3").0, LexErrorKind::MalformedRepetition);
        assert_eq!(
            lex_error("{99999999999}").0,
            LexErrorKind::MalformedRepetition
        );
    }

    #[test]
    fn literal_with_escapes_and_newline() {
        assert_eq!(
            kinds("\"a\\tb\nc\\u00e9\""),
            [
                TokenKind::Literal(vec!['a', '\t', 'b', '\n', 'c', 'é']),
                TokenKind::Eof
            ]
        );
        assert_eq!(kinds("\"\""), [TokenKind::Literal(vec![]), TokenKind::Eof]);
    }

    #[test]
    fn errors() {
        assert_eq!(
            lex_error("root ::= \"abc"),
            (LexErrorKind::UnterminatedLiteral, Span::new(9, 13))
        );
        assert_eq!(lex_error("x ::= [abc").0, LexErrorKind::UnterminatedClass);
        assert_eq!(
            lex_error("x ::= [z-a]"),
            (
                LexErrorKind::InvertedRange {
                    start: 'z',
                    end: 'a'
                },
                Span::new(7, 10)
            )
        );
        assert_eq!(lex_error("[]").0, LexErrorKind::EmptyClass);
        assert_eq!(lex_error("[^]").0, LexErrorKind::EmptyClass);
        assert_eq!(lex_error("\"\\q\"").0, LexErrorKind::InvalidEscape('q'));
        assert_eq!(
            lex_error("x : y"),
            (LexErrorKind::UnexpectedCharacter(':'), Span::new(2, 3))
        );
        assert_eq!(lex_error("x ::= ;").0, LexErrorKind::UnexpectedCharacter(';'));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn source_length_limit() {
        assert!(check_source_len(u32::MAX as usize).is_ok());

        let len = u32::MAX as usize + 1;
        let err = check_source_len(len).unwrap_err();
        assert_eq!(err.inner, ErrorKind::Lex(LexErrorKind::SourceTooLarge(len)));
        assert_eq!(err.span, Span::at(0));
    }
}
