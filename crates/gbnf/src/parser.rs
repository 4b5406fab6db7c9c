use cranelift_entity::SecondaryMap;
use gbnf_runtime::{CharSet, RuleId};
use log::{debug, trace, warn};

use crate::{
    check,
    error::{Error, ParseErrorKind, SpannedError},
    grammar::{Grammar, Rule, RuleOrigin, Symbol, Synthesized},
    lexer::{self, Token, TokenKind},
    linemap,
    options::ParseOptions,
    span::Span,
    symbols::{SymbolTable, RESERVED_PREFIX},
};

impl Grammar {
    pub fn parse(src: &str) -> Result<Grammar, Error> {
        Self::parse_with(src, &ParseOptions::default())
    }
    pub fn parse_with(src: &str, options: &ParseOptions) -> Result<Grammar, Error> {
        parse(src, options).map_err(|err| Error::from_spanned(err, src))
    }
}

fn parse(src: &str, options: &ParseOptions) -> Result<Grammar, SpannedError> {
    let tokens = lexer::tokenize(src)?;
    let mut parser = Parser::new(src, tokens, options);
    parser.parse_grammar()?;
    parser.finish()
}

struct Parser<'a> {
    src: &'a str,
    /// Always ends with [`TokenKind::Eof`]
    tokens: Vec<Token>,
    pos: usize,
    options: &'a ParseOptions,
    symbols: SymbolTable,
    /// Filled as definitions are parsed, references may create identities before that.
    rules: SecondaryMap<RuleId, Option<Rule>>,
    first_defined: Option<RuleId>,
    /// Number of currently open parentheses.
    depth: u32,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: Vec<Token>, options: &'a ParseOptions) -> Parser<'a> {
        debug_assert!(matches!(
            tokens.last(),
            Some(Token {
                kind: TokenKind::Eof,
                ..
            })
        ));

        // a name used anywhere in the source is never handed to a helper,
        // even when the helper is generated before the name is first mentioned
        let mut symbols = SymbolTable::new();
        for token in tokens.iter().filter(|token| token.kind == TokenKind::Name) {
            let name = token.span.as_str(src);
            if name.starts_with(RESERVED_PREFIX) {
                symbols.reserve(name);
            }
        }

        Parser {
            src,
            tokens,
            pos: 0,
            options,
            symbols,
            rules: SecondaryMap::new(),
            first_defined: None,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    /// The first token from the current position which isn't a newline.
    fn peek_significant(&self) -> &Token {
        let mut n = 0;
        while self.peek_nth(n).kind == TokenKind::Newline {
            n += 1;
        }
        self.peek_nth(n)
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.pos += 1;
        }
    }

    fn describe_next(&self) -> (String, Span) {
        let token = self.peek();
        (token.describe(self.src), token.span)
    }

    fn check_name(&self, name: &str, span: Span) -> Result<(), SpannedError> {
        if !self.options.allow_reserved_names && name.starts_with(RESERVED_PREFIX) {
            return Err(ParseErrorKind::ReservedName(name.to_owned()).at(span));
        }
        Ok(())
    }

    fn parse_grammar(&mut self) -> Result<(), SpannedError> {
        loop {
            self.skip_newlines();
            if self.peek().kind == TokenKind::Eof {
                return Ok(());
            }

            self.parse_rule()?;

            match self.peek().kind {
                TokenKind::Newline | TokenKind::Eof => {}
                _ => {
                    let (found, span) = self.describe_next();
                    return Err(ParseErrorKind::TrailingInput(found).at(span));
                }
            }
        }
    }

    fn parse_rule(&mut self) -> Result<(), SpannedError> {
        let name_token = self.bump();
        if name_token.kind != TokenKind::Name {
            let found = name_token.describe(self.src);
            return Err(ParseErrorKind::ExpectedRuleName(found).at(name_token.span));
        }

        let name = name_token.span.as_str(self.src);
        self.check_name(name, name_token.span)?;

        if self.peek().kind != TokenKind::Define {
            let (found, span) = self.describe_next();
            let kind = ParseErrorKind::ExpectedDefine {
                name: name.to_owned(),
                found,
            };
            return Err(kind.at(span));
        }
        self.bump();

        let id = self.symbols.intern(name, name_token.span);
        if self.rules[id].is_some() {
            return Err(ParseErrorKind::DuplicateRule(name.to_owned()).at(name_token.span));
        }
        self.first_defined.get_or_insert(id);

        self.skip_newlines();
        let alternatives = self.parse_alternation(id, false)?;

        trace!("rule '{name}' with {} alternatives", alternatives.len());
        self.rules[id] = Some(Rule {
            origin: RuleOrigin::Defined(name_token.span),
            alternatives,
        });

        Ok(())
    }

    /// Outside of parentheses the alternation ends at a newline, unless the next line starts with `|`.
    fn parse_alternation(
        &mut self,
        rule: RuleId,
        nested: bool,
    ) -> Result<Vec<Vec<Symbol>>, SpannedError> {
        let mut alternatives = vec![self.parse_sequence(rule, nested)?];
        loop {
            if nested || self.peek_significant().kind == TokenKind::Pipe {
                self.skip_newlines();
            }
            if self.peek().kind != TokenKind::Pipe {
                return Ok(alternatives);
            }
            self.bump();
            self.skip_newlines();
            alternatives.push(self.parse_sequence(rule, nested)?);
        }
    }

    fn parse_sequence(&mut self, rule: RuleId, nested: bool) -> Result<Vec<Symbol>, SpannedError> {
        let mut symbols = Vec::new();
        let mut terms = 0;

        loop {
            if nested {
                self.skip_newlines();
            }

            let token = self.peek().clone();
            let term = match token.kind {
                // start of the next rule
                TokenKind::Name if self.peek_nth(1).kind == TokenKind::Define => break,
                TokenKind::Name => {
                    let name = token.span.as_str(self.src);
                    self.check_name(name, token.span)?;
                    self.bump();
                    vec![Symbol::Rule(self.symbols.intern(name, token.span))]
                }
                TokenKind::Literal(chars) => {
                    self.bump();
                    chars
                        .into_iter()
                        .map(|c| Symbol::Chars(CharSet::single(c)))
                        .collect()
                }
                TokenKind::Class(set) => {
                    self.bump();
                    vec![Symbol::Chars(set)]
                }
                TokenKind::Any => {
                    self.bump();
                    vec![Symbol::Chars(CharSet::any())]
                }
                TokenKind::LParen => {
                    self.bump();
                    self.parse_group(rule, token.span)?
                }
                TokenKind::RParen if !nested => {
                    return Err(ParseErrorKind::UnmatchedParen.at(token.span));
                }
                TokenKind::Pipe | TokenKind::RParen | TokenKind::Newline | TokenKind::Eof => break,
                TokenKind::Define
                | TokenKind::Question
                | TokenKind::Star
                | TokenKind::Plus
                | TokenKind::Repeat { .. } => {
                    let found = token.describe(self.src);
                    return Err(ParseErrorKind::ExpectedTerm(found).at(token.span));
                }
            };

            terms += 1;
            let span = token.span.join(self.tokens[self.pos - 1].span);
            self.parse_postfix(rule, term, span, &mut symbols)?;
        }

        if terms == 0 {
            return Err(ParseErrorKind::EmptyAlternative.at(self.peek().span));
        }

        Ok(symbols)
    }

    /// Called after the opening parenthesis. A group with a single alternative is spliced into
    /// the surrounding sequence, otherwise it becomes a helper rule.
    fn parse_group(&mut self, rule: RuleId, open: Span) -> Result<Vec<Symbol>, SpannedError> {
        let limit = self.options.max_nesting;
        if self.depth >= limit {
            return Err(ParseErrorKind::NestingTooDeep { limit }.at(open));
        }
        self.depth += 1;
        let mut alternatives = self.parse_alternation(rule, true)?;
        self.depth -= 1;

        let close = self.bump();
        if close.kind != TokenKind::RParen {
            return Err(ParseErrorKind::UnclosedGroup.at(open));
        }

        if alternatives.len() == 1 {
            return Ok(alternatives.pop().unwrap_or_default());
        }

        let helper = self.helper(rule, open.join(close.span));
        self.define_helper(helper, Synthesized::Group, alternatives);
        Ok(vec![Symbol::Rule(helper)])
    }

    /// Appends `term` to `out`, expanded according to a following postfix operator.
    fn parse_postfix(
        &mut self,
        rule: RuleId,
        term: Vec<Symbol>,
        span: Span,
        out: &mut Vec<Symbol>,
    ) -> Result<(), SpannedError> {
        let (min, max) = match self.peek().kind {
            TokenKind::Question => (0, Some(1)),
            TokenKind::Star => (0, None),
            TokenKind::Plus => (1, None),
            TokenKind::Repeat { min, max } => (min, max),
            _ => {
                out.extend(term);
                return Ok(());
            }
        };
        let operator = self.bump();

        if term.is_empty() {
            return Err(ParseErrorKind::EmptyRepetition.at(operator.span));
        }
        if let Some(max) = max {
            if min > max {
                return Err(ParseErrorKind::InvalidRepetitionBounds { min, max }.at(operator.span));
            }
        }
        let count = max.unwrap_or(min);
        let limit = self.options.max_repetition;
        if count > limit {
            return Err(ParseErrorKind::RepetitionTooLarge { count, limit }.at(operator.span));
        }

        self.expand_repetition(rule, term, min, max, span.join(operator.span), out);
        Ok(())
    }

    /// `min` copies of `term`, then either a `*` helper (`R ::= term R | ""`) when unbounded or a
    /// chain of `max - min` optional helpers (`R1 ::= term R2 | ""`, ..., `Rk ::= term | ""`).
    fn expand_repetition(
        &mut self,
        rule: RuleId,
        term: Vec<Symbol>,
        min: u32,
        max: Option<u32>,
        span: Span,
        out: &mut Vec<Symbol>,
    ) {
        for _ in 0..min {
            out.extend(term.iter().cloned());
        }

        match max {
            None => {
                let helper = self.helper(rule, span);
                let mut body = term;
                body.push(Symbol::Rule(helper));
                self.define_helper(helper, Synthesized::Repeat, vec![body, Vec::new()]);
                out.push(Symbol::Rule(helper));
            }
            Some(max) if max > min => {
                let chain: Vec<RuleId> = (min..max).map(|_| self.helper(rule, span)).collect();
                for (i, &helper) in chain.iter().enumerate() {
                    let mut body = term.clone();
                    if let Some(&next) = chain.get(i + 1) {
                        body.push(Symbol::Rule(next));
                    }
                    self.define_helper(helper, Synthesized::Optional, vec![body, Vec::new()]);
                }
                out.push(Symbol::Rule(chain[0]));
            }
            Some(_) => {}
        }
    }

    fn helper(&mut self, rule: RuleId, span: Span) -> RuleId {
        let base = self.symbols.name(rule).to_owned();
        self.symbols.generate(&base, span)
    }

    fn define_helper(&mut self, id: RuleId, kind: Synthesized, alternatives: Vec<Vec<Symbol>>) {
        debug!("synthesized {kind:?} rule '{}'", self.symbols.name(id));
        self.rules[id] = Some(Rule {
            origin: RuleOrigin::Synthesized(kind),
            alternatives,
        });
    }

    fn finish(self) -> Result<Grammar, SpannedError> {
        let Some(first) = self.first_defined else {
            return Err(ParseErrorKind::NoRules.at(Span::at(linemap::end_offset(self.src))));
        };

        let rules = check::resolve_rules(&self.symbols, self.rules)?;

        let root = match &self.options.root {
            Some(name) => self
                .symbols
                .get(name)
                .ok_or_else(|| ParseErrorKind::MissingRoot(name.clone()).at(Span::at(0)))?,
            None => first,
        };

        let grammar = Grammar {
            symbols: self.symbols,
            rules,
            root,
        };

        check::check_left_recursion(&grammar, self.options.left_recursion)?;

        for id in grammar.unreachable_rules() {
            warn!(
                "rule '{}' is unreachable from '{}'",
                grammar.name(id),
                grammar.name(root)
            );
        }

        debug!(
            "parsed {} rules ({} synthesized), root '{}'",
            grammar.len(),
            grammar.iter().filter(|(_, _, rule)| rule.is_synthesized()).count(),
            grammar.name(root)
        );

        Ok(grammar)
    }
}
