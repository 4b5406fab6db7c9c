use cranelift_entity::PrimaryMap;
use gbnf_runtime::{CharSet, Element, RuleId};

use crate::{span::Span, symbols::SymbolTable};

/// An element of a rule body.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Symbol {
    Chars(CharSet),
    Rule(RuleId),
}

impl Symbol {
    pub fn as_element(&self) -> Element<'_> {
        match self {
            Symbol::Chars(set) => Element::Chars(set),
            Symbol::Rule(id) => Element::Rule(*id),
        }
    }
}

/// The construct a helper rule was generated for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Synthesized {
    /// Parenthesized group with several alternatives.
    Group,
    /// `?` or the optional tail of `{m,n}`
    Optional,
    /// `*`, `+` or `{m,}`
    Repeat,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RuleOrigin {
    /// Written in the source, the span covers the rule name.
    Defined(Span),
    Synthesized(Synthesized),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Rule {
    pub origin: RuleOrigin,
    /// Bodies in source order, an empty body matches the empty string.
    pub alternatives: Vec<Vec<Symbol>>,
}

impl Rule {
    pub fn is_synthesized(&self) -> bool {
        matches!(self.origin, RuleOrigin::Synthesized(_))
    }
}

/// A parsed grammar in which every reference points to a defined rule.
#[derive(Clone, Debug)]
pub struct Grammar {
    pub(crate) symbols: SymbolTable,
    pub(crate) rules: PrimaryMap<RuleId, Rule>,
    pub(crate) root: RuleId,
}

impl Grammar {
    pub fn root(&self) -> RuleId {
        self.root
    }
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.symbols.get(name)
    }
    pub fn name(&self, id: RuleId) -> &str {
        self.symbols.name(id)
    }
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }
    pub fn get_rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(self.rule_id(name)?)
    }
    pub fn len(&self) -> usize {
        self.rules.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &str, &Rule)> + '_ {
        self.rules
            .iter()
            .map(|(id, rule)| (id, self.symbols.name(id), rule))
    }
    /// Compares rules by name rather than identity, so grammars that number their rules
    /// differently can still be equal.
    pub fn structurally_eq(&self, other: &Grammar) -> bool {
        if self.len() != other.len() || self.name(self.root) != other.name(other.root) {
            return false;
        }

        self.iter().all(|(_, name, rule)| {
            let Some(other_rule) = other.get_rule(name) else {
                return false;
            };
            rule.alternatives.len() == other_rule.alternatives.len()
                && std::iter::zip(&rule.alternatives, &other_rule.alternatives).all(|(a, b)| {
                    a.len() == b.len()
                        && std::iter::zip(a, b).all(|pair| match pair {
                            (Symbol::Chars(a), Symbol::Chars(b)) => a == b,
                            (Symbol::Rule(a), Symbol::Rule(b)) => {
                                self.name(*a) == other.name(*b)
                            }
                            _ => false,
                        })
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Grammar, Symbol};

    #[test]
    fn accessors() {
        let grammar = Grammar::parse("root ::= item+\nitem ::= \"a\" | [0-9]").unwrap();
        let item = grammar.rule_id("item").unwrap();
        assert_eq!(grammar.name(item), "item");
        assert_eq!(grammar.len(), 3);
        assert_eq!(grammar.rule(item).alternatives.len(), 2);
        assert!(!grammar.rule(item).is_synthesized());
        assert!(grammar.get_rule("_root_2").unwrap().is_synthesized());
        assert!(grammar.get_rule("missing").is_none());
        assert_eq!(
            grammar.iter().map(|(_, name, _)| name).collect::<Vec<_>>(),
            ["root", "item", "_root_2"]
        );
    }

    #[test]
    fn structural_equality_ignores_numbering() {
        let a = Grammar::parse("root ::= x y\nx ::= \"x\"\ny ::= \"y\"").unwrap();
        let b = Grammar::parse("root ::= x y\ny ::= \"y\"\nx ::= \"x\"").unwrap();
        assert!(a.structurally_eq(&b));

        let c = Grammar::parse("root ::= y x\nx ::= \"x\"\ny ::= \"y\"").unwrap();
        assert!(!a.structurally_eq(&c));

        let d = Grammar::parse("root ::= x y\nx ::= \"x\"\ny ::= \"z\"").unwrap();
        assert!(!a.structurally_eq(&d));
        assert!(matches!(
            d.get_rule("y").unwrap().alternatives[0][0],
            Symbol::Chars(_)
        ));
    }
}
