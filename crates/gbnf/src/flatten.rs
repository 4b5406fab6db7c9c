use std::ops::Range;

use cranelift_entity::{EntityRef, PrimaryMap};
use gbnf_runtime::{Element, RawElement, RuleId};
use serde::{Deserialize, Serialize};

use crate::grammar::Grammar;

/// Every rule as one contiguous slice: alternatives separated by [`Element::Alt`] and
/// terminated by a single [`Element::End`].
#[derive(Clone, Debug)]
pub struct FlatRules<'g> {
    grammar: &'g Grammar,
    elements: Vec<Element<'g>>,
    ranges: PrimaryMap<RuleId, Range<usize>>,
}

impl<'g> FlatRules<'g> {
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }
    pub fn root(&self) -> RuleId {
        self.grammar.root()
    }
    pub fn len(&self) -> usize {
        self.ranges.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
    pub fn rule(&self, id: RuleId) -> &[Element<'g>] {
        &self.elements[self.ranges[id].clone()]
    }
    /// The alternatives of a rule without separators and terminator.
    pub fn bodies(&self, id: RuleId) -> impl Iterator<Item = &[Element<'g>]> + '_ {
        let rule = self.rule(id);
        debug_assert!(rule.last().is_some_and(|element| element.is_end()));
        rule[..rule.len() - 1].split(|element| element.is_alt())
    }
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &[Element<'g>])> + '_ {
        self.ranges
            .iter()
            .map(|(id, range)| (id, &self.elements[range.clone()]))
    }
    pub fn to_raw(&self) -> RawRules {
        let rules = self
            .iter()
            .map(|(_, elements)| {
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    element.encode(&mut out);
                }
                out
            })
            .collect();

        RawRules {
            rules,
            root: self.root().as_u32(),
        }
    }
}

/// The llama.cpp `llama_grammar_element` encoding of a grammar, one array per rule identity.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RawRules {
    pub rules: Vec<Vec<RawElement>>,
    pub root: u32,
}

impl RawRules {
    pub fn rule(&self, id: RuleId) -> &[RawElement] {
        &self.rules[id.index()]
    }
    pub fn root(&self) -> RuleId {
        RuleId::from_u32(self.root)
    }
    pub fn len(&self) -> usize {
        self.rules.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
    /// Pointers to the start of every rule, the layout `llama_grammar_init` takes.
    ///
    /// The pointers are only valid while `self` is alive and unmodified.
    pub fn c_rules(&self) -> Vec<*const RawElement> {
        self.rules.iter().map(|rule| rule.as_ptr()).collect()
    }
}

impl Grammar {
    pub fn flatten(&self) -> FlatRules<'_> {
        let capacity = self
            .rules
            .values()
            .map(|rule| rule.alternatives.iter().map(|body| body.len() + 1).sum::<usize>())
            .sum();

        let mut elements = Vec::with_capacity(capacity);
        let mut ranges = PrimaryMap::with_capacity(self.len());

        for (id, rule) in self.rules.iter() {
            let start = elements.len();
            for (i, body) in rule.alternatives.iter().enumerate() {
                if i > 0 {
                    elements.push(Element::Alt);
                }
                elements.extend(body.iter().map(|symbol| symbol.as_element()));
            }
            elements.push(Element::End);

            let pushed = ranges.push(start..elements.len());
            debug_assert_eq!(pushed, id);
        }

        FlatRules {
            grammar: self,
            elements,
            ranges,
        }
    }
    pub fn to_raw(&self) -> RawRules {
        self.flatten().to_raw()
    }
}
