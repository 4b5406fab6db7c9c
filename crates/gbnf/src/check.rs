use cranelift_bitset::CompoundBitSet;
use cranelift_entity::{EntityRef, EntitySet, PrimaryMap, SecondaryMap};
use gbnf_runtime::RuleId;
use log::warn;

use crate::{
    error::{ErrorKind, ParseErrorKind, SpannedError},
    grammar::{Grammar, Rule, RuleOrigin, Symbol},
    options::LeftRecursion,
    span::Spanned,
    symbols::SymbolTable,
};

/// Moves the parsed definitions into a dense table, failing on the lowest identity
/// which was referenced but never defined.
pub fn resolve_rules(
    symbols: &SymbolTable,
    mut definitions: SecondaryMap<RuleId, Option<Rule>>,
) -> Result<PrimaryMap<RuleId, Rule>, SpannedError> {
    let mut rules = PrimaryMap::with_capacity(symbols.len());
    for id in symbols.ids() {
        let Some(rule) = definitions[id].take() else {
            let kind = ErrorKind::UndefinedRule(symbols.name(id).to_owned());
            return Err(Spanned::new(kind, symbols.first_mention(id)));
        };
        let pushed = rules.push(rule);
        debug_assert_eq!(pushed, id);
    }
    Ok(rules)
}

pub fn check_left_recursion(grammar: &Grammar, policy: LeftRecursion) -> Result<(), SpannedError> {
    if policy == LeftRecursion::Allow {
        return Ok(());
    }

    for id in grammar.left_recursive_rules() {
        let name = grammar.name(id);
        if policy == LeftRecursion::Reject {
            let span = match grammar.rule(id).origin {
                RuleOrigin::Defined(span) => span,
                RuleOrigin::Synthesized(_) => grammar.symbols.first_mention(id),
            };
            return Err(ParseErrorKind::LeftRecursion(name.to_owned()).at(span));
        }
        warn!("rule '{name}' is left recursive");
    }

    Ok(())
}

/// Rules which can match the empty string.
fn nullable_rules(grammar: &Grammar) -> EntitySet<RuleId> {
    let mut nullable = EntitySet::with_capacity(grammar.len());
    loop {
        let mut changed = false;
        for (id, _, rule) in grammar.iter() {
            if nullable.contains(id) {
                continue;
            }
            let is_nullable = rule.alternatives.iter().any(|body| {
                body.iter()
                    .all(|symbol| matches!(symbol, Symbol::Rule(r) if nullable.contains(*r)))
            });
            if is_nullable {
                nullable.insert(id);
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

/// Rules that can be entered before `rule` consumes any input.
fn collect_prefix_rules(rule: &Rule, nullable: &EntitySet<RuleId>, out: &mut Vec<RuleId>) {
    for body in &rule.alternatives {
        for symbol in body {
            let Symbol::Rule(id) = *symbol else {
                break;
            };
            if !out.contains(&id) {
                out.push(id);
            }
            if !nullable.contains(id) {
                break;
            }
        }
    }
}

/// Depth first search from `start` with an explicit stack, prefix chains can be as long as
/// the grammar.
fn find_prefix_cycles(
    start: RuleId,
    prefix_rules: &SecondaryMap<RuleId, Vec<RuleId>>,
    visited: &mut EntitySet<RuleId>,
    on_stack: &mut SecondaryMap<RuleId, bool>,
    found: &mut Vec<RuleId>,
) {
    if visited.contains(start) {
        return;
    }
    visited.insert(start);
    on_stack[start] = true;

    // rules on the current path, each with the index of its next prefix edge
    let mut stack = vec![(start, 0)];
    while let Some((id, edge)) = stack.last_mut() {
        let id = *id;
        let Some(&next) = prefix_rules[id].get(*edge) else {
            on_stack[id] = false;
            stack.pop();
            continue;
        };
        *edge += 1;

        if on_stack[next] {
            //      /next
            // A -> B -> C -> D
            //      ↑________|
            if !found.contains(&next) {
                found.push(next);
            }
        } else if !visited.contains(next) {
            visited.insert(next);
            on_stack[next] = true;
            stack.push((next, 0));
        }
    }
}

impl Grammar {
    /// Rules that can reach themselves without consuming input, at least one per cycle.
    pub fn left_recursive_rules(&self) -> Vec<RuleId> {
        let nullable = nullable_rules(self);

        let mut prefix_rules = SecondaryMap::new();
        for (id, _, rule) in self.iter() {
            let mut prefix = Vec::new();
            collect_prefix_rules(rule, &nullable, &mut prefix);
            prefix_rules[id] = prefix;
        }

        let mut visited = EntitySet::with_capacity(self.len());
        let mut on_stack = SecondaryMap::with_capacity(self.len());
        let mut found = Vec::new();
        for (id, ..) in self.iter() {
            find_prefix_cycles(id, &prefix_rules, &mut visited, &mut on_stack, &mut found);
        }
        found
    }

    /// Rules that no derivation from the root can reference.
    pub fn unreachable_rules(&self) -> Vec<RuleId> {
        let mut reached = CompoundBitSet::with_capacity(self.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if reached.contains(id.index()) {
                continue;
            }
            reached.insert(id.index());
            for body in &self.rules[id].alternatives {
                for symbol in body {
                    if let Symbol::Rule(next) = symbol {
                        stack.push(*next);
                    }
                }
            }
        }

        self.rules
            .keys()
            .filter(|id| !reached.contains(id.index()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Grammar, LeftRecursion, ParseOptions};

    fn names(grammar: &Grammar, ids: Vec<gbnf_runtime::RuleId>) -> Vec<&str> {
        ids.into_iter().map(|id| grammar.name(id)).collect()
    }

    fn allow(src: &str) -> Grammar {
        let options = ParseOptions {
            left_recursion: LeftRecursion::Allow,
            ..Default::default()
        };
        Grammar::parse_with(src, &options).unwrap()
    }

    #[test]
    fn direct_and_indirect_left_recursion() {
        let grammar = allow("root ::= a\na ::= b \"x\" | \"y\"\nb ::= a \"z\"");
        assert_eq!(names(&grammar, grammar.left_recursive_rules()), ["a"]);

        let grammar = allow("root ::= root \"x\" | \"y\"");
        assert_eq!(names(&grammar, grammar.left_recursive_rules()), ["root"]);
    }

    #[test]
    fn left_recursion_through_nullable_prefix() {
        let grammar = allow("root ::= opt root \"x\" | \"y\"\nopt ::= \"o\" | \"\"");
        assert_eq!(names(&grammar, grammar.left_recursive_rules()), ["root"]);

        let grammar = allow("root ::= \"a\" root | \"\"");
        assert!(grammar.left_recursive_rules().is_empty());
    }

    #[test]
    fn long_prefix_chain() {
        const RULES: usize = 100_000;
        let chain = |last: &str| {
            let mut src = String::new();
            for i in 0..RULES - 1 {
                src.push_str(&format!("r{i} ::= r{} \"x\"\n", i + 1));
            }
            src.push_str(&format!("r{} ::= {last}\n", RULES - 1));
            src
        };

        let grammar = allow(&chain("\"y\""));
        assert!(grammar.left_recursive_rules().is_empty());

        let grammar = allow(&chain("r0 | \"y\""));
        assert_eq!(names(&grammar, grammar.left_recursive_rules()), ["r0"]);
    }

    #[test]
    fn unreachable() {
        let grammar = Grammar::parse("root ::= a\na ::= \"a\"\nb ::= \"b\" c\nc ::= \"c\"").unwrap();
        assert_eq!(names(&grammar, grammar.unreachable_rules()), ["b", "c"]);

        let grammar = Grammar::parse("root ::= \"x\"+").unwrap();
        assert!(grammar.unreachable_rules().is_empty());
    }
}
