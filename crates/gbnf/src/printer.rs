use std::fmt::{Display, Write};

use gbnf_runtime::{Element, ElementType, RawElement};

use crate::{
    grammar::{Grammar, Symbol},
    literal::{write_class, write_literal},
};

impl Grammar {
    /// Writes the grammar back in source form, one rule per line in identity order.
    pub fn print(&self, buf: &mut dyn Write) -> std::fmt::Result {
        for (_, name, rule) in self.iter() {
            write!(buf, "{name} ::=")?;
            for (i, body) in rule.alternatives.iter().enumerate() {
                if i > 0 {
                    buf.write_str(" |")?;
                }
                self.print_body(buf, body)?;
            }
            buf.write_char('\n')?;
        }
        Ok(())
    }

    fn print_body(&self, buf: &mut dyn Write, body: &[Symbol]) -> std::fmt::Result {
        if body.is_empty() {
            return buf.write_str(" \"\"");
        }

        let mut run = Vec::new();
        for symbol in body {
            if let Symbol::Chars(set) = symbol {
                if let Some(c) = set.as_single() {
                    run.push(c);
                    continue;
                }
            }

            if !run.is_empty() {
                buf.write_char(' ')?;
                write_literal(buf, &run)?;
                run.clear();
            }

            buf.write_char(' ')?;
            match symbol {
                Symbol::Chars(set) => write_class(buf, set)?,
                Symbol::Rule(id) => buf.write_str(self.name(*id))?,
            }
        }

        if !run.is_empty() {
            buf.write_char(' ')?;
            write_literal(buf, &run)?;
        }
        Ok(())
    }

    /// Writes the llama.cpp encoding of every rule, `name ::= [CHAR 'a'] [RULE_REF x] [END]`.
    pub fn print_flat(&self, buf: &mut dyn Write) -> std::fmt::Result {
        let flat = self.flatten();
        let mut raw = Vec::new();
        for (id, elements) in flat.iter() {
            write!(buf, "{} ::=", self.name(id))?;
            for element in elements {
                raw.clear();
                element.encode(&mut raw);
                for &RawElement { kind, value } in &raw {
                    match *element {
                        Element::Rule(target) => write!(buf, " [{} {}]", kind.name(), self.name(target))?,
                        _ => match kind {
                            ElementType::End | ElementType::Alt | ElementType::CharAny => {
                                write!(buf, " [{}]", kind.name())?
                            }
                            _ => match char::from_u32(value) {
                                Some(c) => write!(buf, " [{} {c:?}]", kind.name())?,
                                None => write!(buf, " [{} {value}]", kind.name())?,
                            },
                        },
                    }
                }
            }
            buf.write_char('\n')?;
        }
        Ok(())
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.print(f)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Grammar, ParseOptions};

    #[test]
    fn prints_helpers_and_merges_literals() {
        let grammar = Grammar::parse("root ::= \"hi\" [a] (\"x\" | [^\\n\"]) .*\n").unwrap();
        assert_eq!(
            grammar.to_string(),
            "root ::= \"hia\" _root_1 _root_2\n\
             _root_1 ::= \"x\" | [^\\n\"]\n\
             _root_2 ::= . _root_2 | \"\"\n"
        );
    }

    #[test]
    fn prints_escapes() {
        let grammar = Grammar::parse(r#"root ::= "a\"\\\t" [\]\-z] "\x01""#).unwrap();
        assert_eq!(
            grammar.to_string(),
            "root ::= \"a\\\"\\\\\\t\" [\\]\\-z] \"\\x01\"\n"
        );
    }

    #[test]
    fn printed_grammar_reparses() {
        let src = "root ::= item (\",\" item)* | \"[\" [^\\]] \"]\"\nitem ::= [a-z]{1,3} \"\"";
        let grammar = Grammar::parse(src).unwrap();
        let printed = grammar.to_string();
        let options = ParseOptions::default().reparse();
        let reparsed = Grammar::parse_with(&printed, &options).unwrap();
        assert!(grammar.structurally_eq(&reparsed), "{printed}");
        assert_eq!(reparsed.to_string(), printed);
    }

    #[test]
    fn flat_dump() {
        let grammar = Grammar::parse("root ::= [a-c] x | .\nx ::= \"y\"").unwrap();
        let mut out = String::new();
        grammar.print_flat(&mut out).unwrap();
        assert_eq!(
            out,
            "root ::= [CHAR 'a'] [CHAR_RNG_UPPER 'c'] [RULE_REF x] [ALT] [CHAR_ANY] [END]\n\
             x ::= [CHAR 'y'] [END]\n"
        );
    }
}
