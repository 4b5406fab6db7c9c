use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{chars::CharSet, RuleId};

/// One entry of a flattened rule.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Element<'g> {
    /// Terminates the rule.
    End,
    /// Separates two alternatives of the same rule.
    Alt,
    Rule(RuleId),
    Chars(&'g CharSet),
}

impl<'g> Element<'g> {
    pub fn is_end(self) -> bool {
        matches!(self, Element::End)
    }
    pub fn is_alt(self) -> bool {
        matches!(self, Element::Alt)
    }
    pub fn encode(self, out: &mut Vec<RawElement>) {
        match self {
            Element::End => out.push(RawElement::new(ElementType::End, 0)),
            Element::Alt => out.push(RawElement::new(ElementType::Alt, 0)),
            Element::Rule(id) => out.push(RawElement::new(ElementType::RuleRef, id.as_u32())),
            Element::Chars(set) => set.encode(out),
        }
    }
}

/// Tags of `llama_grammar_element`, with the same discriminants.
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    End = 0,
    Alt = 1,
    RuleRef = 2,
    Char = 3,
    CharNot = 4,
    /// Modifies the preceding `Char`, `CharNot` or `CharAlt` into an inclusive range.
    CharRngUpper = 5,
    /// Adds another alternative character to the preceding character set.
    CharAlt = 6,
    CharAny = 7,
}

impl ElementType {
    pub fn name(self) -> &'static str {
        match self {
            ElementType::End => "END",
            ElementType::Alt => "ALT",
            ElementType::RuleRef => "RULE_REF",
            ElementType::Char => "CHAR",
            ElementType::CharNot => "CHAR_NOT",
            ElementType::CharRngUpper => "CHAR_RNG_UPPER",
            ElementType::CharAlt => "CHAR_ALT",
            ElementType::CharAny => "CHAR_ANY",
        }
    }
}

impl TryFrom<u32> for ElementType {
    type Error = u32;
    fn try_from(value: u32) -> Result<ElementType, u32> {
        let kind = match value {
            0 => ElementType::End,
            1 => ElementType::Alt,
            2 => ElementType::RuleRef,
            3 => ElementType::Char,
            4 => ElementType::CharNot,
            5 => ElementType::CharRngUpper,
            6 => ElementType::CharAlt,
            7 => ElementType::CharAny,
            _ => return Err(value),
        };
        Ok(kind)
    }
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RawElement {
    pub kind: ElementType,
    /// Code point for character kinds, rule identity for `RuleRef`, zero otherwise.
    pub value: u32,
}

impl RawElement {
    pub const fn new(kind: ElementType, value: u32) -> RawElement {
        RawElement { kind, value }
    }
}

impl fmt::Display for RawElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.kind.name();
        match self.kind {
            ElementType::End | ElementType::Alt | ElementType::CharAny => f.write_str(name),
            ElementType::RuleRef => write!(f, "{name}({})", self.value),
            ElementType::Char
            | ElementType::CharNot
            | ElementType::CharRngUpper
            | ElementType::CharAlt => match char::from_u32(self.value) {
                Some(c) => write!(f, "{name}({c:?})"),
                None => write!(f, "{name}(U+{:04X})", self.value),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_type_discriminants() {
        for value in 0..8 {
            let kind = ElementType::try_from(value).unwrap();
            assert_eq!(kind as u32, value);
        }
        assert_eq!(ElementType::try_from(8), Err(8));
    }

    #[test]
    fn raw_layout_is_two_words() {
        assert_eq!(std::mem::size_of::<RawElement>(), 8);
    }

    #[test]
    fn encode_structural() {
        let mut out = Vec::new();
        Element::Rule(RuleId::from_u32(3)).encode(&mut out);
        Element::Alt.encode(&mut out);
        Element::End.encode(&mut out);
        assert_eq!(
            out,
            [
                RawElement::new(ElementType::RuleRef, 3),
                RawElement::new(ElementType::Alt, 0),
                RawElement::new(ElementType::End, 0),
            ]
        );
    }

    #[test]
    fn display_raw() {
        assert_eq!(RawElement::new(ElementType::Char, 'a' as u32).to_string(), "CHAR('a')");
        assert_eq!(RawElement::new(ElementType::RuleRef, 2).to_string(), "RULE_REF(2)");
        assert_eq!(RawElement::new(ElementType::End, 0).to_string(), "END");
    }
}
