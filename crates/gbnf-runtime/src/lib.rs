//! Types shared between the grammar compiler and whatever walks the compiled rules.
//!
//! The compiler hands out one element slice per rule. Every slice lists the rule's
//! alternatives separated by [`Element::Alt`] and is terminated by [`Element::End`].
//! Terminals point back into the owning grammar, so a flattened table can never
//! outlive it. [`RawElement`] is the same layout encoded as plain integers, matching
//! llama.cpp's `llama_grammar_element`.

pub mod chars;
pub mod element;

pub use chars::{CharRange, CharSet};
pub use element::{Element, ElementType, RawElement};

use cranelift_entity::entity_impl;

/// Identity of a rule, assigned in order of first mention and never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RuleId(u32);

entity_impl! { RuleId }

#[test]
fn test_rule_id_roundtrip() {
    use cranelift_entity::EntityRef;

    for &index in &[0u32, 1, 2, 1 << 20] {
        let id = RuleId::from_u32(index);
        assert_eq!(id.as_u32(), index);
        assert_eq!(id.index(), index as usize);
        assert_eq!(RuleId::new(index as usize), id);
    }
}
