use serde::{Deserialize, Serialize};

use crate::element::{ElementType, RawElement};

/// Inclusive range of code points.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct CharRange {
    pub start: char,
    pub end: char,
}

impl CharRange {
    pub fn new(start: char, end: char) -> CharRange {
        debug_assert!(start <= end, "Inverted range");
        CharRange { start, end }
    }
    pub fn single(c: char) -> CharRange {
        CharRange { start: c, end: c }
    }
    pub fn is_single(self) -> bool {
        self.start == self.end
    }
    pub fn contains(self, c: char) -> bool {
        self.start <= c && c <= self.end
    }
}

/// A character terminal: a union of ranges, optionally negated.
///
/// The negated empty set is the "any character" terminal.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct CharSet {
    negated: bool,
    ranges: Vec<CharRange>,
}

impl CharSet {
    pub fn new(ranges: Vec<CharRange>, negated: bool) -> CharSet {
        assert!(
            negated || !ranges.is_empty(),
            "A non-negated set needs at least one range"
        );
        CharSet { negated, ranges }
    }
    pub fn single(c: char) -> CharSet {
        CharSet {
            negated: false,
            ranges: vec![CharRange::single(c)],
        }
    }
    pub fn any() -> CharSet {
        CharSet {
            negated: true,
            ranges: Vec::new(),
        }
    }
    pub fn is_negated(&self) -> bool {
        self.negated
    }
    pub fn is_any(&self) -> bool {
        self.negated && self.ranges.is_empty()
    }
    pub fn ranges(&self) -> &[CharRange] {
        &self.ranges
    }
    /// Returns the character if this set matches exactly one.
    pub fn as_single(&self) -> Option<char> {
        match (self.negated, self.ranges.as_slice()) {
            (false, [range]) if range.is_single() => Some(range.start),
            _ => None,
        }
    }
    pub fn matches(&self, c: char) -> bool {
        self.ranges.iter().any(|range| range.contains(c)) != self.negated
    }
    pub fn encode(&self, out: &mut Vec<RawElement>) {
        if self.is_any() {
            out.push(RawElement::new(ElementType::CharAny, 0));
            return;
        }

        for (i, range) in self.ranges.iter().enumerate() {
            let kind = match (i, self.negated) {
                (0, true) => ElementType::CharNot,
                (0, false) => ElementType::Char,
                _ => ElementType::CharAlt,
            };
            out.push(RawElement::new(kind, range.start as u32));
            if !range.is_single() {
                out.push(RawElement::new(ElementType::CharRngUpper, range.end as u32));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ranges() {
        let set = CharSet::new(vec![CharRange::new('a', 'z'), CharRange::single('_')], false);
        assert!(set.matches('a'));
        assert!(set.matches('q'));
        assert!(set.matches('_'));
        assert!(!set.matches('A'));
        assert_eq!(set.as_single(), None);
    }

    #[test]
    fn matches_negated() {
        let set = CharSet::new(vec![CharRange::single('"')], true);
        assert!(!set.matches('"'));
        assert!(set.matches('x'));
        assert!(set.matches('\n'));

        let any = CharSet::any();
        assert!(any.is_any());
        assert!(any.matches('\u{10FFFF}'));
    }

    #[test]
    fn encode_like_llama() {
        let mut out = Vec::new();
        CharSet::new(vec![CharRange::new('a', 'z'), CharRange::single('0')], true).encode(&mut out);
        assert_eq!(
            out,
            [
                RawElement::new(ElementType::CharNot, 'a' as u32),
                RawElement::new(ElementType::CharRngUpper, 'z' as u32),
                RawElement::new(ElementType::CharAlt, '0' as u32),
            ]
        );

        out.clear();
        CharSet::any().encode(&mut out);
        assert_eq!(out, [RawElement::new(ElementType::CharAny, 0)]);
    }
}
