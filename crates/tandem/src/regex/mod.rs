//! Regular expression algebra used to accelerate character-class and literal
//! matching.
//!
//! A [`Regex`] is an immutable tree description; [`Regex::compile`] lowers it
//! to a [`Compiled`] matcher with the `test`/`matches` contract. The algebra
//! is deliberately small: everything the combinator layer needs compiles to a
//! deterministic matcher without NFA construction.

mod compiled;

pub use compiled::{Compiled, NEED_MORE_INPUT, NOT_MATCHED};

use crate::bitset::BitSet;

/// Regex description. All constructors produce trees; there are no cycles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Regex {
    /// Matches the empty prefix, always consumes 0.
    Succeed,
    /// Matches a single code unit contained in the set.
    OneOf(BitSet),
    /// Both sides must match the same single prefix of equal length.
    And(Box<Regex>, Box<Regex>),
    /// Either side matches; the longer match wins, ties go left.
    Or(Box<Regex>, Box<Regex>),
    /// Match left, then right from the new index.
    Sequence(Box<Regex>, Box<Regex>),
    /// Greedy repetition. `min` defaults to 0, `max` to unbounded.
    Repeat {
        inner: Box<Regex>,
        min: Option<usize>,
        max: Option<usize>,
    },
}

const WHITESPACE_CHARS: [char; 6] = [' ', '\t', '\r', '\n', '\x0B', '\x0C'];

impl Regex {
    // -------------------------------------------------------------------------
    // Surface constructors
    // -------------------------------------------------------------------------

    /// A single literal character.
    pub fn char_(c: char) -> Regex {
        Regex::OneOf(BitSet::from_chars([c]))
    }

    /// A single character drawn from `chars`.
    pub fn char_in<I: IntoIterator<Item = char>>(chars: I) -> Regex {
        Regex::OneOf(BitSet::from_chars(chars))
    }

    /// A single character *not* drawn from `chars`.
    pub fn char_not_in<I: IntoIterator<Item = char>>(chars: I) -> Regex {
        Regex::OneOf(BitSet::from_chars(chars).complement())
    }

    /// Any single code unit.
    pub fn any_char() -> Regex {
        Regex::OneOf(BitSet::empty().complement())
    }

    /// A single decimal digit, `0..9`.
    pub fn any_digit() -> Regex {
        Regex::OneOf(BitSet::from_ranges(&[('0', '9')]))
    }

    /// A single ASCII letter, `A..Z` or `a..z`.
    pub fn any_letter() -> Regex {
        Regex::OneOf(BitSet::from_ranges(&[('A', 'Z'), ('a', 'z')]))
    }

    /// A single whitespace character: space, tab, CR, LF, VT or FF.
    pub fn any_whitespace() -> Regex {
        Regex::OneOf(BitSet::from_chars(WHITESPACE_CHARS))
    }

    /// A single letter or digit.
    pub fn any_alpha_numeric() -> Regex {
        Regex::OneOf(BitSet::from_ranges(&[('0', '9'), ('A', 'Z'), ('a', 'z')]))
    }

    /// One or more digits.
    pub fn digits() -> Regex {
        Regex::any_digit().at_least(1)
    }

    /// One or more letters.
    pub fn letters() -> Regex {
        Regex::any_letter().at_least(1)
    }

    /// One or more letters or digits.
    pub fn alpha_numerics() -> Regex {
        Regex::any_alpha_numeric().at_least(1)
    }

    /// Zero or more whitespace characters; matches the empty string too.
    pub fn whitespace() -> Regex {
        Regex::any_whitespace().at_least(0)
    }

    /// The literal string `s` as a chain of single-character matches.
    pub fn string(s: &str) -> Regex {
        s.chars()
            .map(Regex::char_)
            .reduce(|l, r| l.then(r))
            .unwrap_or(Regex::Succeed)
    }

    /// A single character satisfying `pred` (tested over 0..=255).
    pub fn filter<F: Fn(char) -> bool>(pred: F) -> Regex {
        Regex::OneOf(BitSet::from_chars(
            (0u32..256).filter_map(char::from_u32).filter(|c| pred(*c)),
        ))
    }

    // -------------------------------------------------------------------------
    // Combinators
    // -------------------------------------------------------------------------

    /// Sequence of two regexes.
    pub fn sequence(left: Regex, right: Regex) -> Regex {
        left.then(right)
    }

    /// Sequence: this regex, then `that`.
    pub fn then(self, that: Regex) -> Regex {
        Regex::Sequence(Box::new(self), Box::new(that))
    }

    /// Intersection of this regex and `that`.
    pub fn and(self, that: Regex) -> Regex {
        Regex::And(Box::new(self), Box::new(that))
    }

    /// Union of this regex and `that`; the longer match wins, ties go left.
    pub fn or(self, that: Regex) -> Regex {
        Regex::Or(Box::new(self), Box::new(that))
    }

    /// Greedy repetition with at least `n` occurrences.
    pub fn at_least(self, n: usize) -> Regex {
        Regex::Repeat { inner: Box::new(self), min: Some(n), max: None }
    }

    /// Greedy repetition with at most `n` occurrences.
    pub fn at_most(self, n: usize) -> Regex {
        Regex::Repeat { inner: Box::new(self), min: None, max: Some(n) }
    }

    /// Greedy repetition with between `min` and `max` occurrences.
    pub fn between(self, min: usize, max: usize) -> Regex {
        Regex::Repeat { inner: Box::new(self), min: Some(min), max: Some(max) }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// The implied character sequence, if this regex is a literal: a chain of
    /// singleton [`Regex::OneOf`] nodes joined by [`Regex::Sequence`]
    /// (`Succeed` is the empty literal).
    pub fn to_literal(&self) -> Option<Vec<char>> {
        match self {
            Regex::Succeed => Some(Vec::new()),
            Regex::OneOf(set) => set.single().map(|c| vec![c]),
            Regex::Sequence(l, r) => {
                let mut chars = l.to_literal()?;
                chars.extend(r.to_literal()?);
                Some(chars)
            }
            _ => None,
        }
    }

    /// Lower this description to a deterministic matcher.
    pub fn compile(&self) -> Compiled {
        compiled::compile(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_builds_literal_chain() {
        let r = Regex::string("ab");
        assert_eq!(
            r,
            Regex::char_('a').then(Regex::char_('b')),
        );
        assert_eq!(r.to_literal(), Some(vec!['a', 'b']));
    }

    #[test]
    fn empty_string_is_succeed() {
        assert_eq!(Regex::string(""), Regex::Succeed);
        assert_eq!(Regex::Succeed.to_literal(), Some(Vec::new()));
    }

    #[test]
    fn non_literals_have_no_literal_form() {
        assert_eq!(Regex::digits().to_literal(), None);
        assert_eq!(Regex::char_in("ab".chars()).to_literal(), None);
        assert_eq!(Regex::char_('a').or(Regex::char_('b')).to_literal(), None);
    }

    #[test]
    fn filter_matches_predicate() {
        let vowels = Regex::filter(|c| "aeiou".contains(c));
        let compiled = vowels.compile();
        assert!(compiled.matches("e"));
        assert!(!compiled.matches("x"));
    }

    #[test]
    fn whitespace_matches_empty() {
        assert!(Regex::whitespace().compile().matches(""));
        assert!(Regex::whitespace().compile().matches(" \t\r\n"));
    }
}
