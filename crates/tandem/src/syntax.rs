//! The `Syntax` façade: one declarative value that is both a parser and a
//! printer.
//!
//! Every combinator here builds both halves so they stay consistent: the
//! parser's value type is always the printer's input type. The free functions
//! at the bottom are the curated helper layer (`digit`, `string`, …) with
//! `String` as the error type, matching the character classes fixed by the
//! library: digit `0..9`, letter `A..Z ∪ a..z`, whitespace
//! `{space, tab, CR, LF, VT, FF}`.

use std::rc::Rc;

use crate::error::ParserError;
use crate::parser::{Implementation, Parser};
use crate::printer::Printer;
use crate::regex::Regex;
use crate::target::Target;
use crate::value::Either;

/// A paired parser and printer over the same value type.
pub struct Syntax<E, V> {
    parser: Parser<E, V>,
    printer: Printer<E, V>,
}

impl<E, V> Clone for Syntax<E, V> {
    fn clone(&self) -> Self {
        Self { parser: self.parser.clone(), printer: self.printer.clone() }
    }
}

impl<E, V> Syntax<E, V> {
    /// Pair a parser with a printer. The caller is responsible for keeping
    /// the two halves consistent; the combinators below do so by
    /// construction.
    pub fn new(parser: Parser<E, V>, printer: Printer<E, V>) -> Self {
        Self { parser, printer }
    }

    /// The parsing half.
    pub fn as_parser(&self) -> Parser<E, V> {
        self.parser.clone()
    }

    /// The printing half.
    pub fn as_printer(&self) -> Printer<E, V> {
        self.printer.clone()
    }
}

impl<E, V> Syntax<E, V>
where
    E: Clone + 'static,
    V: Clone + 'static,
{
    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Parse `input` with the stack-safe engine.
    pub fn parse_string(&self, input: &str) -> Result<V, ParserError<E>> {
        self.parser.parse_string(input)
    }

    /// Parse `input` with the selected engine; both engines produce equal
    /// results.
    pub fn parse_string_with(
        &self,
        input: &str,
        implementation: Implementation,
    ) -> Result<V, ParserError<E>> {
        self.parser.parse_string_with(input, implementation)
    }

    /// Print `value` into a string.
    pub fn print_string(&self, value: &V) -> Result<String, E> {
        self.printer.print_string(value)
    }

    /// Print `value` into a fresh chunk.
    pub fn print_to_chunk(&self, value: &V) -> Result<Vec<char>, E> {
        self.printer.print_to_chunk(value)
    }

    /// Print `value` into `target`.
    pub fn print_to_target<T: Target<char>>(
        &self,
        value: &V,
        target: &mut T,
    ) -> Result<(), E> {
        self.printer.print_to_target(value, target)
    }

    // -------------------------------------------------------------------------
    // Combinators
    // -------------------------------------------------------------------------

    /// Attach a name recorded in failure chains. Printing is unaffected.
    pub fn named(self, name: &str) -> Self {
        Self { parser: self.parser.named(name), printer: self.printer }
    }

    /// Restore the input position when this syntax fails to parse.
    pub fn backtrack(self) -> Self {
        Self { parser: self.parser.backtrack(), printer: self.printer }
    }

    /// Set the auto-backtracking flag for this subtree.
    pub fn set_auto_backtracking(self, enabled: bool) -> Self {
        Self { parser: self.parser.set_auto_backtracking(enabled), printer: self.printer }
    }

    /// Enable auto-backtracking for this subtree.
    pub fn auto_backtracking(self) -> Self {
        self.set_auto_backtracking(true)
    }

    /// Disable auto-backtracking for this subtree.
    pub fn manual_backtracking(self) -> Self {
        self.set_auto_backtracking(false)
    }

    /// Rewrite the user error on both halves.
    pub fn map_error<F>(self, f: F) -> Self
    where
        F: Fn(E) -> E + Clone + 'static,
    {
        let for_parser = f.clone();
        Self {
            parser: self.parser.map_error(move |error| error.map(&for_parser)),
            printer: self.printer.map_error(f),
        }
    }

    /// Map the value both ways: `to` after parsing, `from` before printing.
    pub fn transform<V2, To, From>(self, to: To, from: From) -> Syntax<E, V2>
    where
        V2: Clone + 'static,
        To: Fn(V) -> V2 + 'static,
        From: Fn(V2) -> V + 'static,
    {
        Syntax {
            parser: self.parser.transform(to),
            printer: self.printer.contramap(from),
        }
    }

    /// Map the value both ways with fallible functions.
    pub fn transform_either<V2, To, From>(self, to: To, from: From) -> Syntax<E, V2>
    where
        V2: Clone + 'static,
        To: Fn(V) -> Result<V2, E> + 'static,
        From: Fn(V2) -> Result<V, E> + 'static,
    {
        Syntax {
            parser: self.parser.transform_either(to),
            printer: self.printer.contramap_either(from),
        }
    }

    /// Map the value both ways with partial functions, failing with `error`
    /// where they are undefined.
    pub fn transform_to<V2, To, From>(self, to: To, from: From, error: E) -> Syntax<E, V2>
    where
        V2: Clone + 'static,
        To: Fn(V) -> Option<V2> + 'static,
        From: Fn(V2) -> Option<V> + 'static,
    {
        Syntax {
            parser: self.parser.transform_option(to, error.clone()),
            printer: self.printer.contramap_option(from, error),
        }
    }

    /// Keep values accepted by `pred`; both halves reject the others.
    pub fn filter<F>(self, pred: F, error: E) -> Self
    where
        F: Fn(&V) -> bool + 'static,
    {
        let pred = Rc::new(pred);
        let for_parser = pred.clone();
        Self {
            parser: self.parser.filter(move |v| for_parser(v), error.clone()),
            printer: self.printer.filter_input(move |v| pred(v), error),
        }
    }

    /// Sequence: this syntax, then `that`; the value is the pair.
    pub fn zip<W: Clone + 'static>(self, that: Syntax<E, W>) -> Syntax<E, (V, W)> {
        Syntax {
            parser: self.parser.zip(that.parser),
            printer: self.printer.zip(that.printer),
        }
    }

    /// Sequence with a unit syntax on the right, keeping this value.
    pub fn zip_left(self, that: Syntax<E, ()>) -> Syntax<E, V> {
        Syntax {
            parser: self.parser.zip_left(that.parser),
            printer: self.printer.zip_left(that.printer),
        }
    }

    /// Alternative of two syntaxes over the same value type.
    pub fn or_else(self, that: Syntax<E, V>) -> Self {
        Self {
            parser: self.parser.or_else(that.parser),
            printer: self.printer.or_else(that.printer),
        }
    }

    /// Alternative over different value types, tagged with [`Either`].
    pub fn or_else_either<W: Clone + 'static>(
        self,
        that: Syntax<E, W>,
    ) -> Syntax<E, Either<V, W>> {
        Syntax {
            parser: self.parser.or_else_either(that.parser),
            printer: self.printer.or_else_either(that.printer),
        }
    }

    /// An optional occurrence.
    pub fn optional(self) -> Syntax<E, Option<V>> {
        Syntax {
            parser: self.parser.optional(),
            printer: self.printer.optional(),
        }
    }

    /// Greedy repetition between `min` and `max` occurrences.
    pub fn repeat(self, min: usize, max: Option<usize>) -> Syntax<E, Vec<V>> {
        Syntax {
            parser: self.parser.repeat(min, max),
            printer: self.printer.repeat(min, max),
        }
    }

    /// Zero or more occurrences.
    pub fn repeat0(self) -> Syntax<E, Vec<V>> {
        self.repeat(0, None)
    }

    /// One or more occurrences.
    pub fn repeat1(self) -> Syntax<E, Vec<V>> {
        self.repeat(1, None)
    }

    /// At least `n` occurrences.
    pub fn at_least(self, n: usize) -> Syntax<E, Vec<V>> {
        self.repeat(n, None)
    }

    /// Zero or more occurrences separated by `sep`.
    pub fn repeat_with_sep(self, sep: Syntax<E, ()>) -> Syntax<E, Vec<V>> {
        Syntax {
            parser: self.parser.repeat_with_sep(sep.parser),
            printer: self.printer.repeat_with_sep(sep.printer),
        }
    }

    /// One or more occurrences separated by `sep`.
    pub fn repeat_with_sep1(self, sep: Syntax<E, ()>) -> Syntax<E, Vec<V>> {
        Syntax {
            parser: self.parser.repeat_with_sep1(sep.parser),
            printer: self.printer.repeat_with_sep(sep.printer),
        }
    }

    /// Repeat until `stop` matches; `stop` is consumed when parsing and
    /// printed once after the elements.
    pub fn repeat_until(self, stop: Syntax<E, ()>) -> Syntax<E, Vec<V>> {
        Syntax {
            parser: self.parser.repeat_until(stop.parser),
            printer: self.printer.repeat_until(stop.printer),
        }
    }

    /// Negative lookahead. Parsing succeeds, consuming nothing, iff this
    /// syntax fails; printing emits nothing.
    pub fn not(self, error: E) -> Syntax<E, ()> {
        Syntax {
            parser: self.parser.not(error),
            printer: Printer::succeed(),
        }
    }

    /// The text consumed by this syntax, parsed as its value and printed
    /// verbatim.
    pub fn capture_string(self) -> Syntax<E, String> {
        Syntax {
            parser: self.parser.capture_string(),
            printer: Printer::any_string(),
        }
    }
}

impl<E> Syntax<E, ()>
where
    E: Clone + 'static,
{
    /// Sequence with a unit syntax on the left, keeping `that`'s value.
    pub fn zip_right<W: Clone + 'static>(self, that: Syntax<E, W>) -> Syntax<E, W> {
        Syntax {
            parser: self.parser.zip_right(that.parser),
            printer: self.printer.zip_right(that.printer),
        }
    }

    /// Attach a constant value: parsing yields `value`, printing accepts
    /// only `value` (failing with `error` otherwise).
    pub fn as_value<V: Clone + PartialEq + 'static>(self, value: V, error: E) -> Syntax<E, V> {
        let expected = value.clone();
        Syntax {
            parser: self.parser.as_value(value),
            printer: self.printer.contramap_either(move |v: V| {
                if v == expected {
                    Ok(())
                } else {
                    Err(error.clone())
                }
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Factory helpers
// -----------------------------------------------------------------------------

/// Succeed with `value`, consuming and printing nothing.
pub fn succeed<E, V>(value: V) -> Syntax<E, V>
where
    E: Clone + 'static,
    V: Clone + 'static,
{
    Syntax::new(Parser::succeed(value), Printer::succeed())
}

/// Fail both halves with `error`.
pub fn fail<E, V>(error: E) -> Syntax<E, V>
where
    E: Clone + 'static,
    V: Clone + 'static,
{
    Syntax::new(Parser::fail(error.clone()), Printer::fail(error))
}

/// Succeed only at end of input; prints nothing.
pub fn end<E: Clone + 'static>() -> Syntax<E, ()> {
    Syntax::new(Parser::<E, ()>::end(), Printer::succeed())
}

/// The current input position; prints nothing.
pub fn index<E: Clone + 'static>() -> Syntax<E, usize> {
    Syntax::new(Parser::<E, usize>::index(), Printer::succeed())
}

/// Defer construction of a recursive syntax; forced once and memoised.
pub fn suspend<E, V, F>(f: F) -> Syntax<E, V>
where
    E: Clone + 'static,
    V: Clone + 'static,
    F: Fn() -> Syntax<E, V> + 'static,
{
    let f = Rc::new(f);
    let for_parser = f.clone();
    Syntax::new(
        Parser::suspend(move || for_parser().parser),
        Printer::suspend(move || f().printer),
    )
}

/// Match `regex`, with the matched text as the value.
pub fn regex<E: Clone + 'static>(regex: &Regex, error: E) -> Syntax<E, String> {
    Syntax::new(
        Parser::<E, String>::regex(regex, error.clone()),
        Printer::<E, String>::regex(regex, error),
    )
}

/// Match `regex`, with the last matched character as the value.
pub fn regex_char<E: Clone + 'static>(regex: &Regex, error: E) -> Syntax<E, char> {
    Syntax::new(
        Parser::<E, char>::regex_char(regex, error.clone()),
        Printer::<E, char>::regex_char(regex, error),
    )
}

/// Match `regex` and discard the text; printing emits `chars`.
pub fn regex_discard<E: Clone + 'static>(
    regex: &Regex,
    error: E,
    chars: Vec<char>,
) -> Syntax<E, ()> {
    Syntax::new(
        Parser::<E, ()>::regex_discard(regex, error),
        Printer::<E, ()>::regex_discard(regex, chars),
    )
}

/// Any single character.
pub fn any_char<E: Clone + 'static>() -> Syntax<E, char> {
    Syntax::new(
        Parser::<E, char>::any_char(),
        Printer::<E, String>::any_string().contramap(|c: char| c.to_string()),
    )
}

/// The literal character `c`, with unit value.
pub fn char_(c: char) -> Syntax<String, ()> {
    let r = Regex::char_(c);
    regex_discard(&r, format!("not '{}'", c), vec![c])
}

/// The literal string `s`, parsed and printed as `value`.
pub fn string<V>(s: &str, value: V) -> Syntax<String, V>
where
    V: Clone + PartialEq + 'static,
{
    let r = Regex::string(s);
    regex_discard(&r, format!("not '{}'", s), s.chars().collect())
        .as_value(value, format!("not the value for '{}'", s))
}

/// A single character drawn from `chars`.
pub fn char_in(chars: &str) -> Syntax<String, char> {
    let set = crate::bitset::BitSet::from_chars(chars.chars());
    let error = format!("not one of '{}'", chars);
    Syntax::new(
        Parser::<String, char>::char_in(set, error.clone()),
        Printer::<String, char>::regex_char(&Regex::OneOf(set), error),
    )
}

/// A single character not drawn from `chars`.
pub fn char_not_in(chars: &str) -> Syntax<String, char> {
    let set = crate::bitset::BitSet::from_chars(chars.chars());
    let error = format!("one of '{}'", chars);
    Syntax::new(
        Parser::<String, char>::char_not_in(set, error.clone()),
        Printer::<String, char>::regex_char(&Regex::OneOf(set.complement()), error),
    )
}

/// A single decimal digit.
pub fn digit() -> Syntax<String, char> {
    regex_char(&Regex::any_digit(), "not a digit".to_string())
}

/// A single ASCII letter.
pub fn letter() -> Syntax<String, char> {
    regex_char(&Regex::any_letter(), "not a letter".to_string())
}

/// A single whitespace character.
pub fn whitespace_char() -> Syntax<String, char> {
    regex_char(&Regex::any_whitespace(), "not a whitespace character".to_string())
}

/// A single letter or digit.
pub fn alpha_numeric() -> Syntax<String, char> {
    regex_char(&Regex::any_alpha_numeric(), "not alphanumeric".to_string())
}

/// One or more digits, as a string.
pub fn digits() -> Syntax<String, String> {
    regex(&Regex::digits(), "not digits".to_string())
}

/// One or more letters, as a string.
pub fn letters() -> Syntax<String, String> {
    regex(&Regex::letters(), "not letters".to_string())
}

/// One or more letters or digits, as a string.
pub fn alpha_numerics() -> Syntax<String, String> {
    regex(&Regex::alpha_numerics(), "not alphanumerics".to_string())
}

/// Zero or more whitespace characters, as a string.
pub fn whitespace0() -> Syntax<String, String> {
    regex(&Regex::whitespace(), "not whitespace".to_string())
}
