//! Parser combinators: a declarative AST plus two interchangeable execution
//! engines.
//!
//! A [`Parser`] is a typed handle onto an untyped [`Node`] tree. The tree is
//! what the engines interpret; the typed layer installs the casting closures
//! when it builds nodes, so values stay erased inside the engines and typed at
//! the API boundary.
//!
//! Two engines implement the same semantics:
//!
//! - [`Implementation::Recursive`] - a tree-walking interpreter, the
//!   reference semantics (simpler, good for debugging)
//! - [`Implementation::StackSafe`] - a virtual machine with explicit operand
//!   and continuation stacks, safe for arbitrarily deep grammars
//!
//! Both must produce identical results for every parser and input.

pub(crate) mod recursive;
pub(crate) mod stack_safe;

use std::marker::PhantomData;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::bitset::BitSet;
use crate::error::ParserError;
use crate::regex::{Compiled, Regex};
use crate::value::{cast, erase, unit, AnyValue, Either};

// Erased function types carried inside nodes. The typed combinators are the
// only code that constructs these.
pub(crate) type MapFn = dyn Fn(AnyValue) -> AnyValue;
pub(crate) type TryMapFn<E> = dyn Fn(AnyValue) -> Result<AnyValue, E>;
pub(crate) type PredFn = dyn Fn(&AnyValue) -> bool;
pub(crate) type PairFn = dyn Fn(AnyValue, AnyValue) -> AnyValue;
pub(crate) type SeqFn = dyn Fn(Vec<AnyValue>) -> AnyValue;
pub(crate) type OptFn = dyn Fn(Option<AnyValue>) -> AnyValue;
pub(crate) type ErrMapFn<E> = dyn Fn(ParserError<E>) -> ParserError<E>;

/// A memoised thunk; the only vehicle for recursive grammars.
pub(crate) struct Lazy<E> {
    thunk: Rc<dyn Fn() -> Rc<Node<E>>>,
    cell: OnceCell<Rc<Node<E>>>,
}

impl<E> Lazy<E> {
    pub(crate) fn new(thunk: Rc<dyn Fn() -> Rc<Node<E>>>) -> Self {
        Self { thunk, cell: OnceCell::new() }
    }

    /// Force the thunk; the body is memoised after the first force.
    pub(crate) fn force(&self) -> Rc<Node<E>> {
        self.cell.get_or_init(|| (self.thunk)()).clone()
    }
}

/// The parser combinator algebra. A directed acyclic description of intent;
/// only a forced [`Node::Suspend`] may close a cycle.
pub(crate) enum Node<E> {
    Succeed(AnyValue),
    Fail(E),
    Named(Rc<Node<E>>, String),
    Suspend(Lazy<E>),
    Backtrack(Rc<Node<E>>),
    SetAutoBacktracking(Rc<Node<E>>, bool),
    MapError(Rc<Node<E>>, Rc<ErrMapFn<E>>),
    Transform(Rc<Node<E>>, Rc<MapFn>),
    TransformEither(Rc<Node<E>>, Rc<TryMapFn<E>>),
    Filter(Rc<Node<E>>, Rc<PredFn>, E),
    Zip(Rc<Node<E>>, Rc<Node<E>>, Rc<PairFn>),
    ZipLeft(Rc<Node<E>>, Rc<Node<E>>),
    ZipRight(Rc<Node<E>>, Rc<Node<E>>),
    OrElse(Rc<Node<E>>, Rc<Node<E>>),
    OrElseEither(Rc<Node<E>>, Rc<Node<E>>, Rc<MapFn>, Rc<MapFn>),
    Optional(Rc<Node<E>>, Rc<OptFn>),
    Repeat {
        inner: Rc<Node<E>>,
        min: usize,
        max: Option<usize>,
        wrap: Rc<SeqFn>,
    },
    RepeatUntil {
        inner: Rc<Node<E>>,
        stop: Rc<Node<E>>,
        wrap: Rc<SeqFn>,
    },
    RepeatWithSep {
        inner: Rc<Node<E>>,
        sep: Rc<Node<E>>,
        at_least_one: bool,
        wrap: Rc<SeqFn>,
    },
    Not(Rc<Node<E>>, E),
    End,
    Index,
    CaptureString(Rc<Node<E>>),
    ParseRegex(Compiled, E),
    ParseRegexLastChar(Compiled, E),
    ParseRegexDiscard(Compiled, E),
    CharIn(BitSet, E),
    CharNotIn(BitSet, E),
    AnyChar,
}

/// Engine selection for [`Parser::parse_string_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Implementation {
    /// The stack-safe virtual machine; the production engine.
    StackSafe,
    /// The naturally recursive interpreter; the reference oracle.
    Recursive,
}

/// A typed parser over character input.
///
/// `E` is the user error type, `V` the value produced on success. Parsers are
/// cheap to clone and reusable across parses.
pub struct Parser<E, V> {
    pub(crate) node: Rc<Node<E>>,
    _value: PhantomData<fn() -> V>,
}

impl<E, V> Clone for Parser<E, V> {
    fn clone(&self) -> Self {
        Self { node: self.node.clone(), _value: PhantomData }
    }
}

impl<E, V> Parser<E, V> {
    pub(crate) fn wrap(node: Node<E>) -> Self {
        Self { node: Rc::new(node), _value: PhantomData }
    }
}

impl<E, V> Parser<E, V>
where
    E: Clone + 'static,
    V: Clone + 'static,
{
    // -------------------------------------------------------------------------
    // Leaf constructors
    // -------------------------------------------------------------------------

    /// Always succeeds with `value`, consuming nothing.
    pub fn succeed(value: V) -> Self {
        Self::wrap(Node::Succeed(erase(value)))
    }

    /// Always fails with `error`.
    pub fn fail(error: E) -> Self {
        Self::wrap(Node::Fail(error))
    }

    /// Defer construction; the thunk is forced once and memoised. This is the
    /// vehicle for recursive grammars.
    pub fn suspend<F: Fn() -> Parser<E, V> + 'static>(f: F) -> Self {
        Self::wrap(Node::Suspend(Lazy::new(Rc::new(move || f().node))))
    }

    // -------------------------------------------------------------------------
    // Combinators
    // -------------------------------------------------------------------------

    /// Attach a name; failures inside record the chain of enclosing names.
    pub fn named(self, name: &str) -> Self {
        Self::wrap(Node::Named(self.node, name.to_string()))
    }

    /// Restore the input position if this parser fails, regardless of the
    /// auto-backtracking setting.
    pub fn backtrack(self) -> Self {
        Self::wrap(Node::Backtrack(self.node))
    }

    /// Set the auto-backtracking flag for this subtree.
    pub fn set_auto_backtracking(self, enabled: bool) -> Self {
        Self::wrap(Node::SetAutoBacktracking(self.node, enabled))
    }

    /// Enable auto-backtracking for this subtree.
    pub fn auto_backtracking(self) -> Self {
        self.set_auto_backtracking(true)
    }

    /// Disable auto-backtracking for this subtree.
    pub fn manual_backtracking(self) -> Self {
        self.set_auto_backtracking(false)
    }

    /// Rewrite failures of this parser.
    pub fn map_error<F>(self, f: F) -> Self
    where
        F: Fn(ParserError<E>) -> ParserError<E> + 'static,
    {
        Self::wrap(Node::MapError(self.node, Rc::new(f)))
    }

    /// Map the parsed value.
    pub fn transform<V2, F>(self, f: F) -> Parser<E, V2>
    where
        V2: Clone + 'static,
        F: Fn(V) -> V2 + 'static,
    {
        Parser::wrap(Node::Transform(
            self.node,
            Rc::new(move |v| erase(f(cast::<V>(&v)))),
        ))
    }

    /// Map the parsed value through a fallible function; an `Err` becomes a
    /// `Failure` at the position where this parser started.
    pub fn transform_either<V2, F>(self, f: F) -> Parser<E, V2>
    where
        V2: Clone + 'static,
        F: Fn(V) -> Result<V2, E> + 'static,
    {
        Parser::wrap(Node::TransformEither(
            self.node,
            Rc::new(move |v| f(cast::<V>(&v)).map(erase)),
        ))
    }

    /// Map the parsed value through a partial function, failing with `error`
    /// where it is undefined.
    pub fn transform_option<V2, F>(self, f: F, error: E) -> Parser<E, V2>
    where
        V2: Clone + 'static,
        F: Fn(V) -> Option<V2> + 'static,
    {
        self.transform_either(move |v| f(v).ok_or_else(|| error.clone()))
    }

    /// Replace the parsed value with `value`.
    pub fn as_value<V2: Clone + 'static>(self, value: V2) -> Parser<E, V2> {
        self.transform(move |_| value.clone())
    }

    /// Discard the parsed value.
    pub fn unit(self) -> Parser<E, ()> {
        self.as_value(())
    }

    /// Keep the value only if `pred` accepts it; otherwise fail with `error`
    /// at the position where this parser started.
    pub fn filter<F>(self, pred: F, error: E) -> Self
    where
        F: Fn(&V) -> bool + 'static,
    {
        Self::wrap(Node::Filter(
            self.node,
            Rc::new(move |v: &AnyValue| pred(&cast::<V>(v))),
            error,
        ))
    }

    /// This parser, then `that`; yields the pair.
    pub fn zip<W: Clone + 'static>(self, that: Parser<E, W>) -> Parser<E, (V, W)> {
        Parser::wrap(Node::Zip(
            self.node,
            that.node,
            Rc::new(|a, b| erase((cast::<V>(&a), cast::<W>(&b)))),
        ))
    }

    /// This parser, then `that`; keeps this parser's value.
    pub fn zip_left<W: Clone + 'static>(self, that: Parser<E, W>) -> Parser<E, V> {
        Parser::wrap(Node::ZipLeft(self.node, that.node))
    }

    /// This parser, then `that`; keeps `that`'s value.
    pub fn zip_right<W: Clone + 'static>(self, that: Parser<E, W>) -> Parser<E, W> {
        Parser::wrap(Node::ZipRight(self.node, that.node))
    }

    /// Try this parser; on failure (subject to the backtracking discipline)
    /// try `that`.
    pub fn or_else(self, that: Parser<E, V>) -> Self {
        Self::wrap(Node::OrElse(self.node, that.node))
    }

    /// Like [`Parser::or_else`] for differently typed alternatives.
    pub fn or_else_either<W: Clone + 'static>(
        self,
        that: Parser<E, W>,
    ) -> Parser<E, Either<V, W>> {
        Parser::wrap(Node::OrElseEither(
            self.node,
            that.node,
            Rc::new(|v| erase(Either::<V, W>::Left(cast::<V>(&v)))),
            Rc::new(|v| erase(Either::<V, W>::Right(cast::<W>(&v)))),
        ))
    }

    /// Try this parser; a permitted failure yields `None`.
    pub fn optional(self) -> Parser<E, Option<V>> {
        Parser::wrap(Node::Optional(
            self.node,
            Rc::new(|opt| erase(opt.map(|v| cast::<V>(&v)))),
        ))
    }

    /// Greedy repetition between `min` and `max` occurrences.
    pub fn repeat(self, min: usize, max: Option<usize>) -> Parser<E, Vec<V>> {
        Parser::wrap(Node::Repeat {
            inner: self.node,
            min,
            max,
            wrap: wrap_seq::<V>(),
        })
    }

    /// Zero or more occurrences.
    pub fn repeat0(self) -> Parser<E, Vec<V>> {
        self.repeat(0, None)
    }

    /// One or more occurrences.
    pub fn repeat1(self) -> Parser<E, Vec<V>> {
        self.repeat(1, None)
    }

    /// At least `n` occurrences.
    pub fn at_least(self, n: usize) -> Parser<E, Vec<V>> {
        self.repeat(n, None)
    }

    /// Repeat until `stop` succeeds; `stop`'s input is consumed.
    pub fn repeat_until<W: Clone + 'static>(self, stop: Parser<E, W>) -> Parser<E, Vec<V>> {
        Parser::wrap(Node::RepeatUntil {
            inner: self.node,
            stop: stop.node,
            wrap: wrap_seq::<V>(),
        })
    }

    /// Zero or more occurrences separated by `sep`.
    pub fn repeat_with_sep<W: Clone + 'static>(self, sep: Parser<E, W>) -> Parser<E, Vec<V>> {
        Parser::wrap(Node::RepeatWithSep {
            inner: self.node,
            sep: sep.node,
            at_least_one: false,
            wrap: wrap_seq::<V>(),
        })
    }

    /// One or more occurrences separated by `sep`.
    pub fn repeat_with_sep1<W: Clone + 'static>(self, sep: Parser<E, W>) -> Parser<E, Vec<V>> {
        Parser::wrap(Node::RepeatWithSep {
            inner: self.node,
            sep: sep.node,
            at_least_one: true,
            wrap: wrap_seq::<V>(),
        })
    }

    /// Negative lookahead: succeeds with unit, consuming nothing, iff this
    /// parser fails; otherwise fails with `error`.
    pub fn not(self, error: E) -> Parser<E, ()> {
        Parser::wrap(Node::Not(self.node, error))
    }

    /// Run this parser for its consumption only, yielding the consumed text.
    pub fn capture_string(self) -> Parser<E, String> {
        Parser::wrap(Node::CaptureString(self.node))
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Parse `input` with the stack-safe engine.
    pub fn parse_string(&self, input: &str) -> Result<V, ParserError<E>> {
        self.parse_string_with(input, Implementation::StackSafe)
    }

    /// Parse `input` with the selected engine. Both engines produce equal
    /// results for every parser and input.
    pub fn parse_string_with(
        &self,
        input: &str,
        implementation: Implementation,
    ) -> Result<V, ParserError<E>> {
        let chars: Vec<char> = input.chars().collect();
        let value = match implementation {
            Implementation::StackSafe => stack_safe::parse(&self.node, &chars)?,
            Implementation::Recursive => recursive::parse(&self.node, &chars)?,
        };
        Ok(cast::<V>(&value))
    }
}

impl<E: Clone + 'static> Parser<E, String> {
    /// Match the regex, yielding the matched text.
    pub fn regex(regex: &Regex, error: E) -> Self {
        Self::wrap(Node::ParseRegex(regex.compile(), error))
    }
}

impl<E: Clone + 'static> Parser<E, char> {
    /// Match the regex, yielding the last matched character.
    pub fn regex_char(regex: &Regex, error: E) -> Self {
        Self::wrap(Node::ParseRegexLastChar(regex.compile(), error))
    }

    /// A single character contained in `set`.
    pub fn char_in(set: BitSet, error: E) -> Self {
        Self::wrap(Node::CharIn(set, error))
    }

    /// A single character not contained in `set`.
    pub fn char_not_in(set: BitSet, error: E) -> Self {
        Self::wrap(Node::CharNotIn(set, error))
    }

    /// Any single character; fails only at end of input.
    pub fn any_char() -> Self {
        Self::wrap(Node::AnyChar)
    }
}

impl<E: Clone + 'static> Parser<E, ()> {
    /// Match the regex, discarding the matched text.
    pub fn regex_discard(regex: &Regex, error: E) -> Self {
        Self::wrap(Node::ParseRegexDiscard(regex.compile(), error))
    }

    /// Succeeds only at end of input.
    pub fn end() -> Self {
        Self::wrap(Node::End)
    }
}

impl<E: Clone + 'static> Parser<E, usize> {
    /// The current input position, consuming nothing.
    pub fn index() -> Self {
        Self::wrap(Node::Index)
    }
}

fn wrap_seq<V: Clone + 'static>() -> Rc<SeqFn> {
    Rc::new(|values| erase(values.iter().map(cast::<V>).collect::<Vec<V>>()))
}

/// Shared leaf evaluation: the per-node logic both engines delegate to for
/// nodes that neither recurse nor suspend.
pub(crate) struct Cursor<'s> {
    pub(crate) input: &'s [char],
    pub(crate) pos: usize,
    pub(crate) name_chain: Vec<String>,
    pub(crate) auto_backtrack: bool,
}

impl<'s> Cursor<'s> {
    pub(crate) fn new(input: &'s [char]) -> Self {
        Self {
            input,
            pos: 0,
            name_chain: Vec::new(),
            // Default is manual backtracking; a failing branch that consumed
            // input is not retried unless opted in.
            auto_backtrack: false,
        }
    }

    pub(crate) fn failure<E>(&self, position: usize, failure: E) -> ParserError<E> {
        ParserError::Failure { name_chain: self.name_chain.clone(), position, failure }
    }

    /// Evaluate a leaf node in place. Returns `None` for non-leaf nodes.
    pub(crate) fn eval_leaf<E: Clone>(
        &mut self,
        node: &Node<E>,
    ) -> Option<Result<AnyValue, ParserError<E>>> {
        use crate::regex::{NEED_MORE_INPUT, NOT_MATCHED};
        let result = match node {
            Node::Succeed(value) => Ok(value.clone()),
            Node::Fail(error) => Err(self.failure(self.pos, error.clone())),
            Node::End => {
                if self.pos == self.input.len() {
                    Ok(unit())
                } else {
                    Err(ParserError::NotConsumedAll { position: self.pos })
                }
            }
            Node::Index => Ok(erase(self.pos)),
            Node::CharIn(set, error) => match self.input.get(self.pos) {
                None => Err(ParserError::UnexpectedEndOfInput),
                Some(c) if set.has(*c) => {
                    self.pos += 1;
                    Ok(erase(*c))
                }
                Some(_) => Err(self.failure(self.pos, error.clone())),
            },
            // The complement is taken within 0..=255, so code units past the
            // table never match either class.
            Node::CharNotIn(set, error) => match self.input.get(self.pos) {
                None => Err(ParserError::UnexpectedEndOfInput),
                Some(c) if (*c as u32) < 256 && !set.has(*c) => {
                    self.pos += 1;
                    Ok(erase(*c))
                }
                Some(_) => Err(self.failure(self.pos, error.clone())),
            },
            Node::AnyChar => match self.input.get(self.pos) {
                None => Err(ParserError::UnexpectedEndOfInput),
                Some(c) => {
                    let c = *c;
                    self.pos += 1;
                    Ok(erase(c))
                }
            },
            Node::ParseRegex(compiled, error) => {
                match compiled.test(self.pos, self.input) {
                    NEED_MORE_INPUT => Err(ParserError::UnexpectedEndOfInput),
                    NOT_MATCHED => Err(self.failure(self.pos, error.clone())),
                    next => {
                        let next = next as usize;
                        let text: String = self.input[self.pos..next].iter().collect();
                        self.pos = next;
                        Ok(erase(text))
                    }
                }
            }
            Node::ParseRegexLastChar(compiled, error) => {
                match compiled.test(self.pos, self.input) {
                    NEED_MORE_INPUT => Err(ParserError::UnexpectedEndOfInput),
                    NOT_MATCHED => Err(self.failure(self.pos, error.clone())),
                    next => {
                        let next = next as usize;
                        if next > self.pos {
                            let c = self.input[next - 1];
                            self.pos = next;
                            Ok(erase(c))
                        } else {
                            Err(ParserError::UnknownFailure {
                                name_chain: self.name_chain.clone(),
                                position: self.pos,
                            })
                        }
                    }
                }
            }
            Node::ParseRegexDiscard(compiled, error) => {
                match compiled.test(self.pos, self.input) {
                    NEED_MORE_INPUT => Err(ParserError::UnexpectedEndOfInput),
                    NOT_MATCHED => Err(self.failure(self.pos, error.clone())),
                    next => {
                        self.pos = next as usize;
                        Ok(unit())
                    }
                }
            }
            _ => return None,
        };
        Some(result)
    }
}
