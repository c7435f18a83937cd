//! Printer combinators: the inverse half of a syntax.
//!
//! A [`Printer`] consumes a typed value and appends output to a
//! [`Target`](crate::target::Target). Like the parser side, the AST is
//! untyped inside and typed at the API boundary; unlike the parser side it is
//! interpreted by a single tree-walking engine (printer trees stay shallow).

pub(crate) mod interpreter;

use std::marker::PhantomData;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::regex::{Compiled, Regex};
use crate::target::{ChunkTarget, Target};
use crate::value::{cast, erase, AnyValue, Either};

pub(crate) type InMapFn = dyn Fn(AnyValue) -> AnyValue;
pub(crate) type InTryMapFn<E> = dyn Fn(AnyValue) -> Result<AnyValue, E>;
pub(crate) type InPredFn = dyn Fn(&AnyValue) -> bool;
pub(crate) type UnzipFn = dyn Fn(AnyValue) -> (AnyValue, AnyValue);
pub(crate) type UnwrapEitherFn = dyn Fn(AnyValue) -> Either<AnyValue, AnyValue>;
pub(crate) type UnwrapOptionFn = dyn Fn(AnyValue) -> Option<AnyValue>;
pub(crate) type UnwrapSeqFn = dyn Fn(AnyValue) -> Vec<AnyValue>;
pub(crate) type EqFn = dyn Fn(&AnyValue, &AnyValue) -> bool;
pub(crate) type ErrFn<E> = dyn Fn(E) -> E;
pub(crate) type SelectFn<E> = dyn Fn(&AnyValue) -> Rc<PrintNode<E>>;

/// A memoised printer thunk, mirroring the parser's.
pub(crate) struct PrintLazy<E> {
    thunk: Rc<dyn Fn() -> Rc<PrintNode<E>>>,
    cell: OnceCell<Rc<PrintNode<E>>>,
}

impl<E> PrintLazy<E> {
    pub(crate) fn new(thunk: Rc<dyn Fn() -> Rc<PrintNode<E>>>) -> Self {
        Self { thunk, cell: OnceCell::new() }
    }

    pub(crate) fn force(&self) -> Rc<PrintNode<E>> {
        self.cell.get_or_init(|| (self.thunk)()).clone()
    }
}

/// The printer combinator algebra.
pub(crate) enum PrintNode<E> {
    /// Succeed without printing, ignoring the input value.
    SucceedUnit,
    Fail(E),
    MapError(Rc<PrintNode<E>>, Rc<ErrFn<E>>),
    Contramap(Rc<PrintNode<E>>, Rc<InMapFn>),
    ContramapEither(Rc<PrintNode<E>>, Rc<InTryMapFn<E>>),
    Zip(Rc<PrintNode<E>>, Rc<PrintNode<E>>, Rc<UnzipFn>),
    ZipLeft(Rc<PrintNode<E>>, Rc<PrintNode<E>>),
    ZipRight(Rc<PrintNode<E>>, Rc<PrintNode<E>>),
    OrElse(Rc<PrintNode<E>>, Rc<PrintNode<E>>),
    OrElseEither(Rc<PrintNode<E>>, Rc<PrintNode<E>>, Rc<UnwrapEitherFn>),
    Optional(Rc<PrintNode<E>>, Rc<UnwrapOptionFn>),
    Repeat {
        inner: Rc<PrintNode<E>>,
        min: usize,
        max: Option<usize>,
        unwrap: Rc<UnwrapSeqFn>,
    },
    RepeatWithSep {
        inner: Rc<PrintNode<E>>,
        sep: Rc<PrintNode<E>>,
        unwrap: Rc<UnwrapSeqFn>,
    },
    RepeatUntil {
        inner: Rc<PrintNode<E>>,
        stop: Rc<PrintNode<E>>,
        unwrap: Rc<UnwrapSeqFn>,
    },
    /// Emit a fixed output element, ignoring the input.
    EmitOutput(char),
    /// Assert the input equals the expected value; prints nothing.
    ExactlyEqual {
        expected: AnyValue,
        eq: Rc<EqFn>,
        error: E,
    },
    /// Assert the input differs from the expected value; prints nothing.
    ExceptEqual {
        expected: AnyValue,
        eq: Rc<EqFn>,
        error: E,
    },
    FilterInput(Rc<PrintNode<E>>, Rc<InPredFn>, E),
    /// Choose a printer from the input value at print time.
    FromInput(Rc<SelectFn<E>>),
    Suspend(PrintLazy<E>),
    /// Write an input string character by character.
    Flatten,
    /// Verify the input string against the regex and emit it.
    PrintRegex(Compiled, E),
    /// Verify a single input character against the regex and emit it.
    PrintRegexChar(Compiled, E),
    /// Emit fixed characters, ignoring the input.
    PrintRegexDiscard(Compiled, Vec<char>),
}

/// A typed printer producing character output.
///
/// `E` is the error type, `V` the input value type. Printers are cheap to
/// clone and reusable.
pub struct Printer<E, V> {
    pub(crate) node: Rc<PrintNode<E>>,
    _value: PhantomData<fn(V)>,
}

impl<E, V> Clone for Printer<E, V> {
    fn clone(&self) -> Self {
        Self { node: self.node.clone(), _value: PhantomData }
    }
}

impl<E, V> Printer<E, V> {
    pub(crate) fn wrap(node: PrintNode<E>) -> Self {
        Self { node: Rc::new(node), _value: PhantomData }
    }
}

impl<E, V> Printer<E, V>
where
    E: Clone + 'static,
    V: Clone + 'static,
{
    // -------------------------------------------------------------------------
    // Leaf constructors
    // -------------------------------------------------------------------------

    /// Print nothing and succeed, whatever the input.
    pub fn succeed() -> Self {
        Self::wrap(PrintNode::SucceedUnit)
    }

    /// Always fail with `error`.
    pub fn fail(error: E) -> Self {
        Self::wrap(PrintNode::Fail(error))
    }

    /// Defer construction; forced once and memoised.
    pub fn suspend<F: Fn() -> Printer<E, V> + 'static>(f: F) -> Self {
        Self::wrap(PrintNode::Suspend(PrintLazy::new(Rc::new(move || f().node))))
    }

    /// Succeed printing nothing iff the input equals `expected`.
    pub fn exactly(expected: V, error: E) -> Self
    where
        V: PartialEq,
    {
        Self::wrap(PrintNode::ExactlyEqual {
            expected: erase(expected),
            eq: Rc::new(|a, b| cast::<V>(a) == cast::<V>(b)),
            error,
        })
    }

    /// Succeed printing nothing iff the input differs from `expected`.
    pub fn except(expected: V, error: E) -> Self
    where
        V: PartialEq,
    {
        Self::wrap(PrintNode::ExceptEqual {
            expected: erase(expected),
            eq: Rc::new(|a, b| cast::<V>(a) == cast::<V>(b)),
            error,
        })
    }

    /// Choose the printer from the input value at print time.
    pub fn from_input<F: Fn(&V) -> Printer<E, V> + 'static>(f: F) -> Self {
        Self::wrap(PrintNode::FromInput(Rc::new(move |v: &AnyValue| {
            f(&cast::<V>(v)).node
        })))
    }

    // -------------------------------------------------------------------------
    // Combinators
    // -------------------------------------------------------------------------

    /// Rewrite failures of this printer.
    pub fn map_error<F: Fn(E) -> E + 'static>(self, f: F) -> Self {
        Self::wrap(PrintNode::MapError(self.node, Rc::new(f)))
    }

    /// Feed this printer a value derived from the new input type.
    pub fn contramap<V2, F>(self, f: F) -> Printer<E, V2>
    where
        V2: Clone + 'static,
        F: Fn(V2) -> V + 'static,
    {
        Printer::wrap(PrintNode::Contramap(
            self.node,
            Rc::new(move |v| erase(f(cast::<V2>(&v)))),
        ))
    }

    /// Like [`Printer::contramap`] with a fallible derivation.
    pub fn contramap_either<V2, F>(self, f: F) -> Printer<E, V2>
    where
        V2: Clone + 'static,
        F: Fn(V2) -> Result<V, E> + 'static,
    {
        Printer::wrap(PrintNode::ContramapEither(
            self.node,
            Rc::new(move |v| f(cast::<V2>(&v)).map(erase)),
        ))
    }

    /// Like [`Printer::contramap`] with a partial derivation, failing with
    /// `error` where it is undefined.
    pub fn contramap_option<V2, F>(self, f: F, error: E) -> Printer<E, V2>
    where
        V2: Clone + 'static,
        F: Fn(V2) -> Option<V> + 'static,
    {
        self.contramap_either(move |v| f(v).ok_or_else(|| error.clone()))
    }

    /// Keep printing only if `pred` accepts the input; otherwise fail.
    pub fn filter_input<F: Fn(&V) -> bool + 'static>(self, pred: F, error: E) -> Self {
        Self::wrap(PrintNode::FilterInput(
            self.node,
            Rc::new(move |v: &AnyValue| pred(&cast::<V>(v))),
            error,
        ))
    }

    /// Print a pair: this printer takes the first element, `that` the second.
    pub fn zip<W: Clone + 'static>(self, that: Printer<E, W>) -> Printer<E, (V, W)> {
        Printer::wrap(PrintNode::Zip(
            self.node,
            that.node,
            Rc::new(|v| {
                let (a, b) = cast::<(V, W)>(&v);
                (erase(a), erase(b))
            }),
        ))
    }

    /// This printer takes the input value; `that` prints with unit.
    pub fn zip_left(self, that: Printer<E, ()>) -> Printer<E, V> {
        Printer::wrap(PrintNode::ZipLeft(self.node, that.node))
    }

    /// Try this printer; on failure discard its partial output and try
    /// `that` with the same input.
    pub fn or_else(self, that: Printer<E, V>) -> Self {
        Self::wrap(PrintNode::OrElse(self.node, that.node))
    }

    /// Print whichever side of an [`Either`] the input holds.
    pub fn or_else_either<W: Clone + 'static>(
        self,
        that: Printer<E, W>,
    ) -> Printer<E, Either<V, W>> {
        Printer::wrap(PrintNode::OrElseEither(
            self.node,
            that.node,
            Rc::new(|v| match cast::<Either<V, W>>(&v) {
                Either::Left(a) => Either::Left(erase(a)),
                Either::Right(b) => Either::Right(erase(b)),
            }),
        ))
    }

    /// Print a `Some` input with this printer; print nothing for `None`.
    pub fn optional(self) -> Printer<E, Option<V>> {
        Printer::wrap(PrintNode::Optional(
            self.node,
            Rc::new(|v| cast::<Option<V>>(&v).map(erase)),
        ))
    }

    /// Print every element of the input sequence.
    pub fn repeat(self, min: usize, max: Option<usize>) -> Printer<E, Vec<V>> {
        Printer::wrap(PrintNode::Repeat {
            inner: self.node,
            min,
            max,
            unwrap: unwrap_seq::<V>(),
        })
    }

    /// Print the elements interleaved with `sep` (printed with unit).
    pub fn repeat_with_sep(self, sep: Printer<E, ()>) -> Printer<E, Vec<V>> {
        Printer::wrap(PrintNode::RepeatWithSep {
            inner: self.node,
            sep: sep.node,
            unwrap: unwrap_seq::<V>(),
        })
    }

    /// Print the elements, then the stop printer once with unit.
    pub fn repeat_until(self, stop: Printer<E, ()>) -> Printer<E, Vec<V>> {
        Printer::wrap(PrintNode::RepeatUntil {
            inner: self.node,
            stop: stop.node,
            unwrap: unwrap_seq::<V>(),
        })
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Print `value` into `target`.
    pub fn print_to_target<T: Target<char>>(
        &self,
        value: &V,
        target: &mut T,
    ) -> Result<(), E> {
        interpreter::print(&self.node, &erase(value.clone()), target)
    }

    /// Print `value` into a fresh chunk.
    pub fn print_to_chunk(&self, value: &V) -> Result<Vec<char>, E> {
        let mut target = ChunkTarget::new();
        self.print_to_target(value, &mut target)?;
        Ok(target.finish())
    }

    /// Print `value` into a string.
    pub fn print_string(&self, value: &V) -> Result<String, E> {
        let mut target = ChunkTarget::new();
        self.print_to_target(value, &mut target)?;
        Ok(target.finish_string())
    }
}

impl<E> Printer<E, ()>
where
    E: Clone + 'static,
{
    /// This printer prints with unit; `that` takes the input value.
    pub fn zip_right<W: Clone + 'static>(self, that: Printer<E, W>) -> Printer<E, W> {
        Printer::wrap(PrintNode::ZipRight(self.node, that.node))
    }

    /// Emit a fixed character, ignoring the input.
    pub fn emit(c: char) -> Self {
        Self::wrap(PrintNode::EmitOutput(c))
    }

    /// Emit the fixed characters of a literal regex, ignoring the input.
    pub fn regex_discard(regex: &Regex, chars: Vec<char>) -> Self {
        Self::wrap(PrintNode::PrintRegexDiscard(regex.compile(), chars))
    }
}

impl<E: Clone + 'static> Printer<E, String> {
    /// Verify the input string against `regex` and emit it.
    pub fn regex(regex: &Regex, error: E) -> Self {
        Self::wrap(PrintNode::PrintRegex(regex.compile(), error))
    }

    /// Write the input string as-is.
    pub fn any_string() -> Self {
        Self::wrap(PrintNode::Flatten)
    }
}

impl<E: Clone + 'static> Printer<E, char> {
    /// Verify the input character against `regex` and emit it.
    pub fn regex_char(regex: &Regex, error: E) -> Self {
        Self::wrap(PrintNode::PrintRegexChar(regex.compile(), error))
    }
}

fn unwrap_seq<V: Clone + 'static>() -> Rc<UnwrapSeqFn> {
    Rc::new(|v| cast::<Vec<V>>(&v).into_iter().map(erase).collect())
}
