//! Type-erased values flowing through the execution engines.
//!
//! The engines are untyped inside: every intermediate result is an
//! [`AnyValue`]. The typed `Parser`/`Printer`/`Syntax` wrappers are the only
//! constructors of AST nodes, and each installs casting closures for exactly
//! the types its phantom parameters prove, so a cast on a well-typed tree
//! cannot fail.

use std::any::Any;
use std::rc::Rc;

/// An erased, cheaply clonable value.
pub(crate) type AnyValue = Rc<dyn Any>;

/// Erase a typed value.
pub(crate) fn erase<V: 'static>(v: V) -> AnyValue {
    Rc::new(v)
}

/// Recover a typed value. Panics only if the typed-constructor invariant is
/// broken, which is a library bug, not a user error.
pub(crate) fn cast<V: Clone + 'static>(v: &AnyValue) -> V {
    v.downcast_ref::<V>()
        .expect("tandem internal error: operand type does not match its combinator")
        .clone()
}

/// The erased unit value.
pub(crate) fn unit() -> AnyValue {
    erase(())
}

/// A value of one of two types, produced by `or_else_either`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Either<A, B> {
    Left(A),
    Right(B),
}

impl<A, B> Either<A, B> {
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }

    pub fn left(self) -> Option<A> {
        match self {
            Either::Left(a) => Some(a),
            Either::Right(_) => None,
        }
    }

    pub fn right(self) -> Option<B> {
        match self {
            Either::Left(_) => None,
            Either::Right(b) => Some(b),
        }
    }
}
