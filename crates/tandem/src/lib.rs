//! Tandem: bidirectional parser/printer combinators.
//!
//! A single declarative [`Syntax`] value denotes both a parser that consumes
//! a string and yields a typed value, and a printer that consumes a typed
//! value and produces a string. The same grammar is written once and run in
//! both directions.
//!
//! # Overview
//!
//! ```
//! use tandem::syntax::{char_, digit};
//!
//! let csv = digit().repeat_with_sep(char_(','));
//!
//! let parsed = csv.parse_string("1,2,3").unwrap();
//! assert_eq!(parsed, vec!['1', '2', '3']);
//!
//! let printed = csv.print_string(&parsed).unwrap();
//! assert_eq!(printed, "1,2,3");
//! ```
//!
//! # Execution engines
//!
//! Parsing runs on one of two engines implementing identical semantics:
//!
//! - [`Implementation::StackSafe`] (the default) - a virtual machine with
//!   explicit operand and continuation stacks, safe for arbitrarily deep
//!   recursive grammars
//! - [`Implementation::Recursive`] - a tree-walking interpreter, the
//!   reference semantics
//!
//! Character classes and literals are matched through a small [`regex`]
//! algebra compiled to a deterministic table-driven matcher.
//!
//! # Debugging
//!
//! Set `DEBUG=vm`, `DEBUG=recursive`, `DEBUG=printer` or `DEBUG=regex` (or
//! `DEBUG=*`) to trace an engine; `DEBUG_VERBOSITY=2` adds per-branch detail.

pub mod bitset;
pub mod error;
pub mod parser;
pub mod printer;
pub mod regex;
pub mod syntax;
pub mod target;
mod value;

pub use bitset::BitSet;
pub use error::ParserError;
pub use parser::{Implementation, Parser};
pub use printer::Printer;
pub use regex::{Compiled, Regex, NEED_MORE_INPUT, NOT_MATCHED};
pub use syntax::Syntax;
pub use target::{ChunkTarget, Target};
pub use value::Either;
