//! Tree-walking printer engine.
//!
//! Printers are interpreted recursively; their trees are shallow (repetition
//! iterates in a loop rather than via the tree). The engine threads a
//! [`Target`] and returns unit or the user error. `or_else` brackets the left
//! branch in a checkpoint so a failed branch leaves no partial output behind.

use std::rc::Rc;

use common::{create_logger, log_detail, Logger};

use crate::printer::PrintNode;
use crate::target::Target;
use crate::value::{cast, unit, AnyValue, Either};

pub(crate) fn print<E: Clone + 'static, T: Target<char>>(
    node: &Rc<PrintNode<E>>,
    value: &AnyValue,
    target: &mut T,
) -> Result<(), E> {
    let mut engine = Engine { target, log: create_logger("printer") };
    engine.print(node, value)
}

struct Engine<'t, T> {
    target: &'t mut T,
    log: Logger,
}

impl<'t, T: Target<char>> Engine<'t, T> {
    fn print<E: Clone + 'static>(
        &mut self,
        node: &PrintNode<E>,
        value: &AnyValue,
    ) -> Result<(), E> {
        match node {
            PrintNode::SucceedUnit => Ok(()),

            PrintNode::Fail(error) => Err(error.clone()),

            PrintNode::MapError(inner, f) => self.print(inner, value).map_err(|e| f(e)),

            PrintNode::Contramap(inner, f) => self.print(inner, &f(value.clone())),

            PrintNode::ContramapEither(inner, f) => {
                let mapped = f(value.clone())?;
                self.print(inner, &mapped)
            }

            PrintNode::Zip(left, right, unzip) => {
                let (a, b) = unzip(value.clone());
                self.print(left, &a)?;
                self.print(right, &b)
            }

            PrintNode::ZipLeft(left, right) => {
                self.print(left, value)?;
                self.print(right, &unit())
            }

            PrintNode::ZipRight(left, right) => {
                self.print(left, &unit())?;
                self.print(right, value)
            }

            PrintNode::OrElse(left, right) => {
                let checkpoint = self.target.checkpoint();
                match self.print(left, value) {
                    Ok(()) => {
                        self.target.commit(checkpoint);
                        Ok(())
                    }
                    Err(_) => {
                        // Discard the failed branch's partial output.
                        self.target.rollback(checkpoint);
                        log_detail!(self.log, "or_else fell through to right branch");
                        self.print(right, value)
                    }
                }
            }

            PrintNode::OrElseEither(left, right, unwrap) => match unwrap(value.clone()) {
                Either::Left(a) => self.print(left, &a),
                Either::Right(b) => self.print(right, &b),
            },

            PrintNode::Optional(inner, unwrap) => match unwrap(value.clone()) {
                Some(v) => self.print(inner, &v),
                None => Ok(()),
            },

            PrintNode::Repeat { inner, min, max, unwrap } => {
                let elements = unwrap(value.clone());
                // Bounds are enforced when parsing; printing every element
                // is the only output consistent with the round trip. Flag
                // out-of-bounds sequences when tracing.
                if elements.len() < *min || max.map_or(false, |m| elements.len() > m) {
                    log_detail!(
                        self.log,
                        "printing {} elements outside {}..{:?}",
                        elements.len(),
                        min,
                        max
                    );
                }
                for element in elements {
                    self.print(inner, &element)?;
                }
                Ok(())
            }

            PrintNode::RepeatWithSep { inner, sep, unwrap } => {
                for (i, element) in unwrap(value.clone()).into_iter().enumerate() {
                    if i > 0 {
                        self.print(sep, &unit())?;
                    }
                    self.print(inner, &element)?;
                }
                Ok(())
            }

            PrintNode::RepeatUntil { inner, stop, unwrap } => {
                for element in unwrap(value.clone()) {
                    self.print(inner, &element)?;
                }
                self.print(stop, &unit())
            }

            PrintNode::EmitOutput(c) => {
                self.target.write(*c);
                Ok(())
            }

            PrintNode::ExactlyEqual { expected, eq, error } => {
                if eq(value, expected) {
                    Ok(())
                } else {
                    Err(error.clone())
                }
            }

            PrintNode::ExceptEqual { expected, eq, error } => {
                if eq(value, expected) {
                    Err(error.clone())
                } else {
                    Ok(())
                }
            }

            PrintNode::FilterInput(inner, pred, error) => {
                if pred(value) {
                    self.print(inner, value)
                } else {
                    Err(error.clone())
                }
            }

            PrintNode::FromInput(select) => {
                let chosen = select(value);
                self.print(&chosen, value)
            }

            PrintNode::Suspend(lazy) => {
                let forced = lazy.force();
                self.print(&forced, value)
            }

            PrintNode::Flatten => {
                for c in cast::<String>(value).chars() {
                    self.target.write(c);
                }
                Ok(())
            }

            PrintNode::PrintRegex(compiled, error) => {
                let text = cast::<String>(value);
                if compiled.matches(&text) {
                    for c in text.chars() {
                        self.target.write(c);
                    }
                    Ok(())
                } else {
                    Err(error.clone())
                }
            }

            PrintNode::PrintRegexChar(compiled, error) => {
                let c = cast::<char>(value);
                if compiled.matches(&c.to_string()) {
                    self.target.write(c);
                    Ok(())
                } else {
                    Err(error.clone())
                }
            }

            PrintNode::PrintRegexDiscard(compiled, chars) => {
                // The fixed characters are emitted as-is; the matcher is only
                // consulted when tracing, to flag output the parsing side
                // would reject.
                if self.log.enabled() {
                    let text: String = chars.iter().collect();
                    if !compiled.matches(&text) {
                        log_detail!(self.log, "discard output {:?} is not reparsable", text);
                    }
                }
                for c in chars {
                    self.target.write(*c);
                }
                Ok(())
            }
        }
    }
}
