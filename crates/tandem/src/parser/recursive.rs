//! Naturally recursive parser engine.
//!
//! This is the reference semantics: every node is a pure function of the
//! cursor state. The stack-safe engine must produce the same value or an
//! equal-shaped error for every parser and input. Host recursion makes this
//! engine unsuitable for deeply nested grammars; it exists as the oracle.

use std::rc::Rc;

use common::{create_logger, log_detail, Logger};

use crate::error::ParserError;
use crate::parser::{Cursor, Node};
use crate::value::{erase, unit, AnyValue};

pub(crate) fn parse<E: Clone + 'static>(
    node: &Rc<Node<E>>,
    input: &[char],
) -> Result<AnyValue, ParserError<E>> {
    let mut interpreter = Interpreter {
        cursor: Cursor::new(input),
        log: create_logger("recursive"),
    };
    interpreter.eval(node)
}

struct Interpreter<'s> {
    cursor: Cursor<'s>,
    log: Logger,
}

impl<'s> Interpreter<'s> {
    fn eval<E: Clone + 'static>(
        &mut self,
        node: &Node<E>,
    ) -> Result<AnyValue, ParserError<E>> {
        if let Some(result) = self.cursor.eval_leaf(node) {
            return result;
        }

        match node {
            Node::Named(inner, name) => {
                self.cursor.name_chain.push(name.clone());
                self.log.push_indent();
                let result = self.eval(inner);
                self.log.pop_indent();
                self.cursor.name_chain.pop();
                result
            }

            Node::Suspend(lazy) => {
                let forced = lazy.force();
                self.eval(&forced)
            }

            Node::Backtrack(inner) => {
                let entry = self.cursor.pos;
                let result = self.eval(inner);
                if result.is_err() {
                    self.cursor.pos = entry;
                }
                result
            }

            Node::SetAutoBacktracking(inner, enabled) => {
                let previous = self.cursor.auto_backtrack;
                self.cursor.auto_backtrack = *enabled;
                let result = self.eval(inner);
                self.cursor.auto_backtrack = previous;
                result
            }

            Node::MapError(inner, f) => self.eval(inner).map_err(|e| f(e)),

            Node::Transform(inner, f) => self.eval(inner).map(|v| f(v)),

            Node::TransformEither(inner, f) => {
                let entry = self.cursor.pos;
                let value = self.eval(inner)?;
                f(value).map_err(|e| self.cursor.failure(entry, e))
            }

            Node::Filter(inner, pred, error) => {
                let entry = self.cursor.pos;
                let value = self.eval(inner)?;
                if pred(&value) {
                    Ok(value)
                } else {
                    Err(self.cursor.failure(entry, error.clone()))
                }
            }

            Node::Zip(left, right, combine) => {
                let a = self.eval(left)?;
                let b = self.eval(right)?;
                Ok(combine(a, b))
            }

            Node::ZipLeft(left, right) => {
                let a = self.eval(left)?;
                self.eval(right)?;
                Ok(a)
            }

            Node::ZipRight(left, right) => {
                self.eval(left)?;
                self.eval(right)
            }

            Node::OrElse(left, right) => {
                self.alternative(left, right, None, None)
            }

            Node::OrElseEither(left, right, wrap_left, wrap_right) => {
                self.alternative(left, right, Some(wrap_left), Some(wrap_right))
            }

            Node::Optional(inner, wrap) => {
                let entry = self.cursor.pos;
                match self.eval(inner) {
                    Ok(value) => Ok(wrap(Some(value))),
                    Err(error) => {
                        self.restore_if_permitted(entry);
                        if self.cursor.pos == entry {
                            Ok(wrap(None))
                        } else {
                            Err(error)
                        }
                    }
                }
            }

            Node::Repeat { inner, min, max, wrap } => {
                let mut values: Vec<AnyValue> = Vec::new();
                let mut baseline = self.cursor.pos;
                loop {
                    if Some(values.len()) == *max {
                        break;
                    }
                    let iteration = self.cursor.pos;
                    match self.eval(inner) {
                        Ok(value) => {
                            values.push(value);
                            if self.cursor.pos == iteration {
                                // Zero-width match; the repetition cannot
                                // make further progress.
                                break;
                            }
                            baseline = self.cursor.pos;
                        }
                        Err(error) => {
                            self.restore_if_permitted(baseline);
                            if self.cursor.pos != baseline || values.len() < *min {
                                return Err(error);
                            }
                            log_detail!(
                                self.log,
                                "repeat stopped after {} at {}",
                                values.len(),
                                self.cursor.pos
                            );
                            break;
                        }
                    }
                }
                Ok(wrap(values))
            }

            Node::RepeatUntil { inner, stop, wrap } => {
                let mut values: Vec<AnyValue> = Vec::new();
                loop {
                    let iteration = self.cursor.pos;
                    let value = self.eval(inner)?;
                    values.push(value);
                    let zero_width = self.cursor.pos == iteration;
                    let before_stop = self.cursor.pos;
                    match self.eval(stop) {
                        Ok(_) => break,
                        Err(error) => {
                            self.restore_if_permitted(before_stop);
                            if self.cursor.pos != before_stop {
                                return Err(error);
                            }
                            if zero_width {
                                break;
                            }
                        }
                    }
                }
                Ok(wrap(values))
            }

            Node::RepeatWithSep { inner, sep, at_least_one, wrap } => {
                let entry = self.cursor.pos;
                let mut values: Vec<AnyValue> = Vec::new();
                match self.eval(inner) {
                    Ok(value) => values.push(value),
                    Err(error) => {
                        self.restore_if_permitted(entry);
                        if self.cursor.pos != entry || *at_least_one {
                            return Err(error);
                        }
                        return Ok(wrap(values));
                    }
                }
                loop {
                    let baseline = self.cursor.pos;
                    if let Err(error) = self.eval(sep) {
                        self.restore_if_permitted(baseline);
                        if self.cursor.pos != baseline {
                            return Err(error);
                        }
                        break;
                    }
                    match self.eval(inner) {
                        Ok(value) => {
                            values.push(value);
                            if self.cursor.pos == baseline {
                                break;
                            }
                        }
                        Err(error) => {
                            self.restore_if_permitted(baseline);
                            if self.cursor.pos != baseline {
                                return Err(error);
                            }
                            break;
                        }
                    }
                }
                Ok(wrap(values))
            }

            Node::Not(inner, error) => {
                let entry = self.cursor.pos;
                match self.eval(inner) {
                    Ok(_) => {
                        self.cursor.pos = entry;
                        Err(self.cursor.failure(entry, error.clone()))
                    }
                    Err(_) => {
                        self.cursor.pos = entry;
                        Ok(unit())
                    }
                }
            }

            Node::CaptureString(inner) => {
                let entry = self.cursor.pos;
                self.eval(inner)?;
                let text: String = self.cursor.input[entry..self.cursor.pos].iter().collect();
                Ok(erase(text))
            }

            // Leaves were handled by eval_leaf.
            _ => Err(ParserError::UnknownFailure {
                name_chain: self.cursor.name_chain.clone(),
                position: self.cursor.pos,
            }),
        }
    }

    /// Try the right branch after a left failure, per the backtracking
    /// discipline: a branch that consumed input is only retried when the
    /// position can be restored.
    fn alternative<E: Clone + 'static>(
        &mut self,
        left: &Rc<Node<E>>,
        right: &Rc<Node<E>>,
        wrap_left: Option<&Rc<crate::parser::MapFn>>,
        wrap_right: Option<&Rc<crate::parser::MapFn>>,
    ) -> Result<AnyValue, ParserError<E>> {
        let entry = self.cursor.pos;
        match self.eval(left) {
            Ok(value) => Ok(match wrap_left {
                Some(wrap) => wrap(value),
                None => value,
            }),
            Err(left_error) => {
                self.restore_if_permitted(entry);
                if self.cursor.pos != entry {
                    return Err(left_error);
                }
                log_detail!(self.log, "alternative at {}", entry);
                match self.eval(right) {
                    Ok(value) => Ok(match wrap_right {
                        Some(wrap) => wrap(value),
                        None => value,
                    }),
                    Err(right_error) => Err(left_error.add_failed_branch(right_error)),
                }
            }
        }
    }

    /// Restore the cursor to `target` after a failure, if auto-backtracking
    /// permits it. Callers decide what a still-advanced position means.
    fn restore_if_permitted(&mut self, target: usize) {
        if self.cursor.pos != target && self.cursor.auto_backtrack {
            self.cursor.pos = target;
        }
    }
}
