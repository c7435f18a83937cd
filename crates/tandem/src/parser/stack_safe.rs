//! Stack-safe parser engine.
//!
//! A trampoline over two explicit stacks replaces host recursion:
//!
//! - the **operand stack** holds values awaiting combination (a `Zip` keeps
//!   its left value there while the right side runs);
//! - the **continuation stack** holds one frame per still-open combinator,
//!   describing what to do when its child completes.
//!
//! The loop either descends into the next node or feeds the latest outcome to
//! the top frame. A failure unwinds frame by frame, so name scopes and
//! backtracking flags are restored on failure paths exactly as on success
//! paths, and frames that may retry capture the position at which their scope
//! was entered.
//!
//! Both stacks are plain vectors: they grow geometrically and frames are
//! stored inline, so the hot loop performs no per-frame heap allocation.

use std::rc::Rc;

use common::{create_logger, log, log_detail, Logger};

use crate::error::ParserError;
use crate::parser::{Cursor, ErrMapFn, MapFn, Node, OptFn, PairFn, PredFn, SeqFn, TryMapFn};
use crate::value::{erase, unit, AnyValue};

pub(crate) fn parse<E: Clone + 'static>(
    root: &Rc<Node<E>>,
    input: &[char],
) -> Result<AnyValue, ParserError<E>> {
    Vm::new(input).run(root.clone())
}

enum ZipKind {
    Pair(Rc<PairFn>),
    Left,
    Right,
}

/// A deferred continuation. Frames that may retry record the entry position
/// of their scope.
enum Frame<E> {
    /// Restore the name chain on exit of a `Named` scope.
    PopName,
    /// Restore the auto-backtracking flag on exit of `SetAutoBacktracking`.
    RestoreBacktrack { previous: bool },
    /// Restore the position if the child failed (`Backtrack`).
    Restore { entry: usize },
    MapError { f: Rc<ErrMapFn<E>> },
    Transform { f: Rc<MapFn> },
    TransformEither { f: Rc<TryMapFn<E>>, entry: usize },
    Filter { pred: Rc<PredFn>, error: E, entry: usize },
    /// Left side of a `Zip*` finished; evaluate the right side.
    ZipSecond { right: Rc<Node<E>>, kind: ZipKind },
    /// Right side of a `Zip*` finished; the left value is on the operand
    /// stack.
    ZipCombine { kind: ZipKind },
    /// Rewrap a successful value (`or_else_either` branches).
    WrapValue { f: Rc<MapFn> },
    /// Left branch of an alternative is running.
    Alternative {
        right: Rc<Node<E>>,
        entry: usize,
        wrap_right: Option<Rc<MapFn>>,
    },
    /// Right branch of an alternative is running; both errors are retained
    /// if it fails too.
    SecondBranch { left_error: ParserError<E> },
    Optional { entry: usize, wrap: Rc<OptFn> },
    Repeat {
        inner: Rc<Node<E>>,
        min: usize,
        max: Option<usize>,
        wrap: Rc<SeqFn>,
        values: Vec<AnyValue>,
        baseline: usize,
        iteration: usize,
    },
    /// `RepeatUntil`, waiting on the loop body.
    UntilBody {
        inner: Rc<Node<E>>,
        stop: Rc<Node<E>>,
        wrap: Rc<SeqFn>,
        values: Vec<AnyValue>,
        iteration: usize,
    },
    /// `RepeatUntil`, waiting on the stop parser.
    UntilStop {
        inner: Rc<Node<E>>,
        stop: Rc<Node<E>>,
        wrap: Rc<SeqFn>,
        values: Vec<AnyValue>,
        before_stop: usize,
        zero_width: bool,
    },
    /// `RepeatWithSep`, waiting on the first element.
    SepFirst {
        inner: Rc<Node<E>>,
        sep: Rc<Node<E>>,
        at_least_one: bool,
        wrap: Rc<SeqFn>,
        entry: usize,
    },
    /// `RepeatWithSep`, waiting on a separator.
    SepNext {
        inner: Rc<Node<E>>,
        sep: Rc<Node<E>>,
        wrap: Rc<SeqFn>,
        values: Vec<AnyValue>,
        baseline: usize,
    },
    /// `RepeatWithSep`, waiting on the element after a separator.
    SepItem {
        inner: Rc<Node<E>>,
        sep: Rc<Node<E>>,
        wrap: Rc<SeqFn>,
        values: Vec<AnyValue>,
        baseline: usize,
    },
    Not { entry: usize, error: E },
    Capture { entry: usize },
}

/// What evaluating one node did: either a completed outcome or a child to
/// descend into (with this node's frame already pushed).
enum Step<E> {
    Done(Result<AnyValue, ParserError<E>>),
    Descend(Rc<Node<E>>),
}

struct Vm<'s, E> {
    cursor: Cursor<'s>,
    operands: Vec<AnyValue>,
    frames: Vec<Frame<E>>,
    log: Logger,
}

impl<'s, E: Clone + 'static> Vm<'s, E> {
    fn new(input: &'s [char]) -> Self {
        Self {
            cursor: Cursor::new(input),
            operands: Vec::with_capacity(16),
            frames: Vec::with_capacity(64),
            log: create_logger("vm"),
        }
    }

    fn run(&mut self, root: Rc<Node<E>>) -> Result<AnyValue, ParserError<E>> {
        log!(self.log, "parse {} chars", self.cursor.input.len());
        let mut next = Some(root);
        let mut last: Result<AnyValue, ParserError<E>> = Ok(unit());
        loop {
            while let Some(node) = next.take() {
                match self.step(node) {
                    Step::Done(outcome) => last = outcome,
                    Step::Descend(child) => next = Some(child),
                }
            }
            match self.frames.pop() {
                None => return last,
                Some(frame) => next = self.apply(frame, &mut last),
            }
        }
    }

    /// Translate one node into stack mutations. Leaves complete immediately;
    /// everything else pushes its continuation and descends into a child.
    fn step(&mut self, node: Rc<Node<E>>) -> Step<E> {
        if let Some(result) = self.cursor.eval_leaf(&node) {
            return Step::Done(result);
        }

        match &*node {
            Node::Named(inner, name) => {
                self.cursor.name_chain.push(name.clone());
                self.frames.push(Frame::PopName);
                Step::Descend(inner.clone())
            }

            Node::Suspend(lazy) => Step::Descend(lazy.force()),

            Node::Backtrack(inner) => {
                self.frames.push(Frame::Restore { entry: self.cursor.pos });
                Step::Descend(inner.clone())
            }

            Node::SetAutoBacktracking(inner, enabled) => {
                self.frames.push(Frame::RestoreBacktrack {
                    previous: self.cursor.auto_backtrack,
                });
                self.cursor.auto_backtrack = *enabled;
                Step::Descend(inner.clone())
            }

            Node::MapError(inner, f) => {
                self.frames.push(Frame::MapError { f: f.clone() });
                Step::Descend(inner.clone())
            }

            Node::Transform(inner, f) => {
                self.frames.push(Frame::Transform { f: f.clone() });
                Step::Descend(inner.clone())
            }

            Node::TransformEither(inner, f) => {
                self.frames.push(Frame::TransformEither {
                    f: f.clone(),
                    entry: self.cursor.pos,
                });
                Step::Descend(inner.clone())
            }

            Node::Filter(inner, pred, error) => {
                self.frames.push(Frame::Filter {
                    pred: pred.clone(),
                    error: error.clone(),
                    entry: self.cursor.pos,
                });
                Step::Descend(inner.clone())
            }

            Node::Zip(left, right, combine) => {
                self.frames.push(Frame::ZipSecond {
                    right: right.clone(),
                    kind: ZipKind::Pair(combine.clone()),
                });
                Step::Descend(left.clone())
            }

            Node::ZipLeft(left, right) => {
                self.frames.push(Frame::ZipSecond {
                    right: right.clone(),
                    kind: ZipKind::Left,
                });
                Step::Descend(left.clone())
            }

            Node::ZipRight(left, right) => {
                self.frames.push(Frame::ZipSecond {
                    right: right.clone(),
                    kind: ZipKind::Right,
                });
                Step::Descend(left.clone())
            }

            Node::OrElse(left, right) => {
                self.frames.push(Frame::Alternative {
                    right: right.clone(),
                    entry: self.cursor.pos,
                    wrap_right: None,
                });
                Step::Descend(left.clone())
            }

            Node::OrElseEither(left, right, wrap_left, wrap_right) => {
                self.frames.push(Frame::Alternative {
                    right: right.clone(),
                    entry: self.cursor.pos,
                    wrap_right: Some(wrap_right.clone()),
                });
                self.frames.push(Frame::WrapValue { f: wrap_left.clone() });
                Step::Descend(left.clone())
            }

            Node::Optional(inner, wrap) => {
                self.frames.push(Frame::Optional {
                    entry: self.cursor.pos,
                    wrap: wrap.clone(),
                });
                Step::Descend(inner.clone())
            }

            Node::Repeat { inner, min, max, wrap } => {
                if *max == Some(0) {
                    return Step::Done(Ok(wrap(Vec::new())));
                }
                self.frames.push(Frame::Repeat {
                    inner: inner.clone(),
                    min: *min,
                    max: *max,
                    wrap: wrap.clone(),
                    values: Vec::new(),
                    baseline: self.cursor.pos,
                    iteration: self.cursor.pos,
                });
                Step::Descend(inner.clone())
            }

            Node::RepeatUntil { inner, stop, wrap } => {
                self.frames.push(Frame::UntilBody {
                    inner: inner.clone(),
                    stop: stop.clone(),
                    wrap: wrap.clone(),
                    values: Vec::new(),
                    iteration: self.cursor.pos,
                });
                Step::Descend(inner.clone())
            }

            Node::RepeatWithSep { inner, sep, at_least_one, wrap } => {
                self.frames.push(Frame::SepFirst {
                    inner: inner.clone(),
                    sep: sep.clone(),
                    at_least_one: *at_least_one,
                    wrap: wrap.clone(),
                    entry: self.cursor.pos,
                });
                Step::Descend(inner.clone())
            }

            Node::Not(inner, error) => {
                self.frames.push(Frame::Not {
                    entry: self.cursor.pos,
                    error: error.clone(),
                });
                Step::Descend(inner.clone())
            }

            Node::CaptureString(inner) => {
                self.frames.push(Frame::Capture { entry: self.cursor.pos });
                Step::Descend(inner.clone())
            }

            // Leaves were handled by eval_leaf.
            _ => Step::Done(Err(ParserError::UnknownFailure {
                name_chain: self.cursor.name_chain.clone(),
                position: self.cursor.pos,
            })),
        }
    }

    /// Feed the latest outcome to a frame. Returns a node to descend into
    /// when the frame schedules more work (an alternative branch, the next
    /// repetition); otherwise the possibly rewritten outcome keeps unwinding.
    fn apply(
        &mut self,
        frame: Frame<E>,
        outcome: &mut Result<AnyValue, ParserError<E>>,
    ) -> Option<Rc<Node<E>>> {
        match frame {
            Frame::PopName => {
                self.cursor.name_chain.pop();
                None
            }

            Frame::RestoreBacktrack { previous } => {
                self.cursor.auto_backtrack = previous;
                None
            }

            Frame::Restore { entry } => {
                if outcome.is_err() {
                    self.cursor.pos = entry;
                }
                None
            }

            Frame::MapError { f } => {
                if let Err(error) = outcome {
                    *outcome = Err(f(error.clone()));
                }
                None
            }

            Frame::Transform { f } => {
                if let Ok(value) = outcome {
                    *outcome = Ok(f(value.clone()));
                }
                None
            }

            Frame::TransformEither { f, entry } => {
                if let Ok(value) = outcome {
                    *outcome = match f(value.clone()) {
                        Ok(mapped) => Ok(mapped),
                        Err(error) => Err(self.cursor.failure(entry, error)),
                    };
                }
                None
            }

            Frame::Filter { pred, error, entry } => {
                if let Ok(value) = outcome {
                    if !pred(value) {
                        *outcome = Err(self.cursor.failure(entry, error));
                    }
                }
                None
            }

            Frame::ZipSecond { right, kind } => match outcome {
                Ok(value) => match kind {
                    ZipKind::Right => Some(right),
                    kind => {
                        self.operands.push(value.clone());
                        self.frames.push(Frame::ZipCombine { kind });
                        Some(right)
                    }
                },
                Err(_) => None,
            },

            Frame::ZipCombine { kind } => {
                let left = self
                    .operands
                    .pop()
                    .expect("tandem internal error: operand stack underflow");
                if let Ok(value) = outcome {
                    *outcome = Ok(match kind {
                        ZipKind::Pair(combine) => combine(left, value.clone()),
                        ZipKind::Left => left,
                        ZipKind::Right => value.clone(),
                    });
                }
                None
            }

            Frame::WrapValue { f } => {
                if let Ok(value) = outcome {
                    *outcome = Ok(f(value.clone()));
                }
                None
            }

            Frame::Alternative { right, entry, wrap_right } => match outcome {
                Ok(_) => None,
                Err(left_error) => {
                    self.restore_if_permitted(entry);
                    if self.cursor.pos != entry {
                        return None;
                    }
                    log_detail!(self.log, "alternative at {}", entry);
                    self.frames.push(Frame::SecondBranch { left_error: left_error.clone() });
                    if let Some(wrap) = wrap_right {
                        self.frames.push(Frame::WrapValue { f: wrap });
                    }
                    Some(right)
                }
            },

            Frame::SecondBranch { left_error } => {
                if let Err(right_error) = outcome {
                    *outcome = Err(left_error.add_failed_branch(right_error.clone()));
                }
                None
            }

            Frame::Optional { entry, wrap } => {
                match outcome {
                    Ok(value) => *outcome = Ok(wrap(Some(value.clone()))),
                    Err(_) => {
                        self.restore_if_permitted(entry);
                        if self.cursor.pos == entry {
                            *outcome = Ok(wrap(None));
                        }
                    }
                }
                None
            }

            Frame::Repeat { inner, min, max, wrap, mut values, baseline, iteration } => {
                match outcome {
                    Ok(value) => {
                        values.push(value.clone());
                        if self.cursor.pos == iteration || Some(values.len()) == max {
                            *outcome = Ok(wrap(values));
                            return None;
                        }
                        let pos = self.cursor.pos;
                        self.frames.push(Frame::Repeat {
                            inner: inner.clone(),
                            min,
                            max,
                            wrap,
                            values,
                            baseline: pos,
                            iteration: pos,
                        });
                        Some(inner)
                    }
                    Err(_) => {
                        self.restore_if_permitted(baseline);
                        if self.cursor.pos != baseline || values.len() < min {
                            return None;
                        }
                        log_detail!(
                            self.log,
                            "repeat stopped after {} at {}",
                            values.len(),
                            self.cursor.pos
                        );
                        *outcome = Ok(wrap(values));
                        None
                    }
                }
            }

            Frame::UntilBody { inner, stop, wrap, mut values, iteration } => match outcome {
                Ok(value) => {
                    values.push(value.clone());
                    self.frames.push(Frame::UntilStop {
                        inner,
                        stop: stop.clone(),
                        wrap,
                        values,
                        before_stop: self.cursor.pos,
                        zero_width: self.cursor.pos == iteration,
                    });
                    Some(stop)
                }
                Err(_) => None,
            },

            Frame::UntilStop { inner, stop, wrap, values, before_stop, zero_width } => {
                match outcome {
                    Ok(_) => {
                        *outcome = Ok(wrap(values));
                        None
                    }
                    Err(_) => {
                        self.restore_if_permitted(before_stop);
                        if self.cursor.pos != before_stop {
                            return None;
                        }
                        if zero_width {
                            *outcome = Ok(wrap(values));
                            return None;
                        }
                        self.frames.push(Frame::UntilBody {
                            inner: inner.clone(),
                            stop,
                            wrap,
                            values,
                            iteration: self.cursor.pos,
                        });
                        Some(inner)
                    }
                }
            }

            Frame::SepFirst { inner, sep, at_least_one, wrap, entry } => match outcome {
                Ok(value) => {
                    self.frames.push(Frame::SepNext {
                        inner,
                        sep: sep.clone(),
                        wrap,
                        values: vec![value.clone()],
                        baseline: self.cursor.pos,
                    });
                    Some(sep)
                }
                Err(_) => {
                    self.restore_if_permitted(entry);
                    if self.cursor.pos == entry && !at_least_one {
                        *outcome = Ok(wrap(Vec::new()));
                    }
                    None
                }
            },

            Frame::SepNext { inner, sep, wrap, values, baseline } => match outcome {
                Ok(_) => {
                    self.frames.push(Frame::SepItem {
                        inner: inner.clone(),
                        sep,
                        wrap,
                        values,
                        baseline,
                    });
                    Some(inner)
                }
                Err(_) => {
                    self.restore_if_permitted(baseline);
                    if self.cursor.pos == baseline {
                        *outcome = Ok(wrap(values));
                    }
                    None
                }
            },

            Frame::SepItem { inner, sep, wrap, mut values, baseline } => match outcome {
                Ok(value) => {
                    values.push(value.clone());
                    if self.cursor.pos == baseline {
                        *outcome = Ok(wrap(values));
                        return None;
                    }
                    self.frames.push(Frame::SepNext {
                        inner,
                        sep: sep.clone(),
                        wrap,
                        values,
                        baseline: self.cursor.pos,
                    });
                    Some(sep)
                }
                Err(_) => {
                    self.restore_if_permitted(baseline);
                    if self.cursor.pos == baseline {
                        *outcome = Ok(wrap(values));
                    }
                    None
                }
            },

            Frame::Not { entry, error } => {
                self.cursor.pos = entry;
                *outcome = if outcome.is_ok() {
                    Err(self.cursor.failure(entry, error))
                } else {
                    Ok(unit())
                };
                None
            }

            Frame::Capture { entry } => {
                if outcome.is_ok() {
                    let text: String =
                        self.cursor.input[entry..self.cursor.pos].iter().collect();
                    *outcome = Ok(erase(text));
                }
                None
            }
        }
    }

    fn restore_if_permitted(&mut self, target: usize) {
        if self.cursor.pos != target && self.cursor.auto_backtrack {
            self.cursor.pos = target;
        }
    }
}
